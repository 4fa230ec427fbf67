use std::sync::Arc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use lera_checkout::catalog::InMemorySource;
use lera_checkout::{Action, Amount, BuyerId, Checkout, Config, Engine, InventoryCatalog, TierRecord};
use tokio::runtime::Runtime;

const TIERS: [&str; 3] = ["ga", "vip", "vvip"];

fn records(remaining: u32) -> Vec<TierRecord> {
    vec![
        TierRecord::new("ga", "General Admission", Amount::from_minor(7500), remaining),
        TierRecord::new("vip", "VIP Pass", Amount::from_minor(15_000), remaining),
        TierRecord::new("vvip", "VVIP Experience", Amount::from_minor(25_000), remaining),
    ]
}

fn config() -> Config {
    Config {
        require_terms: false,
        ..Config::default()
    }
}

/// Generates buyer action sequences for benchmarking.
///
/// Pattern per buyer:
/// 1. Set 2 units of one tier
/// 2. Increment another tier
/// 3. Commit
pub struct ActionGenerator {
    num_buyers: BuyerId,
    current_buyer: BuyerId,
    current_step: u32,
}

impl ActionGenerator {
    pub fn new(num_buyers: BuyerId) -> Self {
        Self {
            num_buyers,
            current_buyer: 1,
            current_step: 0,
        }
    }
}

impl Iterator for ActionGenerator {
    type Item = Action;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_buyer > self.num_buyers {
            return None;
        }

        let buyer = self.current_buyer;
        let event = "1".to_string();
        let tier = TIERS[buyer as usize % TIERS.len()].to_string();

        let action = match self.current_step {
            0 => Action::Set {
                buyer,
                event,
                tier,
                quantity: 2,
            },
            1 => Action::Increment {
                buyer,
                event,
                tier: TIERS[(buyer as usize + 1) % TIERS.len()].to_string(),
            },
            _ => Action::Commit { buyer, event },
        };

        self.current_step += 1;
        if self.current_step == 3 {
            self.current_step = 0;
            self.current_buyer += 1;
        }

        Some(action)
    }
}

fn bench_engine_actions(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("engine");

    for buyers in [100u32, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(buyers), &buyers, |b, &buyers| {
            b.iter(|| {
                runtime.block_on(async {
                    let source = InMemorySource::new().with_event("1", records(u32::MAX));
                    let mut engine = Engine::new(source, config());
                    for action in ActionGenerator::new(buyers) {
                        let _ = black_box(engine.apply(action).await);
                    }
                    engine
                })
            });
        });
    }

    group.finish();
}

fn bench_contended_commits(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("contended_commits");

    // More buyers than stock: half of the commits conflict
    for buyers in [64usize, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(buyers), &buyers, |b, &buyers| {
            b.iter(|| {
                runtime.block_on(async {
                    let catalog = Arc::new(
                        InventoryCatalog::new("1", records(buyers as u32), Duration::from_secs(5))
                            .unwrap(),
                    );
                    let handles: Vec<_> = (0..buyers)
                        .map(|_| {
                            let mut checkout = Checkout::new(Arc::clone(&catalog), &config());
                            checkout.set_quantity("ga", 2);
                            checkout.set_quantity("vip", 1);
                            tokio::spawn(async move { checkout.commit().await.is_ok() })
                        })
                        .collect();
                    for handle in handles {
                        let _ = black_box(handle.await);
                    }
                })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_engine_actions, bench_contended_commits);
criterion_main!(benches);
