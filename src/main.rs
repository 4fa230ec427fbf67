use std::env;
use std::io;
use std::process::ExitCode;

use lera_checkout::catalog::InMemorySource;
use lera_checkout::csv::{read_actions, read_tiers, write_tiers};
use lera_checkout::{Config, Engine};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: lera-checkout <tiers.csv> <actions.csv>";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(
            "warn".parse().expect("static directive is valid"),
        ))
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let (Some(tiers_path), Some(actions_path)) = (args.next(), args.next()) else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut source = InMemorySource::new();
    match read_tiers(&tiers_path) {
        Ok(rows) => {
            for result in rows {
                match result {
                    Ok((event, record)) => source.insert(event, record),
                    Err(e) => warn!("{e}"),
                }
            }
        }
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    }

    let actions = match read_actions(actions_path) {
        Ok(actions) => actions,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let events = source.events();
    let mut engine = Engine::new(source, config);
    for event in &events {
        if let Err(e) = engine.refresh(event).await {
            warn!(event = %event, "{e}");
        }
    }

    let (action_sender, action_receiver) = tokio::sync::mpsc::channel(16);

    tokio::spawn(async move {
        for result in actions {
            match result {
                Ok(action) => {
                    if action_sender.send(action).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    engine.run(ReceiverStream::new(action_receiver)).await;

    for receipt in engine.receipts() {
        info!(
            receipt = %receipt.id,
            event = %receipt.event,
            quantity = receipt.total_quantity,
            total = %receipt.total_price,
            "receipt"
        );
    }

    if let Err(e) = write_tiers(io::stdout().lock(), engine.catalogs().map(|catalog| &**catalog)) {
        error!("failed to write output: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
