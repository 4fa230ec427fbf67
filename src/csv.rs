use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::catalog::InventoryCatalog;
use crate::{Action, Amount, BuyerId, EventId, TierRecord};

/// Errors that can occur when reading csv input
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("{path}: cannot open: {source}")]
    Open { path: String, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized action '{action}'")]
    UnrecognizedAction { line: usize, action: String },

    #[error("line {line}: {action} missing tier")]
    MissingTier { line: usize, action: String },

    #[error("line {line}: set missing quantity")]
    MissingQuantity { line: usize },

    #[error("line {line}: tier {tier} has invalid price {price}")]
    InvalidPrice { line: usize, tier: String, price: f64 },

    #[error("line {line}: tier {tier} has negative {field}")]
    Negative {
        line: usize,
        tier: String,
        field: &'static str,
    },
}

#[derive(Debug, Deserialize)]
struct TierRow {
    event: EventId,
    tier: String,
    name: String,
    price: f64,
    remaining: i64,
}

#[derive(Debug, Deserialize)]
struct ActionRow {
    action: String,
    buyer: BuyerId,
    event: EventId,
    tier: Option<String>,
    quantity: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    event: &'a str,
    tier: &'a str,
    name: &'a str,
    price: String,
    remaining: u32,
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, CsvError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.display().to_string(),
            source,
        })
}

/// Read event tier definitions from a csv file
pub fn read_tiers(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<(EventId, TierRecord), CsvError>>, CsvError> {
    let reader = open(path.as_ref())?;

    Ok(reader
        .into_deserialize::<TierRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            let price = Amount::from_float(row.price).ok_or_else(|| CsvError::InvalidPrice {
                line,
                tier: row.tier.clone(),
                price: row.price,
            })?;
            if price.is_negative() {
                return Err(CsvError::Negative {
                    line,
                    tier: row.tier,
                    field: "price",
                });
            }
            let remaining = u32::try_from(row.remaining).map_err(|_| CsvError::Negative {
                line,
                tier: row.tier.clone(),
                field: "remaining",
            })?;
            Ok((
                row.event,
                TierRecord::new(row.tier, row.name, price, remaining),
            ))
        }))
}

/// Read buyer actions from a csv file
pub fn read_actions(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Action, CsvError>>, CsvError> {
    let reader = open(path.as_ref())?;

    Ok(reader
        .into_deserialize::<ActionRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            let ActionRow {
                action,
                buyer,
                event,
                tier,
                quantity,
            } = row;

            let require_tier = |tier: Option<String>| {
                tier.ok_or_else(|| CsvError::MissingTier {
                    line,
                    action: action.clone(),
                })
            };

            match action.as_str() {
                "set" => Ok(Action::Set {
                    buyer,
                    event,
                    tier: require_tier(tier)?,
                    quantity: quantity.ok_or(CsvError::MissingQuantity { line })?,
                }),
                "increment" => Ok(Action::Increment {
                    buyer,
                    event,
                    tier: require_tier(tier)?,
                }),
                "decrement" => Ok(Action::Decrement {
                    buyer,
                    event,
                    tier: require_tier(tier)?,
                }),
                "accept" => Ok(Action::AcceptTerms { buyer, event }),
                "commit" => Ok(Action::Commit { buyer, event }),
                "cancel" => Ok(Action::Cancel { buyer, event }),
                _ => Err(CsvError::UnrecognizedAction {
                    line,
                    action: action.clone(),
                }),
            }
        }))
}

/// Write the tier state of every catalog in csv format
pub fn write_tiers<'a, W: io::Write>(
    writer: W,
    catalogs: impl IntoIterator<Item = &'a InventoryCatalog>,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);

    for catalog in catalogs {
        for tier in catalog.tiers() {
            writer.serialize(OutputRow {
                event: catalog.event(),
                tier: &tier.id,
                name: &tier.name,
                price: tier.unit_price.to_string(),
                remaining: tier.remaining,
            })?;
        }
    }

    writer.flush()?;
    Ok(())
}
