//! CSV trade file adapter.

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::domain::error::PnlError;
use crate::domain::fx::FxConverter;
use crate::domain::trade::{Currency, TRADE_TIME_FORMAT, Trade, VALUE_DATE_FORMAT};
use crate::ports::trade_port::{TradeFile, TradePort};

/// Header every trade file must start with, column for column.
pub const TRADE_HEADERS: [&str; 13] = [
    "TradeID",
    "BBGCode",
    "Currency",
    "Side",
    "Price",
    "Volume",
    "Portfolio",
    "Action",
    "Account",
    "Strategy",
    "User",
    "TradeTimeUTC",
    "ValueDate",
];

const FX_HEADERS: [&str; 3] = ["From", "To", "Rate"];

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvTradeAdapter;

impl CsvTradeAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "csv")
}

fn ingest_error(path: &Path, reason: impl std::fmt::Display) -> PnlError {
    PnlError::Ingest {
        file: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn field<'r>(record: &'r StringRecord, index: usize) -> Result<&'r str, String> {
    record
        .get(index)
        .ok_or_else(|| format!("missing {} column", TRADE_HEADERS[index]))
}

fn parse_record(record: &StringRecord) -> Result<Trade, String> {
    let price = field(record, 4)?;
    let volume = field(record, 5)?;
    let trade_time = field(record, 11)?;
    let value_date = field(record, 12)?;

    Ok(Trade {
        trade_id: field(record, 0)?.to_string(),
        instrument: field(record, 1)?.to_string(),
        currency: field(record, 2)?
            .parse::<Currency>()
            .map_err(|e| e.to_string())?,
        side: field(record, 3)?.parse()?,
        price: price
            .parse::<Decimal>()
            .map_err(|e| format!("invalid price {price:?}: {e}"))?,
        volume: volume
            .parse::<u64>()
            .map_err(|e| format!("invalid volume {volume:?}: {e}"))?,
        portfolio: field(record, 6)?.to_string(),
        action: field(record, 7)?.parse()?,
        account: field(record, 8)?.to_string(),
        strategy: field(record, 9)?.to_string(),
        user: field(record, 10)?.to_string(),
        trade_time: NaiveDateTime::parse_from_str(trade_time, TRADE_TIME_FORMAT)
            .map_err(|e| format!("invalid TradeTimeUTC {trade_time:?}: {e}"))?,
        value_date: NaiveDate::parse_from_str(value_date, VALUE_DATE_FORMAT)
            .map_err(|e| format!("invalid ValueDate {value_date:?}: {e}"))?,
    })
}

impl TradePort for CsvTradeAdapter {
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, PnlError> {
        let entries = fs::read_dir(dir).map_err(|e| ingest_error(dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ingest_error(dir, e))?.path();
            if path.is_dir() {
                info!("{} is a directory, ignored", path.display());
            } else if !is_csv(&path) {
                info!("{} is not a csv file, ignored", path.display());
            } else {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    fn read_trades(&self, path: &Path) -> Result<Option<TradeFile>, PnlError> {
        if path.is_dir() || !is_csv(path) {
            info!("{} is not a csv file, ignored", path.display());
            return Ok(None);
        }

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| ingest_error(path, e))?;

        let headers = rdr.headers().map_err(|e| ingest_error(path, e))?;
        if !headers.iter().eq(TRADE_HEADERS) {
            info!("{} has unexpected headers, ignored", path.display());
            return Ok(None);
        }

        let mut file = TradeFile {
            path: path.to_path_buf(),
            ..Default::default()
        };
        for (line, result) in rdr.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("{} row {}: {e}", path.display(), line + 1);
                    file.skipped.push(PnlError::MalformedRecord {
                        trade_id: String::new(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            match parse_record(&record) {
                Ok(trade) => file.trades.push(trade),
                Err(reason) => {
                    warn!("{} row {}: {reason}", path.display(), line + 1);
                    file.skipped.push(PnlError::MalformedRecord {
                        trade_id: record.get(0).unwrap_or_default().to_string(),
                        reason,
                    });
                }
            }
        }

        debug!(
            "read {} trades from {} ({} rows skipped)",
            file.trades.len(),
            path.display(),
            file.skipped.len()
        );
        Ok(Some(file))
    }
}

/// Load a directed FX table from a `From,To,Rate` CSV file.
pub fn load_fx_rates(path: &Path) -> Result<FxConverter, PnlError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| ingest_error(path, e))?;

    let headers = rdr.headers().map_err(|e| ingest_error(path, e))?;
    if !headers.iter().eq(FX_HEADERS) {
        return Err(ingest_error(path, "expected header From,To,Rate"));
    }

    let mut rates = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| ingest_error(path, e))?;
        let from: Currency = record.get(0).unwrap_or_default().parse()?;
        let to: Currency = record.get(1).unwrap_or_default().parse()?;
        let raw = record.get(2).unwrap_or_default();
        let rate: Decimal = raw
            .parse()
            .map_err(|e| ingest_error(path, format!("invalid rate {raw:?}: {e}")))?;
        if rate <= Decimal::ZERO {
            return Err(ingest_error(path, format!("rate {from}->{to} must be positive")));
        }
        rates.push((from, to, rate));
    }

    info!("loaded {} FX rates from {}", rates.len(), path.display());
    Ok(FxConverter::from_rates(rates))
}
