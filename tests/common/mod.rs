#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tradepnl::domain::error::PnlError;
pub use tradepnl::domain::trade::{Action, Currency, Side, Trade};
use tradepnl::ports::trade_port::{TradeFile, TradePort};

/// In-memory trade files keyed by path.
pub struct MockTradePort {
    pub files: BTreeMap<PathBuf, Vec<Trade>>,
    pub errors: BTreeMap<PathBuf, String>,
}

impl MockTradePort {
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, path: &str, trades: Vec<Trade>) -> Self {
        self.files.insert(PathBuf::from(path), trades);
        self
    }

    pub fn with_error(mut self, path: &str, reason: &str) -> Self {
        self.errors.insert(PathBuf::from(path), reason.to_string());
        self
    }
}

impl TradePort for MockTradePort {
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, PnlError> {
        Ok(self
            .files
            .keys()
            .chain(self.errors.keys())
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect())
    }

    fn read_trades(&self, path: &Path) -> Result<Option<TradeFile>, PnlError> {
        if let Some(reason) = self.errors.get(path) {
            return Err(PnlError::Ingest {
                file: path.display().to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self.files.get(path).map(|trades| TradeFile {
            path: path.to_path_buf(),
            trades: trades.clone(),
            skipped: Vec::new(),
        }))
    }
}

pub fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.6f").unwrap()
}

/// Trade with fixed book fields; override what the test cares about.
pub fn make_trade(
    id: &str,
    action: Action,
    side: Side,
    currency: Currency,
    price: Decimal,
    volume: u64,
    time: &str,
) -> Trade {
    Trade {
        trade_id: id.to_string(),
        instrument: "AAPL US Equity".to_string(),
        currency,
        side,
        price,
        volume,
        portfolio: "portfolio1".to_string(),
        action,
        account: "Account1".to_string(),
        strategy: "Strategy1".to_string(),
        user: "User1".to_string(),
        trade_time: ts(time),
        value_date: NaiveDate::from_ymd_opt(2010, 1, 5).unwrap(),
    }
}

pub const TRADE_HEADER: &str =
    "TradeID,BBGCode,Currency,Side,Price,Volume,Portfolio,Action,Account,Strategy,User,TradeTimeUTC,ValueDate";

/// CSV row for `trade` in the input file layout.
pub fn csv_row(trade: &Trade) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{}",
        trade.trade_id,
        trade.instrument,
        trade.currency,
        trade.side.tag(),
        trade.price,
        trade.volume,
        trade.portfolio,
        trade.action,
        trade.account,
        trade.strategy,
        trade.user,
        trade.trade_time.format("%Y-%m-%dT%H:%M:%S%.6f"),
        trade.value_date.format("%Y%m%d"),
    )
}

pub fn write_trade_file(dir: &Path, name: &str, trades: &[Trade]) -> PathBuf {
    let mut content = String::from(TRADE_HEADER);
    content.push('\n');
    for trade in trades {
        content.push_str(&csv_row(trade));
        content.push('\n');
    }
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
