//! Trade lifecycle record and its closed enumerations.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::PnlError;

/// Wire format of `TradeTimeUTC`, microsecond precision.
pub const TRADE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
/// Wire format of `ValueDate`.
pub const VALUE_DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Nok,
    Krw,
}

impl Currency {
    pub const ALL: [Currency; 6] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Nok,
        Currency::Krw,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Nok => "NOK",
            Currency::Krw => "KRW",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = PnlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == tag)
            .ok_or(PnlError::UnknownCurrency { tag })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn tag(self) -> &'static str {
        match self {
            Side::Buy => "B",
            Side::Sell => "S",
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "B" | "b" => Ok(Side::Buy),
            "S" | "s" => Ok(Side::Sell),
            other => Err(format!("invalid side {other:?}, expected B or S")),
        }
    }
}

/// Lifecycle tag. New opens a trade, Amend corrects it, Cancel voids it for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    New,
    Amend,
    Cancel,
}

impl Action {
    pub fn tag(self) -> &'static str {
        match self {
            Action::New => "NEW",
            Action::Amend => "AMEND",
            Action::Cancel => "CANCEL",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NEW" => Ok(Action::New),
            "AMEND" => Ok(Action::Amend),
            "CANCEL" => Ok(Action::Cancel),
            other => Err(format!("invalid action {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub trade_id: String,
    pub instrument: String,
    pub currency: Currency,
    pub side: Side,
    pub price: Decimal,
    pub volume: u64,
    pub portfolio: String,
    pub action: Action,
    pub account: String,
    pub strategy: String,
    pub user: String,
    pub trade_time: NaiveDateTime,
    pub value_date: NaiveDate,
}

impl Trade {
    /// Required-field checks applied before a record may enter the store.
    pub fn validate(&self) -> Result<(), PnlError> {
        let required = [
            ("trade id", &self.trade_id),
            ("instrument", &self.instrument),
            ("portfolio", &self.portfolio),
            ("account", &self.account),
            ("strategy", &self.strategy),
            ("user", &self.user),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(self.malformed(format!("{field} is empty")));
            }
        }
        if self.price < Decimal::ZERO {
            return Err(self.malformed(format!("price {} is negative", self.price)));
        }
        if self.volume == 0 {
            return Err(self.malformed("volume must be positive".to_string()));
        }
        Ok(())
    }

    /// price × volume, unsigned. Fails with [`PnlError::Overflow`] when the
    /// product leaves `Decimal` range.
    pub fn notional(&self) -> Result<Decimal, PnlError> {
        self.price
            .checked_mul(Decimal::from(self.volume))
            .ok_or_else(|| PnlError::Overflow {
                context: format!("in notional of trade {}", self.trade_id),
            })
    }

    /// Cash flow of the trade in its own currency: buys pay out, sells take in.
    pub fn signed_cash(&self) -> Result<Decimal, PnlError> {
        let notional = self.notional()?;
        Ok(match self.side {
            Side::Buy => -notional,
            Side::Sell => notional,
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.action == Action::Cancel
    }

    fn malformed(&self, reason: String) -> PnlError {
        PnlError::MalformedRecord {
            trade_id: self.trade_id.clone(),
            reason,
        }
    }
}
