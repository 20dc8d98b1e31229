//! Aggregation requests and trade bucketing.
//!
//! A request names the dimensions to group on, an optional currency to convert
//! into, and an optional OR-set of [`TradeFilter`]s. [`group_trades`] turns the
//! canonical store into buckets keyed by the comma-joined dimension values,
//! each bucket sorted by trade time.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::error::PnlError;
use super::store::CanonicalStore;
use super::trade::{Currency, Trade};

/// Separator between dimension values in a group key.
pub const KEY_DELIMITER: &str = ",";

/// Grouping dimension. Declaration order is the canonical key order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupField {
    InstrumentCode,
    Account,
    Portfolio,
    Strategy,
    User,
    Currency,
}

type Extractor = fn(&Trade) -> &str;

fn instrument_of(t: &Trade) -> &str {
    &t.instrument
}

fn account_of(t: &Trade) -> &str {
    &t.account
}

fn portfolio_of(t: &Trade) -> &str {
    &t.portfolio
}

fn strategy_of(t: &Trade) -> &str {
    &t.strategy
}

fn user_of(t: &Trade) -> &str {
    &t.user
}

fn currency_of(t: &Trade) -> &str {
    t.currency.code()
}

/// Every dimension with its wire tag and value extractor, in canonical order.
const DIMENSIONS: [(GroupField, &str, Extractor); 6] = [
    (GroupField::InstrumentCode, "BBG_CODE", instrument_of),
    (GroupField::Account, "ACCOUNT", account_of),
    (GroupField::Portfolio, "PORTFOLIO", portfolio_of),
    (GroupField::Strategy, "STRATEGY", strategy_of),
    (GroupField::User, "USER", user_of),
    (GroupField::Currency, "CURRENCY", currency_of),
];

impl GroupField {
    pub fn all() -> BTreeSet<GroupField> {
        DIMENSIONS.iter().map(|(field, _, _)| *field).collect()
    }

    pub fn tag(self) -> &'static str {
        DIMENSIONS[self as usize].1
    }

    pub fn value(self, trade: &Trade) -> &str {
        (DIMENSIONS[self as usize].2)(trade)
    }
}

impl fmt::Display for GroupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for GroupField {
    type Err = PnlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_uppercase();
        if tag == "INSTRUMENT" {
            return Ok(GroupField::InstrumentCode);
        }
        DIMENSIONS
            .iter()
            .find(|(_, wire, _)| *wire == tag)
            .map(|(field, _, _)| *field)
            .ok_or(PnlError::UnknownGroupField { tag })
    }
}

/// Parse a comma-separated list of group field tags. Blank input yields an
/// empty set.
pub fn parse_group_fields(input: &str) -> Result<BTreeSet<GroupField>, PnlError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::parse)
        .collect()
}

/// Equality constraints on trade fields; an absent constraint matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeFilter {
    pub instrument: Option<String>,
    pub currency: Option<Currency>,
    pub portfolio: Option<String>,
    pub account: Option<String>,
    pub strategy: Option<String>,
    pub user: Option<String>,
}

fn allows(constraint: &Option<String>, value: &str) -> bool {
    constraint.as_deref().is_none_or(|wanted| wanted == value)
}

impl TradeFilter {
    pub fn matches(&self, trade: &Trade) -> bool {
        allows(&self.instrument, &trade.instrument)
            && self.currency.is_none_or(|c| c == trade.currency)
            && allows(&self.portfolio, &trade.portfolio)
            && allows(&self.account, &trade.account)
            && allows(&self.strategy, &trade.strategy)
            && allows(&self.user, &trade.user)
    }
}

impl fmt::Display for TradeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(v) = &self.instrument {
            parts.push(format!("instrument={v}"));
        }
        if let Some(c) = self.currency {
            parts.push(format!("currency={c}"));
        }
        if let Some(v) = &self.portfolio {
            parts.push(format!("portfolio={v}"));
        }
        if let Some(v) = &self.account {
            parts.push(format!("account={v}"));
        }
        if let Some(v) = &self.strategy {
            parts.push(format!("strategy={v}"));
        }
        if let Some(v) = &self.user {
            parts.push(format!("user={v}"));
        }
        write!(f, "TradeFilter{{{}}}", parts.join(","))
    }
}

impl FromStr for TradeFilter {
    type Err = PnlError;

    /// Parses `key=value` pairs separated by `;`, e.g.
    /// `account=Account1;strategy=Strategy5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| PnlError::InvalidFilter {
            input: s.to_string(),
            reason,
        };
        let mut filter = TradeFilter::default();
        for pair in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| invalid(format!("expected key=value, got {pair:?}")))?;
            let value = value.trim();
            if value.is_empty() {
                return Err(invalid(format!("empty value for {}", key.trim())));
            }
            match key.trim().to_lowercase().as_str() {
                "instrument" | "bbg_code" | "bbgcode" => filter.instrument = Some(value.into()),
                "currency" | "ccy" => filter.currency = Some(value.parse()?),
                "portfolio" => filter.portfolio = Some(value.into()),
                "account" => filter.account = Some(value.into()),
                "strategy" => filter.strategy = Some(value.into()),
                "user" => filter.user = Some(value.into()),
                other => return Err(invalid(format!("unknown filter key {other:?}"))),
            }
        }
        Ok(filter)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationRequest {
    pub group_fields: Option<BTreeSet<GroupField>>,
    pub target_currency: Option<Currency>,
    pub filters: Option<Vec<TradeFilter>>,
}

impl AggregationRequest {
    pub fn grouped_by<I: IntoIterator<Item = GroupField>>(mut self, fields: I) -> Self {
        self.group_fields = Some(fields.into_iter().collect());
        self
    }

    pub fn converted_to(mut self, currency: Currency) -> Self {
        self.target_currency = Some(currency);
        self
    }

    pub fn filtered_by(mut self, filter: TradeFilter) -> Self {
        self.filters.get_or_insert_with(Vec::new).push(filter);
        self
    }

    /// Fields the group key is built from.
    ///
    /// No fields (absent or empty) means all of them. Without a target
    /// currency, Currency is always included so unconverted amounts in
    /// different currencies never share a bucket.
    pub fn effective_fields(&self) -> BTreeSet<GroupField> {
        let mut fields = match &self.group_fields {
            Some(fields) if !fields.is_empty() => fields.clone(),
            _ => GroupField::all(),
        };
        if self.target_currency.is_none() {
            fields.insert(GroupField::Currency);
        }
        fields
    }

    pub fn admits(&self, trade: &Trade) -> bool {
        match &self.filters {
            Some(filters) if !filters.is_empty() => filters.iter().any(|f| f.matches(trade)),
            _ => true,
        }
    }

    /// Title fragment describing conversion and filters, e.g.
    /// `" converted to USD TradeFilter{account=Account1}"`.
    pub fn title_suffix(&self) -> String {
        let mut title = String::new();
        if let Some(c) = self.target_currency {
            title.push_str(&format!(" converted to {c}"));
        }
        if let Some(filters) = self.filters.as_ref().filter(|f| !f.is_empty()) {
            let joined: Vec<String> = filters.iter().map(ToString::to_string).collect();
            title.push(' ');
            title.push_str(&joined.join(","));
        }
        title
    }
}

/// Group key of `trade` over `fields`, values in canonical dimension order.
pub fn group_key(trade: &Trade, fields: &BTreeSet<GroupField>) -> String {
    fields
        .iter()
        .map(|field| field.value(trade))
        .collect::<Vec<_>>()
        .join(KEY_DELIMITER)
}

/// Bucket the live trades of `store` according to `request`.
///
/// Cancelled trades never reach a bucket. Within a bucket trades are ordered
/// by `trade_time`; equal times keep store (trade id) order.
pub fn group_trades<'a>(
    store: &'a CanonicalStore,
    request: &AggregationRequest,
) -> BTreeMap<String, Vec<&'a Trade>> {
    let fields = request.effective_fields();
    let mut buckets: BTreeMap<String, Vec<&Trade>> = BTreeMap::new();

    for trade in store
        .trades()
        .filter(|t| !t.is_cancelled())
        .filter(|t| request.admits(t))
    {
        buckets.entry(group_key(trade, &fields)).or_default().push(trade);
    }

    for bucket in buckets.values_mut() {
        bucket.sort_by_key(|t| t.trade_time);
    }
    buckets
}
