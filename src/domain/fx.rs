//! Static directed FX conversion table.
//!
//! Each (from, to) pair is populated on its own; the table makes no attempt to
//! keep `rate(A, B)` and `rate(B, A)` reciprocal, and a missing pair is an
//! error rather than something derived from its inverse.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crate::domain::error::PnlError;
use crate::domain::trade::Currency::{self, Eur, Gbp, Jpy, Krw, Nok, Usd};

#[derive(Debug, Clone, PartialEq)]
pub struct FxConverter {
    rates: HashMap<(Currency, Currency), Decimal>,
}

impl FxConverter {
    pub fn from_rates<I>(rates: I) -> Self
    where
        I: IntoIterator<Item = (Currency, Currency, Decimal)>,
    {
        Self {
            rates: rates
                .into_iter()
                .map(|(from, to, rate)| ((from, to), rate))
                .collect(),
        }
    }

    pub fn rate(&self, from: Currency, to: Currency) -> Option<Decimal> {
        self.rates.get(&(from, to)).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn convert(&self, amount: Decimal, from: Currency, to: Currency) -> Result<Decimal, PnlError> {
        if from == to {
            return Ok(amount);
        }
        let rate = self.rate(from, to).ok_or(PnlError::MissingFxRate { from, to })?;
        amount.checked_mul(rate).ok_or_else(|| PnlError::Overflow {
            context: format!("converting {amount} {from} to {to}"),
        })
    }
}

impl Default for FxConverter {
    /// Mock rates covering every ordered pair of the supported currencies.
    fn default() -> Self {
        Self::from_rates([
            (Jpy, Nok, dec!(0.077531938)),
            (Jpy, Krw, dec!(9.60525)),
            (Jpy, Eur, dec!(0.0070910209)),
            (Jpy, Gbp, dec!(0.0062874509)),
            (Jpy, Usd, dec!(0.007632253)),
            (Nok, Krw, dec!(123.94419)),
            (Nok, Eur, dec!(0.091494017)),
            (Nok, Gbp, dec!(0.081121973)),
            (Nok, Usd, dec!(0.098477164)),
            (Nok, Jpy, dec!(12.894937)),
            (Krw, Eur, dec!(0.00073831595)),
            (Krw, Gbp, dec!(0.00065457653)),
            (Krw, Usd, dec!(0.00079457416)),
            (Krw, Jpy, dec!(0.10410236)),
            (Krw, Nok, dec!(0.0080737494)),
            (Eur, Gbp, dec!(0.88658051)),
            (Eur, Usd, dec!(1.076172)),
            (Eur, Jpy, dec!(140.98625)),
            (Eur, Nok, dec!(10.933211)),
            (Eur, Krw, dec!(1354.3574)),
            (Gbp, Usd, dec!(1.214049)),
            (Gbp, Jpy, dec!(159.05493)),
            (Gbp, Nok, dec!(12.334854)),
            (Gbp, Krw, dec!(1527.7671)),
            (Gbp, Eur, dec!(1.1282449)),
            (Usd, Jpy, dec!(159.07764)),
            (Usd, Nok, dec!(12.334854)),
            (Usd, Krw, dec!(1528.2562)),
            (Usd, Eur, dec!(1.1283253)),
            (Usd, Gbp, dec!(1.214049)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_currency_is_identity() {
        let fx = FxConverter::from_rates([(Eur, Usd, dec!(1.1))]);
        assert_eq!(fx.convert(dec!(123.45), Usd, Usd).unwrap(), dec!(123.45));
        assert_eq!(fx.convert(dec!(123.45), Krw, Krw).unwrap(), dec!(123.45));
    }

    #[test]
    fn converts_with_directed_rate() {
        let fx = FxConverter::default();
        assert_eq!(fx.convert(dec!(-6000), Eur, Usd).unwrap(), dec!(-6457.032));
    }

    #[test]
    fn missing_pair_is_an_error() {
        let fx = FxConverter::from_rates([(Eur, Usd, dec!(1.1))]);
        let err = fx.convert(dec!(10), Usd, Eur).unwrap_err();
        assert!(matches!(err, PnlError::MissingFxRate { from: Usd, to: Eur }));
    }

    #[test]
    fn conversion_out_of_range_is_an_error() {
        let fx = FxConverter::default();
        let err = fx.convert(Decimal::MAX, Jpy, Krw).unwrap_err();
        assert!(matches!(err, PnlError::Overflow { .. }));
    }

    #[test]
    fn round_trip_is_not_identity() {
        let fx = FxConverter::default();
        assert_eq!(fx.rate(Eur, Usd), Some(dec!(1.076172)));
        assert_eq!(fx.rate(Usd, Eur), Some(dec!(1.1283253)));

        let there = fx.convert(dec!(100), Eur, Usd).unwrap();
        let back = fx.convert(there, Usd, Eur).unwrap();
        assert_eq!(there, dec!(107.6172));
        assert_eq!(back, dec!(107.6172) * dec!(1.1283253));
        assert_ne!(back, dec!(100));
    }

    #[test]
    fn default_table_covers_every_ordered_pair() {
        let fx = FxConverter::default();
        assert_eq!(fx.len(), 30);
        for from in Currency::ALL {
            for to in Currency::ALL {
                if from != to {
                    assert!(fx.rate(from, to).is_some(), "missing {from}->{to}");
                }
            }
        }
    }
}
