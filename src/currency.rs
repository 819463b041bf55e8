//! Fixed-point native currency and the network's unit conversions.
//!
//! All coin amounts are carried as integer hastings (10^24 per coin) so that
//! budget comparisons never drift. Floating point is only used when crossing
//! into fiat, where the exchange rate is approximate anyway.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::price::ExchangeRate;

/// Smallest units in one coin.
pub const HASTINGS_PER_COIN: u128 = 1_000_000_000_000_000_000_000_000;
pub const BYTES_PER_TB: u64 = 1_000_000_000_000;

pub const BLOCKS_PER_DAY: u64 = 144;
/// 144 blocks/day × 365.25 days, truncated.
pub const BLOCKS_PER_YEAR: u64 = BLOCKS_PER_DAY * 36_525 / 100;
pub const BLOCKS_PER_MONTH: u64 = BLOCKS_PER_YEAR / 12;

const HUMAN_UNITS: [&str; 9] = ["pS", "nS", "uS", "mS", "SC", "KS", "MS", "GS", "TS"];

/// An amount of the network's native asset, in hastings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Currency(u128);

impl Currency {
    pub const ZERO: Self = Self(0);
    pub const ONE_COIN: Self = Self(HASTINGS_PER_COIN);

    pub const fn from_hastings(hastings: u128) -> Self {
        Self(hastings)
    }

    pub const fn hastings(self) -> u128 {
        self.0
    }

    pub fn from_coins(coins: u64) -> Self {
        Self(u128::from(coins).saturating_mul(HASTINGS_PER_COIN))
    }

    /// Exact conversion of a decimal coin count. `None` for negative or
    /// overflowing values.
    pub fn from_coins_decimal(coins: Decimal) -> Option<Self> {
        if coins.is_sign_negative() && !coins.is_zero() {
            return None;
        }
        let mantissa = u128::try_from(coins.mantissa()).ok()?;
        let scale = coins.scale();
        let hastings = if scale <= 24 {
            mantissa.checked_mul(10u128.pow(24 - scale))?
        } else {
            mantissa / 10u128.pow(scale - 24)
        };
        Some(Self(hastings))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtraction floored at zero.
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn mul_u64(self, factor: u64) -> Self {
        Self(self.0.saturating_mul(u128::from(factor)))
    }

    /// Integer division, truncating.
    ///
    /// # Panics
    ///
    /// Panics if `divisor` is zero.
    pub fn div_u64(self, divisor: u64) -> Self {
        Self(self.0 / u128::from(divisor))
    }

    /// Multiplies by a non-negative decimal fraction without leaving integer
    /// arithmetic. Negative fractions yield zero.
    pub fn mul_fraction(self, fraction: Decimal) -> Self {
        let Ok(mantissa) = u128::try_from(fraction.mantissa()) else {
            return Self::ZERO;
        };
        let denominator = 10u128.pow(fraction.scale());
        match self.0.checked_mul(mantissa) {
            Some(product) => Self(product / denominator),
            None => Self((self.0 / denominator).saturating_mul(mantissa)),
        }
    }

    /// Approximate scaling by a float. Non-finite or non-positive factors
    /// yield zero; results beyond `u128::MAX` saturate.
    pub fn mul_f64(self, factor: f64) -> Self {
        if !factor.is_finite() || factor <= 0.0 {
            return Self::ZERO;
        }
        Self((self.0 as f64 * factor) as u128)
    }

    /// Whole and fractional coins are converted separately so large balances
    /// keep their sub-coin precision.
    pub fn to_coins_f64(self) -> f64 {
        let whole = self.0 / HASTINGS_PER_COIN;
        let frac = self.0 % HASTINGS_PER_COIN;
        whole as f64 + frac as f64 / HASTINGS_PER_COIN as f64
    }

    /// Hastings bought by one unit of fiat.
    pub fn per_fiat_unit(rate: ExchangeRate) -> Self {
        Self::ONE_COIN.mul_f64(1.0 / rate.fiat_per_coin())
    }

    pub fn to_fiat(self, rate: ExchangeRate) -> f64 {
        self.to_coins_f64() * rate.fiat_per_coin()
    }

    /// Short display form using the largest fitting unit, e.g. `1.2 KS`.
    pub fn human_string(&self) -> String {
        let pico = HASTINGS_PER_COIN / 1_000_000_000_000;
        if self.0 < pico {
            return format!("{} H", self.0);
        }

        let mut magnitude = pico;
        let mut index = 0;
        while index < HUMAN_UNITS.len() - 1 && self.0 >= magnitude.saturating_mul(1000) {
            magnitude *= 1000;
            index += 1;
        }

        let whole = self.0 / magnitude;
        let frac = (self.0 % magnitude) as f64 / magnitude as f64;
        format!(
            "{} {}",
            trim_decimal(whole as f64 + frac, 3),
            HUMAN_UNITS[index]
        )
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid currency amount: {0:?}")]
pub struct ParseCurrencyError(String);

impl FromStr for Currency {
    type Err = ParseCurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u128>()
            .map(Self)
            .map_err(|_| ParseCurrencyError(s.to_string()))
    }
}

// The node encodes amounts as base-10 strings since they overflow JSON numbers.
impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CurrencyVisitor;

        impl Visitor<'_> for CurrencyVisitor {
            type Value = Currency;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer amount of hastings")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Currency, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Currency, E> {
                Ok(Currency(u128::from(v)))
            }
        }

        deserializer.deserialize_any(CurrencyVisitor)
    }
}

/// Formats a byte count with decimal units, e.g. `1.500 TB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [(u64, &str); 6] = [
        (1_000_000_000_000_000_000, "EB"),
        (1_000_000_000_000_000, "PB"),
        (1_000_000_000_000, "TB"),
        (1_000_000_000, "GB"),
        (1_000_000, "MB"),
        (1_000, "kB"),
    ];

    for (size, unit) in UNITS {
        if bytes >= size {
            let n = bytes as f64 / size as f64;
            return if n >= 100.0 {
                format!("{:.1} {}", n, unit)
            } else if n >= 10.0 {
                format!("{:.2} {}", n, unit)
            } else {
                format!("{:.3} {}", n, unit)
            };
        }
    }
    format!("{} B", bytes)
}

fn trim_decimal(value: f64, precision: usize) -> String {
    let s = format!("{:.*}", precision, value);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}
