//! Coin amounts
//!
//! Amounts are kept sorted by denom, which is the order Cosmos-SDK
//! requires in messages and fees and the order canonical sign bytes use.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::core::codec::string_number;

/// Coin parsing errors
#[derive(Error, Debug, PartialEq)]
pub enum CoinError {
    #[error("Invalid coin '{0}': expected <amount><denom>, e.g. 1uluna")]
    InvalidFormat(String),
    #[error("Invalid denom '{0}'")]
    InvalidDenom(String),
    #[error("Duplicate denom: {0}")]
    DuplicateDenom(String),
    #[error("Invalid decimal '{0}'")]
    InvalidDecimal(String),
}

/// A single denom/amount pair in amino JSON form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "string_number")]
    pub amount: u128,
}

/// A set of coins keyed by denom
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coins(BTreeMap<String, u128>);

impl Coins {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Add `amount` of `denom`, merging with any existing entry
    pub fn add(&mut self, denom: impl Into<String>, amount: u128) {
        *self.0.entry(denom.into()).or_insert(0) += amount;
    }

    pub fn get(&self, denom: &str) -> Option<u128> {
        self.0.get(denom).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Coins as a list sorted by denom
    pub fn to_list(&self) -> Vec<Coin> {
        self.0
            .iter()
            .map(|(denom, amount)| Coin {
                denom: denom.clone(),
                amount: *amount,
            })
            .collect()
    }

    /// Coins as a `{denom: amount}` map
    pub fn as_map(&self) -> &BTreeMap<String, u128> {
        &self.0
    }
}

impl From<BTreeMap<String, u128>> for Coins {
    fn from(map: BTreeMap<String, u128>) -> Self {
        Self(map)
    }
}

impl FromStr for Coins {
    type Err = CoinError;

    /// Parse `"1uluna"` or `"1uluna,20uusd"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut coins = Coins::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let split = part
                .find(|c: char| !c.is_ascii_digit())
                .ok_or_else(|| CoinError::InvalidFormat(part.to_string()))?;
            let (amount, denom) = part.split_at(split);
            if amount.is_empty() || denom.is_empty() {
                return Err(CoinError::InvalidFormat(part.to_string()));
            }
            let amount: u128 = amount
                .parse()
                .map_err(|_| CoinError::InvalidFormat(part.to_string()))?;
            if !is_valid_denom(denom) {
                return Err(CoinError::InvalidDenom(denom.to_string()));
            }
            if coins.get(denom).is_some() {
                return Err(CoinError::DuplicateDenom(denom.to_string()));
            }
            coins.add(denom, amount);
        }

        if coins.is_empty() {
            return Err(CoinError::InvalidFormat(s.to_string()));
        }
        Ok(coins)
    }
}

/// Cosmos-SDK denom rule: `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`
pub fn is_valid_denom(denom: &str) -> bool {
    let mut chars = denom.chars();
    let starts_with_letter = chars.next().map_or(false, |c| c.is_ascii_alphabetic());
    starts_with_letter
        && (3..=128).contains(&denom.len())
        && chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c))
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(denom, amount)| format!("{}{}", amount, denom))
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

impl Serialize for Coins {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_list().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Coins {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let list = Vec::<Coin>::deserialize(deserializer)?;
        let mut coins = Coins::new();
        for coin in list {
            coins.add(coin.denom, coin.amount);
        }
        Ok(coins)
    }
}

// =============================================================================
// Decimal prices
// =============================================================================

/// A non-negative decimal such as a gas price (`0.01133`)
///
/// Held as `mantissa / 10^scale` so fee math never goes through floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecAmount {
    mantissa: u128,
    scale: u32,
}

/// Most fractional digits accepted in a decimal
const MAX_DECIMAL_SCALE: u32 = 18;

impl DecAmount {
    /// `mantissa / 10^scale`
    pub const fn new(mantissa: u128, scale: u32) -> Self {
        Self { mantissa, scale }
    }

    /// `ceil(self * factor)`
    pub fn mul_ceil(&self, factor: u64) -> u128 {
        let product = self.mantissa * factor as u128;
        let divisor = 10u128.pow(self.scale);
        (product + divisor - 1) / divisor
    }
}

impl FromStr for DecAmount {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || CoinError::InvalidDecimal(s.to_string());

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if fraction.len() as u32 > MAX_DECIMAL_SCALE {
            return Err(invalid());
        }

        let digits = format!("{}{}", whole, fraction);
        let mantissa = digits.parse::<u128>().map_err(|_| invalid())?;
        Ok(Self {
            mantissa,
            scale: fraction.len() as u32,
        })
    }
}

impl fmt::Display for DecAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let divisor = 10u128.pow(self.scale);
        write!(
            f,
            "{}.{:0width$}",
            self.mantissa / divisor,
            self.mantissa % divisor,
            width = self.scale as usize
        )
    }
}

impl Serialize for DecAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DecAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            String(String),
            Number(serde_json::Number),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::String(s) => s,
            Raw::Number(n) => n.to_string(),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}
