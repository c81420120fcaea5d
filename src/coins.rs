//! Coin list parsing
//!
//! Funds sent along with instantiate/execute are given on the command line as
//! a comma separated coin list such as `"100uscrt,5ibc/27394fb0"`.

use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use crate::{ComputeError, Result};

static COIN_RE: OnceLock<Regex> = OnceLock::new();

fn coin_re() -> &'static Regex {
    COIN_RE.get_or_init(|| Regex::new(r"^([0-9]+)[ ]*([a-z][a-z0-9/]{2,15})$").expect("coin pattern is valid"))
}

/// Funds keyed by denomination, kept sorted by denom
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Coins(BTreeMap<String, u128>);

impl Coins {
    /// No funds
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a coin list. An empty (or whitespace only) string means no funds.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let mut coins = BTreeMap::new();
        if input.is_empty() {
            return Ok(Self(coins));
        }

        let re = coin_re();
        for part in input.split(',') {
            let part = part.trim();
            let caps = re
                .captures(part)
                .ok_or_else(|| ComputeError::Parse(format!("invalid coin expression: {}", part)))?;

            let amount = caps[1]
                .parse::<u128>()
                .map_err(|e| ComputeError::Parse(format!("invalid coin amount '{}': {}", &caps[1], e)))?;
            if amount == 0 {
                return Err(ComputeError::Parse(format!("coin amount must be positive: {}", part)));
            }

            let denom = caps[2].to_string();
            if coins.insert(denom.clone(), amount).is_some() {
                return Err(ComputeError::Parse(format!("duplicate denomination {}", denom)));
            }
        }

        Ok(Self(coins))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Amount held for a denomination
    pub fn amount_of(&self, denom: &str) -> Option<u128> {
        self.0.get(denom).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u128)> {
        self.0.iter()
    }

    /// Every entry has a positive amount and a well-formed denom
    pub fn is_valid(&self) -> bool {
        let re = coin_re();
        self.0
            .iter()
            .all(|(denom, amount)| *amount > 0 && re.is_match(&format!("{}{}", amount, denom)))
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(d, a)| format!("{}{}", a, d)).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Serialized the SDK way: a sorted list of `{denom, amount}` with string amounts
impl Serialize for Coins {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        let list: Vec<_> = self
            .0
            .iter()
            .map(|(denom, amount)| json!({ "denom": denom, "amount": amount.to_string() }))
            .collect();
        list.serialize(serializer)
    }
}
