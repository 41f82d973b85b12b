use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MoneyError;

static FORM_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+,\d{2}$").expect("static regex"));

/// Brazilian real amount in cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(pub u64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub const fn reais(reais: u64) -> Self {
        Cents(reais * 100)
    }

    /// Strict form input: digits, a comma and exactly two decimals, nothing else.
    pub fn parse_form(input: &str) -> Result<Self, MoneyError> {
        if !FORM_PRICE.is_match(input) {
            return Err(MoneyError::Format(input.to_string()));
        }

        Cents::parse_brl(input)
    }

    /// Parses the dashboard price format (`1,50`). A leading `R$` and `.`
    /// thousands separators are tolerated.
    pub fn parse_brl(input: &str) -> Result<Self, MoneyError> {
        let cleaned: String = input
            .trim()
            .trim_start_matches("R$")
            .trim()
            .chars()
            .filter(|c| *c != '.')
            .collect();

        if !FORM_PRICE.is_match(&cleaned) {
            return Err(MoneyError::Format(input.to_string()));
        }

        let (whole, fraction) = cleaned
            .split_once(',')
            .ok_or_else(|| MoneyError::Format(input.to_string()))?;

        let whole: u64 = whole
            .parse()
            .map_err(|_| MoneyError::Overflow(input.to_string()))?;
        let fraction: u64 = fraction
            .parse()
            .map_err(|_| MoneyError::Format(input.to_string()))?;

        whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction))
            .map(Cents)
            .ok_or_else(|| MoneyError::Overflow(input.to_string()))
    }

    pub fn times(self, count: u64) -> Option<Cents> {
        self.0.checked_mul(count).map(Cents)
    }

    pub fn saturating_add(self, other: Cents) -> Cents {
        Cents(self.0.saturating_add(other.0))
    }
}

impl FromStr for Cents {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cents::parse_brl(s)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R$ {},{:02}", self.0 / 100, self.0 % 100)
    }
}
