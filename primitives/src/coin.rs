use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An amount of staking tokens, counted in indivisible units.
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Coin(u64);

impl Coin {
    pub const ZERO: Coin = Coin(0u64);

    /// How many units fit in one whole token.
    pub const UNITS_PER_TOKEN: u64 = 100_000u64;

    /// JavaScript's Number.MAX_SAFE_INTEGER: 2^53 - 1
    pub const MAX_SAFE_VALUE: u64 = 9_007_199_254_740_991u64;

    /// Creates a `Coin` without checking the safe-value bound. Only for
    /// constants known to be in range.
    pub const fn from_u64_unchecked(value: u64) -> Coin {
        Coin(value)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Coin) -> Option<Coin> {
        self.0
            .checked_add(rhs.0)
            .filter(|&value| value <= Coin::MAX_SAFE_VALUE)
            .map(Coin)
    }

    pub fn checked_sub(self, rhs: Coin) -> Option<Coin> {
        self.0.checked_sub(rhs.0).map(Coin)
    }

    pub fn checked_factor(self, times: u64) -> Option<Coin> {
        self.0
            .checked_mul(times)
            .filter(|&value| value <= Coin::MAX_SAFE_VALUE)
            .map(Coin)
    }

    pub fn saturating_sub(self, rhs: Coin) -> Coin {
        Coin(self.0.saturating_sub(rhs.0))
    }
}

impl From<Coin> for u64 {
    fn from(coin: Coin) -> Self {
        coin.0
    }
}

impl TryFrom<u64> for Coin {
    type Error = CoinConvertError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value <= Coin::MAX_SAFE_VALUE {
            Ok(Coin(value))
        } else {
            Err(CoinConvertError(value))
        }
    }
}

impl Add<Coin> for Coin {
    type Output = Coin;

    fn add(self, rhs: Coin) -> Coin {
        self.checked_add(rhs).expect("Coin value overflow")
    }
}

impl AddAssign<Coin> for Coin {
    fn add_assign(&mut self, rhs: Coin) {
        *self = *self + rhs;
    }
}

impl Sub<Coin> for Coin {
    type Output = Coin;

    fn sub(self, rhs: Coin) -> Coin {
        self.checked_sub(rhs).expect("Coin value underflow")
    }
}

impl SubAssign<Coin> for Coin {
    fn sub_assign(&mut self, rhs: Coin) {
        *self = *self - rhs;
    }
}

impl Sum for Coin {
    fn sum<I: Iterator<Item = Coin>>(iter: I) -> Self {
        iter.fold(Coin::ZERO, Add::add)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // NOTE: The format string has 5 decimal places hard-coded.
        write!(
            f,
            "{}.{:05}",
            self.0 / Coin::UNITS_PER_TOKEN,
            self.0 % Coin::UNITS_PER_TOKEN
        )
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
#[error("Can't convert u64 to Coin: {0} is out of bounds")]
pub struct CoinConvertError(pub u64);

#[derive(Debug, Error, Eq, PartialEq)]
#[error("Can't parse Coin value: {0}")]
pub struct CoinParseError(pub String);

impl FromStr for Coin {
    type Err = CoinParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_error = || CoinParseError(s.to_string());

        let (int_part, frac_part) = match s.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (s, ""),
        };

        if int_part.is_empty() || frac_part.len() > 5 {
            return Err(parse_error());
        }

        let whole: u64 = int_part.parse().map_err(|_| parse_error())?;

        let frac: u64 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{frac_part:0<5}");
            padded.parse().map_err(|_| parse_error())?
        };

        whole
            .checked_mul(Coin::UNITS_PER_TOKEN)
            .and_then(|units| units.checked_add(frac))
            .and_then(|units| Coin::try_from(units).ok())
            .ok_or_else(parse_error)
    }
}
