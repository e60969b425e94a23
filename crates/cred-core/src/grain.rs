//! Fixed-point grain amounts.
//!
//! A [`Grain`] counts attograin: 1 GRAIN = 10^18 attograin. Amounts are
//! integers end to end; binary floating point never represents a grain value.
//! Serialized as a decimal-integer string so no JSON consumer loses precision.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{GRAIN_DECIMALS, ONE_GRAIN};
use crate::error::GrainParseError;

/// An amount of grain in attograin.
///
/// The two string forms differ in unit. Serde reads and writes the integer
/// attograin count, so the JSON string `"25"` is 25 attograin. [`FromStr`]
/// reads whole grain with an optional fraction, so `"25".parse()` is 25
/// grain. Configuration files therefore hold attograin strings.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Grain(pub u128);

impl Grain {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(ONE_GRAIN);

    /// `whole` grain, in attograin.
    pub fn from_whole(whole: u64) -> Self {
        // u64::MAX * 10^18 < u128::MAX
        Self(whole as u128 * ONE_GRAIN)
    }

    pub fn attograin(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Sum of all amounts, `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, g| acc.checked_add(g))
    }

    /// Decimal rendering truncated (not rounded) to `decimals` places.
    ///
    /// ```
    /// use cred_core::grain::Grain;
    /// let g: Grain = "1.239".parse().unwrap();
    /// assert_eq!(g.format(2), "1.23");
    /// assert_eq!(g.format(0), "1");
    /// assert_eq!(Grain::from_whole(5).format(3), "5.000");
    /// ```
    pub fn format(self, decimals: u32) -> String {
        let decimals = decimals.min(GRAIN_DECIMALS);
        let whole = self.0 / ONE_GRAIN;
        if decimals == 0 {
            return whole.to_string();
        }
        let frac = self.0 % ONE_GRAIN;
        let digits = format!("{frac:018}");
        format!("{whole}.{}", &digits[..decimals as usize])
    }
}

/// Full precision with trailing zeros trimmed: `1.5`, `0`, `12`.
impl fmt::Display for Grain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / ONE_GRAIN;
        let frac = self.0 % ONE_GRAIN;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:018}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

/// Parses whole-grain decimal strings such as `"12"`, `"1.5"` or
/// `"0.000000000000000001"`.
impl FromStr for Grain {
    type Err = GrainParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(GrainParseError::Empty);
        }
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(GrainParseError::Empty);
        }
        if let Some(c) = whole.chars().chain(frac.chars()).find(|c| !c.is_ascii_digit()) {
            return Err(GrainParseError::InvalidCharacter(c));
        }
        if frac.len() > GRAIN_DECIMALS as usize {
            return Err(GrainParseError::TooPrecise { max: GRAIN_DECIMALS });
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| GrainParseError::Overflow)?
        };
        let frac_value: u128 = if frac.is_empty() {
            0
        } else {
            let scale = 10u128.pow(GRAIN_DECIMALS - frac.len() as u32);
            frac.parse::<u128>().map_err(|_| GrainParseError::Overflow)? * scale
        };

        whole
            .checked_mul(ONE_GRAIN)
            .and_then(|w| w.checked_add(frac_value))
            .map(Self)
            .ok_or(GrainParseError::Overflow)
    }
}

impl TryFrom<String> for Grain {
    type Error = std::num::ParseIntError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse::<u128>().map(Self)
    }
}

impl From<Grain> for String {
    fn from(g: Grain) -> Self {
        g.0.to_string()
    }
}

impl From<u128> for Grain {
    fn from(attograin: u128) -> Self {
        Self(attograin)
    }
}
