//! Rational scale factors relative to the scene size
//!
//! Manifests express texture sizes as fractions of the scene resolution, in
//! formats like "1/2" or "2".

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Represents a rational scale factor as a fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ScaleFactor {
    /// The numerator of the fraction
    pub numerator: u32,
    /// The denominator of the fraction
    pub denominator: u32,
}

impl ScaleFactor {
    /// The identity scale factor
    pub const ONE: Self = Self::new(1, 1);

    /// Creates a new scale factor from numerator and denominator
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self { numerator, denominator }
    }

    /// Applies the scale factor to a pixel dimension
    ///
    /// The result is rounded down and never smaller than one pixel, so that a
    /// heavily downscaled texture still has a valid extent.
    pub fn apply(&self, size: u32) -> u32 {
        let scaled = u64::from(size) * u64::from(self.numerator) / u64::from(self.denominator);
        (scaled as u32).max(1)
    }
}

impl FromStr for ScaleFactor {
    type Err = ScaleFactorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((numerator, denominator)) = s.split_once('/') {
            let numerator = numerator.trim().parse::<u32>().map_err(|_| ScaleFactorParseError::InvalidNumerator)?;
            let denominator = denominator.trim().parse::<u32>().map_err(|_| ScaleFactorParseError::InvalidDenominator)?;

            if denominator == 0 {
                return Err(ScaleFactorParseError::ZeroDenominator);
            }

            Ok(ScaleFactor::new(numerator, denominator))
        } else {
            let numerator = s.parse::<u32>().map_err(|_| ScaleFactorParseError::InvalidNumerator)?;
            Ok(ScaleFactor::new(numerator, 1))
        }
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl<'de> Deserialize<'de> for ScaleFactor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error types for scale factor parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScaleFactorParseError {
    /// The numerator is not a valid integer
    #[error("invalid numerator")]
    InvalidNumerator,
    /// The denominator is not a valid integer
    #[error("invalid denominator")]
    InvalidDenominator,
    /// The denominator is zero (division by zero)
    #[error("denominator cannot be zero")]
    ZeroDenominator,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_factor_parsing() {
        assert_eq!("1".parse::<ScaleFactor>().unwrap(), ScaleFactor::new(1, 1));
        assert_eq!("2".parse::<ScaleFactor>().unwrap(), ScaleFactor::new(2, 1));
        assert_eq!("1/2".parse::<ScaleFactor>().unwrap(), ScaleFactor::new(1, 2));
        assert_eq!(" 3 / 4 ".parse::<ScaleFactor>().unwrap(), ScaleFactor::new(3, 4));

        assert_eq!("1/0".parse::<ScaleFactor>(), Err(ScaleFactorParseError::ZeroDenominator));
        assert_eq!("x/2".parse::<ScaleFactor>(), Err(ScaleFactorParseError::InvalidNumerator));
        assert_eq!("1/y".parse::<ScaleFactor>(), Err(ScaleFactorParseError::InvalidDenominator));
    }

    #[test]
    fn test_scale_factor_apply() {
        assert_eq!(ScaleFactor::ONE.apply(1920), 1920);
        assert_eq!(ScaleFactor::new(1, 2).apply(1920), 960);
        assert_eq!(ScaleFactor::new(1, 4).apply(1079), 269);
        // Never collapses to zero
        assert_eq!(ScaleFactor::new(1, 64).apply(16), 1);
        assert_eq!(ScaleFactor::new(0, 1).apply(16), 1);
    }

    #[test]
    fn test_scale_factor_display() {
        assert_eq!(ScaleFactor::new(2, 1).to_string(), "2");
        assert_eq!(ScaleFactor::new(1, 8).to_string(), "1/8");
    }
}
