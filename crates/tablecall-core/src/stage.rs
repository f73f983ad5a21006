//! Alert stages and the classifier that maps tables remaining onto them.
//!
//! Thresholds are strictly descending, e.g. `[10, 5, 2]`. A stage is the
//! number of thresholds the remaining count has dropped to or below:
//!
//! ```text
//! remaining   11   10..=6   5..=3   2 and below
//! stage        0      1       2         3 (final call)
//! ```
//!
//! The last configured threshold is the terminal stage. There is no extra
//! stage for "zero tables remaining".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Default alert thresholds.
pub const DEFAULT_THRESHOLDS: [u32; 3] = [10, 5, 2];

/// Discrete proximity level. `0` means "not near yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertStage(usize);

impl AlertStage {
    /// Stage before any alert has been reached.
    pub const NONE: AlertStage = AlertStage(0);

    /// Creates a stage from its index.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Numeric stage index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for AlertStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated, strictly descending alert thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertThresholds(Vec<u32>);

impl AlertThresholds {
    /// Validates and wraps a threshold list.
    pub fn new(thresholds: Vec<u32>) -> Result<Self> {
        if thresholds.is_empty() {
            return Err(CoreError::EmptyThresholds);
        }
        if thresholds.windows(2).any(|w| w[0] <= w[1]) {
            return Err(CoreError::UnorderedThresholds(thresholds));
        }
        Ok(Self(thresholds))
    }

    /// Raw thresholds, largest first.
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Number of thresholds, which is also the terminal stage index.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated list.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The final-call stage.
    pub fn terminal(&self) -> AlertStage {
        AlertStage(self.0.len())
    }

    /// True if `stage` is the final-call stage.
    pub fn is_terminal(&self, stage: AlertStage) -> bool {
        stage >= self.terminal()
    }

    /// Maps tables remaining onto a stage.
    pub fn classify(&self, tables_remaining: i64) -> AlertStage {
        classify(tables_remaining, &self.0)
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLDS.to_vec())
    }
}

impl FromStr for AlertThresholds {
    type Err = CoreError;

    /// Parses a comma separated list such as `10,5,2`.
    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| {
                p.parse::<u32>()
                    .map_err(|_| CoreError::InvalidThreshold(p.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(values)
    }
}

impl<'de> Deserialize<'de> for AlertThresholds {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let values = Vec::<u32>::deserialize(deserializer)?;
        AlertThresholds::new(values).map_err(serde::de::Error::custom)
    }
}

/// Maps tables remaining onto a stage in `[0, thresholds.len()]`.
///
/// Returns the index of the first threshold that `tables_remaining` exceeds,
/// or `thresholds.len()` if it exceeds none. Boundaries are inclusive: a
/// remaining count equal to a threshold has reached that stage.
pub fn classify(tables_remaining: i64, thresholds: &[u32]) -> AlertStage {
    let index = thresholds
        .iter()
        .position(|&t| tables_remaining > i64::from(t))
        .unwrap_or(thresholds.len());
    AlertStage(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: [u32; 3] = [10, 5, 2];

    #[test]
    fn test_classify_table() {
        assert_eq!(classify(11, &T), AlertStage(0));
        assert_eq!(classify(10, &T), AlertStage(1));
        assert_eq!(classify(9, &T), AlertStage(1));
        assert_eq!(classify(6, &T), AlertStage(1));
        assert_eq!(classify(5, &T), AlertStage(2));
        assert_eq!(classify(3, &T), AlertStage(2));
    }

    #[test]
    fn test_final_call_boundaries() {
        // smallest threshold is already the final call
        assert_eq!(classify(2, &T), AlertStage(3));
        assert_eq!(classify(1, &T), AlertStage(3));
        // zero and negative stay at the same terminal stage
        assert_eq!(classify(0, &T), AlertStage(3));
        assert_eq!(classify(-7, &T), AlertStage(3));
    }

    #[test]
    fn test_classify_monotonic_and_bounded() {
        let sets: [&[u32]; 4] = [&[10, 5, 2], &[1], &[100, 50, 20, 10, 0], &[3, 2, 1]];
        for thresholds in sets {
            let mut prev = classify(-5, thresholds);
            for remaining in -5..200 {
                let stage = classify(remaining, thresholds);
                assert!(stage.index() <= thresholds.len());
                assert!(stage <= prev, "stage rose at {remaining} for {thresholds:?}");
                prev = stage;
            }
        }
    }

    #[test]
    fn test_thresholds_validation() {
        assert!(AlertThresholds::new(vec![10, 5, 2]).is_ok());
        assert!(matches!(AlertThresholds::new(vec![]), Err(CoreError::EmptyThresholds)));
        assert!(matches!(
            AlertThresholds::new(vec![5, 5, 2]),
            Err(CoreError::UnorderedThresholds(_))
        ));
        assert!(matches!(
            AlertThresholds::new(vec![2, 5]),
            Err(CoreError::UnorderedThresholds(_))
        ));
    }

    #[test]
    fn test_thresholds_from_str() {
        let t: AlertThresholds = "10, 5,2".parse().unwrap();
        assert_eq!(t.as_slice(), &[10, 5, 2]);
        assert_eq!(t.terminal(), AlertStage(3));
        assert!(t.is_terminal(AlertStage(3)));
        assert!(!t.is_terminal(AlertStage(2)));

        assert!(matches!(
            "10,five".parse::<AlertThresholds>(),
            Err(CoreError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_thresholds_deserialize_rejects_unordered() {
        let ok: AlertThresholds = serde_json::from_str("[8, 4]").unwrap();
        assert_eq!(ok.len(), 2);
        assert!(serde_json::from_str::<AlertThresholds>("[4, 8]").is_err());
    }

    #[test]
    fn test_default_thresholds() {
        assert_eq!(AlertThresholds::default().as_slice(), &DEFAULT_THRESHOLDS);
    }
}
