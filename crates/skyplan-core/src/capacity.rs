//! Capacity profiles — the (minimum, maximum, default) instance triple.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BuildError, BuildResult};

/// Caller-supplied instance counts, not yet validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityConfig {
    pub minimum: u32,
    pub maximum: u32,
    #[serde(rename = "default")]
    pub default_count: u32,
}

impl CapacityConfig {
    pub fn new(minimum: u32, maximum: u32, default_count: u32) -> Self {
        Self {
            minimum,
            maximum,
            default_count,
        }
    }
}

/// A validated instance-count range.
///
/// Always satisfies `minimum <= default <= maximum`. Deserializing goes
/// through [`CapacityProfile::build`], so the invariant holds for values
/// read back from JSON or TOML too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CapacityConfig", into = "CapacityConfig")]
pub struct CapacityProfile {
    minimum: u32,
    maximum: u32,
    default_count: u32,
}

impl CapacityProfile {
    /// Validate a capacity triple.
    pub fn build(config: &CapacityConfig) -> BuildResult<Self> {
        if config.minimum > config.maximum {
            return Err(BuildError::range(format!(
                "capacity minimum ({}) must not exceed maximum ({})",
                config.minimum, config.maximum
            )));
        }
        if config.default_count < config.minimum || config.default_count > config.maximum {
            return Err(BuildError::range(format!(
                "capacity default ({}) must be within [{}, {}]",
                config.default_count, config.minimum, config.maximum
            )));
        }

        debug!(
            minimum = config.minimum,
            maximum = config.maximum,
            default = config.default_count,
            "capacity profile built"
        );
        Ok(Self {
            minimum: config.minimum,
            maximum: config.maximum,
            default_count: config.default_count,
        })
    }

    /// Shorthand for `build(&CapacityConfig::new(..))`.
    pub fn new(minimum: u32, maximum: u32, default_count: u32) -> BuildResult<Self> {
        Self::build(&CapacityConfig::new(minimum, maximum, default_count))
    }

    /// A fixed-size fleet: minimum, maximum and default all equal `count`.
    pub fn fixed(count: u32) -> Self {
        Self {
            minimum: count,
            maximum: count,
            default_count: count,
        }
    }

    pub fn minimum(&self) -> u32 {
        self.minimum
    }

    pub fn maximum(&self) -> u32 {
        self.maximum
    }

    pub fn default_count(&self) -> u32 {
        self.default_count
    }

    pub fn contains(&self, count: u32) -> bool {
        (self.minimum..=self.maximum).contains(&count)
    }

    pub fn to_config(&self) -> CapacityConfig {
        CapacityConfig::new(self.minimum, self.maximum, self.default_count)
    }
}

impl TryFrom<CapacityConfig> for CapacityProfile {
    type Error = BuildError;

    fn try_from(config: CapacityConfig) -> BuildResult<Self> {
        Self::build(&config)
    }
}

impl From<CapacityProfile> for CapacityConfig {
    fn from(profile: CapacityProfile) -> Self {
        profile.to_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn accepts_ordered_triple() {
        let profile = CapacityProfile::new(2, 10, 3).unwrap();
        assert_eq!(profile.minimum(), 2);
        assert_eq!(profile.maximum(), 10);
        assert_eq!(profile.default_count(), 3);
    }

    #[test]
    fn rejects_minimum_above_maximum() {
        let err = CapacityProfile::new(5, 2, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRange);
    }

    #[test]
    fn rejects_default_outside_range() {
        let err = CapacityProfile::new(2, 10, 15).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRange);
        let err = CapacityProfile::new(2, 10, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRange);
    }

    #[test]
    fn succeeds_iff_ordered() {
        for min in 0..5 {
            for max in 0..5 {
                for default in 0..5 {
                    let ordered = min <= default && default <= max;
                    assert_eq!(
                        CapacityProfile::new(min, max, default).is_ok(),
                        ordered,
                        "({min}, {max}, {default})"
                    );
                }
            }
        }
    }

    #[test]
    fn boundary_values_accepted() {
        assert!(CapacityProfile::new(0, 0, 0).is_ok());
        assert!(CapacityProfile::new(1, 5, 5).is_ok());
        assert!(CapacityProfile::new(1, 5, 1).is_ok());
    }

    #[test]
    fn serializes_with_default_key() {
        let profile = CapacityProfile::new(2, 10, 2).unwrap();
        let json = serde_json::to_value(profile).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "minimum": 2, "maximum": 10, "default": 2 })
        );
    }

    #[test]
    fn deserialize_validates() {
        let bad = serde_json::json!({ "minimum": 5, "maximum": 2, "default": 3 });
        assert!(serde_json::from_value::<CapacityProfile>(bad).is_err());

        let good = serde_json::json!({ "minimum": 1, "maximum": 3, "default": 2 });
        let profile: CapacityProfile = serde_json::from_value(good).unwrap();
        assert!(profile.contains(3));
        assert!(!profile.contains(4));
    }
}
