//! ISO-8601 durations as used by autoscale rule windows and cooldowns
//! (`PT1M`, `PT5M`, `PT1H30M`, `P1D`).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{BuildError, BuildResult};

static ISO_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
        .expect("static regex")
});

/// A parsed day/time ISO-8601 duration. Years, months and weeks are not
/// accepted since their length is calendar-dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoDuration {
    secs: u64,
}

impl IsoDuration {
    pub const ZERO: IsoDuration = IsoDuration { secs: 0 };

    pub fn from_secs(secs: u64) -> Self {
        Self { secs }
    }

    /// Parse `s`, naming `field` in the error message on failure.
    pub fn parse(field: &str, s: &str) -> BuildResult<Self> {
        let s = s.trim();
        let invalid = || {
            BuildError::invalid_type(format!(
                "{field} must be an ISO-8601 duration (e.g. PT5M), got {s:?}"
            ))
        };

        let caps = ISO_DURATION.captures(s).ok_or_else(invalid)?;
        // "P", "PT" and "P1DT" match the pattern but are not valid.
        if s.ends_with('T') || (1..=4).all(|i| caps.get(i).is_none()) {
            return Err(invalid());
        }

        let part = |i: usize, unit: u64| -> BuildResult<u64> {
            match caps.get(i) {
                Some(m) => m
                    .as_str()
                    .parse::<u64>()
                    .ok()
                    .and_then(|v| v.checked_mul(unit))
                    .ok_or_else(invalid),
                None => Ok(0),
            }
        };

        let secs = [part(1, 86_400)?, part(2, 3_600)?, part(3, 60)?, part(4, 1)?]
            .into_iter()
            .try_fold(0u64, |acc, v| acc.checked_add(v))
            .ok_or_else(invalid)?;

        Ok(Self { secs })
    }

    pub fn as_secs(&self) -> u64 {
        self.secs
    }
}

impl fmt::Display for IsoDuration {
    /// Canonical form: `PT0S` for zero, otherwise days then H/M/S,
    /// omitting zero components.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.secs == 0 {
            return write!(f, "PT0S");
        }
        let days = self.secs / 86_400;
        let hours = (self.secs % 86_400) / 3_600;
        let mins = (self.secs % 3_600) / 60;
        let secs = self.secs % 60;

        write!(f, "P")?;
        if days > 0 {
            write!(f, "{days}D")?;
        }
        if hours + mins + secs > 0 {
            write!(f, "T")?;
            if hours > 0 {
                write!(f, "{hours}H")?;
            }
            if mins > 0 {
                write!(f, "{mins}M")?;
            }
            if secs > 0 {
                write!(f, "{secs}S")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parse_common_values() {
        assert_eq!(IsoDuration::parse("timeGrain", "PT1M").unwrap().as_secs(), 60);
        assert_eq!(IsoDuration::parse("cooldown", "PT5M").unwrap().as_secs(), 300);
        assert_eq!(IsoDuration::parse("window", "PT1H30M").unwrap().as_secs(), 5_400);
        assert_eq!(IsoDuration::parse("window", "P1D").unwrap().as_secs(), 86_400);
        assert_eq!(IsoDuration::parse("pause", "PT0S").unwrap(), IsoDuration::ZERO);
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "P", "PT", "5m", "PT5X", "P1W", "1M"] {
            let err = IsoDuration::parse("cooldown", bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidType, "{bad:?}");
        }
    }

    #[test]
    fn error_names_field() {
        let err = IsoDuration::parse("timeWindow", "soon").unwrap_err();
        assert!(err.message().contains("timeWindow"));
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(IsoDuration::from_secs(300).to_string(), "PT5M");
        assert_eq!(IsoDuration::from_secs(5_400).to_string(), "PT1H30M");
        assert_eq!(IsoDuration::from_secs(86_400).to_string(), "P1D");
        assert_eq!(IsoDuration::from_secs(90_061).to_string(), "P1DT1H1M1S");
        assert_eq!(IsoDuration::ZERO.to_string(), "PT0S");
    }
}
