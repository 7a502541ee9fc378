//! Schedule profiles — capacity ranges that apply on a recurrence or
//! during a fixed date window.
//!
//! The business-hours composer produces the canonical pair:
//!
//! ```text
//! "Business Hours": business days, hours [start, end)
//! "Off Hours":      all seven days, hours [0, start) ∪ [end, 24)
//! ```
//!
//! Overlap between profiles is not detected. Mixing the composed pair
//! with custom recurrences that cover the same hours is the caller's
//! responsibility.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use skyplan_core::{require, BuildError, BuildResult, CapacityConfig, CapacityProfile};

pub const DEFAULT_TIME_ZONE: &str = "UTC";
pub const BUSINESS_HOURS_PROFILE: &str = "Business Hours";
pub const OFF_HOURS_PROFILE: &str = "Off Hours";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub const WEEKDAYS: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecurrenceFrequency {
    #[default]
    Week,
    Month,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceConfig {
    pub frequency: Option<RecurrenceFrequency>,
    pub time_zone: Option<String>,
    #[serde(default)]
    pub days: Vec<Day>,
    #[serde(default)]
    pub hours: Vec<u32>,
    #[serde(default)]
    pub minutes: Vec<u32>,
}

/// A validated recurrence. `days` and `hours` are never empty; `minutes`
/// defaults to `[0]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    pub frequency: RecurrenceFrequency,
    pub time_zone: String,
    pub days: Vec<Day>,
    pub hours: Vec<u32>,
    pub minutes: Vec<u32>,
}

impl Recurrence {
    pub fn build(config: &RecurrenceConfig) -> BuildResult<Self> {
        if config.days.is_empty() {
            return Err(BuildError::cardinality("recurrence requires at least one day"));
        }
        if config.hours.is_empty() {
            return Err(BuildError::cardinality("recurrence requires at least one hour"));
        }
        if let Some(h) = config.hours.iter().find(|&&h| h > 23) {
            return Err(BuildError::range(format!(
                "recurrence hour must be between 0 and 23, got {h}"
            )));
        }
        if let Some(m) = config.minutes.iter().find(|&&m| m > 59) {
            return Err(BuildError::range(format!(
                "recurrence minute must be between 0 and 59, got {m}"
            )));
        }

        Ok(Self {
            frequency: config.frequency.unwrap_or_default(),
            time_zone: time_zone_or_default(&config.time_zone),
            days: config.days.clone(),
            hours: config.hours.clone(),
            minutes: if config.minutes.is_empty() {
                vec![0]
            } else {
                config.minutes.clone()
            },
        })
    }

    pub fn to_config(&self) -> RecurrenceConfig {
        RecurrenceConfig {
            frequency: Some(self.frequency),
            time_zone: Some(self.time_zone.clone()),
            days: self.days.clone(),
            hours: self.hours.clone(),
            minutes: self.minutes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedDateConfig {
    pub time_zone: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// A validated fixed date window, `start < end`, in `time_zone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedDate {
    pub time_zone: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl FixedDate {
    pub fn build(config: &FixedDateConfig) -> BuildResult<Self> {
        if config.start >= config.end {
            return Err(BuildError::range(format!(
                "fixedDate start ({}) must be before end ({})",
                config.start, config.end
            )));
        }
        Ok(Self {
            time_zone: time_zone_or_default(&config.time_zone),
            start: config.start,
            end: config.end,
        })
    }

    pub fn to_config(&self) -> FixedDateConfig {
        FixedDateConfig {
            time_zone: Some(self.time_zone.clone()),
            start: self.start,
            end: self.end,
        }
    }
}

/// What makes a schedule profile active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleTrigger {
    /// Neither recurrence nor fixed date: the always-on default profile.
    Always,
    Recurring,
    Fixed,
}

/// Resolve which schedule field drives activation. A fixed date wins
/// when both are present.
pub(crate) fn trigger_of(recurrence: bool, fixed_date: bool) -> ScheduleTrigger {
    match (recurrence, fixed_date) {
        (_, true) => ScheduleTrigger::Fixed,
        (true, false) => ScheduleTrigger::Recurring,
        (false, false) => ScheduleTrigger::Always,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleProfileConfig {
    #[serde(default)]
    pub name: String,
    /// Kept loosely typed so a non-numeric `minimum` reaches the builder.
    pub capacity: Option<Value>,
    pub recurrence: Option<RecurrenceConfig>,
    pub fixed_date: Option<FixedDateConfig>,
}

impl ScheduleProfileConfig {
    pub fn new(name: impl Into<String>, capacity: CapacityConfig) -> Self {
        Self {
            name: name.into(),
            capacity: Some(capacity_value(&capacity)),
            recurrence: None,
            fixed_date: None,
        }
    }
}

/// A validated schedule profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleProfile {
    pub name: String,
    pub capacity: CapacityProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_date: Option<FixedDate>,
}

impl ScheduleProfile {
    /// Validate a schedule profile.
    ///
    /// Checks, in order: name, capacity presence, capacity range, then the
    /// recurrence and fixed date if supplied.
    pub fn build(config: &ScheduleProfileConfig) -> BuildResult<Self> {
        require(&config.name, "schedule profile name is required")?;
        let capacity = config
            .capacity
            .as_ref()
            .filter(|c| c.get("minimum").is_some_and(Value::is_number))
            .ok_or_else(|| {
                BuildError::missing(format!(
                    "schedule profile {:?} requires a capacity with a numeric minimum",
                    config.name
                ))
            })?;
        let capacity: CapacityConfig = serde_json::from_value(capacity.clone()).map_err(|e| {
            BuildError::invalid_type(format!(
                "schedule profile {:?} capacity is malformed: {e}",
                config.name
            ))
        })?;
        let capacity = CapacityProfile::build(&capacity)?;

        let recurrence = config.recurrence.as_ref().map(Recurrence::build).transpose()?;
        let fixed_date = config.fixed_date.as_ref().map(FixedDate::build).transpose()?;

        if recurrence.is_some() && fixed_date.is_some() {
            warn!(
                profile = %config.name,
                "schedule profile has both recurrence and fixedDate; fixedDate drives activation"
            );
        }

        debug!(profile = %config.name, "schedule profile built");
        Ok(Self {
            name: config.name.clone(),
            capacity,
            recurrence,
            fixed_date,
        })
    }

    pub fn trigger(&self) -> ScheduleTrigger {
        trigger_of(self.recurrence.is_some(), self.fixed_date.is_some())
    }

    /// Compose the canonical business-hours / off-hours pair.
    pub fn business_hours(config: &BusinessHoursConfig) -> BuildResult<[ScheduleProfile; 2]> {
        let hours = config.business_hours.unwrap_or_default();
        if hours.start >= hours.end || hours.end > 24 {
            return Err(BuildError::range(format!(
                "business hours must satisfy start < end <= 24, got {}..{}",
                hours.start, hours.end
            )));
        }

        let business_days = config
            .business_days
            .clone()
            .unwrap_or_else(|| Day::WEEKDAYS.to_vec());
        if business_days.is_empty() {
            return Err(BuildError::cardinality(
                "business hours schedule requires at least one business day",
            ));
        }

        let time_zone = time_zone_or_default(&config.time_zone);

        let business = ScheduleProfile::build(&ScheduleProfileConfig {
            name: BUSINESS_HOURS_PROFILE.to_string(),
            capacity: Some(capacity_value(&config.business_hours_capacity)),
            recurrence: Some(RecurrenceConfig {
                frequency: Some(RecurrenceFrequency::Week),
                time_zone: Some(time_zone.clone()),
                days: business_days,
                hours: hours.hours().collect(),
                minutes: vec![0],
            }),
            fixed_date: None,
        })?;

        let off = ScheduleProfile::build(&ScheduleProfileConfig {
            name: OFF_HOURS_PROFILE.to_string(),
            capacity: Some(capacity_value(&config.off_hours_capacity)),
            recurrence: Some(RecurrenceConfig {
                frequency: Some(RecurrenceFrequency::Week),
                time_zone: Some(time_zone),
                days: Day::ALL.to_vec(),
                hours: hours.complement().collect(),
                minutes: vec![0],
            }),
            fixed_date: None,
        })?;

        Ok([business, off])
    }

    pub fn to_config(&self) -> ScheduleProfileConfig {
        ScheduleProfileConfig {
            name: self.name.clone(),
            capacity: Some(capacity_value(&self.capacity.to_config())),
            recurrence: self.recurrence.as_ref().map(Recurrence::to_config),
            fixed_date: self.fixed_date.as_ref().map(FixedDate::to_config),
        }
    }
}

/// Half-open hour range `[start, end)` on a 24-hour clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    pub start: u32,
    pub end: u32,
}

impl Default for HourRange {
    fn default() -> Self {
        Self { start: 8, end: 18 }
    }
}

impl HourRange {
    pub fn hours(&self) -> impl Iterator<Item = u32> {
        self.start..self.end
    }

    /// `[0, start) ∪ [end, 24)`.
    pub fn complement(&self) -> impl Iterator<Item = u32> {
        (0..self.start).chain(self.end..24)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessHoursConfig {
    pub business_hours_capacity: CapacityConfig,
    pub off_hours_capacity: CapacityConfig,
    pub time_zone: Option<String>,
    /// Defaults to Monday through Friday.
    pub business_days: Option<Vec<Day>>,
    /// Defaults to 08:00–18:00.
    pub business_hours: Option<HourRange>,
}

fn capacity_value(capacity: &CapacityConfig) -> Value {
    serde_json::json!({
        "minimum": capacity.minimum,
        "maximum": capacity.maximum,
        "default": capacity.default_count,
    })
}

fn time_zone_or_default(tz: &Option<String>) -> String {
    tz.as_deref()
        .map(str::trim)
        .filter(|tz| !tz.is_empty())
        .unwrap_or(DEFAULT_TIME_ZONE)
        .to_string()
}
