//! Core data types for the bioaerosol pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

/// Timestamp in the fixed reference timezone.
pub type Timestamp = DateTime<FixedOffset>;

/// Seconds in a minute.
pub const SECONDS_PER_MINUTE: f64 = 60.0;
/// Minutes in an hour.
pub const MINUTES_PER_HOUR: f64 = 60.0;
/// Hours in a day.
pub const HOURS_PER_DAY: f64 = 24.0;

/// Upper size bound (µm, inclusive) of the PM2.5 band.
pub const PM25_MAX_SIZE: f64 = 2.5;
/// Upper size bound (µm, inclusive) of the PM10 band.
pub const PM10_MAX_SIZE: f64 = 10.0;

/// Time-bin resolution for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Second,
    Minute,
    Hour,
    Day,
}

impl Granularity {
    /// All granularities, finest first.
    pub const ALL: [Granularity; 4] = [
        Granularity::Second,
        Granularity::Minute,
        Granularity::Hour,
        Granularity::Day,
    ];

    /// Length of one unit in seconds.
    pub fn unit_seconds(self) -> f64 {
        match self {
            Granularity::Second => 1.0,
            Granularity::Minute => SECONDS_PER_MINUTE,
            Granularity::Hour => SECONDS_PER_MINUTE * MINUTES_PER_HOUR,
            Granularity::Day => SECONDS_PER_MINUTE * MINUTES_PER_HOUR * HOURS_PER_DAY,
        }
    }

    /// Convert a flow rate in liters per second to liters per unit.
    #[inline]
    pub fn scale_flow_rate(self, liters_per_second: f64) -> f64 {
        liters_per_second * self.unit_seconds()
    }

    /// Truncate a timestamp to the start of its bin, on the reference clock.
    pub fn truncate(self, ts: Timestamp) -> Timestamp {
        let seconds_of_day = ts.num_seconds_from_midnight() as i64;
        let unit = self.unit_seconds() as i64;
        ts - Duration::seconds(seconds_of_day % unit)
            - Duration::nanoseconds(ts.nanosecond() as i64)
    }

    /// Express an elapsed duration in this granularity's unit.
    pub fn elapsed_units(self, elapsed: Duration) -> f64 {
        let micros = elapsed
            .num_microseconds()
            .unwrap_or_else(|| elapsed.num_milliseconds().saturating_mul(1000));
        micros as f64 / 1e6 / self.unit_seconds()
    }

    /// Short unit name, as accepted on the command line.
    pub fn unit_name(self) -> &'static str {
        match self {
            Granularity::Second => "secs",
            Granularity::Minute => "mins",
            Granularity::Hour => "hours",
            Granularity::Day => "days",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.unit_name())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Ok(Granularity::Second),
            "m" | "min" | "mins" | "minute" | "minutes" => Ok(Granularity::Minute),
            "h" | "hour" | "hours" => Ok(Granularity::Hour),
            "d" | "day" | "days" => Ok(Granularity::Day),
            other => Err(format!(
                "unknown time unit '{other}' (expected secs, mins, hours or days)"
            )),
        }
    }
}

/// Species class assigned to a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    Bacteria,
    Fungi,
    Pollen,
    FluorescentOthers,
    NonFluorescence,
}

impl Species {
    /// All species, in output order.
    pub const ALL: [Species; 5] = [
        Species::Bacteria,
        Species::Fungi,
        Species::Pollen,
        Species::FluorescentOthers,
        Species::NonFluorescence,
    ];

    /// Position in [`Species::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Label used in output tables.
    pub fn label(self) -> &'static str {
        match self {
            Species::Bacteria => "Bacteria",
            Species::Fungi => "Fungi",
            Species::Pollen => "Pollen",
            Species::FluorescentOthers => "Fluorescent-others",
            Species::NonFluorescence => "Non-fluorescence",
        }
    }

    /// Is this one of the fluorescent classes?
    pub fn is_fluorescent(self) -> bool {
        !matches!(self, Species::NonFluorescence)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Category a concentration row is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// A single species.
    Species(Species),
    /// Bacteria + Fungi + Pollen + Fluorescent-others.
    AllFluorescence,
    /// All fluorescent classes + Non-fluorescence.
    AllParticles,
    /// Particles no larger than 2.5 µm.
    Pm25,
    /// Particles no larger than 10 µm.
    Pm10,
}

impl Classification {
    /// Label used in output tables.
    pub fn label(self) -> &'static str {
        match self {
            Classification::Species(species) => species.label(),
            Classification::AllFluorescence => "All-fluorescence",
            Classification::AllParticles => "All-particles",
            Classification::Pm25 => "PM2.5",
            Classification::Pm10 => "PM10",
        }
    }
}

impl From<Species> for Classification {
    fn from(species: Species) -> Self {
        Classification::Species(species)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-channel fluorescence cutoffs derived from baseline data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdVector {
    pub fl1_280: f64,
    pub fl2_280: f64,
    pub fl2_370: f64,
}

impl ThresholdVector {
    /// Thresholds in channel order `[FL1_280, FL2_280, FL2_370]`.
    pub fn as_array(&self) -> [f64; 3] {
        [self.fl1_280, self.fl2_280, self.fl2_370]
    }
}

impl From<[f64; 3]> for ThresholdVector {
    fn from(values: [f64; 3]) -> Self {
        Self {
            fl1_280: values[0],
            fl2_280: values[1],
            fl2_370: values[2],
        }
    }
}

/// The three fluorescence readings of one particle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fluorescence {
    pub fl1_280: f64,
    pub fl2_280: f64,
    pub fl2_370: f64,
}

impl Fluorescence {
    /// Are all channels strictly below their thresholds?
    pub fn all_below(&self, threshold: &ThresholdVector) -> bool {
        self.fl1_280 < threshold.fl1_280
            && self.fl2_280 < threshold.fl2_280
            && self.fl2_370 < threshold.fl2_370
    }
}

/// One classified particle observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Absolute timestamp on the reference clock.
    pub timestamp: Timestamp,
    /// Optical size (µm).
    pub size: f64,
    /// Assigned species.
    pub species: Species,
    /// Flow rate of the source file (L/s).
    pub flow_rate: f64,
    /// Size within the PM2.5 band.
    pub pm25: bool,
    /// Size within the PM10 band.
    pub pm10: bool,
}

impl SensorRecord {
    /// Bin key at the given granularity.
    #[inline]
    pub fn bin(&self, granularity: Granularity) -> Timestamp {
        granularity.truncate(self.timestamp)
    }

    /// Flow rate in liters per granularity unit.
    #[inline]
    pub fn flow_rate_at(&self, granularity: Granularity) -> f64 {
        granularity.scale_flow_rate(self.flow_rate)
    }
}

/// Is the size within the PM2.5 band?
#[inline]
pub fn in_pm25(size: f64) -> bool {
    (0.0..=PM25_MAX_SIZE).contains(&size)
}

/// Is the size within the PM10 band?
#[inline]
pub fn in_pm10(size: f64) -> bool {
    (0.0..=PM10_MAX_SIZE).contains(&size)
}

/// One output row: a bin, a category and its concentration.
///
/// `conc` is `None` when the bin's concentration is undefined (zero elapsed time or zero flow).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationRow {
    pub bin: Timestamp,
    pub classification: Classification,
    pub conc: Option<f64>,
}

impl ConcentrationRow {
    /// Bin date as `YYYY-MM-DD`.
    pub fn date(&self) -> String {
        self.bin.format("%Y-%m-%d").to_string()
    }

    /// Bin clock time as `HH:MM:SS`.
    pub fn time(&self) -> String {
        self.bin.format("%H:%M:%S").to_string()
    }
}
