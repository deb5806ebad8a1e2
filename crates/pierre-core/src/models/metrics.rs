// ABOUTME: Fitness metric record types consumed by the coaching context pipeline
// ABOUTME: Defines MetricDomain categories and immutable MetricRecord observations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

/// Category of fitness metric
///
/// Ordering of the enum is the canonical display order; use
/// [`MetricDomain::PRIORITY`] when deciding which domains survive a tight
/// context budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricDomain {
    /// Endurance sessions (duration, distance)
    Workout,
    /// Resistance sessions (volume, load)
    Strength,
    /// Health samples (resting heart rate, HRV, sleep)
    Health,
    /// Training load (acute/chronic load, TSS)
    Training,
}

impl MetricDomain {
    /// Every domain, in canonical order
    pub const ALL: [Self; 4] = [Self::Workout, Self::Strength, Self::Health, Self::Training];

    /// Domains ordered from most to least important for coaching context
    pub const PRIORITY: [Self; 4] = [Self::Training, Self::Workout, Self::Strength, Self::Health];

    /// Lowercase identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Workout => "workout",
            Self::Strength => "strength",
            Self::Health => "health",
            Self::Training => "training",
        }
    }
}

impl fmt::Display for MetricDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricDomain {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "workout" => Ok(Self::Workout),
            "strength" => Ok(Self::Strength),
            "health" => Ok(Self::Health),
            "training" => Ok(Self::Training),
            other => Err(AppError::invalid_input(format!(
                "Unknown metric domain: {other}"
            ))),
        }
    }
}

/// One immutable fitness observation
///
/// `value` is optional because upstream sources occasionally deliver samples
/// without a reading; such records are counted but never aggregated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Domain this observation belongs to
    pub domain: MetricDomain,
    /// When the observation was taken
    pub timestamp: DateTime<Utc>,
    /// Name of the numeric field (e.g. `duration_minutes`, `resting_hr`)
    pub metric: String,
    /// Numeric reading
    #[serde(default)]
    pub value: Option<f64>,
    /// Unit of `value` (e.g. `min`, `kg`, `bpm`)
    pub unit: String,
}

impl MetricRecord {
    /// Create a record carrying a reading
    #[must_use]
    pub fn new(
        domain: MetricDomain,
        timestamp: DateTime<Utc>,
        metric: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            domain,
            timestamp,
            metric: metric.into(),
            value: Some(value),
            unit: unit.into(),
        }
    }

    /// The reading, if present and finite
    #[must_use]
    pub fn valid_value(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }
}
