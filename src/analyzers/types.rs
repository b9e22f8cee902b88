//! Data types produced by the aggregation functions.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::schema::{DayType, Metric};

/// Distribution of a group of values.
///
/// For an empty group every statistic is `None` and `count` is 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DistributionSummary {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Population standard deviation.
    pub std_dev: Option<f64>,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
    pub count: usize,
}

impl DistributionSummary {
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Mean => self.mean,
            Metric::Median => self.median,
            Metric::StdDev => self.std_dev,
            Metric::Q1 => self.q1,
            Metric::Q3 => self.q3,
            Metric::Count => Some(self.count as f64),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Delay distribution of all reports within one hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimestampDelayStats {
    pub timestamp: NaiveDateTime,
    #[serde(flatten)]
    pub summary: DistributionSummary,
}

/// Delay distribution of one value of a categorical column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    #[serde(flatten)]
    pub summary: DistributionSummary,
}

/// Distribution of each weather measurement on one type of day, keyed by the
/// measurement's canonical name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherDayTypeSummary {
    pub day_type: DayType,
    pub measurements: BTreeMap<String, DistributionSummary>,
}

/// Outlier fences at 1.5 IQR beyond the quartiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IqrFence {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrFence {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}
