use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use crate::analyzers::types::{
    CategorySummary, DistributionSummary, IqrFence, TimestampDelayStats, WeatherDayTypeSummary,
};
use crate::analyzers::utility::{mean, median, quantile, sorted, stddev};
use crate::normalize::floor_to_hour;
use crate::records::{TrafficRecord, WeatherRecord, traffic_key};
use crate::schema::{DayType, TrafficCategory, WeatherColumn};

/// Summarizes a group of values, skipping missing ones.
///
/// Never fails: an empty (or all-missing) group yields `count == 0` with every
/// statistic undefined.
pub fn summarize<I>(values: I) -> DistributionSummary
where
    I: IntoIterator<Item = Option<f64>>,
{
    let present: Vec<f64> = values.into_iter().flatten().collect();
    let Some(avg) = mean(&present) else {
        return DistributionSummary::default();
    };
    let ordered = sorted(&present);

    DistributionSummary {
        mean: Some(avg),
        median: median(&ordered),
        std_dev: stddev(&present, avg),
        q1: quantile(&ordered, 0.25),
        q3: quantile(&ordered, 0.75),
        count: present.len(),
    }
}

/// Delay distribution of a group of traffic records, in signed minutes.
pub fn delay_distribution<'a, I>(group: I) -> DistributionSummary
where
    I: IntoIterator<Item = &'a TrafficRecord>,
{
    summarize(group.into_iter().map(|r| Some(r.delay_minutes as f64)))
}

/// One delay summary per hour, in chronological order.
///
/// Report times are floored to the hour first, so records straight from a
/// merge group the same way as records from the loaded dataset.
pub fn delay_stats_by_timestamp(records: &[TrafficRecord]) -> Vec<TimestampDelayStats> {
    let mut groups: BTreeMap<NaiveDateTime, Vec<&TrafficRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(floor_to_hour(record.timestamp))
            .or_default()
            .push(record);
    }

    groups
        .into_iter()
        .map(|(timestamp, group)| TimestampDelayStats {
            timestamp,
            summary: delay_distribution(group),
        })
        .collect()
}

/// One delay summary per value of `category`, ordered by value.
///
/// Records without a value for the category (no route, day type not
/// annotated) are left out.
pub fn summarize_by(records: &[TrafficRecord], category: TrafficCategory) -> Vec<CategorySummary> {
    let mut groups: BTreeMap<String, Vec<&TrafficRecord>> = BTreeMap::new();
    for record in records {
        if let Some(key) = traffic_key(record, category.column()) {
            groups.entry(key).or_default().push(record);
        }
    }

    groups
        .into_iter()
        .map(|(category, group)| CategorySummary {
            category,
            summary: delay_distribution(group),
        })
        .collect()
}

/// Per-timestamp delay statistics of the records whose `category` equals
/// `value`.
pub fn delay_stats_for_category(
    records: &[TrafficRecord],
    category: TrafficCategory,
    value: &str,
) -> Vec<TimestampDelayStats> {
    let selected: Vec<TrafficRecord> = records
        .iter()
        .filter(|r| traffic_key(r, category.column()).as_deref() == Some(value))
        .cloned()
        .collect();
    delay_stats_by_timestamp(&selected)
}

/// Distribution of every weather measurement per day type.
///
/// Only day types with at least one annotated record appear.
pub fn weather_by_day_type(weather: &[WeatherRecord]) -> Vec<WeatherDayTypeSummary> {
    let mut groups: BTreeMap<DayType, Vec<&WeatherRecord>> = BTreeMap::new();
    for record in weather {
        if let Some(day_type) = record.day_type {
            groups.entry(day_type).or_default().push(record);
        }
    }

    groups
        .into_iter()
        .map(|(day_type, group)| WeatherDayTypeSummary {
            day_type,
            measurements: WeatherColumn::MEASUREMENTS
                .iter()
                .map(|&column| {
                    let values = group.iter().map(|r| r.measurement(column));
                    (column.canonical_name().to_string(), summarize(values))
                })
                .collect(),
        })
        .collect()
}

/// Fences at `Q1 - 1.5 IQR` and `Q3 + 1.5 IQR`. `None` for empty input.
pub fn iqr_fence(values: &[f64]) -> Option<IqrFence> {
    let ordered = sorted(values);
    let q1 = quantile(&ordered, 0.25)?;
    let q3 = quantile(&ordered, 0.75)?;
    let iqr = q3 - q1;

    Some(IqrFence {
        q1,
        q3,
        lower: q1 - 1.5 * iqr,
        upper: q3 + 1.5 * iqr,
    })
}

/// Values inside the IQR fences, in their original order.
///
/// Meant for trend charts only; statistics should be computed on the
/// untrimmed input.
pub fn iqr_trim(values: &[f64]) -> Vec<f64> {
    match iqr_fence(values) {
        Some(fence) => values.iter().copied().filter(|v| fence.contains(*v)).collect(),
        None => Vec::new(),
    }
}

/// Items whose value lies inside the IQR fences computed over all values.
/// Items without a value are dropped.
pub fn iqr_trim_by<T, F>(items: &[T], value: F) -> Vec<&T>
where
    F: Fn(&T) -> Option<f64>,
{
    let values: Vec<f64> = items.iter().filter_map(&value).collect();
    let Some(fence) = iqr_fence(&values) else {
        return Vec::new();
    };
    items
        .iter()
        .filter(|item| value(*item).is_some_and(|v| fence.contains(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::parse_timestamp;
    use crate::schema::Metric;
    use approx::assert_abs_diff_eq;

    fn rec(vehicle: &str, brigade: &str, delay: i64, ts: &str) -> TrafficRecord {
        TrafficRecord {
            vehicle_no: vehicle.into(),
            brigade: brigade.into(),
            route: None,
            stop: None,
            delay_minutes: delay,
            outside_route: false,
            timestamp: parse_timestamp(ts).unwrap(),
            day_type: None,
        }
    }

    #[test]
    fn test_delay_distribution_empty_group() {
        let empty: [TrafficRecord; 0] = [];
        let summary = delay_distribution(&empty);
        assert_eq!(summary.count, 0);
        assert!(summary.is_empty());
        for metric in [Metric::Mean, Metric::Median, Metric::StdDev, Metric::Q1, Metric::Q3] {
            assert_eq!(summary.metric(metric), None);
        }
        assert_eq!(summary.metric(Metric::Count), Some(0.0));
    }

    #[test]
    fn test_delay_distribution_keeps_sign() {
        let group = [
            rec("1", "1", -4, "2025-01-03 08:00"),
            rec("2", "1", 2, "2025-01-03 08:00"),
            rec("3", "1", 6, "2025-01-03 08:00"),
            rec("4", "1", -8, "2025-01-03 08:00"),
        ];
        let s = delay_distribution(&group);
        assert_eq!(s.count, 4);
        assert_abs_diff_eq!(s.mean.unwrap(), -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.median.unwrap(), -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.std_dev.unwrap(), (116.0f64 / 4.0).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(s.q1.unwrap(), -5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.q3.unwrap(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_summarize_skips_missing() {
        let s = summarize([Some(1.0), None, Some(3.0)]);
        assert_eq!(s.count, 2);
        assert_eq!(s.mean, Some(2.0));
        assert_eq!(summarize([None, None]), DistributionSummary::default());
    }

    #[test]
    fn test_delay_stats_by_timestamp_is_chronological() {
        let records = [
            rec("1", "1", 5, "2025-01-03 09:00"),
            rec("2", "1", 1, "2025-01-03 08:00"),
            rec("3", "1", 3, "2025-01-03 08:00"),
        ];
        let stats = delay_stats_by_timestamp(&records);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].timestamp, parse_timestamp("2025-01-03 08:00").unwrap());
        assert_eq!(stats[0].summary.count, 2);
        assert_eq!(stats[0].summary.mean, Some(2.0));
        assert_eq!(stats[1].summary.count, 1);
        assert_eq!(stats[1].summary.std_dev, Some(0.0));
    }

    #[test]
    fn test_delay_stats_by_timestamp_groups_sub_hour_reports() {
        let records = [
            rec("1", "1", 2, "2025-01-03 08:01"),
            rec("2", "1", 4, "2025-01-03 08:20"),
            rec("3", "1", 9, "2025-01-03 09:59"),
        ];
        let stats = delay_stats_by_timestamp(&records);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].timestamp, parse_timestamp("2025-01-03 08:00").unwrap());
        assert_eq!(stats[0].summary.count, 2);
        assert_eq!(stats[0].summary.mean, Some(3.0));
        assert_eq!(stats[1].timestamp, parse_timestamp("2025-01-03 09:00").unwrap());

        let for_brigade = delay_stats_for_category(&records, TrafficCategory::Brigade, "1");
        assert_eq!(for_brigade, stats);
    }

    #[test]
    fn test_summarize_by_brigade_and_day_type() {
        let mut records = vec![
            rec("1", "181", 5, "2025-01-03 08:00"),
            rec("2", "181", 1, "2025-01-03 08:00"),
            rec("3", "M1", -3, "2025-01-03 08:00"),
        ];

        let by_brigade = summarize_by(&records, TrafficCategory::Brigade);
        let keys: Vec<_> = by_brigade.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(keys, vec!["181", "M1"]);
        assert_eq!(by_brigade[0].summary.mean, Some(3.0));
        assert_eq!(by_brigade[1].summary.mean, Some(-3.0));

        assert!(summarize_by(&records, TrafficCategory::DayType).is_empty());
        records[0].day_type = Some(DayType::Weekday);
        let by_day = summarize_by(&records, TrafficCategory::DayType);
        assert_eq!(by_day.len(), 1);
        assert_eq!(by_day[0].category, "Dzień roboczy");
    }

    #[test]
    fn test_delay_stats_for_category() {
        let records = [
            rec("1", "181", 5, "2025-01-03 08:00"),
            rec("2", "M1", 1, "2025-01-03 08:00"),
            rec("1", "181", 7, "2025-01-03 09:00"),
        ];
        let stats = delay_stats_for_category(&records, TrafficCategory::VehicleNo, "1");
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].summary.mean, Some(5.0));
        assert_eq!(stats[1].summary.mean, Some(7.0));
    }

    #[test]
    fn test_weather_by_day_type() {
        let ts = parse_timestamp("2025-01-04 08:00").unwrap();
        let base = WeatherRecord {
            timestamp: ts,
            temperature: Some(1.0),
            wind_speed: None,
            humidity: Some(80.0),
            rainfall: Some(0.0),
            pressure: Some(1000.0),
            day_type: Some(DayType::Weekend),
        };
        let weather = vec![
            base.clone(),
            WeatherRecord { temperature: Some(3.0), ..base.clone() },
            WeatherRecord { day_type: None, ..base.clone() },
        ];

        let summary = weather_by_day_type(&weather);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].day_type, DayType::Weekend);
        assert_eq!(summary[0].measurements["temperature"].mean, Some(2.0));
        assert_eq!(summary[0].measurements["wind_speed"].count, 0);
        assert_eq!(summary[0].measurements.len(), 5);
    }

    #[test]
    fn test_iqr_trim_removes_outlier() {
        let values = [1.0, 2.0, 3.0, 4.0, 100.0];
        let fence = iqr_fence(&values).unwrap();
        assert_eq!(fence.q1, 2.0);
        assert_eq!(fence.q3, 4.0);
        assert_eq!(fence.upper, 7.0);
        assert_eq!(fence.lower, -1.0);
        assert_eq!(iqr_trim(&values), vec![1.0, 2.0, 3.0, 4.0]);
        assert!(iqr_trim(&[]).is_empty());
    }

    #[test]
    fn test_iqr_trim_by_keeps_untrimmed_input() {
        let records = [
            rec("1", "1", 1, "2025-01-03 08:00"),
            rec("2", "1", 2, "2025-01-03 08:00"),
            rec("3", "1", 3, "2025-01-03 08:00"),
            rec("4", "1", 4, "2025-01-03 08:00"),
            rec("5", "1", 100, "2025-01-03 08:00"),
        ];
        let kept = iqr_trim_by(&records, |r| Some(r.delay_minutes as f64));
        assert_eq!(kept.len(), 4);
        assert!(kept.iter().all(|r| r.delay_minutes < 100));
        assert_eq!(delay_distribution(&records).count, 5);
    }
}
