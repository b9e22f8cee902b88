//! Ordinary least squares fit of a delay metric on the weather covariates.
//!
//! The fit is descriptive: it is evaluated on the same rows it was fitted on
//! and says nothing about predictive accuracy on unseen hours.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::analyzers::correlation::index_stats;
use crate::analyzers::types::TimestampDelayStats;
use crate::error::Result;
use crate::normalize::floor_to_hour;
use crate::records::WeatherRecord;
use crate::schema::Metric;

const COVARIATES: usize = 5;

/// Weather covariates aligned with the target metric of the same hour.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegressionFrame {
    pub timestamps: Vec<NaiveDateTime>,
    pub covariates: Vec<[Option<f64>; COVARIATES]>,
    pub target: Vec<Option<f64>>,
}

impl RegressionFrame {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Inner join of weather rows with `metric` of the delay statistics.
///
/// Several weather rows may share an hour; the statistics must not.
pub fn regression_frame(
    weather: &[WeatherRecord],
    stats: &[TimestampDelayStats],
    metric: Metric,
) -> Result<RegressionFrame> {
    let index = index_stats(stats)?;
    let mut frame = RegressionFrame::default();

    for w in weather {
        let timestamp = floor_to_hour(w.timestamp);
        if let Some(summary) = index.get(&timestamp) {
            frame.timestamps.push(timestamp);
            frame.covariates.push(w.measurements());
            frame.target.push(summary.metric(metric));
        }
    }

    Ok(frame)
}

/// Result of an in-sample least squares fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearFit {
    /// One coefficient per covariate, in temperature, wind speed, humidity,
    /// rainfall, pressure order. `None` when no row was usable.
    pub coefficients: Option<[f64; COVARIATES]>,
    pub intercept: Option<f64>,
    /// Fitted values aligned with the input rows; `None` for rows with a
    /// missing covariate or when the fit is undefined.
    pub predictions: Vec<Option<f64>>,
    /// Rows used in the fit.
    pub observations: usize,
    /// Covariate means over the rows used in the fit.
    pub covariate_means: Option<[f64; COVARIATES]>,
}

impl LinearFit {
    /// Intercept plus the temperature effect at the mean fitted temperature.
    pub fn trend_level(&self) -> Option<f64> {
        let intercept = self.intercept?;
        let coefficients = self.coefficients?;
        let means = self.covariate_means?;
        Some(intercept + coefficients[0] * means[0])
    }

    pub fn predict(&self, row: &[Option<f64>; COVARIATES]) -> Option<f64> {
        let coefficients = self.coefficients?;
        let intercept = self.intercept?;
        let mut y = intercept;
        for (x, b) in row.iter().zip(coefficients) {
            y += (*x)? * b;
        }
        Some(y)
    }
}

/// Fits `target ~ covariates` by ordinary least squares.
///
/// Rows where the target or any covariate is missing are excluded from the
/// fit; nothing is imputed. Covariates that are constant, or linear
/// combinations of earlier covariates, over the fitted rows get a coefficient
/// of 0. With no usable rows the fit is undefined rather than an error.
pub fn fit_linear_model(covariates: &[[Option<f64>; COVARIATES]], target: &[Option<f64>]) -> LinearFit {
    let rows: Vec<([f64; COVARIATES], f64)> = covariates
        .iter()
        .zip(target)
        .filter_map(|(x, y)| {
            let y = (*y)?;
            let mut complete = [0.0; COVARIATES];
            for (slot, value) in complete.iter_mut().zip(x) {
                *slot = (*value)?;
            }
            Some((complete, y))
        })
        .collect();

    if rows.is_empty() {
        return LinearFit {
            coefficients: None,
            intercept: None,
            predictions: vec![None; covariates.len()],
            observations: 0,
            covariate_means: None,
        };
    }

    let n = rows.len() as f64;
    let mut x_mean = [0.0; COVARIATES];
    let mut y_mean = 0.0;
    for (x, y) in &rows {
        for (m, v) in x_mean.iter_mut().zip(x) {
            *m += v / n;
        }
        y_mean += y / n;
    }

    // Normal equations on centered data.
    let mut xtx = [[0.0; COVARIATES]; COVARIATES];
    let mut xty = [0.0; COVARIATES];
    for (x, y) in &rows {
        let dx: [f64; COVARIATES] = std::array::from_fn(|i| x[i] - x_mean[i]);
        let dy = y - y_mean;
        for i in 0..COVARIATES {
            xty[i] += dx[i] * dy;
            for j in 0..COVARIATES {
                xtx[i][j] += dx[i] * dx[j];
            }
        }
    }

    let coefficients = solve_normal_equations(xtx, xty);
    let intercept = y_mean
        - coefficients
            .iter()
            .zip(&x_mean)
            .map(|(b, m)| b * m)
            .sum::<f64>();

    let mut fit = LinearFit {
        coefficients: Some(coefficients),
        intercept: Some(intercept),
        predictions: Vec::new(),
        observations: rows.len(),
        covariate_means: Some(x_mean),
    };
    fit.predictions = covariates.iter().map(|row| fit.predict(row)).collect();
    fit
}

/// Gauss-Jordan elimination with partial pivoting. Columns whose pivot
/// vanishes relative to their own diagonal are treated as free and set to 0.
fn solve_normal_equations(
    mut a: [[f64; COVARIATES]; COVARIATES],
    mut b: [f64; COVARIATES],
) -> [f64; COVARIATES] {
    let tolerance: [f64; COVARIATES] = std::array::from_fn(|i| a[i][i].abs() * 1e-9);
    let mut pivot_row_of = [None; COVARIATES];
    let mut row = 0;

    for col in 0..COVARIATES {
        if row == COVARIATES {
            break;
        }
        let Some((best, best_abs)) = (row..COVARIATES)
            .map(|r| (r, a[r][col].abs()))
            .max_by(|x, y| x.1.total_cmp(&y.1))
        else {
            break;
        };
        if best_abs == 0.0 || best_abs <= tolerance[col] {
            continue;
        }

        a.swap(row, best);
        b.swap(row, best);
        let pivot = a[row];
        let pivot_b = b[row];

        for r in 0..COVARIATES {
            if r == row {
                continue;
            }
            let factor = a[r][col] / pivot[col];
            if factor != 0.0 {
                for c in col..COVARIATES {
                    a[r][c] -= factor * pivot[c];
                }
                b[r] -= factor * pivot_b;
            }
        }

        pivot_row_of[col] = Some(row);
        row += 1;
    }

    let mut x = [0.0; COVARIATES];
    for (col, pivot) in pivot_row_of.iter().enumerate() {
        if let Some(r) = pivot {
            x[col] = b[*r] / a[*r][col];
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate::delay_stats_by_timestamp;
    use crate::error::Error;
    use crate::normalize::parse_timestamp;
    use crate::records::TrafficRecord;
    use approx::assert_abs_diff_eq;

    fn row(t: f64, w: f64, h: f64, r: f64, p: f64) -> [Option<f64>; 5] {
        [Some(t), Some(w), Some(h), Some(r), Some(p)]
    }

    #[test]
    fn test_exact_linear_relationship_is_recovered() {
        let covariates: Vec<_> = (0..12)
            .map(|i| {
                let i = i as f64;
                row(i, (i * 7.0) % 5.0, 50.0 + (i * 3.0) % 7.0, (i * i) % 3.0, 1000.0 + (i * 11.0) % 13.0)
            })
            .collect();
        let target: Vec<_> = covariates
            .iter()
            .map(|x| {
                let x = x.map(|v| v.unwrap());
                Some(2.0 + 0.5 * x[0] - 1.0 * x[1] + 0.1 * x[2] + 3.0 * x[3] - 0.2 * x[4])
            })
            .collect();

        let fit = fit_linear_model(&covariates, &target);
        let coefficients = fit.coefficients.unwrap();
        assert_eq!(fit.observations, 12);
        for (got, want) in coefficients.iter().zip([0.5, -1.0, 0.1, 3.0, -0.2]) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(fit.intercept.unwrap(), 2.0, epsilon = 1e-4);
        for (p, y) in fit.predictions.iter().zip(&target) {
            assert_abs_diff_eq!(p.unwrap(), y.unwrap(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_rows_with_missing_values_are_excluded_not_imputed() {
        let mut covariates: Vec<_> = (0..6).map(|i| row(i as f64, 0.0, 0.0, 0.0, 0.0)).collect();
        let mut target: Vec<_> = (0..6).map(|i| Some(1.0 + 2.0 * i as f64)).collect();
        covariates.push([Some(100.0), None, Some(0.0), Some(0.0), Some(0.0)]);
        target.push(Some(-500.0));
        covariates.push(row(50.0, 0.0, 0.0, 0.0, 0.0));
        target.push(None);

        let fit = fit_linear_model(&covariates, &target);
        assert_eq!(fit.observations, 6);
        let coefficients = fit.coefficients.unwrap();
        assert_abs_diff_eq!(coefficients[0], 2.0, epsilon = 1e-9);
        // constant covariates carry no weight
        assert_eq!(&coefficients[1..], &[0.0, 0.0, 0.0, 0.0]);
        assert_abs_diff_eq!(fit.intercept.unwrap(), 1.0, epsilon = 1e-9);

        assert_eq!(fit.predictions.len(), 8);
        assert_eq!(fit.predictions[6], None);
        assert_abs_diff_eq!(fit.predictions[7].unwrap(), 101.0, epsilon = 1e-9);
    }

    #[test]
    fn test_collinear_covariate_gets_zero_weight() {
        let covariates: Vec<_> = (0..5)
            .map(|i| {
                let t = i as f64;
                row(t, 2.0 * t, (t * 3.0) % 4.0, 0.0, 0.0)
            })
            .collect();
        let target: Vec<_> = covariates.iter().map(|x| Some(3.0 * x[0].unwrap())).collect();

        let fit = fit_linear_model(&covariates, &target);
        for (p, y) in fit.predictions.iter().zip(&target) {
            assert_abs_diff_eq!(p.unwrap(), y.unwrap(), epsilon = 1e-9);
        }
        assert_eq!(fit.coefficients.unwrap()[1], 0.0);
    }

    #[test]
    fn test_empty_input_is_undefined() {
        let fit = fit_linear_model(&[[None; 5]], &[Some(1.0)]);
        assert_eq!(fit.observations, 0);
        assert_eq!(fit.coefficients, None);
        assert_eq!(fit.intercept, None);
        assert_eq!(fit.predictions, vec![None]);
        assert_eq!(fit.trend_level(), None);
    }

    #[test]
    fn test_trend_level_uses_mean_temperature() {
        let covariates: Vec<_> = (0..4).map(|i| row(i as f64, 0.0, 0.0, 0.0, 0.0)).collect();
        let target: Vec<_> = (0..4).map(|i| Some(10.0 + i as f64)).collect();
        let fit = fit_linear_model(&covariates, &target);
        // 10 + 1.0 * 1.5
        assert_abs_diff_eq!(fit.trend_level().unwrap(), 11.5, epsilon = 1e-9);
    }

    fn weather(ts: &str, t: f64) -> WeatherRecord {
        WeatherRecord {
            timestamp: parse_timestamp(ts).unwrap(),
            temperature: Some(t),
            wind_speed: Some(1.0),
            humidity: Some(80.0),
            rainfall: Some(0.0),
            pressure: Some(1010.0),
            day_type: None,
        }
    }

    fn traffic(ts: &str, delay: i64) -> TrafficRecord {
        TrafficRecord {
            vehicle_no: "1".into(),
            brigade: "1".into(),
            route: None,
            stop: None,
            delay_minutes: delay,
            outside_route: false,
            timestamp: parse_timestamp(ts).unwrap(),
            day_type: None,
        }
    }

    #[test]
    fn test_regression_frame_inner_join() {
        let w = [
            weather("2025-01-03 08:00", 1.0),
            weather("2025-01-03 08:00", 1.5),
            weather("2025-01-03 09:00", 2.0),
        ];
        let stats = delay_stats_by_timestamp(&[traffic("2025-01-03 08:00", 4), traffic("2025-01-03 08:00", 6)]);

        let frame = regression_frame(&w, &stats, Metric::Mean).unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.target, vec![Some(5.0), Some(5.0)]);
        assert_eq!(frame.covariates[1][0], Some(1.5));

        let counts = regression_frame(&w, &stats, Metric::Count).unwrap();
        assert_eq!(counts.target, vec![Some(2.0), Some(2.0)]);
    }

    #[test]
    fn test_regression_frame_rejects_duplicate_stats() {
        let w = [weather("2025-01-03 08:00", 1.0)];
        let mut stats = delay_stats_by_timestamp(&[traffic("2025-01-03 08:00", 4)]);
        stats.push(stats[0].clone());

        assert!(matches!(
            regression_frame(&w, &stats, Metric::Mean),
            Err(Error::JoinCardinality { .. })
        ));
    }
}
