// ABOUTME: Statistical analysis engine for fitness trend calculations
// ABOUTME: Implements least-squares linear regression over timestamped samples
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::cast_precision_loss)] // Safe: statistical calculations with controlled ranges

use chrono::{DateTime, Utc};
use pierre_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Milliseconds in one day, the x-axis unit for trend slopes
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A single timestamped sample used for trend analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendDataPoint {
    /// Sample timestamp
    pub date: DateTime<Utc>,
    /// Sample value
    pub value: f64,
}

/// Linear regression analysis results
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Slope of the regression line in value units per day
    pub slope: f64,
    /// Y-intercept at the first sample's timestamp
    pub intercept: f64,
    /// Coefficient of determination (goodness of fit, 0-1)
    pub r_squared: f64,
}

/// Statistical analyzer for metric trends
pub struct StatisticalAnalyzer;

impl StatisticalAnalyzer {
    /// Arithmetic mean, `None` for an empty slice
    ///
    /// Accumulated as a running mean so large finite samples cannot overflow
    /// an intermediate sum.
    #[must_use]
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let mut mean = 0.0;
        for (i, value) in values.iter().enumerate() {
            mean += (value - mean) / (i + 1) as f64;
        }
        Some(mean)
    }

    /// Least-squares regression of value against elapsed days
    ///
    /// Points must already be sorted ascending by date. The x-axis is elapsed
    /// days since the first point so the slope reads as "change per day".
    ///
    /// # Errors
    ///
    /// Returns an error with fewer than 2 points, or when every point shares
    /// the same timestamp (zero variance in x).
    pub fn linear_regression(data_points: &[TrendDataPoint]) -> AppResult<RegressionResult> {
        let Some(first) = data_points.first() else {
            return Err(AppError::invalid_input(
                "Insufficient data points for regression: need at least 2, got 0",
            ));
        };
        if data_points.len() < 2 {
            return Err(AppError::invalid_input(format!(
                "Insufficient data points for regression: need at least 2, got {}",
                data_points.len()
            )));
        }

        let origin = first.date;
        let x_values: Vec<f64> = data_points
            .iter()
            .map(|p| (p.date - origin).num_milliseconds() as f64 / MILLIS_PER_DAY)
            .collect();
        let y_values: Vec<f64> = data_points.iter().map(|p| p.value).collect();

        let mean_x = Self::mean(&x_values).unwrap_or_default();
        let mean_y = Self::mean(&y_values).unwrap_or_default();

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        let mut syy = 0.0;
        for (x, y) in x_values.iter().zip(&y_values) {
            let dx = x - mean_x;
            let dy = y - mean_y;
            sxx = dx.mul_add(dx, sxx);
            sxy = dx.mul_add(dy, sxy);
            syy = dy.mul_add(dy, syy);
        }

        // Any spread in timestamps, even milliseconds, yields a slope
        if sxx <= 0.0 {
            return Err(AppError::invalid_input(
                "Cannot calculate regression: zero variance in x",
            ));
        }

        let slope = sxy / sxx;
        let intercept = slope.mul_add(-mean_x, mean_y);
        let r_squared = if syy <= 0.0 {
            // Flat series: the line explains everything there is to explain
            1.0
        } else {
            (sxy * sxy) / (sxx * syy)
        };

        Ok(RegressionResult {
            slope,
            intercept,
            r_squared,
        })
    }
}
