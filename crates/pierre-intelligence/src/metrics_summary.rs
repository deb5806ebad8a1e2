// ABOUTME: Reduces raw per-domain fitness records into a compact statistical summary
// ABOUTME: Computes count, mean, min, max, trend slope, and last value per metric domain
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::cast_precision_loss)] // Safe: sample counts are far below 2^52

//! # Metrics Aggregator
//!
//! [`summarize`] is a pure function: identical input records produce a
//! bit-identical [`MetricsSummary`]. Summaries are recomputed on every coach
//! request and never cached, because records can change between calls.
//!
//! Statistics that cannot be computed are `None` rather than zero, so a
//! domain without data is distinguishable from a domain whose values are all
//! zero, and "no trend" is distinguishable from a flat trend.

use std::collections::{BTreeMap, BTreeSet};

use pierre_core::models::{MetricDomain, MetricRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::statistical_analysis::{StatisticalAnalyzer, TrendDataPoint};

/// Aggregate statistics for one metric domain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainSummary {
    /// Number of records with a usable value
    pub count: usize,
    /// Number of records whose value was missing or non-finite
    pub invalid_count: usize,
    /// Arithmetic mean of valid values
    pub mean: Option<f64>,
    /// Smallest valid value
    pub min: Option<f64>,
    /// Largest valid value
    pub max: Option<f64>,
    /// Regression slope in value units per day (undefined below two points)
    pub trend_slope: Option<f64>,
    /// Value of the most recent valid record
    pub last_value: Option<f64>,
    /// Metric name of the most recent valid record
    pub metric: Option<String>,
    /// Unit of the most recent valid record
    pub unit: Option<String>,
}

impl DomainSummary {
    /// Whether any statistic is defined
    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.count > 0
    }
}

/// Per-domain statistics derived from one request's records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    domains: BTreeMap<MetricDomain, DomainSummary>,
}

impl MetricsSummary {
    /// Statistics for one domain, if it was requested
    #[must_use]
    pub fn get(&self, domain: MetricDomain) -> Option<&DomainSummary> {
        self.domains.get(&domain)
    }

    /// Iterate domains in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (MetricDomain, &DomainSummary)> {
        self.domains.iter().map(|(domain, summary)| (*domain, summary))
    }

    /// Requested domains in canonical order
    #[must_use]
    pub fn domains(&self) -> Vec<MetricDomain> {
        self.domains.keys().copied().collect()
    }

    /// Number of domains in the summary
    #[must_use]
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Whether the summary covers no domain at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// A new summary keeping only the given domains
    #[must_use]
    pub fn restricted_to(&self, keep: &BTreeSet<MetricDomain>) -> Self {
        Self {
            domains: self
                .domains
                .iter()
                .filter(|(domain, _)| keep.contains(domain))
                .map(|(domain, summary)| (*domain, summary.clone()))
                .collect(),
        }
    }
}

/// Summarize records for the requested domains
///
/// Records outside `domains` are ignored. Every requested domain gets an
/// entry, even when it has no records.
#[must_use]
pub fn summarize(records: &[MetricRecord], domains: &BTreeSet<MetricDomain>) -> MetricsSummary {
    let mut grouped: BTreeMap<MetricDomain, Vec<&MetricRecord>> =
        domains.iter().map(|domain| (*domain, Vec::new())).collect();

    for record in records {
        if let Some(bucket) = grouped.get_mut(&record.domain) {
            bucket.push(record);
        }
    }

    let summary = MetricsSummary {
        domains: grouped
            .into_iter()
            .map(|(domain, bucket)| (domain, summarize_domain(bucket)))
            .collect(),
    };

    debug!(
        domains = summary.len(),
        records = records.len(),
        "Computed metrics summary"
    );

    summary
}

fn summarize_domain(mut records: Vec<&MetricRecord>) -> DomainSummary {
    // Stable sort keeps input order for equal timestamps
    records.sort_by_key(|record| record.timestamp);

    let mut valid: Vec<(&MetricRecord, f64)> = Vec::with_capacity(records.len());
    let mut invalid_count = 0;
    for record in records {
        match record.valid_value() {
            Some(value) => valid.push((record, value)),
            None => invalid_count += 1,
        }
    }

    let Some((last_record, last_value)) = valid.last().copied() else {
        return DomainSummary {
            invalid_count,
            ..DomainSummary::default()
        };
    };

    let values: Vec<f64> = valid.iter().map(|(_, value)| *value).collect();
    let count = values.len();
    let mean = StatisticalAnalyzer::mean(&values);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let points: Vec<TrendDataPoint> = valid
        .iter()
        .map(|(record, value)| TrendDataPoint {
            date: record.timestamp,
            value: *value,
        })
        .collect();
    let trend_slope = StatisticalAnalyzer::linear_regression(&points)
        .ok()
        .map(|regression| regression.slope)
        .filter(|slope| slope.is_finite());

    DomainSummary {
        count,
        invalid_count,
        mean,
        min: Some(min),
        max: Some(max),
        trend_slope,
        last_value: Some(last_value),
        metric: Some(last_record.metric.clone()),
        unit: Some(last_record.unit.clone()),
    }
}
