// ABOUTME: Fitness metrics aggregation engine for the coaching context pipeline
// ABOUTME: Summarizes per-domain records with descriptive statistics and trend regression
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Intelligence
//!
//! Pure, deterministic reductions over fitness records. Nothing in this crate
//! performs I/O or reads the clock; callers pass records in and get a summary
//! out.

/// Descriptive statistics and trend summaries per metric domain
pub mod metrics_summary;

/// Linear regression over timestamped samples
pub mod statistical_analysis;

pub use metrics_summary::{summarize, DomainSummary, MetricsSummary};
pub use statistical_analysis::{RegressionResult, StatisticalAnalyzer, TrendDataPoint};
