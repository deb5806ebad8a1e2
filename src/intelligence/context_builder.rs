// ABOUTME: Composes the metrics summary and conversation history into a bounded coach context
// ABOUTME: Drops older history first and whole summary domains by priority to honor the byte budget
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Context Builder
//!
//! The budget bounds the whole prompt sent upstream. Sizes are UTF-8 byte
//! lengths, counting every provider message rendered as `role: content\n`:
//! the system message (persona, blank line, summary block) and each retained
//! history message. [`CoachContext::serialized_size`] is measured on exactly
//! the list [`CoachContext::to_chat_messages`] returns.
//!
//! Truncation order:
//!
//! 1. Summary domains are dropped whole, least important first
//!    (health, strength, workout, training). With every domain gone the
//!    summary block becomes a short placeholder.
//! 2. When the newest message fits next to the smallest system message, it
//!    is always kept and domains are dropped to make room for it.
//! 3. History is appended newest-first until the next message would not fit.
//!
//! A budget too small for the persona plus the smallest summary block cannot
//! be honored and is rejected as a configuration error.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use pierre_core::models::MetricDomain;
use pierre_intelligence::{DomainSummary, MetricsSummary};
use serde::Serialize;

use crate::errors::{AppError, AppResult};
use crate::llm::prompts::{COACH_SYSTEM_PROMPT, EMPTY_SUMMARY_NOTE, SUMMARY_HEADING};
use crate::llm::ChatMessage;

/// Bounded prompt context for one coaching request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoachContext {
    user_id: String,
    #[serde(skip)]
    system_prompt: String,
    summary: MetricsSummary,
    conversation_history: Vec<ChatMessage>,
    budget: usize,
    budget_remaining: usize,
    history_truncated: bool,
    summary_truncated: bool,
    dropped_domains: Vec<MetricDomain>,
}

impl CoachContext {
    /// Build a context for the coach persona whose prompt never exceeds `budget`
    ///
    /// `history` is in chronological order (oldest first). Inputs are not
    /// modified.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `budget` cannot hold the persona
    /// and the smallest summary block.
    pub fn build(
        user_id: impl Into<String>,
        summary: &MetricsSummary,
        history: &[ChatMessage],
        budget: usize,
    ) -> AppResult<Self> {
        Self::build_with_system_prompt(COACH_SYSTEM_PROMPT, user_id, summary, history, budget)
    }

    /// Build a context around an explicit system prompt
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `budget` cannot hold
    /// `system_prompt` and the smallest summary block.
    pub fn build_with_system_prompt(
        system_prompt: &str,
        user_id: impl Into<String>,
        summary: &MetricsSummary,
        history: &[ChatMessage],
        budget: usize,
    ) -> AppResult<Self> {
        // System message size after each successive domain drop
        let mut kept: BTreeSet<MetricDomain> = summary.iter().map(|(domain, _)| domain).collect();
        let mut steps = vec![(Vec::new(), system_message_size(system_prompt, summary, &kept))];
        for domain in MetricDomain::PRIORITY.iter().rev() {
            if kept.remove(domain) {
                let mut dropped = steps
                    .last()
                    .map(|(dropped, _)| dropped.clone())
                    .unwrap_or_default();
                dropped.push(*domain);
                steps.push((dropped, system_message_size(system_prompt, summary, &kept)));
            }
        }

        let smallest = steps.iter().map(|(_, size)| *size).min().unwrap_or(0);
        if smallest > budget {
            return Err(AppError::config(format!(
                "context budget of {budget} bytes cannot hold the system prompt and summary ({smallest} bytes)"
            )));
        }

        let target = match history.last().map(rendered_message_size) {
            Some(newest) if smallest + newest <= budget => budget - newest,
            _ => budget,
        };
        let Some((dropped_domains, system_size)) =
            steps.into_iter().find(|(_, size)| *size <= target)
        else {
            return Err(AppError::internal("no summary fits the context budget"));
        };

        let mut remaining = budget - system_size;
        let mut retained = 0;
        for message in history.iter().rev() {
            let size = rendered_message_size(message);
            if size > remaining {
                break;
            }
            remaining -= size;
            retained += 1;
        }

        let keep: BTreeSet<MetricDomain> = summary
            .iter()
            .map(|(domain, _)| domain)
            .filter(|domain| !dropped_domains.contains(domain))
            .collect();

        Ok(Self {
            user_id: user_id.into(),
            system_prompt: system_prompt.to_owned(),
            summary: summary.restricted_to(&keep),
            conversation_history: history[history.len() - retained..].to_vec(),
            budget,
            budget_remaining: remaining,
            history_truncated: retained < history.len(),
            summary_truncated: !dropped_domains.is_empty(),
            dropped_domains,
        })
    }

    /// Smallest budget that holds `system_prompt` with an empty summary block
    ///
    /// Any budget at least this large builds successfully for every summary.
    #[must_use]
    pub fn minimum_budget(system_prompt: &str) -> usize {
        rendered_message_size(&system_message(system_prompt, ""))
    }

    /// User this context belongs to
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Summary restricted to the domains that fit
    #[must_use]
    pub const fn summary(&self) -> &MetricsSummary {
        &self.summary
    }

    /// Retained history in chronological order
    #[must_use]
    pub fn conversation_history(&self) -> &[ChatMessage] {
        &self.conversation_history
    }

    /// Configured budget in bytes
    #[must_use]
    pub const fn budget(&self) -> usize {
        self.budget
    }

    /// Unused budget in bytes
    #[must_use]
    pub const fn budget_remaining(&self) -> usize {
        self.budget_remaining
    }

    /// Whether older messages were dropped
    #[must_use]
    pub const fn history_truncated(&self) -> bool {
        self.history_truncated
    }

    /// Whether summary domains were dropped
    #[must_use]
    pub const fn summary_truncated(&self) -> bool {
        self.summary_truncated
    }

    /// Dropped domains, in the order they were dropped
    #[must_use]
    pub fn dropped_domains(&self) -> &[MetricDomain] {
        &self.dropped_domains
    }

    /// Compact text form of the retained summary, one line per domain
    #[must_use]
    pub fn render_summary(&self) -> String {
        render_lines(&self.summary, |_| true)
    }

    /// Size in bytes of the full prompt returned by [`Self::to_chat_messages`]
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        self.to_chat_messages()
            .iter()
            .map(rendered_message_size)
            .sum()
    }

    /// Provider message list: one system message, then history in order
    #[must_use]
    pub fn to_chat_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.conversation_history.len() + 1);
        messages.push(system_message(&self.system_prompt, &self.render_summary()));
        messages.extend(self.conversation_history.iter().cloned());
        messages
    }
}

/// System message: persona, a blank line, then the summary block
fn system_message(system_prompt: &str, summary_lines: &str) -> ChatMessage {
    let summary_block = if summary_lines.is_empty() {
        EMPTY_SUMMARY_NOTE.to_owned()
    } else {
        format!("{SUMMARY_HEADING}\n{summary_lines}")
    };
    ChatMessage::system(format!(
        "{}\n\n{}",
        system_prompt.trim_end(),
        summary_block.trim_end()
    ))
}

fn system_message_size(
    system_prompt: &str,
    summary: &MetricsSummary,
    keep: &BTreeSet<MetricDomain>,
) -> usize {
    let lines = render_lines(summary, |domain| keep.contains(&domain));
    rendered_message_size(&system_message(system_prompt, &lines))
}

fn render_lines(summary: &MetricsSummary, keep: impl Fn(MetricDomain) -> bool) -> String {
    summary
        .iter()
        .filter(|(domain, _)| keep(*domain))
        .map(|(domain, stats)| render_domain_line(domain, stats))
        .collect()
}

/// One summary line, newline-terminated
fn render_domain_line(domain: MetricDomain, stats: &DomainSummary) -> String {
    let mut line = format!("[{domain}]");

    if stats.has_data() {
        let unit = stats.unit.as_deref().unwrap_or("");
        // write! into a String cannot fail
        let _ = write!(
            line,
            " {metric} n={count} mean={mean} min={min} max={max} last={last} {unit} trend=",
            metric = stats.metric.as_deref().unwrap_or("value"),
            count = stats.count,
            mean = format_stat(stats.mean),
            min = format_stat(stats.min),
            max = format_stat(stats.max),
            last = format_stat(stats.last_value),
        );
        match stats.trend_slope {
            Some(slope) => {
                let _ = write!(line, "{slope:+.2}/day");
            }
            None => line.push_str("n/a"),
        }
    } else {
        line.push_str(" no data");
    }

    if stats.invalid_count > 0 {
        let _ = write!(line, " ({} invalid)", stats.invalid_count);
    }
    line.push('\n');
    line
}

fn format_stat(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_owned(), |v| format!("{v:.2}"))
}

/// Bytes taken by one provider message rendered as `role: content\n`
fn rendered_message_size(message: &ChatMessage) -> usize {
    message.role.as_str().len() + 2 + message.content.len() + 1
}
