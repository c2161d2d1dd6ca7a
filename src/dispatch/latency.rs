use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::device::Category;

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    total_us: u64,
    count: u64,
}

/// Running latency sums per event category.
///
/// Owned by the dispatcher; only its `Running` state records into it.
#[derive(Debug, Clone)]
pub struct LatencyAggregator {
    started_at: DateTime<Local>,
    accumulators: BTreeMap<Category, Accumulator>,
    dropped_sends: u64,
}

impl Default for LatencyAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyAggregator {
    pub fn new() -> Self {
        Self {
            started_at: Local::now(),
            accumulators: Category::ALL
                .into_iter()
                .map(|category| (category, Accumulator::default()))
                .collect(),
            dropped_sends: 0,
        }
    }

    pub fn record(&mut self, category: Category, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.record_micros(category, micros);
    }

    pub fn record_micros(&mut self, category: Category, micros: u64) {
        let accumulator = self.accumulators.entry(category).or_default();
        accumulator.total_us = accumulator.total_us.saturating_add(micros);
        accumulator.count += 1;
    }

    pub fn record_dropped_send(&mut self) {
        self.dropped_sends += 1;
    }

    pub fn count(&self, category: Category) -> u64 {
        self.accumulators
            .get(&category)
            .map(|acc| acc.count)
            .unwrap_or(0)
    }

    pub fn dropped_sends(&self) -> u64 {
        self.dropped_sends
    }

    pub fn summarize(&self) -> LatencyReport {
        let categories = self
            .accumulators
            .iter()
            .map(|(category, acc)| {
                let mean_us = if acc.count == 0 {
                    0.0
                } else {
                    acc.total_us as f64 / acc.count as f64
                };
                (
                    *category,
                    CategorySummary {
                        mean_us,
                        count: acc.count,
                    },
                )
            })
            .collect();

        LatencyReport {
            started_at: self.started_at,
            finished_at: Local::now(),
            categories,
            dropped_sends: self.dropped_sends,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategorySummary {
    pub mean_us: f64,
    pub count: u64,
}

/// Shutdown summary of one run
#[derive(Debug, Clone)]
pub struct LatencyReport {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub categories: BTreeMap<Category, CategorySummary>,
    pub dropped_sends: u64,
}

impl LatencyReport {
    pub fn get(&self, category: Category) -> CategorySummary {
        self.categories
            .get(&category)
            .copied()
            .unwrap_or(CategorySummary {
                mean_us: 0.0,
                count: 0,
            })
    }

    pub fn total_events(&self) -> u64 {
        self.categories.values().map(|summary| summary.count).sum()
    }
}

impl fmt::Display for LatencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Latency summary {} - {} ({} events, {} dropped sends)",
            self.started_at.format("%H:%M:%S.%3f"),
            self.finished_at.format("%H:%M:%S.%3f"),
            self.total_events(),
            self.dropped_sends
        )?;
        for (category, summary) in &self.categories {
            writeln!(
                f,
                "  {:<5} mean {:>10.2} us over {} events",
                category.to_string(),
                summary.mean_us,
                summary.count
            )?;
        }
        Ok(())
    }
}
