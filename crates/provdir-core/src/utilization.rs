//! Per-period activity counters for a provider.
//!
//! A [`Utilization`] table is keyed by (period index, [`Metric`]). The simulation writes it;
//! exporters only read it, summing each metric column across every period.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Activity metrics tracked per provider and period
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Encounters,
    Procedures,
    Labs,
    Prescriptions,
}

impl Metric {
    /// All metrics, in the order their totals are reported
    pub const ALL: [Metric; 4] = [
        Metric::Encounters,
        Metric::Procedures,
        Metric::Labs,
        Metric::Prescriptions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Encounters => "encounters",
            Metric::Procedures => "procedures",
            Metric::Labs => "labs",
            Metric::Prescriptions => "prescriptions",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "encounters" => Ok(Metric::Encounters),
            "procedures" => Ok(Metric::Procedures),
            "labs" => Ok(Metric::Labs),
            "prescriptions" => Ok(Metric::Prescriptions),
            _ => Err(CoreError::unknown_metric(s)),
        }
    }
}

/// Scalar totals of every metric column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilizationTotals {
    pub encounters: u64,
    pub procedures: u64,
    pub labs: u64,
    pub prescriptions: u64,
}

impl UtilizationTotals {
    pub fn get(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Encounters => self.encounters,
            Metric::Procedures => self.procedures,
            Metric::Labs => self.labs,
            Metric::Prescriptions => self.prescriptions,
        }
    }
}

/// Table of (period, metric) -> counter.
///
/// Serialized as `{ "<period>": { "<metric>": count } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Utilization {
    rows: BTreeMap<u32, BTreeMap<Metric, u64>>,
}

impl Utilization {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a single cell by one
    pub fn increment(&mut self, period: u32, metric: Metric) {
        self.add(period, metric, 1);
    }

    /// Add `count` to a cell, creating it when absent
    pub fn add(&mut self, period: u32, metric: Metric, count: u64) {
        let cell = self.rows.entry(period).or_default().entry(metric).or_insert(0);
        *cell = cell.saturating_add(count);
    }

    /// Overwrite a cell
    pub fn set(&mut self, period: u32, metric: Metric, count: u64) {
        self.rows.entry(period).or_default().insert(metric, count);
    }

    /// Builder-style variant of [`Utilization::set`]
    pub fn with(mut self, period: u32, metric: Metric, count: u64) -> Self {
        self.set(period, metric, count);
        self
    }

    /// Counter for a cell; absent cells read as zero
    pub fn get(&self, period: u32, metric: Metric) -> u64 {
        self.rows
            .get(&period)
            .and_then(|row| row.get(&metric))
            .copied()
            .unwrap_or(0)
    }

    /// Every populated (period, count) pair of one metric column, in period order
    pub fn column(&self, metric: Metric) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.rows
            .iter()
            .filter_map(move |(period, row)| row.get(&metric).map(|count| (*period, *count)))
    }

    /// Sum of a metric column across all periods
    pub fn total(&self, metric: Metric) -> u64 {
        self.column(metric)
            .fold(0u64, |acc, (_, count)| acc.saturating_add(count))
    }

    pub fn totals(&self) -> UtilizationTotals {
        UtilizationTotals {
            encounters: self.total(Metric::Encounters),
            procedures: self.total(Metric::Procedures),
            labs: self.total(Metric::Labs),
            prescriptions: self.total(Metric::Prescriptions),
        }
    }

    /// Sorted distinct period keys
    pub fn periods(&self) -> Vec<u32> {
        self.rows.keys().copied().collect()
    }
}
