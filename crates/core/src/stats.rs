//! Summary statistics over parsed equipment rows.
//!
//! Means are unweighted averages over the rows whose cell held a finite
//! number. A mean is absent when its column is missing from the header or
//! when no row contributed a value; it is never NaN.

use std::collections::HashMap;

use serde::Serialize;

use crate::history::EquipmentRow;
use crate::table::{EquipmentRecord, Metric, MetricSet};

/// Aggregate figures for one upload.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Summary {
    /// Number of rows, including rows whose fields were defaulted.
    pub count: i64,
    pub mean_flowrate: Option<f64>,
    pub mean_pressure: Option<f64>,
    pub mean_temperature: Option<f64>,
}

impl Summary {
    pub fn mean(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Flowrate => self.mean_flowrate,
            Metric::Pressure => self.mean_pressure,
            Metric::Temperature => self.mean_temperature,
        }
    }
}

/// Incremental mean; never forms the full sum, so large finite readings
/// cannot overflow it.
#[derive(Debug, Clone, Copy, Default)]
struct RunningMean {
    mean: f64,
    n: u64,
}

impl RunningMean {
    fn push(&mut self, value: f64) {
        self.n += 1;
        self.mean += (value - self.mean) / self.n as f64;
    }

    fn mean(&self) -> Option<f64> {
        if self.n == 0 {
            return None;
        }
        self.mean.is_finite().then_some(self.mean)
    }
}

/// Incremental aggregator, fed one record at a time so the row stream is
/// consumed in a single pass.
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    present: MetricSet,
    count: i64,
    means: [RunningMean; 3],
}

impl StatsAggregator {
    /// `present` lists the measurement columns found in the header.
    pub fn new(present: MetricSet) -> Self {
        Self {
            present,
            count: 0,
            means: [RunningMean::default(); 3],
        }
    }

    pub fn observe(&mut self, record: &EquipmentRecord) {
        self.count += 1;
        for (slot, metric) in Metric::ALL.into_iter().enumerate() {
            if !self.present.contains(metric) {
                continue;
            }
            if let Some(value) = record.reading(metric) {
                self.means[slot].push(value);
            }
        }
    }

    pub fn finish(self) -> Summary {
        let mean = |slot: usize, metric: Metric| {
            if self.present.contains(metric) {
                self.means[slot].mean()
            } else {
                None
            }
        };
        Summary {
            count: self.count,
            mean_flowrate: mean(0, Metric::Flowrate),
            mean_pressure: mean(1, Metric::Pressure),
            mean_temperature: mean(2, Metric::Temperature),
        }
    }
}

/// Aggregate a complete set of records.
pub fn aggregate<I>(present: MetricSet, records: I) -> Summary
where
    I: IntoIterator,
    I::Item: std::borrow::Borrow<EquipmentRecord>,
{
    use std::borrow::Borrow;

    let mut aggregator = StatsAggregator::new(present);
    for record in records {
        aggregator.observe(record.borrow());
    }
    aggregator.finish()
}

// ---------------------------------------------------------------------------
// Type distribution
// ---------------------------------------------------------------------------

/// Number of stored rows per equipment type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub equipment_type: String,
    pub count: i64,
}

/// Count rows per type, ordered by count descending then type name.
pub fn type_distribution(rows: &[EquipmentRow]) -> Vec<TypeCount> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for row in rows {
        *counts.entry(row.equipment_type.as_str()).or_insert(0) += 1;
    }

    let mut distribution: Vec<TypeCount> = counts
        .into_iter()
        .map(|(t, count)| TypeCount {
            equipment_type: t.to_string(),
            count,
        })
        .collect();
    distribution.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.equipment_type.cmp(&b.equipment_type))
    });
    distribution
}
