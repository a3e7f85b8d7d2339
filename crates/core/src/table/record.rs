//! Typed equipment records built from raw rows.
//!
//! Missing text fields fall back to the documented defaults. Numeric cells
//! that are empty or not a finite number are coerced: the stored value is
//! [`DEFAULT_NUMERIC`] and the reading counts as absent for aggregation. Each
//! coercion of a non-empty cell is recorded as a [`FieldIssue`].

use serde::Serialize;

use super::{
    synthesized_equipment_id, RawRow, COL_EQUIPMENT_ID, COL_EQUIPMENT_NAME, COL_FLOWRATE,
    COL_PRESSURE, COL_TEMPERATURE, COL_TYPE, DEFAULT_NAME, DEFAULT_NUMERIC, DEFAULT_TYPE,
};

/// The three numeric measurement columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Flowrate,
    Pressure,
    Temperature,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Flowrate, Metric::Pressure, Metric::Temperature];

    /// Normalized column name for this metric.
    pub fn column(self) -> &'static str {
        match self {
            Self::Flowrate => COL_FLOWRATE,
            Self::Pressure => COL_PRESSURE,
            Self::Temperature => COL_TEMPERATURE,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Set of metrics, used to record which measurement columns a header has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricSet([bool; 3]);

impl MetricSet {
    pub fn all() -> Self {
        Self([true; 3])
    }

    pub fn from_fn(mut f: impl FnMut(Metric) -> bool) -> Self {
        let mut set = Self::default();
        for metric in Metric::ALL {
            set.0[metric.slot()] = f(metric);
        }
        set
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.0[metric.slot()]
    }
}

/// A numeric cell that could not be read and was coerced to the default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub row_index: usize,
    pub column: &'static str,
    pub value: String,
}

/// One typed row with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentRecord {
    pub index: usize,
    pub equipment_id: String,
    pub name: String,
    pub equipment_type: String,
    readings: [Option<f64>; 3],
    pub issues: Vec<FieldIssue>,
}

impl EquipmentRecord {
    /// Apply the tolerance policy to a raw row.
    pub fn from_raw(row: &RawRow) -> Self {
        let text = |column: &str| {
            row.get(column)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let mut issues = Vec::new();
        let mut readings = [None; 3];
        for metric in Metric::ALL {
            let Some(raw) = row.get(metric.column()).map(str::trim) else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }
            match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => readings[metric.slot()] = Some(v),
                _ => issues.push(FieldIssue {
                    row_index: row.index,
                    column: metric.column(),
                    value: raw.to_string(),
                }),
            }
        }

        Self {
            index: row.index,
            equipment_id: text(COL_EQUIPMENT_ID)
                .unwrap_or_else(|| synthesized_equipment_id(row.index)),
            name: text(COL_EQUIPMENT_NAME).unwrap_or_else(|| DEFAULT_NAME.to_string()),
            equipment_type: text(COL_TYPE).unwrap_or_else(|| DEFAULT_TYPE.to_string()),
            readings,
            issues,
        }
    }

    /// The value read from the source, if the cell held a finite number.
    pub fn reading(&self, metric: Metric) -> Option<f64> {
        self.readings[metric.slot()]
    }

    /// The value persisted for this row: the reading or [`DEFAULT_NUMERIC`].
    pub fn stored_value(&self, metric: Metric) -> f64 {
        self.reading(metric).unwrap_or(DEFAULT_NUMERIC)
    }
}
