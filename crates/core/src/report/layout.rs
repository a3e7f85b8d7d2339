//! Document content for a snapshot report, independent of output format.

use crate::history::SnapshotDetail;

use super::REPORT_ROW_LIMIT;

pub const SUMMARY_HEADER: [&str; 2] = ["Metric", "Value"];
pub const DETAIL_HEADER: [&str; 4] = ["ID", "Name", "Type", "Pressure"];

/// Everything a report shows, already formatted as text.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub title: String,
    pub date_line: String,
    pub summary: Vec<[String; 2]>,
    pub detail: Vec<[String; 4]>,
    /// Stored rows left out of the detail table.
    pub omitted_rows: usize,
}

/// Two decimal places; an absent value prints as zero.
pub fn format_measure(value: Option<f64>) -> String {
    let value = value.filter(|v| v.is_finite()).unwrap_or(0.0);
    // Avoid printing "-0.00".
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        "0.00".to_string()
    } else {
        format!("{value:.2}")
    }
}

impl ReportLayout {
    pub fn build(detail: &SnapshotDetail) -> Self {
        let snapshot = &detail.snapshot;

        let summary = vec![
            ["Total Records".to_string(), snapshot.total_records.to_string()],
            ["Avg Flowrate".to_string(), format_measure(snapshot.avg_flowrate)],
            ["Avg Pressure".to_string(), format_measure(snapshot.avg_pressure)],
            ["Avg Temperature".to_string(), format_measure(snapshot.avg_temperature)],
        ];

        let detail_rows = detail
            .rows
            .iter()
            .take(REPORT_ROW_LIMIT)
            .map(|row| {
                [
                    row.equipment_id.clone(),
                    row.name.clone(),
                    row.equipment_type.clone(),
                    format_measure(Some(row.pressure)),
                ]
            })
            .collect();

        Self {
            title: snapshot.file_name.clone(),
            date_line: format!(
                "Uploaded: {}",
                snapshot.created_at.format("%Y-%m-%d %H:%M UTC")
            ),
            summary,
            detail: detail_rows,
            omitted_rows: detail.rows.len().saturating_sub(REPORT_ROW_LIMIT),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::history::{EquipmentRow, UploadSnapshot};

    fn detail_with_rows(n: usize) -> SnapshotDetail {
        let rows = (0..n)
            .map(|i| EquipmentRow {
                id: i as i64 + 1,
                snapshot_id: 9,
                position: i as i32,
                equipment_id: format!("R-{i}"),
                name: format!("Unit {i}"),
                equipment_type: "Pump".into(),
                flowrate: 1.0,
                pressure: i as f64 * 0.5,
                temperature: 20.0,
            })
            .collect();
        SnapshotDetail {
            snapshot: UploadSnapshot {
                id: 9,
                owner_id: 1,
                file_name: "plant.csv".into(),
                created_at: Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap(),
                total_records: n as i64,
                avg_flowrate: Some(1.0),
                avg_pressure: None,
                avg_temperature: Some(20.456),
            },
            rows,
        }
    }

    #[test]
    fn summary_formats_two_decimals_and_absent_as_zero() {
        let layout = ReportLayout::build(&detail_with_rows(3));
        assert_eq!(layout.title, "plant.csv");
        assert_eq!(layout.date_line, "Uploaded: 2026-03-04 05:06 UTC");
        assert_eq!(layout.summary[0], ["Total Records".to_string(), "3".to_string()]);
        assert_eq!(layout.summary[1][1], "1.00");
        assert_eq!(layout.summary[2][1], "0.00");
        assert_eq!(layout.summary[3][1], "20.46");
    }

    #[test]
    fn detail_is_capped_at_fifty_in_stored_order() {
        let layout = ReportLayout::build(&detail_with_rows(60));
        assert_eq!(layout.detail.len(), 50);
        assert_eq!(layout.omitted_rows, 10);
        let ids: Vec<_> = layout.detail.iter().map(|r| r[0].clone()).collect();
        let expected: Vec<_> = (0..50).map(|i| format!("R-{i}")).collect();
        assert_eq!(ids, expected);
        assert_eq!(layout.detail[3][3], "1.50");
    }

    #[test]
    fn small_snapshot_has_no_omitted_rows() {
        let layout = ReportLayout::build(&detail_with_rows(0));
        assert!(layout.detail.is_empty());
        assert_eq!(layout.omitted_rows, 0);
    }

    #[test]
    fn negative_zero_prints_as_zero() {
        assert_eq!(format_measure(Some(-0.001)), "0.00");
        assert_eq!(format_measure(Some(-1.234)), "-1.23");
        assert_eq!(format_measure(Some(f64::NAN)), "0.00");
    }
}
