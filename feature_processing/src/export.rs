use log::info;
use std::io::Write;
use std::path::Path;

use crate::error::FeatureError;
use crate::misc::FeatureRow;

/// Writes feature rows as CSV, one column per schema name.
pub fn export_feature_rows<W: Write>(rows: &[FeatureRow], writer: W) -> Result<(), FeatureError> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_to_path(rows: &[FeatureRow], path: &Path) -> Result<(), FeatureError> {
    let file = std::fs::File::create(path)?;
    export_feature_rows(rows, file)?;
    info!("Exported {} feature rows to {:?}", rows.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::misc::FeatureName;
    use chrono::NaiveDate;

    fn row() -> FeatureRow {
        FeatureRow {
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 42,
            ma_5: 1.1,
            ma_10: 1.2,
            ma_20: 1.3,
            ma_50: 1.4,
            rsi: 55.0,
            bb_middle: 1.3,
            bb_upper: 1.6,
            bb_lower: 1.0,
            high_low_pct: 100.0,
            price_change: 0.01,
            volume_change: -0.2,
            close_lag_1: 1.4,
            volume_lag_1: 40.0,
            close_lag_2: 1.3,
            volume_lag_2: 41.0,
            close_lag_3: 1.2,
            volume_lag_3: 39.0,
            close_lag_5: 1.0,
            volume_lag_5: 38.0,
        }
    }

    #[test]
    fn header_uses_schema_names() {
        let mut out = Vec::new();
        export_feature_rows(&[row()], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        let header: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(header[0], "Date");
        let expected: Vec<&str> = FeatureName::ALL.iter().map(|n| n.as_str()).collect();
        assert_eq!(header[1..], expected[..]);

        let first = lines.next().unwrap();
        assert!(first.starts_with("2024-02-01,1.0,2.0,0.5,1.5,42,"));
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        export_to_path(&[row(), row()], &path).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }
}
