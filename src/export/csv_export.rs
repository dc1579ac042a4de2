//! CSV export functionality

use std::path::Path;

use csv::Writer;

use super::ExportableProgress;
use crate::CommandError;

/// Write progress rows to CSV format
pub fn write_progress_csv(rows: &[ExportableProgress], path: &Path) -> Result<(), CommandError> {
    let file = std::fs::File::create(path)
        .map_err(|e| CommandError::Internal(format!("Failed to create CSV file: {}", e)))?;

    let mut writer = Writer::from_writer(file);

    // Headers come from the first serialized record
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| CommandError::Internal(format!("Failed to write CSV record: {}", e)))?;
    }

    writer
        .flush()
        .map_err(|e| CommandError::Internal(format!("Failed to flush CSV: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trends::tests::entry;
    use std::fs;

    #[test]
    fn test_write_progress_csv() {
        let path = std::env::temp_dir().join(format!("test_progress_{}.csv", std::process::id()));

        let mut first = entry("2026-03-01", "Shoulder Press", 3725, 80.0);
        first.feedback = vec!["Raise your arm higher".to_string()];
        let rows = vec![
            ExportableProgress::from(&first),
            ExportableProgress::from(&entry("2026-03-02", "Knee Raises", 45, 100.0)),
        ];
        write_progress_csv(&rows, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,date,exercise_name"));
        assert!(content.contains("Shoulder Press"));
        assert!(content.contains("1h 2m 5s"));
        assert!(content.contains("Raise your arm higher"));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_write_empty_csv() {
        let path = std::env::temp_dir().join(format!("test_progress_empty_{}.csv", std::process::id()));
        write_progress_csv(&[], &path).unwrap();

        assert!(fs::read_to_string(&path).unwrap().is_empty());
        fs::remove_file(&path).ok();
    }
}
