//! Float positions from CTS5 alert e-mails.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use platform_data::{read_alert, write_positions_csv};
use tracing::info;

/// Parse every alert and write one CSV row per alert, in argument order.
pub fn alerts_to_csv(alerts: &[PathBuf], output: &Path) -> Result<()> {
    let positions = alerts
        .iter()
        .map(|path| read_alert(path).with_context(|| format!("Failed to parse {}", path.display())))
        .collect::<Result<Vec<_>>>()?;
    write_positions_csv(output, &positions)?;
    info!(path = %output.display(), floats = positions.len(), "Wrote float positions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALERT: &str = "UTC=3D25-03-16 04:31:07\nLat=3D4907.500N Long=3D01624.000W\n";

    #[test]
    fn test_alerts_to_csv() {
        let dir = tempfile::tempdir().unwrap();
        let alert = dir.path().join("alert_6903012345_01.txt");
        std::fs::write(&alert, ALERT).unwrap();
        let output = dir.path().join("floats").join("float_positions.csv");

        alerts_to_csv(&[alert], &output).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("2025-03-16 04:31:07,"));
        assert!(lines[1].ends_with(",Float,6903012345"));
    }

    #[test]
    fn test_unparseable_alert_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let alert = dir.path().join("alert_6903012345_02.txt");
        std::fs::write(&alert, "no fix today").unwrap();

        let err = alerts_to_csv(&[alert], &dir.path().join("out.csv")).unwrap_err();
        assert!(err.to_string().contains("alert_6903012345_02.txt"));
    }
}
