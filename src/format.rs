//! Formatting helpers for human-readable byte sizes, durations and summaries.

use std::time::Duration;

use crate::stats::RunSummary;

/// Formats a byte count as a human-readable string (B, KB, MB, GB).
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [(u64, &str); 3] = [(1 << 30, "GB"), (1 << 20, "MB"), (1 << 10, "KB")];

    UNITS
        .iter()
        .find(|(size, _)| bytes >= *size)
        .map_or_else(
            || format!("{bytes} B"),
            |(size, unit)| format!("{:.2} {unit}", bytes as f64 / *size as f64),
        )
}

/// Formats a duration as a human-readable string (e.g. "5.0s", "1m 05s", "1h 01m 05s").
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match secs {
        3600.. => format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60),
        60.. => format!("{}m {:02}s", secs / 60, secs % 60),
        _ => format!("{}.{:01}s", secs, d.subsec_millis() / 100),
    }
}

/// One-line summary of a backup run.
#[must_use]
pub fn format_summary(summary: &RunSummary) -> String {
    format!(
        "{} albums: {} downloaded ({} in {}, {}/s), {} already present, {} processing, {} invalid names, {} failed",
        summary.albums,
        summary.files_downloaded,
        format_bytes(summary.total_bytes),
        format_duration(summary.elapsed),
        format_bytes(summary.average_speed()),
        summary.files_present,
        summary.skipped_processing,
        summary.invalid_names,
        summary.failures,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1_048_576), "1.00 MB");
        assert_eq!(format_bytes(1_073_741_824), "1.00 GB");
    }

    #[test]
    fn format_duration_units() {
        assert_eq!(format_duration(Duration::ZERO), "0.0s");
        assert_eq!(format_duration(Duration::from_millis(500)), "0.5s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 05s");
        assert_eq!(format_duration(Duration::from_secs(3665)), "1h 01m 05s");
    }

    #[test]
    fn summary_line() {
        let summary = RunSummary {
            albums: 2,
            files_downloaded: 3,
            files_present: 1,
            skipped_processing: 1,
            total_bytes: 2048,
            elapsed: Duration::from_secs(2),
            ..RunSummary::default()
        };
        assert_eq!(
            format_summary(&summary),
            "2 albums: 3 downloaded (2.00 KB in 2.0s, 1.00 KB/s), 1 already present, 1 processing, 0 invalid names, 0 failed"
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn format_bytes_never_panics(bytes in 0u64..u64::MAX) {
                let _ = format_bytes(bytes);
            }

            #[test]
            fn format_duration_never_panics(millis in 0u64..1_000_000_000) {
                let _ = format_duration(Duration::from_millis(millis));
            }
        }
    }
}
