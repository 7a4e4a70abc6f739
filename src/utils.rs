//! # Utility Functions
//!
//! Formatting for console output, validation of user-supplied parameters,
//! identifiers for runs and reports, and small table helpers.
//!
//! ## Usage Examples
//!
//! ```rust
//! use diet_api_bench::utils::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! assert_eq!(format_latency_ms(0.25), "250.0μs");
//! assert_eq!(format_request_rate(1500.0), "1.50K req/s");
//!
//! validate_concurrency(10)?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use std::time::Duration;
use uuid::Uuid;

/// Format of run identifiers, e.g. `20260102_164318`.
///
/// Lexicographic order of identifiers in this format is chronological order.
pub const RUN_ID_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Run identifier for a run starting now, in local time
pub fn generate_run_id() -> String {
    chrono::Local::now().format(RUN_ID_FORMAT).to_string()
}

/// Unique identifier for a written report
pub fn generate_report_id() -> String {
    Uuid::new_v4().to_string()
}

/// Format a millisecond latency with an adaptive unit
///
/// Latencies are stored in milliseconds throughout the crate; this picks a
/// unit that keeps the number readable in the summary tables.
///
/// ## Parameters
/// - `ms`: Latency in milliseconds
///
/// ## Unit Selection
///
/// - **Microseconds**: below 1ms, one decimal (e.g., "250.0μs")
/// - **Milliseconds**: below 1s, two decimals (e.g., "12.50ms")
/// - **Seconds**: everything longer, two decimals (e.g., "2.50s")
///
/// ## Examples
///
/// ```rust
/// # use diet_api_bench::utils::format_latency_ms;
/// assert_eq!(format_latency_ms(0.25), "250.0μs");
/// assert_eq!(format_latency_ms(12.5), "12.50ms");
/// assert_eq!(format_latency_ms(2500.0), "2.50s");
/// ```
pub fn format_latency_ms(ms: f64) -> String {
    if ms < 1.0 {
        format!("{:.1}μs", ms * 1000.0)
    } else if ms < 1000.0 {
        format!("{:.2}ms", ms)
    } else {
        format!("{:.2}s", ms / 1000.0)
    }
}

/// Format a request rate for display
pub fn format_request_rate(requests_per_second: f64) -> String {
    if requests_per_second < 1000.0 {
        format!("{:.1} req/s", requests_per_second)
    } else if requests_per_second < 1_000_000.0 {
        format!("{:.2}K req/s", requests_per_second / 1000.0)
    } else {
        format!("{:.2}M req/s", requests_per_second / 1_000_000.0)
    }
}

/// Format a fraction in [0, 1] as a percentage with two decimals
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Format a duration for display
///
/// Used for the run banner, where durations come from the command line and
/// are rarely finer than milliseconds.
///
/// ## Parameters
/// - `duration`: The Duration to format
///
/// ## Returns
/// Whole milliseconds below one second, seconds with two decimals below one
/// minute, and `<minutes>m<seconds>s` beyond that.
///
/// ## Examples
///
/// ```rust
/// # use diet_api_bench::utils::format_duration;
/// # use std::time::Duration;
/// assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{}m{:02}s", duration.as_secs() / 60, duration.as_secs() % 60)
    }
}

/// Validate the number of simultaneously in-flight requests
///
/// ## Parameters
/// - `concurrency`: Requests launched per batch
///
/// ## Returns
/// - `Ok(())`: 1 to 1024 inclusive
/// - `Err`: zero, or more than 1024 (beyond that the client, not the API,
///   becomes the bottleneck)
pub fn validate_concurrency(concurrency: usize) -> Result<()> {
    if concurrency == 0 {
        anyhow::bail!("Concurrency cannot be zero");
    }
    if concurrency > 1024 {
        anyhow::bail!("Concurrency {} is too high (maximum 1024)", concurrency);
    }
    Ok(())
}

/// Validate a collection duration or request timeout
pub fn validate_duration(name: &str, duration: Duration) -> Result<()> {
    if duration.is_zero() {
        anyhow::bail!("{} must be greater than zero", name);
    }
    Ok(())
}

/// Number of logical CPU cores available to this process
pub fn get_cpu_cores() -> usize {
    num_cpus::get()
}

/// Render one table row padded to `widths`
///
/// ```rust
/// # use diet_api_bench::utils::table_row;
/// assert_eq!(table_row(&["a", "bc"], &[3, 2]), "| a   | bc |");
/// ```
pub fn table_row(columns: &[&str], widths: &[usize]) -> String {
    let mut row = String::from("|");
    for (i, column) in columns.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(10);
        row.push_str(&format!(" {:width$} |", column, width = width));
    }
    row
}

/// Render a separator line matching `widths`
pub fn table_separator(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for &width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_latency_ms() {
        assert_eq!(format_latency_ms(0.5), "500.0μs");
        assert_eq!(format_latency_ms(12.5), "12.50ms");
        assert_eq!(format_latency_ms(1500.0), "1.50s");
    }

    #[test]
    fn test_format_request_rate() {
        assert_eq!(format_request_rate(10.0), "10.0 req/s");
        assert_eq!(format_request_rate(1500.0), "1.50K req/s");
        assert_eq!(format_request_rate(2_500_000.0), "2.50M req/s");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(1.0), "100.00%");
        assert_eq!(format_percent(10.0 / 300.0), "3.33%");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(30)), "30.00s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m05s");
    }

    #[test]
    fn test_validate_concurrency() {
        assert!(validate_concurrency(1).is_ok());
        assert!(validate_concurrency(10).is_ok());
        assert!(validate_concurrency(0).is_err());
        assert!(validate_concurrency(1025).is_err());
    }

    #[test]
    fn test_validate_duration() {
        assert!(validate_duration("Duration", Duration::from_millis(1)).is_ok());
        assert!(validate_duration("Timeout", Duration::ZERO).is_err());
    }

    #[test]
    fn test_run_id_shape() {
        let id = generate_run_id();
        assert_eq!(id.len(), 15);
        assert_eq!(&id[8..9], "_");
        assert!(chrono::NaiveDateTime::parse_from_str(&id, RUN_ID_FORMAT).is_ok());
    }

    #[test]
    fn test_report_ids_unique() {
        assert_ne!(generate_report_id(), generate_report_id());
    }

    #[test]
    fn test_table_rendering() {
        let widths = [8, 5];
        assert_eq!(table_separator(&widths), "+----------+-------+");
        assert_eq!(table_row(&["Test", "P50"], &widths), "| Test     | P50   |");
    }
}
