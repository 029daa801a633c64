//! Clock-face rendering of countdown values.

/// Render seconds as `MM:SS`, zero-padded.
///
/// Minutes are not wrapped into hours, so 7200 seconds reads `120:00`.
pub fn format_time(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
