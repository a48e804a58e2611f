/// Formats a countdown value as `M:SS`; minutes are not wrapped into hours.
pub fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
