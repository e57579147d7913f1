//! Pure countdown logic with no platform dependencies.
//! Testable on host without an audio device or a terminal.

mod engine;

pub use engine::{CountdownEngine, Sleeper, ThreadSleeper, TICK_PERIOD};

/// Maximum number of digits accepted by the duration entry (HHMMSS).
pub const MAX_ENTRY_DIGITS: usize = 6;

/// Split a second count into (hours, minutes, seconds).
pub fn split_hms(total_secs: u64) -> (u64, u64, u64) {
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    (h, m, s)
}

pub fn hms_to_seconds(h: u64, m: u64, s: u64) -> u64 {
    h.saturating_mul(3600)
        .saturating_add(m.saturating_mul(60))
        .saturating_add(s)
}

/// Format a second count as "HH:MM:SS"
pub fn format_hms(total_secs: u64) -> String {
    let (h, m, s) = split_hms(total_secs);
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Parse "HH:MM:SS" leniently. Missing or malformed segments count as zero,
/// so "1:x:30" is (1, 0, 30) and "" is (0, 0, 0).
pub fn parse_hms(text: &str) -> (u64, u64, u64) {
    let mut parts = text.split(':').map(|p| p.trim().parse::<u64>().unwrap_or(0));
    let h = parts.next().unwrap_or(0);
    let m = parts.next().unwrap_or(0);
    let s = parts.next().unwrap_or(0);
    (h, m, s)
}

/// Keep only ASCII digits, capped at [`MAX_ENTRY_DIGITS`].
pub fn entry_digits(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_digit())
        .take(MAX_ENTRY_DIGITS)
        .collect()
}

/// Group raw entry digits two at a time: "12345" becomes "12:34:5".
pub fn format_entry(digits: &str) -> String {
    let digits = entry_digits(digits);
    let mut out = String::with_capacity(digits.len() + 2);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && i % 2 == 0 {
            out.push(':');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_hms() {
        assert_eq!(split_hms(0), (0, 0, 0));
        assert_eq!(split_hms(59), (0, 0, 59));
        assert_eq!(split_hms(3661), (1, 1, 1));
        assert_eq!(split_hms(360_000), (100, 0, 0));
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(61), "00:01:01");
        assert_eq!(format_hms(3661), "01:01:01");
    }

    #[test]
    fn test_parse_hms() {
        assert_eq!(parse_hms("01:02:03"), (1, 2, 3));
        assert_eq!(parse_hms("12:3"), (12, 3, 0));
        assert_eq!(parse_hms("5"), (5, 0, 0));
        assert_eq!(parse_hms(""), (0, 0, 0));
        assert_eq!(parse_hms("1:x:30"), (1, 0, 30));
        assert_eq!(parse_hms("::"), (0, 0, 0));
    }

    #[test]
    fn test_hms_to_seconds() {
        assert_eq!(hms_to_seconds(0, 0, 0), 0);
        assert_eq!(hms_to_seconds(1, 1, 1), 3661);
        // Entry allows 99 minutes/seconds, no normalisation happens here
        assert_eq!(hms_to_seconds(0, 99, 99), 99 * 60 + 99);
    }

    #[test]
    fn test_entry_digits() {
        assert_eq!(entry_digits("12:34:56"), "123456");
        assert_eq!(entry_digits("a1b2"), "12");
        assert_eq!(entry_digits("1234567"), "123456");
    }

    #[test]
    fn test_format_entry() {
        assert_eq!(format_entry(""), "");
        assert_eq!(format_entry("1"), "1");
        assert_eq!(format_entry("12"), "12");
        assert_eq!(format_entry("123"), "12:3");
        assert_eq!(format_entry("12345"), "12:34:5");
        assert_eq!(format_entry("123456"), "12:34:56");
        assert_eq!(format_entry("12:34:56:78"), "12:34:56");
    }

    #[test]
    fn test_entry_roundtrip_through_parse() {
        let shown = format_entry("013005");
        assert_eq!(shown, "01:30:05");
        assert_eq!(parse_hms(&shown), (1, 30, 5));
    }
}
