use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Elapsed time as `mm:ss`. Minutes keep counting past 59.
pub fn format_elapsed(seconds: u64) -> String {
    let mins = seconds / 60;
    let secs = seconds % 60;
    format!("{mins:02}:{secs:02}")
}

/// Truncate `text` to at most `max_width` terminal columns, ending in `…`
/// when something was cut.
pub fn fit_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(9), "00:09");
        assert_eq!(format_elapsed(61), "01:01");
        assert_eq!(format_elapsed(599), "09:59");
    }

    #[test]
    fn test_format_elapsed_past_an_hour() {
        assert_eq!(format_elapsed(3600), "60:00");
        assert_eq!(format_elapsed(6125), "102:05");
    }

    #[test]
    fn test_fit_width_short_text_unchanged() {
        assert_eq!(fit_width("CALIBRATED", 20), "CALIBRATED");
        assert_eq!(fit_width("CALIBRATED", 10), "CALIBRATED");
    }

    #[test]
    fn test_fit_width_truncates_with_ellipsis() {
        assert_eq!(fit_width("CAMERA ERROR: missing", 8), "CAMERA …");
        assert_eq!(fit_width("abc", 0), "");
    }
}
