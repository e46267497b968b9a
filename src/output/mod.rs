// Output formatting: terminal display and CSV reports.

pub mod csv;
pub mod terminal;

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Works on characters rather than bytes, so multi-byte CJK text never
/// splits mid-character.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

/// Default file name for a bias report written on `date`.
pub fn bias_report_name(date: chrono::NaiveDate) -> String {
    format!("narrative_bias_{}.csv", date.format("%Y%m%d"))
}

/// Default file name for an evolution report.
pub fn evolution_report_name(threshold: f64, top_k: usize) -> String {
    format!("topic_evolution_threshold_{threshold}_top_{top_k}.csv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_cjk() {
        assert_eq!(truncate_chars("真相很复杂", 2), "真相...");
        assert_eq!(truncate_chars("真相", 5), "真相");
    }

    #[test]
    fn test_report_names() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(bias_report_name(date), "narrative_bias_20240307.csv");
        assert_eq!(
            evolution_report_name(0.75, 10),
            "topic_evolution_threshold_0.75_top_10.csv"
        );
    }
}
