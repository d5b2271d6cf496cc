//! Importance scoring for exam questions.
//!
//! A question's score blends how often it was asked, how recently it was
//! asked and a manually assigned weight. Scores live in `[0, 1]` and are
//! rounded to two decimals before they are persisted.

use chrono::Datelike;

pub const REPEAT_WEIGHT: f64 = 0.4;
pub const RECENCY_WEIGHT: f64 = 0.4;
pub const GLOBAL_WEIGHT: f64 = 0.2;

/// Repeats needed for the repeat term to saturate.
pub const REPEAT_SATURATION: f64 = 10.0;
/// Recent years needed for the recency term to saturate.
pub const RECENT_SATURATION: f64 = 5.0;
/// A year counts as recent when `current_year - year` is at most this.
pub const RECENT_WINDOW_YEARS: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub repeat_score: f64,
    pub recency_score: f64,
    pub global_score: f64,
    pub score: f64,
}

/// Score against the current UTC calendar year.
pub fn compute_score<S: AsRef<str>>(repeat_count: i64, years: &[S], global_importance: f64) -> f64 {
    score_breakdown(repeat_count, years, global_importance, current_year()).score
}

pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

pub fn score_breakdown<S: AsRef<str>>(
    repeat_count: i64,
    years: &[S],
    global_importance: f64,
    current_year: i32,
) -> ScoreBreakdown {
    let recent = years
        .iter()
        .filter_map(|year| parse_year(year.as_ref()))
        .filter(|&year| {
            i64::from(current_year) - i64::from(year) <= i64::from(RECENT_WINDOW_YEARS)
        })
        .count();
    let recency_score = (recent as f64 / RECENT_SATURATION).min(1.0);
    let repeat_score = (repeat_count.max(0) as f64 / REPEAT_SATURATION).min(1.0);
    let global_score = if global_importance.is_finite() {
        global_importance.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let raw = repeat_score * REPEAT_WEIGHT + recency_score * RECENCY_WEIGHT + global_score * GLOBAL_WEIGHT;
    ScoreBreakdown {
        repeat_score,
        recency_score,
        global_score,
        score: round2(raw),
    }
}

/// Reads the leading integer of a year label: `"2019"` and `"2019-20"` both
/// give 2019, `"n/a"` gives nothing.
pub fn parse_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map(|(idx, _)| idx)
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i32>().ok().map(|value| value * sign)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i32 = 2024;

    fn score(repeat: i64, years: &[&str], global: f64) -> f64 {
        score_breakdown(repeat, years, global, NOW).score
    }

    #[test]
    fn test_reference_scenario() {
        let years = ["2023", "2022", "2021", "2020", "2019", "2010"];
        let result = score_breakdown(6, &years, 0.9, NOW);
        assert_eq!(result.recency_score, 1.0);
        assert_eq!(result.repeat_score, 0.6);
        assert_eq!(result.global_score, 0.9);
        assert_eq!(result.score, 0.82);
    }

    #[test]
    fn test_empty_years_only_global_weight() {
        for (global, expected) in [(0.0, 0.0), (0.5, 0.1), (1.0, 0.2), (0.75, 0.15), (0.33, 0.07)] {
            assert_eq!(score(0, &[], global), expected, "global {}", global);
        }
    }

    #[test]
    fn test_global_importance_is_clamped() {
        assert_eq!(score(0, &[], -3.0), 0.0);
        assert_eq!(score(0, &[], 7.5), 0.2);
        assert_eq!(score(0, &[], f64::NAN), 0.0);
    }

    #[test]
    fn test_saturation() {
        let years = ["2024", "2023", "2022", "2021", "2020", "2019", "2018"];
        assert_eq!(score(10, &years, 0.0), 0.8);
        assert_eq!(score(25, &years, 1.0), 1.0);
        assert_eq!(score(12, &years, 0.5), 0.9);
    }

    #[test]
    fn test_recency_window_boundary() {
        // 2019 is exactly five years back and still recent; 2018 is not.
        assert_eq!(score_breakdown(0, &["2019"], 0.0, NOW).recency_score, 0.2);
        assert_eq!(score_breakdown(0, &["2018"], 0.0, NOW).recency_score, 0.0);
        assert_eq!(score_breakdown(0, &["2026"], 0.0, NOW).recency_score, 0.2);
    }

    #[test]
    fn test_non_numeric_years_are_not_recent() {
        let result = score_breakdown(3, &["abc", "", "2023"], 0.0, NOW);
        assert_eq!(result.recency_score, 0.2);
        assert_eq!(result.repeat_score, 0.3);
        assert_eq!(result.score, 0.2);
    }

    #[test]
    fn test_extreme_years_do_not_overflow() {
        let result = score_breakdown(1, &["-2147483647", "-999999"], 0.0, NOW);
        assert_eq!(result.recency_score, 0.0);
        assert_eq!(result.repeat_score, 0.1);
        assert_eq!(score_breakdown(0, &["-2147483647"], 0.0, i32::MAX).recency_score, 0.0);
        // Out of range for i32, so not a year at all.
        assert_eq!(parse_year("99999999999"), None);
        assert_eq!(score_breakdown(1, &["99999999999"], 0.0, NOW).recency_score, 0.0);
        assert_eq!(score_breakdown(0, &["2147483647"], 0.0, i32::MIN).recency_score, 0.2);
    }

    #[test]
    fn test_order_invariance() {
        let a = ["2010", "2023", "abc", "2021", "2019"];
        let b = ["2019", "abc", "2021", "2023", "2010"];
        assert_eq!(score(5, &a, 0.4), score(5, &b, 0.4));
    }

    #[test]
    fn test_rounding_half_up() {
        // 0.4 * 0.1 + 0.2 * 0.025 = 0.045 -> 0.05
        assert_eq!(round2(0.045), 0.05);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(0.8200000000000001), 0.82);
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2023"), Some(2023));
        assert_eq!(parse_year(" 2019-20"), Some(2019));
        assert_eq!(parse_year("-5"), Some(-5));
        assert_eq!(parse_year("n/a"), None);
        assert_eq!(parse_year(""), None);
        assert_eq!(parse_year("-"), None);
    }

    #[test]
    fn test_compute_score_uses_current_year() {
        let this_year = current_year().to_string();
        assert_eq!(compute_score(1, &[this_year.as_str()], 0.0), 0.12);
    }
}
