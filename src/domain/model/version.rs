//! Most-recent version resolution from date suffixes on versioned model ids

use once_cell::sync::Lazy;
use regex::Regex;

/// `(year, month, day)`; `(0, 0, 0)` when no date could be read
pub type DateTuple = (u32, u32, u32);

pub const UNDATED: DateTuple = (0, 0, 0);

static COMPACT_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{8}$").unwrap());

/// Extract the release date encoded in a versioned id.
///
/// Accepts `MM-DD-YY` (two-digit years are 2000-based) or `YYYYMMDD` after the alias.
/// Any three hyphenated numbers are read as `MM-DD-YY`, so `2025-01-31` yields `(2031, 2025, 1)`.
/// Ids that do not start with their alias are dated from their trailing segments rather than
/// treated as undated.
pub fn extract_date(model_id: &str, alias: &str) -> DateTuple {
    match model_id.strip_prefix(alias) {
        Some(rest) => parse_suffix(rest.trim_start_matches('-')),
        None => parse_trailing(model_id),
    }
}

/// Pick the versioned id with the latest date, ties broken on the id string.
pub fn most_recent<'a, I>(alias: &str, model_ids: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    model_ids
        .into_iter()
        .map(|id| (extract_date(id, alias), id.as_str()))
        .max()
        .map(|(_, id)| id)
}

fn parse_suffix(suffix: &str) -> DateTuple {
    let parts: Vec<&str> = suffix.split('-').collect();
    match parts.as_slice() {
        [month, day, year] => parse_month_day_year(month, day, year),
        [compact] => parse_compact(compact),
        _ => UNDATED,
    }
}

fn parse_trailing(model_id: &str) -> DateTuple {
    let parts: Vec<&str> = model_id.split('-').collect();

    if let Some(last) = parts.last() {
        let compact = parse_compact(last);
        if compact != UNDATED {
            return compact;
        }
    }

    match parts.as_slice() {
        [.., month, day, year] => parse_month_day_year(month, day, year),
        _ => UNDATED,
    }
}

fn parse_month_day_year(month: &str, day: &str, year: &str) -> DateTuple {
    match (month.parse::<u32>(), day.parse::<u32>(), year.parse::<u32>()) {
        (Ok(month), Ok(day), Ok(year)) => {
            let year = if year < 100 { year + 2000 } else { year };
            (year, month, day)
        }
        _ => UNDATED,
    }
}

fn parse_compact(block: &str) -> DateTuple {
    if !COMPACT_DATE.is_match(block) {
        return UNDATED;
    }

    // Eight ASCII digits always split into valid integers.
    let year = block[..4].parse().unwrap_or(0);
    let month = block[4..6].parse().unwrap_or(0);
    let day = block[6..].parse().unwrap_or(0);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_extract_month_day_year() {
        assert_eq!(extract_date("gpt-4o-12-17-24", "gpt-4o"), (2024, 12, 17));
        assert_eq!(extract_date("o1-01-10-24", "o1"), (2024, 1, 10));
    }

    #[test]
    fn test_extract_four_digit_year_kept() {
        assert_eq!(extract_date("model-03-02-2025", "model"), (2025, 3, 2));
    }

    #[test]
    fn test_extract_compact_date() {
        assert_eq!(
            extract_date("claude-3-opus-20240229", "claude-3-opus"),
            (2024, 2, 29)
        );
    }

    #[test]
    fn test_hyphenated_iso_suffix_read_as_month_day_year() {
        assert_eq!(extract_date("o3-mini-2025-01-31", "o3-mini"), (2031, 2025, 1));

        // The ISO id reads as year 2031 and outranks a genuine 2024 id.
        let model_ids = ids(&["m-12-17-24", "m-2025-01-31"]);
        assert_eq!(most_recent("m", &model_ids), Some("m-2025-01-31"));
    }

    #[test]
    fn test_unparsable_suffix_is_undated() {
        assert_eq!(extract_date("gpt-4o-latest", "gpt-4o"), UNDATED);
        assert_eq!(extract_date("gpt-4o", "gpt-4o"), UNDATED);
        assert_eq!(extract_date("gpt-4o-2024-1", "gpt-4o"), UNDATED);
        assert_eq!(extract_date("gpt-4o-aa-bb-cc", "gpt-4o"), UNDATED);
        assert_eq!(extract_date("gpt-4o-2024121", "gpt-4o"), UNDATED);
    }

    #[test]
    fn test_extract_without_alias_prefix_uses_trailing_segments() {
        assert_eq!(
            extract_date("claude-3-5-haiku-20241022", "claude-3-haiku"),
            (2024, 10, 22)
        );
        assert_eq!(extract_date("preview", "claude-3-haiku"), UNDATED);
    }

    #[test]
    fn test_most_recent_picks_latest_date() {
        let model_ids = ids(&["gpt-4o-01-15-24", "gpt-4o-12-17-24", "gpt-4o-01-10-24"]);
        assert_eq!(most_recent("gpt-4o", &model_ids), Some("gpt-4o-12-17-24"));
    }

    #[test]
    fn test_most_recent_prefers_dated_over_undated() {
        let model_ids = ids(&["gpt-4o-preview", "gpt-4o-01-10-24"]);
        assert_eq!(most_recent("gpt-4o", &model_ids), Some("gpt-4o-01-10-24"));
    }

    #[test]
    fn test_most_recent_single_undated_candidate() {
        let model_ids = ids(&["gpt-4o-preview"]);
        assert_eq!(most_recent("gpt-4o", &model_ids), Some("gpt-4o-preview"));
    }

    #[test]
    fn test_most_recent_tie_breaks_on_id() {
        let model_ids = ids(&["m-b-20240101", "m-a-20240101"]);
        // Neither starts with alias "x", both dated 2024-01-01.
        assert_eq!(most_recent("x", &model_ids), Some("m-b-20240101"));
    }

    #[test]
    fn test_most_recent_empty() {
        let model_ids: Vec<String> = Vec::new();
        assert_eq!(most_recent("gpt-4o", &model_ids), None);
    }

    #[test]
    fn test_most_recent_is_member_with_maximal_date() {
        let model_ids = ids(&[
            "o1-mini-01-15-24",
            "o1-mini-12-17-24",
            "o1-mini-01-10-24",
            "o1-mini-beta",
        ]);
        let picked = most_recent("o1-mini", &model_ids).unwrap();

        assert!(model_ids.iter().any(|id| id == picked));
        let picked_date = extract_date(picked, "o1-mini");
        for id in &model_ids {
            assert!(extract_date(id, "o1-mini") <= picked_date);
        }
    }
}
