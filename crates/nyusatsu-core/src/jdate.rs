//! Era-calendar date parsing.
//!
//! Regional portals emit dates in imperial-era notation (`令和7年3月10日`,
//! `R08.02.20`), sometimes with full-width digits, sometimes Gregorian.
//! Each era converts with a fixed year offset: Gregorian = offset + era year.

use chrono::NaiveDate;

const REIWA_OFFSET: i32 = 2018;
const HEISEI_OFFSET: i32 = 1988;
const SHOWA_OFFSET: i32 = 1925;

/// Parse a portal date string into a calendar date.
///
/// Returns `None` for text that carries no complete date; callers treat that
/// as a missing field, not an error.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = normalize_digits(text.trim());
    if text.is_empty() {
        return None;
    }

    if let Some((offset, rest)) = split_era(&text) {
        let year = if rest.starts_with("元年") {
            Some(1)
        } else {
            None
        };
        let nums = extract_numbers(rest);
        return match (year, nums.as_slice()) {
            (Some(y), [m, d, ..]) => NaiveDate::from_ymd_opt(offset + y, *m, *d),
            (None, [y, m, d, ..]) => NaiveDate::from_ymd_opt(offset + *y as i32, *m, *d),
            _ => None,
        };
    }

    // Gregorian fallback: first number must look like a full year.
    let nums = extract_numbers(&text);
    match nums.as_slice() {
        [y, m, d, ..] if *y >= 1900 => NaiveDate::from_ymd_opt(*y as i32, *m, *d),
        _ => None,
    }
}

/// Era marker at the head of the string, kanji or single-letter form.
fn split_era(text: &str) -> Option<(i32, &str)> {
    for (kanji, letter, offset) in [
        ("令和", 'R', REIWA_OFFSET),
        ("平成", 'H', HEISEI_OFFSET),
        ("昭和", 'S', SHOWA_OFFSET),
    ] {
        if let Some(rest) = text.strip_prefix(kanji) {
            return Some((offset, rest));
        }
        let mut chars = text.chars();
        if chars.next() == Some(letter) {
            let rest = chars.as_str();
            // Letter eras are only trusted when digits follow immediately,
            // otherwise any word starting with R/H/S would match.
            if rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                return Some((offset, rest));
            }
        }
    }
    None
}

/// Collect runs of ASCII digits as numbers, in order of appearance.
fn extract_numbers(text: &str) -> Vec<u32> {
    let mut out = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_ascii_digit() {
            current.push(ch);
            continue;
        }
        if !current.is_empty() {
            if let Ok(v) = current.parse::<u32>() {
                out.push(v);
            }
            current.clear();
        }
    }
    if !current.is_empty() {
        if let Ok(v) = current.parse::<u32>() {
            out.push(v);
        }
    }
    out
}

/// Map full-width digits (０-９) onto their ASCII forms.
fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn reiwa_kanji_form() {
        assert_eq!(parse_date("令和7年3月10日"), Some(d(2025, 3, 10)));
    }

    #[test]
    fn reiwa_letter_form() {
        assert_eq!(parse_date("R08.02.20"), Some(d(2026, 2, 20)));
        assert_eq!(parse_date("R8.2.20"), Some(d(2026, 2, 20)));
    }

    #[test]
    fn heisei_and_showa_offsets() {
        assert_eq!(parse_date("平成31年4月1日"), Some(d(2019, 4, 1)));
        assert_eq!(parse_date("H31.04.01"), Some(d(2019, 4, 1)));
        assert_eq!(parse_date("昭和64年1月7日"), Some(d(1989, 1, 7)));
    }

    #[test]
    fn gannen_is_year_one() {
        assert_eq!(parse_date("令和元年5月1日"), Some(d(2019, 5, 1)));
    }

    #[test]
    fn full_width_digits() {
        assert_eq!(parse_date("令和７年３月１０日"), Some(d(2025, 3, 10)));
    }

    #[test]
    fn gregorian_forms() {
        assert_eq!(parse_date("2025年3月10日"), Some(d(2025, 3, 10)));
        assert_eq!(parse_date("2025/03/10"), Some(d(2025, 3, 10)));
        assert_eq!(parse_date("2025-03-10"), Some(d(2025, 3, 10)));
    }

    #[test]
    fn rejects_incomplete_or_junk_text() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("令和7年3月"), None);
        assert_eq!(parse_date("随時"), None);
        assert_eq!(parse_date("Rough estimate"), None);
    }

    #[test]
    fn rejects_impossible_dates() {
        assert_eq!(parse_date("令和7年13月40日"), None);
    }
}
