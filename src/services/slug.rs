//! Event slug generation and parsing.
//!
//! Check-in links and QR codes identify events by a URL-safe slug derived
//! from the event's display name and date. The derivation is a pure
//! function: same name and date always produce the same slug, with no
//! randomness and no external state. Existing printed QR codes depend on
//! this exact algorithm, so it must not change.

use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

lazy_static! {
    /// A slug ends with a hyphen-separated 8-digit DDMMYYYY run.
    static ref SLUG_DATE_REGEX: regex::Regex =
        regex::Regex::new(r"^(.+)-(\d{8})$").unwrap();
}

/// Approximate event identity recovered from a slug.
///
/// Lossy by design: capitalization, diacritics and exact spacing are gone.
/// Diagnostic and display use only, never a reliable parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSlug {
    pub name: String,
    pub date: NaiveDate,
}

/// Build the URL-safe slug for an event from its display name and date.
///
/// The name portion is normalized as follows:
/// 1. Unicode canonical decomposition (NFD), dropping combining marks, so
///    every accented Latin letter falls back to its base letter
/// 2. `đ`/`Đ` mapped to `d`/`D` explicitly (no decomposable accent)
/// 3. lowercased
/// 4. everything but lowercase ASCII letters, digits, whitespace and
///    hyphens removed
/// 5. trimmed, whitespace runs collapsed to a single hyphen, hyphen runs
///    collapsed to one
///
/// The date portion is `DDMMYYYY` - day-month-year order, deliberately not
/// ISO, to match the locale of the printed materials.
///
/// Any input normalizes to *something*; an all-symbol name yields just the
/// date suffix. Rejecting empty names is the caller's job.
///
/// `event_slug("Grand Opening 2024", 2024-03-05)` is
/// `"grand-opening-2024-05032024"`.
pub fn event_slug(event_name: &str, event_date: NaiveDate) -> String {
    let stripped: String = event_name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' => 'd',
            'Đ' => 'D',
            other => other,
        })
        .collect();

    let lowered = stripped.to_lowercase();

    // Keep only [a-z0-9], whitespace and hyphens
    let cleaned: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();

    // Whitespace runs become single hyphens, then hyphen runs collapse
    let mut name_slug = String::with_capacity(cleaned.len());
    for c in cleaned.trim().chars() {
        if c.is_whitespace() || c == '-' {
            if !name_slug.ends_with('-') {
                name_slug.push('-');
            }
        } else {
            name_slug.push(c);
        }
    }

    let date_str = format!(
        "{:02}{:02}{}",
        event_date.day(),
        event_date.month(),
        event_date.year()
    );

    format!("{name_slug}-{date_str}")
}

/// Attempt to recover an approximate name and the event date from a slug.
///
/// Matches a trailing 8-digit run anchored at the end of the string and
/// preceded by a hyphen; hyphens in the name portion become spaces. Returns
/// `None` when the trailing pattern is absent or the digits are not a real
/// calendar date.
pub fn parse_event_slug(slug: &str) -> Option<ParsedSlug> {
    let captures = SLUG_DATE_REGEX.captures(slug)?;
    let name_slug = captures.get(1)?.as_str();
    let date_str = captures.get(2)?.as_str();

    let day: u32 = date_str[0..2].parse().ok()?;
    let month: u32 = date_str[2..4].parse().ok()?;
    let year: i32 = date_str[4..8].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    Some(ParsedSlug {
        name: name_slug.replace('-', " "),
        date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn ascii_name_becomes_lowercase_hyphenated() {
        assert_eq!(
            event_slug("Grand Opening 2024", date(2024, 3, 5)),
            "grand-opening-2024-05032024"
        );
    }

    #[test]
    fn vietnamese_diacritics_are_stripped() {
        assert_eq!(
            event_slug("Hội Nghị Khách Hàng", date(2025, 1, 1)),
            "hoi-nghi-khach-hang-01012025"
        );
    }

    #[test]
    fn d_with_stroke_maps_to_d() {
        assert_eq!(
            event_slug("Đại Hội Đồng", date(2024, 12, 31)),
            "dai-hoi-dong-31122024"
        );
    }

    #[test]
    fn slug_contains_only_ascii_letters_digits_hyphens() {
        let slug = event_slug("Nguyễn Văn A & Bạn Bè!!!", date(2024, 6, 15));
        assert!(
            slug.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        );
        assert!(!slug.contains('đ'));
    }

    #[test]
    fn special_characters_are_removed() {
        assert_eq!(
            event_slug("Tech (Meetup) #5!", date(2024, 7, 9)),
            "tech-meetup-5-09072024"
        );
    }

    #[test]
    fn whitespace_and_hyphen_runs_collapse() {
        assert_eq!(
            event_slug("  Spring   -  Fair  ", date(2024, 4, 1)),
            "spring-fair-01042024"
        );
    }

    #[test]
    fn generator_is_idempotent() {
        let d = date(2024, 3, 5);
        assert_eq!(
            event_slug("Hội Nghị Khách Hàng", d),
            event_slug("Hội Nghị Khách Hàng", d)
        );
    }

    #[test]
    fn empty_after_normalization_yields_bare_date_suffix() {
        assert_eq!(event_slug("!!!", date(2024, 1, 2)), "-02012024");
    }

    #[test]
    fn parse_recovers_the_date_exactly() {
        let parsed = parse_event_slug("grand-opening-2024-05032024").unwrap();
        assert_eq!(parsed.date, date(2024, 3, 5));
        // The name is intentionally lossy; only its shape is guaranteed.
        assert_eq!(parsed.name, "grand opening 2024");
    }

    #[test]
    fn parse_roundtrip_recovers_date_not_name() {
        let d = date(2025, 1, 1);
        let slug = event_slug("Hội Nghị Khách Hàng", d);
        let parsed = parse_event_slug(&slug).unwrap();
        assert_eq!(parsed.date, d);
        // No assertion on name equality: diacritics and case are gone.
    }

    #[test]
    fn parse_rejects_slug_without_trailing_date() {
        assert!(parse_event_slug("no-date-here").is_none());
        assert!(parse_event_slug("05032024").is_none());
    }

    #[test]
    fn parse_rejects_impossible_dates() {
        assert!(parse_event_slug("launch-99992024").is_none());
    }
}
