//! Certificate numbers look like `2025-007`. New certificates take the lowest
//! number no issue title uses yet, so gaps left by abandoned checks get filled.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;

/// How the certificate number is read out of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extraction {
    /// `YYYY-NNN`: the part after the dash
    Suffix,
    /// A bare number taken whole
    Whole,
}

impl Extraction {
    fn apply<'t>(&self, matched: &'t str) -> &'t str {
        match self {
            Extraction::Suffix => matched.split_once('-').map_or(matched, |(_, n)| n),
            Extraction::Whole => matched,
        }
    }
}

struct TitlePattern {
    regex: Regex,
    extraction: Extraction,
}

impl TitlePattern {
    fn new(pattern: &str, extraction: Extraction) -> Self {
        Self {
            regex: Regex::new(pattern).unwrap(),
            extraction,
        }
    }
}

lazy_static! {
    /// Tried in order: the first pattern matching anywhere in a title is the
    /// only one used for that title.
    static ref TITLE_PATTERNS: Vec<TitlePattern> = vec![
        TitlePattern::new(r"\b\d{4}-\d{3}\b", Extraction::Suffix),
        TitlePattern::new(r"\b\d{4}-\d{2}\b", Extraction::Suffix),
        TitlePattern::new(r"\b\d{4}-\d\b", Extraction::Suffix),
        TitlePattern::new(r"\b\d{3}\b", Extraction::Whole),
        TitlePattern::new(r"\b\d{2}\b", Extraction::Whole),
        TitlePattern::new(r"\b\d\b", Extraction::Whole),
    ];
}

/// Certificate numbers must fall strictly between these bounds.
const LOWER_BOUND: u32 = 0;
const UPPER_BOUND: u32 = 10_000;

/// The certificate numbers in use and the one to hand out next.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IdentifierAllocation {
    pub used: BTreeSet<u32>,
    pub next: u32,
}

/// Look at every title and pick the next free certificate number.
pub fn allocate<'a, I>(titles: I) -> IdentifierAllocation
where
    I: IntoIterator<Item = &'a str>,
{
    let used = used_identifiers(titles);
    let next = next_identifier(&used);
    IdentifierAllocation { used, next }
}

/// Certificate numbers mentioned in one title.
pub fn identifiers_in_title(title: &str) -> Vec<u32> {
    for pattern in TITLE_PATTERNS.iter() {
        if !pattern.regex.is_match(title) {
            continue;
        }
        return pattern
            .regex
            .find_iter(title)
            .filter_map(|m| pattern.extraction.apply(m.as_str()).parse::<u32>().ok())
            .filter(|n| *n > LOWER_BOUND && *n < UPPER_BOUND)
            .collect();
    }
    vec![]
}

/// Every certificate number used across `titles`, ascending.
pub fn used_identifiers<'a, I>(titles: I) -> BTreeSet<u32>
where
    I: IntoIterator<Item = &'a str>,
{
    titles.into_iter().flat_map(identifiers_in_title).collect()
}

/// Lowest positive number missing from `used`.
pub fn next_identifier(used: &BTreeSet<u32>) -> u32 {
    let mut candidate = 1;
    for &n in used.range(1u32..) {
        if n != candidate {
            break;
        }
        candidate += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next(titles: &[&str]) -> u32 {
        next_identifier(&used_identifiers(titles.iter().copied()))
    }

    #[test]
    fn test_fills_the_first_gap() {
        assert_eq!(
            next(&[
                "CODECHECK 2025-001",
                "Certificate 2025-002 for paper X",
                "2025-004: reproduce figures"
            ]),
            3
        );
    }

    #[test]
    fn test_empty_titles() {
        assert_eq!(next(&[]), 1);
        assert_eq!(next(&["no numbers here"]), 1);
    }

    #[test]
    fn test_no_gap_takes_the_next_number() {
        assert_eq!(next(&["2025-001", "2025-002", "2025-003"]), 4);
    }

    #[test]
    fn test_dashed_pattern_wins_over_bare_numbers() {
        assert_eq!(identifiers_in_title("Paper 42, certificate 2024-017"), vec![17]);
    }

    #[test]
    fn test_all_matches_of_the_winning_pattern() {
        assert_eq!(identifiers_in_title("2024-010 and 2025-011"), vec![10, 11]);
        assert_eq!(identifiers_in_title("issues 12 and 34"), vec![12, 34]);
    }

    #[test]
    fn test_shorter_suffixes() {
        assert_eq!(identifiers_in_title("2023-45"), vec![45]);
        assert_eq!(identifiers_in_title("2023-5"), vec![5]);
    }

    #[test]
    fn test_bare_numbers() {
        assert_eq!(identifiers_in_title("Review 123"), vec![123]);
        assert_eq!(identifiers_in_title("Review 7"), vec![7]);
        // Four digit numbers are years, not certificates
        assert!(identifiers_in_title("Published 2024").is_empty());
    }

    #[test]
    fn test_zero_is_not_a_certificate() {
        assert!(identifiers_in_title("2025-000").is_empty());
        assert_eq!(next(&["2025-000"]), 1);
    }

    #[test]
    fn test_union_is_deduplicated() {
        let used = used_identifiers(["2025-001", "2024-001", "2025-002"]);
        assert_eq!(used.into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_allocate_reports_used_numbers() {
        let allocation = allocate(["2025-003", "Review 1", "2024-002"]);
        assert_eq!(allocation.used, BTreeSet::from([1, 2, 3]));
        assert_eq!(allocation.next, 4);
    }

    #[test]
    fn test_next_identifier_on_sets() {
        assert_eq!(next_identifier(&BTreeSet::new()), 1);
        assert_eq!(next_identifier(&BTreeSet::from([2, 3])), 1);
        assert_eq!(next_identifier(&BTreeSet::from([1, 2, 5])), 3);
    }
}
