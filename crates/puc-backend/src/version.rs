//! Version-string detection and ordering for tag names and header versions.
//!
//! Ordering is dotted-numeric: numeric segments compare as numbers, and
//! pre-release words (`dev`, `alpha`, `beta`, `RC`, `pl`) rank around the bare
//! number they decorate, so `1.0.0-beta` sorts below `1.0.0` while `1.0.0-pl1`
//! sorts above it.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

static VERSION_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9]{1,5}(\.[0-9]{1,10}){0,4}($|[abrdp+_\-]|\s)")
        .expect("version-like pattern should compile")
});

/// Rank a bare number gets when compared against a pre-release word.
const NUMBER_RANK: i8 = 4;
/// Rank of words that are not a known pre-release marker.
const UNKNOWN_WORD_RANK: i8 = -6;

const SPECIAL_FORMS: [(&str, i8); 10] = [
    ("dev", 0),
    ("alpha", 1),
    ("a", 1),
    ("beta", 2),
    ("b", 2),
    ("RC", 3),
    ("rc", 3),
    ("#", NUMBER_RANK),
    ("pl", 5),
    ("p", 5),
];

/// Remove surrounding whitespace and one leading `v`/`V`.
#[must_use]
pub fn strip_version_prefix(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed
        .strip_prefix(['v', 'V'])
        .unwrap_or(trimmed)
}

/// Check whether a tag name looks like a version number, e.g. `v1.2.3`,
/// `2.0-rc1` or `4.1b`, as opposed to names like `latest` or `stable-build-42`.
#[must_use]
pub fn looks_like_version(name: &str) -> bool {
    let name = strip_version_prefix(name);
    if !name.starts_with(|ch: char| ch.is_ascii_digit()) {
        return false;
    }
    VERSION_LIKE.is_match(name)
}

/// Compare two version strings.
///
/// A leading `v` is ignored on both sides, and an empty string sorts below
/// any non-empty one.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = strip_version_prefix(a);
    let b = strip_version_prefix(b);
    if a.is_empty() || b.is_empty() {
        return (!a.is_empty()).cmp(&!b.is_empty());
    }

    let left = canonicalize(a);
    let right = canonicalize(b);
    compare_segments(&segments(&left), &segments(&right))
}

/// Compare two optional tag names; a missing name sorts below any present one.
#[must_use]
pub fn compare_tag_names(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare_versions(a, b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[must_use]
pub fn is_newer_version(candidate: &str, installed: &str) -> bool {
    compare_versions(candidate, installed) == Ordering::Greater
}

/// Keep only the items whose name looks like a version and order them from
/// the highest version to the lowest.
pub fn sort_by_version_desc<T, F>(items: Vec<T>, name_of: F) -> Vec<T>
where
    F: Fn(&T) -> Option<&str>,
{
    let mut versioned: Vec<T> = items
        .into_iter()
        .filter(|item| name_of(item).is_some_and(looks_like_version))
        .collect();
    versioned.sort_by(|a, b| compare_tag_names(name_of(b), name_of(a)));
    versioned
}

#[derive(Debug, Clone, Copy)]
enum Segment<'a> {
    Number(u64),
    Word(&'a str),
}

/// Insert separators between digit/non-digit runs and turn `-`, `_`, `+`
/// and other punctuation into dots, collapsing repeats.
fn canonicalize(version: &str) -> String {
    fn is_digit(ch: char) -> bool {
        ch.is_ascii_digit()
    }

    let mut out = String::with_capacity(version.len() * 2);
    let mut chars = version.chars();
    let Some(first) = chars.next() else {
        return out;
    };
    out.push(first);
    let mut previous = first;

    for ch in chars {
        let last_is_dot = out.ends_with('.');
        if matches!(ch, '-' | '_' | '+') {
            if !last_is_dot {
                out.push('.');
            }
        } else if previous != '.' && ch != '.' && is_digit(previous) != is_digit(ch) {
            if !last_is_dot {
                out.push('.');
            }
            out.push(ch);
        } else if !ch.is_ascii_alphanumeric() {
            if !last_is_dot {
                out.push('.');
            }
        } else {
            out.push(ch);
        }
        previous = ch;
    }

    out
}

fn segments(canonical: &str) -> Vec<Segment<'_>> {
    canonical
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| {
            if part.starts_with(|ch: char| ch.is_ascii_digit()) {
                let digits: &str = part
                    .split(|ch: char| !ch.is_ascii_digit())
                    .next()
                    .unwrap_or_default();
                Segment::Number(digits.parse().unwrap_or(u64::MAX))
            } else {
                Segment::Word(part)
            }
        })
        .collect()
}

fn special_form_rank(word: &str) -> i8 {
    SPECIAL_FORMS
        .iter()
        .find(|(form, _)| word.starts_with(form))
        .map_or(UNKNOWN_WORD_RANK, |(_, rank)| *rank)
}

fn compare_segment(left: Segment<'_>, right: Segment<'_>) -> Ordering {
    match (left, right) {
        (Segment::Number(a), Segment::Number(b)) => a.cmp(&b),
        (Segment::Word(a), Segment::Word(b)) => special_form_rank(a).cmp(&special_form_rank(b)),
        (Segment::Number(_), Segment::Word(word)) => NUMBER_RANK.cmp(&special_form_rank(word)),
        (Segment::Word(word), Segment::Number(_)) => special_form_rank(word).cmp(&NUMBER_RANK),
    }
}

fn compare_segments(left: &[Segment<'_>], right: &[Segment<'_>]) -> Ordering {
    for (a, b) in left.iter().zip(right) {
        let ordering = compare_segment(*a, *b);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    match left.len().cmp(&right.len()) {
        Ordering::Equal => Ordering::Equal,
        // The longer side wins with an extra number and loses with a
        // pre-release word.
        Ordering::Greater => match left[right.len()] {
            Segment::Number(_) => Ordering::Greater,
            Segment::Word(word) => special_form_rank(word).cmp(&NUMBER_RANK),
        },
        Ordering::Less => match right[left.len()] {
            Segment::Number(_) => Ordering::Less,
            Segment::Word(word) => NUMBER_RANK.cmp(&special_form_rank(word)),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::*;

    #[test]
    fn identical_versions_compare_equal() {
        for version in ["1", "1.2", "1.2.3", "2.0-rc1", "10.4.1.7"] {
            assert_eq!(compare_versions(version, version), Ordering::Equal);
        }
    }

    #[test]
    fn v_prefix_is_ignored() {
        assert_eq!(compare_versions("v1.2.3", "1.2.3"), Ordering::Equal);
        assert_eq!(compare_versions("V2.0", "v2.0"), Ordering::Equal);
    }

    #[test]
    fn numeric_segments_compare_as_numbers() {
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "10.0"), Ordering::Less);
    }

    #[test]
    fn pre_release_ranks_below_release() {
        assert_eq!(compare_versions("1.0.0-beta", "1.0.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0-rc1", "1.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0-alpha", "1.0.0-beta"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0-dev", "1.0.0-alpha"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0-pl1", "1.0.0"), Ordering::Greater);
    }

    #[test]
    fn extra_numeric_segment_is_newer() {
        assert_eq!(compare_versions("1.2.1", "1.2"), Ordering::Greater);
        assert!(is_newer_version("2.0.1", "2.0"));
        assert!(!is_newer_version("2.0", "2.0"));
    }

    #[test]
    fn empty_version_sorts_lowest() {
        assert_eq!(compare_versions("", "0.1"), Ordering::Less);
        assert_eq!(compare_versions("0.1", ""), Ordering::Greater);
        assert_eq!(compare_versions("", ""), Ordering::Equal);
    }

    #[test]
    fn missing_tag_names_sort_below_present_ones() {
        assert_eq!(compare_tag_names(None, Some("0.0.1")), Ordering::Less);
        assert_eq!(compare_tag_names(Some("0.0.1"), None), Ordering::Greater);
        assert_eq!(compare_tag_names(None, None), Ordering::Equal);
    }

    #[test]
    fn looks_like_version_accepts_common_forms() {
        assert!(looks_like_version("v2.0.1"));
        assert!(looks_like_version("2.0-rc1"));
        assert!(looks_like_version("1.2.3"));
        assert!(looks_like_version("4.1b"));
        assert!(looks_like_version("3.0_patch"));
        assert!(looks_like_version("1.0 final"));
        assert!(looks_like_version("12345"));
    }

    #[test]
    fn looks_like_version_rejects_other_names() {
        assert!(!looks_like_version("latest"));
        assert!(!looks_like_version("stable-build-42"));
        assert!(!looks_like_version(""));
        assert!(!looks_like_version("v"));
        assert!(!looks_like_version("123456"));
        assert!(!looks_like_version("1.2.3.4.5.6"));
        assert!(!looks_like_version("1.2x"));
    }

    #[test]
    fn sort_by_version_desc_filters_and_orders() {
        let tags = vec!["v1.0", "nightly", "v2.0", "v1.9", "v1.10"];

        let sorted = sort_by_version_desc(tags, |tag| Some(*tag));

        assert_eq!(sorted, vec!["v2.0", "v1.10", "v1.9", "v1.0"]);
    }
}
