//! Structural similarity between two SQL statements.
//!
//! The score blends keyword overlap (60%) with overlap of the tables named
//! after `FROM`/`JOIN` (40%). Each overlap is `|A ∩ B| / max(|A|, |B|)` and
//! counts as 0 when both sets are empty. The result is rounded to two
//! decimals and always lies in [0, 1].

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

/// Weight of keyword overlap in the final score
pub const KEYWORD_WEIGHT: f64 = 0.6;

/// Weight of table overlap in the final score
pub const TABLE_WEIGHT: f64 = 0.4;

static KEYWORD_RE: OnceLock<Regex> = OnceLock::new();
static TABLE_RE: OnceLock<Regex> = OnceLock::new();

fn keyword_re() -> &'static Regex {
    KEYWORD_RE.get_or_init(|| {
        Regex::new(
            r"\b(SELECT|FROM|WHERE|GROUP\s+BY|ORDER\s+BY|JOIN|HAVING|AND|OR|IN|EXISTS|NOT|LIKE|BETWEEN|IS\s+NULL|IS\s+NOT\s+NULL)\b",
        )
        .expect("keyword pattern is valid")
    })
}

fn table_re() -> &'static Regex {
    TABLE_RE.get_or_init(|| {
        Regex::new(r"\b(?:FROM|JOIN)\s+(\w+)\b").expect("table pattern is valid")
    })
}

/// Score a submitted statement against a reference statement
pub fn score(submitted: &str, reference: &str) -> f64 {
    let submitted = fold(submitted);
    let reference = fold(reference);

    let keyword_score = overlap(&keyword_set(&submitted), &keyword_set(&reference));
    let table_score = overlap(&table_set(&submitted), &table_set(&reference));

    let value = round2(KEYWORD_WEIGHT * keyword_score + TABLE_WEIGHT * table_score);
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Keywords present in `query`, canonicalised (`GROUP   BY` -> `GROUP BY`).
///
/// Expects an already uppercased query.
pub fn keyword_set(query: &str) -> BTreeSet<String> {
    keyword_re()
        .find_iter(query)
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .collect()
}

/// Identifiers immediately following `FROM` or `JOIN`.
///
/// Expects an already uppercased query.
pub fn table_set(query: &str) -> BTreeSet<String> {
    table_re()
        .captures_iter(query)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Round to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn fold(query: &str) -> String {
    query.trim().to_uppercase()
}

fn overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let largest = a.len().max(b.len());
    if largest == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / largest as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_statements_score_one() {
        let query = "SELECT titre FROM LIVRES WHERE annee>2020;";
        assert_eq!(score(query, query), 1.0);
    }

    #[test]
    fn test_case_and_whitespace_are_ignored() {
        let a = "select titre from livres where annee > 2020";
        let b = "  SELECT titre\nFROM LIVRES\nWHERE annee>2020;  ";
        assert_eq!(score(a, b), 1.0);
    }

    #[test]
    fn test_empty_side_scores_zero() {
        assert_eq!(score("", "SELECT a FROM t"), 0.0);
        assert_eq!(score("hello world", "SELECT a FROM t"), 0.0);
        assert_eq!(score("", ""), 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        // K1 = {SELECT, FROM}, K2 = {SELECT, FROM, WHERE}; T1 = T2 = {LIVRES}
        let value = score("SELECT * FROM livres", "SELECT * FROM livres WHERE a = 1");
        assert_eq!(value, round2(0.6 * 2.0 / 3.0 + 0.4));
        assert_eq!(value, 0.8);
    }

    #[test]
    fn test_different_tables() {
        // Keywords match, tables do not
        assert_eq!(score("SELECT a FROM x", "SELECT a FROM y"), 0.6);
    }

    #[test]
    fn test_keyword_set_multiword() {
        let set = keyword_set("SELECT A FROM T WHERE B IS NOT NULL GROUP   BY A");
        let expected: BTreeSet<String> = ["SELECT", "FROM", "WHERE", "IS NOT NULL", "GROUP BY"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn test_keyword_set_whole_words_only() {
        let set = keyword_set("SELECT INDEX, ORDERS FROM INFORMATION");
        assert!(!set.contains("IN"));
        assert!(!set.contains("OR"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_table_set_from_and_join() {
        let set = table_set("SELECT * FROM LIVRES L JOIN AUTEURS A ON L.A = A.ID JOIN  EMPRUNTS E");
        let expected: BTreeSet<String> = ["LIVRES", "AUTEURS", "EMPRUNTS"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn test_score_always_bounded() {
        let inputs = [
            "",
            ";;;",
            "FROM",
            "JOIN JOIN JOIN",
            "ñandú FROM été",
            "SELECT * FROM a JOIN b JOIN c WHERE x IN (SELECT y FROM z)",
            "\u{0}\u{1}garbage",
        ];
        for a in inputs {
            for b in inputs {
                let value = score(a, b);
                assert!((0.0..=1.0).contains(&value), "{a:?} vs {b:?} -> {value}");
            }
        }
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.666_666), 0.67);
        assert_eq!(round2(0.0), 0.0);
    }
}
