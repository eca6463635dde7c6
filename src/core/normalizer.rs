//! Canonical display form of SQL statements.
//!
//! Used for prompts, logs and CLI output. Similarity scoring does its own
//! case folding and never goes through here.

/// Normalize a statement: drop `--` comments, collapse whitespace, uppercase,
/// and strip trailing semicolons.
pub fn normalize(query: &str) -> String {
    let without_comments: Vec<&str> = query.lines().map(strip_comment).collect();

    let collapsed = without_comments
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    collapsed
        .to_uppercase()
        .trim_end_matches(';')
        .trim_end()
        .to_string()
}

fn strip_comment(line: &str) -> &str {
    match line.find("--") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(
            normalize("select  titre\n\tfrom livres ;"),
            "SELECT TITRE FROM LIVRES"
        );
    }

    #[test]
    fn test_normalize_strips_comments() {
        let query = "-- Question 2\nSELECT nom -- the name\nFROM auteurs;";
        assert_eq!(normalize(query), "SELECT NOM FROM AUTEURS");
    }

    #[test]
    fn test_normalize_multiple_semicolons() {
        assert_eq!(normalize("select 1;;"), "SELECT 1");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("-- only a comment"), "");
    }
}
