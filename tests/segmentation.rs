//! Segmentation and Similarity Integration Tests
//!
//! Realistic coursework layouts run through the segmenter, then scored.

use sqlgrade::core::similarity::score;
use sqlgrade::core::{normalize, StatementSegmenter};

const SUBMISSION: &str = "\
TP3 - Bibliothèque
Nom : Martin

Exercice 1 : liste des livres récents
SELECT titre, annee
FROM livres
WHERE annee > 2020;

Exercice 2 : nombre d'emprunts par lecteur
-- jointure sur les emprunts
SELECT l.nom, COUNT(*)
FROM lecteurs l
JOIN emprunts e ON e.lecteur_id = l.id
GROUP BY l.nom
HAVING COUNT(*) > 2;
";

#[test]
fn test_coursework_layout() {
    let statements = StatementSegmenter::segment(&[SUBMISSION]);

    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0].index, 0);
    assert_eq!(statements[1].index, 1);
    assert_eq!(
        normalize(&statements[0].text),
        "SELECT TITRE, ANNEE FROM LIVRES WHERE ANNEE > 2020"
    );
    assert!(statements[1].text.starts_with("-- jointure"));
    assert!(statements[1].text.ends_with("HAVING COUNT(*) > 2;"));
}

#[test]
fn test_page_break_inside_statement() {
    let pages = [
        "Exercice 1\nSELECT titre\nFROM livres",
        "Page 2\nWHERE annee > 2020;\nFin du devoir",
    ];

    let statements = StatementSegmenter::segment(&pages);

    // "Page 2" lands inside the open statement
    assert_eq!(statements.len(), 1);
    assert_eq!(
        statements[0].text,
        "SELECT titre\nFROM livres\nPage 2\nWHERE annee > 2020;"
    );
}

#[test]
fn test_round_trip_of_terminated_statements() {
    let originals = [
        "SELECT * FROM a;",
        "SELECT b FROM c WHERE d = 1;",
        "SELECT e FROM f JOIN g ON f.id = g.id;",
    ];
    let text = originals.join("\n\nRéponse suivante\n\n");

    let statements = StatementSegmenter::segment(&[text]);

    let texts: Vec<&str> = statements.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, originals);
}

#[test]
fn test_segmented_statements_score_against_reference() {
    let reference = "\
SELECT titre, annee FROM livres WHERE annee > 2020;
SELECT l.nom, COUNT(*) FROM lecteurs l JOIN emprunts e ON e.lecteur_id = l.id GROUP BY l.nom HAVING COUNT(*) > 2;
";
    let submitted = StatementSegmenter::segment(&[SUBMISSION]);
    let expected = StatementSegmenter::segment(&[reference]);

    assert_eq!(submitted.len(), expected.len());
    for (sub, reference) in submitted.iter().zip(&expected) {
        assert_eq!(score(&sub.text, &reference.text), 1.0);
    }
}

#[test]
fn test_similarity_properties() {
    let samples = [
        "SELECT * FROM livres",
        "select * from livres where annee > 2000",
        "SELECT a FROM x JOIN y ON x.id = y.id",
        "SELECT nom FROM lecteurs GROUP BY nom ORDER BY nom",
        "not sql at all",
        "",
    ];

    for a in samples {
        for b in samples {
            let value = score(a, b);
            assert!((0.0..=1.0).contains(&value));
            assert_eq!(value, score(b, a), "symmetry: {a:?} / {b:?}");
            // Two decimals at most
            assert_eq!(value, (value * 100.0).round() / 100.0);
        }
    }

    for a in samples.iter().filter(|s| s.to_uppercase().contains("FROM")) {
        assert_eq!(score(a, a), 1.0);
    }
}
