use std::fs;
use std::sync::Arc;

use math_annotate::glossary::{GlossaryExtractor, GlossarySimplifier};
use math_annotate::store::load_questions;
use math_annotate::{
    AnnotationRecord, Annotator, AnnotatorError, Difficulty, JsonlSink, OpenMode,
};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

const INPUT: &str = r#"{"post_id": 11, "title": "Limits", "latex_title": "\\lim", "tags": "<calculus><limits>", "body": "Find the limit of [MATH]1/n[/MATH].", "latex": ["1/n"], "score": 3, "view_count": 40}
{"post_id": null, "title": null, "body": "Résoudre l'équation [MATH]x = 2[/MATH]."}

{"post_id": "13", "tags": ["algebra"], "body": "Show the matrix has an eigenvalue.", "score": null}
"#;

fn read_output(path: &std::path::Path) -> Vec<AnnotationRecord> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn glossary_annotator() -> Annotator {
    Annotator::new(
        Arc::new(GlossaryExtractor::new(5)),
        Arc::new(GlossarySimplifier::new()),
    )
}

#[test]
fn loads_forgiving_question_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("questions.jsonl");
    fs::write(&path, INPUT).unwrap();

    let records = load_questions(&path).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].tags, vec!["calculus", "limits"]);
    assert_eq!(records[0].latex_title, vec!["\\lim"]);
    assert_eq!(records[1].post_id, -1);
    assert_eq!(records[1].title, "");
    assert_eq!(records[2].post_id, 13);
    assert_eq!(records[2].score, 0);
}

#[test]
fn malformed_line_fails_the_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("questions.jsonl");
    fs::write(&path, "{\"post_id\": 1}\n{\"post_id\": 2,\n").unwrap();

    let err = load_questions(&path).unwrap_err();
    assert!(matches!(err, AnnotatorError::MalformedInput { line: 2, .. }));
}

#[test]
fn missing_input_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = load_questions(dir.path().join("absent.jsonl")).unwrap_err();
    assert!(matches!(err, AnnotatorError::Io { .. }));
}

#[tokio::test]
async fn annotated_file_has_one_line_per_question_in_order() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("questions.jsonl");
    let output = dir.path().join("out").join("annotated.jsonl");
    fs::write(&input, INPUT).unwrap();

    let records = load_questions(&input).unwrap();
    let mut sink = JsonlSink::open(&output, OpenMode::Truncate).unwrap();
    let stats = glossary_annotator()
        .annotate(&records, &mut sink, &CancellationToken::new())
        .await
        .unwrap();
    drop(sink);

    assert_eq!(stats.persisted, 3);
    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("Résoudre"), "non-ASCII should stay literal");
    assert!(!text.contains("[MATH]"));

    let out = read_output(&output);
    let ids: Vec<i64> = out.iter().map(|r| r.post_id).collect();
    assert_eq!(ids, vec![11, -1, 13]);

    assert_eq!(out[0].raw_passage, "Find the limit of $1/n$.");
    assert_eq!(out[0].terms.get("limit"), Some(&Difficulty::Medium));
    assert_eq!(out[0].tags, vec!["calculus", "limits"]);
    assert_eq!(out[2].difficulty, Difficulty::Medium);
    assert_eq!(out[2].terms.len(), 2);

    for rec in &out {
        let passage = rec.raw_passage.to_lowercase();
        assert!(rec.terms.keys().all(|t| passage.contains(&t.to_lowercase())));
    }
}

#[tokio::test]
async fn rerun_appends_after_existing_output() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("annotated.jsonl");
    let first = vec![math_annotate::QuestionRecord {
        post_id: 1,
        body: "a sum".into(),
        ..Default::default()
    }];
    let second = vec![math_annotate::QuestionRecord {
        post_id: 2,
        body: "a product".into(),
        ..Default::default()
    }];

    for batch in [&first, &second] {
        let mut sink = JsonlSink::open(&output, OpenMode::Append).unwrap();
        glossary_annotator()
            .annotate(batch, &mut sink, &CancellationToken::new())
            .await
            .unwrap();
    }

    let ids: Vec<i64> = read_output(&output).iter().map(|r| r.post_id).collect();
    assert_eq!(ids, vec![1, 2]);
}
