#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use inkpress::pipeline::{GenerateRequest, Pipeline};
use inkpress::store::{MemoryOutcomeStore, Recorder};

use common::{pdf_text, test_config};

fn setup() -> (TempDir, Pipeline, Arc<MemoryOutcomeStore>) {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let store = Arc::new(MemoryOutcomeStore::new());
    let pipeline = Pipeline::new(&config, Recorder::new(store.clone()));
    (tmp, pipeline, store)
}

#[tokio::test]
async fn test_html_fragment_wrapped_and_rendered() {
    let (_tmp, pipeline, store) = setup();

    let run = pipeline
        .run(GenerateRequest::new("html", "<h1>Hi</h1>"))
        .await;
    run.recording.await.unwrap();

    let pdf = run.result.expect("html generation failed");
    assert_eq!(pdf.file_name, "html_document.pdf");
    let body = pdf_text(&pdf.bytes);
    assert!(body.starts_with("%PDF-1.4\n<!DOCTYPE html>"));
    assert!(body.contains("<div class=\"container\">\n<h1>Hi</h1>\n    </div>"));

    let outcome = &store.outcomes()[0];
    assert!(outcome.success);
    assert!(outcome
        .fixes
        .contains(&"Added complete HTML5 document structure".to_string()));
    assert_eq!(outcome.artifact_size, Some(pdf.bytes.len() as u64));
}

#[tokio::test]
async fn test_smart_quotes_straightened_before_execution() {
    let (_tmp, pipeline, _store) = setup();

    let run = pipeline
        .run(GenerateRequest::new(
            "python",
            "title = “Quarterly Report”\nprint(title)",
        ))
        .await;

    let body = pdf_text(&run.result.unwrap().bytes);
    assert!(body.contains("title = \"Quarterly Report\""));
    assert!(!body.contains('“') && !body.contains('”'));
    assert!(run
        .outcome
        .fixes
        .contains(&"Fixed smart quotes → regular quotes".to_string()));
}

#[tokio::test]
async fn test_javascript_reports_advisory() {
    let (_tmp, pipeline, store) = setup();

    let run = pipeline
        .run(GenerateRequest::new(
            "javascript",
            "const doc = new jsPDF();\ndoc.text('Hi', 10, 10);",
        ))
        .await;
    run.recording.await.unwrap();

    let err = run.result.unwrap_err();
    assert_eq!(err.status().as_u16(), 500);
    assert_eq!(
        err.to_string(),
        "Code execution error: JavaScript execution requires Node.js setup. Please use Python or HTML instead."
    );
    let outcome = &store.outcomes()[0];
    assert!(!outcome.success);
    assert!(outcome.artifact_size.is_none());
}

#[tokio::test]
async fn test_dangerous_snippet_rejected_before_execution() {
    let (tmp, pipeline, store) = setup();

    let run = pipeline
        .run(GenerateRequest::new("python", "result = eval(“1 + 1”)"))
        .await;
    run.recording.await.unwrap();

    let err = run.result.unwrap_err();
    assert_eq!(err.status().as_u16(), 400);
    assert_eq!(
        err.to_string(),
        "Code contains potentially dangerous pattern: eval("
    );

    let outcome = &store.outcomes()[0];
    assert!(!outcome.success);
    assert!(outcome.fixes.is_empty());
    // No workspace was ever created
    assert!(!tmp.path().join("work").exists());
}

#[tokio::test]
async fn test_story_builder_gains_single_build_call() {
    let (_tmp, pipeline, _store) = setup();

    let code = "doc = SimpleDocTemplate('report.pdf')\n\
                story = []\n\
                story.append(Paragraph('Intro'))\n\
                story.append(Spacer(1, 12))";
    let run = pipeline.run(GenerateRequest::new("python", code)).await;

    let body = pdf_text(&run.result.unwrap().bytes);
    assert_eq!(body.matches("doc.build(story)").count(), 1);
    assert!(body.find("doc.build(story)") > body.rfind("story.append("));
    assert!(body.contains("from reportlab.platypus import"));
}

#[tokio::test]
async fn test_visualization_gets_backend_once() {
    let (_tmp, pipeline, _store) = setup();

    let run = pipeline
        .run(GenerateRequest::new(
            "matplotlib",
            "plt.plot([1, 2, 3], [4, 5, 6])\nplt.show()",
        ))
        .await;

    let body = pdf_text(&run.result.unwrap().bytes);
    assert!(body.starts_with("%PDF-1.4\nimport matplotlib\nmatplotlib.use('Agg')"));
    assert_eq!(body.matches("matplotlib.use(").count(), 1);
    assert!(body.contains("pass  # plt.show() removed for PDF generation"));
    assert!(body.contains("plt.savefig('chart.pdf', bbox_inches='tight', dpi=300)"));
}

#[tokio::test]
async fn test_failing_snippet_reports_cause_and_fixes() {
    let (_tmp, pipeline, store) = setup();

    let run = pipeline
        .run(GenerateRequest::new("python", "# RAISE_ERROR\nx = “1”"))
        .await;
    run.recording.await.unwrap();

    let err = run.result.unwrap_err();
    assert_eq!(err.status().as_u16(), 500);
    assert_eq!(err.to_string(), "Code execution error: ValueError: boom");

    let outcome = &store.outcomes()[0];
    assert_eq!(
        outcome.error_message.as_deref(),
        Some("Code execution error: ValueError: boom")
    );
    assert!(!outcome.fixes.is_empty());
}

#[tokio::test]
async fn test_clean_exit_without_pdf_is_artifact_missing() {
    let (_tmp, pipeline, _store) = setup();

    let run = pipeline
        .run(GenerateRequest::new("python", "# NO_PDF\nx = 1"))
        .await;

    let err = run.result.unwrap_err();
    assert_eq!(err.status().as_u16(), 400);
    let message = err.to_string();
    assert!(message.starts_with("No PDF file was generated. Check your code for errors."));
    assert!(message.contains("Error: nothing was built"));
}

#[tokio::test]
async fn test_runaway_snippet_times_out() {
    let (_tmp, pipeline, _store) = setup();

    let run = pipeline
        .run(GenerateRequest::new("python", "# SLEEP_FOREVER\nx = 1"))
        .await;

    let err = run.result.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Code execution error: execution timed out after 2s"
    );
    assert!(run.outcome.duration < Duration::from_secs(10));
}

#[tokio::test]
async fn test_success_duration_is_measured() {
    let (_tmp, pipeline, _store) = setup();

    let run = pipeline
        .run(GenerateRequest::new("python", "x = 1"))
        .await;

    assert!(run.outcome.success);
    assert!(run.outcome.duration > Duration::ZERO);
    assert!(run.outcome.duration < Duration::from_secs(10));
    assert!(run.outcome.artifact_size.unwrap() > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_never_share_artifacts() {
    let (_tmp, pipeline, store) = setup();
    let pipeline = Arc::new(pipeline);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let run = pipeline
                    .run(GenerateRequest::new("python", format!("marker = {}\n", i)))
                    .await;
                run.recording.await.unwrap();
                (i, run.result)
            })
        })
        .collect();

    for handle in handles {
        let (i, result) = handle.await.unwrap();
        let body = pdf_text(&result.unwrap().bytes);
        assert_eq!(body, format!("%PDF-1.4\nmarker = {}", i));
    }

    assert_eq!(store.outcomes().len(), 8);
    assert!(store.outcomes().iter().all(|o| o.success));
}
