mod common;

use common::ScriptedChat;
use rs_mail_tabulator::domain::email::EmailRecord;
use rs_mail_tabulator::error::{ExtractionError, Stage};
use rs_mail_tabulator::llm::extraction::{CONFIRM_PROMPT, EXTRACT_PROMPT, ExtractionClient, Outcome};
use rs_mail_tabulator::retry::RetryPolicy;
use rs_mail_tabulator::sheet::TableWriter;

fn record(subject: &str, body: &str) -> EmailRecord {
    EmailRecord {
        body: body.to_string(),
        subject: subject.to_string(),
        date: String::new(),
        from: String::new(),
        to: String::new(),
    }
}

#[test]
fn negative_confirmation_skips_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let writer = TableWriter::new(dir.path());
    let chat = ScriptedChat::new([Some("NO, I CAN'T.")]);
    let client = ExtractionClient::new(&chat, RetryPolicy::immediate(3));

    let outcome = client.process(&record("Hello", "just saying hi"), &writer).unwrap();

    assert_eq!(outcome, Outcome::Declined);
    assert_eq!(chat.calls(), 1);
    assert_eq!(chat.system_prompt(0), CONFIRM_PROMPT);
    assert!(!writer.path_for("Hello").exists());
}

#[test]
fn positive_confirmation_extracts_and_writes() {
    let dir = tempfile::tempdir().unwrap();
    let writer = TableWriter::new(dir.path());
    let reply = r#"[{"item":"apple","qty":"2"}]"#;
    let chat = ScriptedChat::new([Some("yes, i can."), Some(reply)]);
    let client = ExtractionClient::new(&chat, RetryPolicy::immediate(3));

    let outcome = client.process(&record("Fruit order", "2 apples"), &writer).unwrap();

    let expected_path = dir.path().join("Fruit order.xlsx");
    assert_eq!(
        outcome,
        Outcome::Written {
            path: expected_path.clone(),
            rows: 1,
            reply: reply.to_string(),
        }
    );
    assert!(expected_path.exists());
    assert_eq!(chat.calls(), 2);
    assert_eq!(chat.system_prompt(1), EXTRACT_PROMPT);
    assert_eq!(chat.requests.borrow()[1][1].content, "2 apples");
}

#[test]
fn malformed_replies_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let writer = TableWriter::new(dir.path());
    let chat = ScriptedChat::new([
        Some("YES, I CAN."),
        Some("[{'item': 'apple'"),
        Some("Here is your data!"),
        Some(r#"[{"item":"apple"}]"#),
    ]);
    let client = ExtractionClient::new(&chat, RetryPolicy::immediate(5));

    let outcome = client.process(&record("retry", "apple"), &writer).unwrap();

    assert!(matches!(outcome, Outcome::Written { rows: 1, .. }));
    assert_eq!(chat.calls(), 4);
}

#[test]
fn retries_stop_at_the_configured_limit() {
    let dir = tempfile::tempdir().unwrap();
    let writer = TableWriter::new(dir.path());
    let chat = ScriptedChat::new([Some("YES"), Some("nope"), Some("still nope")]);
    let client = ExtractionClient::new(&chat, RetryPolicy::immediate(2));

    let err = client.process(&record("bounded", "x"), &writer).unwrap_err();

    assert!(matches!(
        err,
        ExtractionError::AttemptsExhausted { attempts: 2, .. }
    ));
    assert_eq!(chat.calls(), 3);
    assert!(!writer.path_for("bounded").exists());
}

#[test]
fn empty_confirmation_is_no_response() {
    let dir = tempfile::tempdir().unwrap();
    let writer = TableWriter::new(dir.path());
    let chat = ScriptedChat::new([None::<&str>]);
    let client = ExtractionClient::new(&chat, RetryPolicy::immediate(3));

    let err = client.process(&record("silent", "x"), &writer).unwrap_err();

    assert!(matches!(
        err,
        ExtractionError::NoResponse {
            stage: Stage::Confirm
        }
    ));
    assert_eq!(chat.calls(), 1);
}

#[test]
fn empty_extraction_reply_stops_without_retry() {
    let dir = tempfile::tempdir().unwrap();
    let writer = TableWriter::new(dir.path());
    let chat = ScriptedChat::new([Some("YES, I CAN."), None]);
    let client = ExtractionClient::new(&chat, RetryPolicy::immediate(5));

    let err = client.process(&record("silent", "x"), &writer).unwrap_err();

    assert!(matches!(
        err,
        ExtractionError::NoResponse {
            stage: Stage::Extract
        }
    ));
    assert_eq!(chat.calls(), 2);
}
