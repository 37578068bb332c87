use courier_foundation::{
    Email, FallbackMimeTypeProvider, FallbackSender, FixedProvider, Message, MessageSender, MimeType,
    MimeTypeError, MimeTypeProvider, SendError,
};
use courier_kernel::{AttemptError, FallbackExecutor};
use courier_testing::{DecliningSender, FailingSender, RecordingSender, assert_sent, init_tracing};
use std::cell::RefCell;

#[test]
fn fallback_stops_at_first_success() {
    init_tracing();
    let called = RefCell::new(Vec::new());
    let executor = FallbackExecutor::new("abc")
        .with_candidate("A", Err::<u32, _>("a broke"))
        .with_candidate("B", Err("b broke"))
        .with_candidate("C", Ok(3))
        .with_candidate("D", Ok(4));

    let result = executor
        .execute_with_fallback(|outcome| {
            called.borrow_mut().push(*outcome);
            (*outcome).map_err(AttemptError::failed)
        })
        .unwrap();

    assert_eq!(result.value, 3);
    assert_eq!(result.index, 2);
    assert_eq!(result.candidate, "C");
    assert_eq!(called.borrow().len(), 3);
}

#[test]
fn exhaustion_keeps_every_cause_in_order() {
    let executor = FallbackExecutor::new("ab")
        .with_candidate("A", "a broke")
        .with_candidate("B", "b broke");

    let err = executor
        .execute_with_fallback(|reason| Err::<(), _>(AttemptError::failed(*reason)))
        .unwrap_err();

    assert_eq!(err.attempts.len(), 2);
    assert_eq!(err.attempts[0].index, 0);
    assert_eq!(err.attempts[0].cause.to_string(), "failed: a broke");
    assert_eq!(err.attempts[1].candidate, "B");
    assert_eq!(err.attempts[1].cause.to_string(), "failed: b broke");
}

#[test]
fn fallback_sender_skips_declines_and_failures() {
    init_tracing();
    let quota = DecliningSender::new("sendgrid", "quota reached");
    let smtp = FailingSender::new("smtp", "connection refused");
    let console = RecordingSender::new("console");
    let never = RecordingSender::new("never");

    let sender = FallbackSender::new("at-any-cost")
        .with_sender(quota.clone())
        .with_sender(smtp.clone())
        .with_sender(console.clone())
        .with_sender(never.clone());

    let message: Message = Email::new("Hi", "Hello").to("ada@example.org").into();
    sender.send(&message).unwrap();

    assert_eq!(quota.attempts(), 1);
    assert_eq!(smtp.attempts(), 1);
    assert_sent!(console, 1);
    assert_sent!(never, 0);
}

#[test]
fn fallback_sender_reports_every_attempt_when_exhausted() {
    let sender = FallbackSender::new("at-any-cost")
        .with_sender(DecliningSender::new("sendgrid", "quota reached"))
        .with_sender(FailingSender::new("smtp", "connection refused"));

    let message: Message = Email::new("Hi", "Hello").into();
    let err = sender.send(&message).unwrap_err();

    let SendError::AllFailed(all) = err else {
        panic!("expected exhaustion, got {err:?}");
    };
    assert_eq!(all.executor, "at-any-cost");
    assert!(all.attempts[0].cause.is_declined());
    assert!(!all.attempts[1].cause.is_declined());
    assert!(all.to_string().contains("connection refused"));
}

#[test]
fn mime_type_detection_falls_back_to_a_fixed_type() {
    let provider = FallbackMimeTypeProvider::default();
    assert_eq!(provider.from_file_name("logo.png").unwrap(), MimeType::new("image/png"));
    assert!(matches!(
        provider.from_bytes(b"unknown"),
        Err(MimeTypeError::NoProvider(_))
    ));

    let lenient = FallbackMimeTypeProvider::default().with_provider(FixedProvider(MimeType::new(
        "application/octet-stream",
    )));
    assert_eq!(lenient.provider_names(), vec!["magic-bytes", "extension", "fixed"]);
    assert_eq!(lenient.from_bytes(b"unknown").unwrap().as_str(), "application/octet-stream");
}
