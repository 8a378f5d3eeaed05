//! Integration tests for capture replay and lock verification.
//!
//! Captures are built inline as JSON lines; no files or network needed.
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=book_replay=debug cargo test --test replay_lock
//! ```

use book_replay::audit::{AuditEvent, MemorySink, Scalar};
use book_replay::orderbook::sha256_hex;
use book_replay::replay::{raw_sha256, seal, EXIT_FAIL, EXIT_PASS};
use book_replay::types::{ExpectedLock, LockField};
use book_replay::{verify, verify_capture, Config, Error, VerifyResult};

/// Route engine logs to the test harness when RUST_LOG is set
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One push line; `bids` and `asks` are JSON arrays of `[price, size]`
fn push(action: &str, seq: i64, prev: i64, bids: &str, asks: &str) -> String {
    let seqs = format!(r#""seqId":{seq},"prevSeqId":{prev}"#);
    let levels = format!(r#""bids":{bids},"asks":{asks}"#);
    format!(r#"{{"action":"{action}","data":[{{{seqs},{levels}}}]}}"#)
}

fn snapshot(seq: i64, bids: &str, asks: &str) -> String {
    push("snapshot", seq, -1, bids, asks)
}

fn update(seq: i64, prev: i64, bids: &str, asks: &str) -> String {
    push("update", seq, prev, bids, asks)
}

fn capture(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Snapshot followed by a tombstone for one bid
fn basic_capture() -> Vec<String> {
    vec![
        snapshot(1, r#"[["100","1"],["99","2"]]"#, r#"[["101","1"]]"#),
        update(2, 1, r#"[["99","0"]]"#, "[]"),
    ]
}

fn lock_for(raw: &str) -> ExpectedLock {
    seal(raw.as_bytes(), "okx-books", None, MemorySink::new()).unwrap()
}

#[test]
fn test_end_to_end_digest() {
    init_tracing();
    let raw = capture(&basic_capture());
    let lock = lock_for(&raw);

    let expected = sha256_hex(br#"{"asks":[["101","1"]],"bids":[["100","1"]]}"#);
    assert_eq!(lock.canonical_book_digest_sha256, expected);
    assert_eq!(lock.messages_n, 2);
    assert_eq!(lock.final_seq_id, 2);
    assert_eq!(lock.raw_sha256, raw_sha256(raw.as_bytes()));

    let config = Config::new("okx-books");
    let result = verify_capture(raw.as_bytes(), &lock, &config, MemorySink::new());
    assert!(result.is_pass(), "unexpected result: {:?}", result);
    assert_eq!(result.exit_code(), EXIT_PASS);
}

#[test]
fn test_replay_is_deterministic() {
    let lines = vec![
        snapshot(
            10,
            r#"[["9.5","3"],["10","1"],["9.50","2"]]"#,
            r#"[["11","1"],["10.75","4"]]"#,
        ),
        update(11, 10, r#"[["10","0"],["9.25","7"]]"#, r#"[["12","1"]]"#),
        update(11, 11, "[]", "[]"),
        update(12, 11, "[]", r#"[["11","0"]]"#),
    ];
    let raw = capture(&lines);

    let first = lock_for(&raw);
    let second = lock_for(&raw);
    assert_eq!(first, second);
}

#[test]
fn test_every_transition_is_audited_in_order() {
    init_tracing();
    let lines = vec![
        snapshot(1, r#"[["100","1"]]"#, r#"[["101","1"]]"#),
        update(2, 1, r#"[["99","2"]]"#, "[]"),
        // same seqId and prevSeqId
        update(2, 2, r#"[["99","0"]]"#, "[]"),
        // stale reference: last applied is 2
        update(5, 1, r#"[["100","0"]]"#, "[]"),
        update(6, 5, "[]", "[]"),
        snapshot(10, r#"[["98","1"]]"#, r#"[["103","1"]]"#),
    ];
    let raw = capture(&lines);
    let lock = lock_for(&raw);

    let mut sink = MemorySink::new();
    let report = match verify(raw.lines(), &lock, &mut sink) {
        VerifyResult::Pass(report) => report,
        other => panic!("Expected Pass, got {:?}", other),
    };

    // one record per message, plus the seal
    let records = sink.records();
    assert_eq!(report.messages_n, 6);
    assert_eq!(records.len() as u64, report.messages_n + 1);

    let trail: Vec<_> = records.iter().map(|r| (r.event, r.reason_code)).collect();
    assert_eq!(
        trail,
        vec![
            (AuditEvent::BookBoot, "SNAPSHOT_BOOT"),
            (AuditEvent::BookApply, "DELTA_APPLIED"),
            (AuditEvent::BookApply, "SEQ_UNCHANGED"),
            (AuditEvent::BookReset, "STALE_PREV_SEQ"),
            (AuditEvent::BookApply, "DELTA_EMPTY"),
            (AuditEvent::BookReset, "SNAPSHOT_RESET"),
            (AuditEvent::BookSeal, "LOCK_MATCH"),
        ]
    );

    for (index, record) in records[..6].iter().enumerate() {
        assert_eq!(record.attrs.get("msg_index"), Some(&Scalar::from(index)));
    }
    assert_eq!(report.stats.total(), report.messages_n);
    assert_eq!(report.stats.skip, 1);
    assert_eq!(report.stats.reset_path, 1);
    assert_eq!(report.stats.reset, 1);
    assert_eq!(report.final_seq_id, 10);
}

#[test]
fn test_gap_aborts_without_digest() {
    init_tracing();
    let mut lines = basic_capture();
    // last applied is 2, so prevSeqId 7 is a gap of 5
    lines.push(update(8, 7, r#"[["100","0"]]"#, "[]"));
    lines.push(update(9, 8, "[]", "[]"));

    let good = lock_for(&capture(&basic_capture()));
    let mut sink = MemorySink::new();
    let result = verify(&lines, &good, &mut sink);

    match &result {
        VerifyResult::Fatal(Error::SequenceGap { gap, seq_id, .. }) => {
            assert_eq!(*gap, 5);
            assert_eq!(*seq_id, 8);
        }
        other => panic!("Expected SequenceGap, got {:?}", other),
    }
    assert_eq!(result.exit_code(), EXIT_FAIL);
    assert_eq!(sink.count(AuditEvent::BookGap), 1);
    assert_eq!(sink.count(AuditEvent::BookSeal), 0);
    // boot + apply before the gap, nothing after it
    assert_eq!(sink.records().len(), 3);
}

#[test]
fn test_gap_capture_cannot_be_sealed() {
    let mut lines = basic_capture();
    lines.push(update(4, 3, "[]", "[]"));
    let raw = capture(&lines);
    let result = seal(raw.as_bytes(), "okx-books", None, MemorySink::new());
    assert!(matches!(result, Err(Error::SequenceGap { gap: 1, .. })));
}

#[test]
fn test_final_seq_is_last_non_skip_message() {
    let lines = vec![
        snapshot(100, r#"[["1","1"]]"#, "[]"),
        update(105, 100, "[]", "[]"),
        update(103, 101, "[]", "[]"),
        update(103, 103, "[]", "[]"),
    ];
    let lock = lock_for(&capture(&lines));
    assert_eq!(lock.final_seq_id, 103);
}

#[test]
fn test_reset_path_keeps_book() {
    let with_stale = vec![
        snapshot(1, r#"[["100","1"]]"#, r#"[["101","1"]]"#),
        update(5, 1, "[]", "[]"),
        // stale reference: its delta must not reach the book
        update(6, 2, r#"[["100","0"]]"#, "[]"),
        update(7, 6, "[]", r#"[["102","2"]]"#),
    ];
    let plain = vec![
        snapshot(1, r#"[["100","1"]]"#, r#"[["101","1"]]"#),
        update(7, 1, "[]", r#"[["102","2"]]"#),
    ];

    let mut sink = MemorySink::new();
    let stale_lock = seal(capture(&with_stale).as_bytes(), "p", None, &mut sink).unwrap();
    let plain_lock = lock_for(&capture(&plain));

    assert_eq!(
        stale_lock.canonical_book_digest_sha256,
        plain_lock.canonical_book_digest_sha256
    );
    assert_eq!(stale_lock.final_seq_id, 7);
    assert_eq!(sink.count(AuditEvent::BookReset), 1);
}

#[test]
fn test_resnapshot_replaces_book() {
    let lines = vec![
        snapshot(1, r#"[["100","1"]]"#, r#"[["101","1"]]"#),
        update(2, 1, r#"[["99","4"]]"#, "[]"),
        snapshot(50, r#"[["98","1"]]"#, r#"[["103","1"]]"#),
    ];
    let lock = lock_for(&capture(&lines));
    let expected = sha256_hex(br#"{"asks":[["103","1"]],"bids":[["98","1"]]}"#);
    assert_eq!(lock.canonical_book_digest_sha256, expected);
    assert_eq!(lock.final_seq_id, 50);
}

#[test]
fn test_update_before_snapshot_is_fatal() {
    let lines = vec![update(2, 1, "[]", "[]"), snapshot(3, "[]", "[]")];
    let lock = lock_for(&capture(&basic_capture()));
    let result = verify(&lines, &lock, MemorySink::new());
    assert!(matches!(
        result,
        VerifyResult::Fatal(Error::ProtocolOrder { seq_id: 2 })
    ));
}

#[test]
fn test_extreme_seq_ids_gap_is_fatal() {
    let lines = vec![
        snapshot(i64::MIN, r#"[["100","1"]]"#, "[]"),
        update(5, 1, "[]", "[]"),
    ];
    let lock = lock_for(&capture(&basic_capture()));
    let mut sink = MemorySink::new();
    let result = verify(&lines, &lock, &mut sink);

    match &result {
        VerifyResult::Fatal(Error::SequenceGap { gap, .. }) => assert_eq!(*gap, i64::MAX),
        other => panic!("Expected SequenceGap, got {:?}", other),
    }
    assert_eq!(result.exit_code(), EXIT_FAIL);
    assert_eq!(sink.count(AuditEvent::BookGap), 1);
}

#[test]
fn test_digest_mismatch() {
    let raw = capture(&basic_capture());
    let mut lock = lock_for(&raw);
    lock.canonical_book_digest_sha256 = sha256_hex(b"something else");

    let result = verify(raw.lines(), &lock, MemorySink::new());
    assert_eq!(result.mismatched_field(), Some(LockField::CanonicalDigest));
}

#[test]
fn test_capture_preconditions() {
    let raw = capture(&basic_capture());
    let lock = lock_for(&raw);
    let config = Config::new("okx-books");

    let tampered = raw.replace("[\"100\",\"1\"]", "[\"100\",\"5\"]");
    let mut sink = MemorySink::new();
    let result = verify_capture(tampered.as_bytes(), &lock, &config, &mut sink);
    assert_eq!(result.mismatched_field(), Some(LockField::RawSha256));
    // no replay after a failed precondition
    assert!(sink.records().is_empty());

    let other = Config::new("other-venue");
    let result = verify_capture(raw.as_bytes(), &lock, &other, MemorySink::new());
    assert_eq!(result.mismatched_field(), Some(LockField::ProviderId));

    let pinned = Config::new("okx-books").with_schema_version("2");
    let result = verify_capture(raw.as_bytes(), &lock, &pinned, MemorySink::new());
    assert_eq!(result.mismatched_field(), Some(LockField::SchemaVersion));

    // with the raw check off the tampered level reaches the book
    let trusted = Config::new("okx-books").with_raw_digest_check(false);
    let result = verify_capture(tampered.as_bytes(), &lock, &trusted, MemorySink::new());
    assert_eq!(result.mismatched_field(), Some(LockField::CanonicalDigest));
}

#[test]
fn test_lock_json_roundtrip_verifies() {
    let raw = capture(&basic_capture());
    let lock = lock_for(&raw);
    let reloaded = ExpectedLock::from_json(&lock.to_json_pretty().unwrap()).unwrap();
    let config = Config::new("okx-books");
    let result = verify_capture(raw.as_bytes(), &reloaded, &config, MemorySink::new());
    assert!(result.is_pass());
}
