//! Verify a captured order-book feed against its lock.
//!
//! ```bash
//! cargo run --example verify_lock -- capture.jsonl capture.lock.json [provider_id]
//! ```
//!
//! Exit codes: 0 pass, 1 fatal or mismatch, 2 missing input.
//!
//! Pass `--seal` as the first argument to write a fresh lock instead. The new
//! lock is verified against the capture right after it is written:
//!
//! ```bash
//! cargo run --example verify_lock -- --seal capture.jsonl capture.lock.json okx-books
//! ```

use std::path::Path;
use std::process::exit;

use book_replay::audit::TracingSink;
use book_replay::replay::seal;
use book_replay::types::ExpectedLock;
use book_replay::{verify_capture, Config, Error, VerifyResult};
use tracing_subscriber::EnvFilter;

const DEFAULT_PROVIDER: &str = "okx-books";

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let sealing = args.first().map(String::as_str) == Some("--seal");
    if sealing {
        args.remove(0);
    }

    let result = match (args.first(), args.get(1)) {
        (Some(capture), Some(lock)) => {
            let (capture, lock) = (Path::new(capture), Path::new(lock));
            let provider = args.get(2).map_or(DEFAULT_PROVIDER, String::as_str);
            if sealing {
                seal_capture(capture, lock, provider)
            } else {
                verify_files(capture, lock, provider)
            }
        }
        _ => {
            eprintln!("usage: verify_lock [--seal] <capture.jsonl> <lock.json> [provider_id]");
            let missing = Error::InputMissing("capture and lock paths".to_string());
            report(VerifyResult::Fatal(missing))
        }
    };
    exit(result.exit_code());
}

/// Read a required input; an absent file is `InputMissing`, not an I/O failure
fn read_input(path: &Path) -> Result<Vec<u8>, Error> {
    if !path.is_file() {
        return Err(Error::InputMissing(path.display().to_string()));
    }
    Ok(std::fs::read(path)?)
}

fn load(capture: &Path, lock: &Path) -> Result<(Vec<u8>, ExpectedLock), Error> {
    let raw = read_input(capture)?;
    let json = read_input(lock)?;
    let json = std::str::from_utf8(&json).map_err(|e| Error::Lock(e.to_string()))?;
    Ok((raw, ExpectedLock::from_json(json)?))
}

fn verify_files(capture: &Path, lock: &Path, provider: &str) -> VerifyResult {
    let result = match load(capture, lock) {
        Ok((raw, lock)) => verify_capture(&raw, &lock, &Config::new(provider), TracingSink),
        Err(err) => VerifyResult::Fatal(err),
    };
    report(result)
}

fn seal_capture(capture: &Path, lock: &Path, provider: &str) -> VerifyResult {
    let written = read_input(capture)
        .and_then(|raw| seal(&raw, provider, None, TracingSink))
        .and_then(|sealed| sealed.to_json_pretty())
        .and_then(|json| Ok(std::fs::write(lock, json)?));
    match written {
        Ok(()) => {
            println!("sealed {}", lock.display());
            verify_files(capture, lock, provider)
        }
        Err(err) => report(VerifyResult::Fatal(err)),
    }
}

fn report(result: VerifyResult) -> VerifyResult {
    match &result {
        VerifyResult::Pass(report) => {
            let (digest, messages) = (&report.canonical_digest, report.messages_n);
            println!("PASS digest={digest} messages={messages}");
        }
        VerifyResult::Mismatch { fields, .. } => {
            for m in fields {
                let (field, expected, actual) = (m.field, &m.expected, &m.actual);
                println!("MISMATCH {field}: expected {expected} got {actual}");
            }
        }
        VerifyResult::Fatal(err) => eprintln!("FATAL {err}"),
    }
    result
}
