//! Integration tests for the strategy pipeline against fake executables
//!
//! These tests verify:
//! - Strategy order and short-circuiting once a key file exists
//! - Piped (`--stdout` | consumer) steps
//! - Status streaming of the user wordlist step
//! - Failure propagation from the converter and from hashcat
#![cfg(unix)]

mod common;

use common::{Sandbox, status_line};
use std::fs;
use std::io;
use std::sync::{Arc, Mutex};
use wpacrack::models::{WordList, status};
use wpacrack::services::{AttackContext, EngineError};
use wpacrack::state::ProgressHandle;

#[tokio::test]
async fn test_existing_key_skips_every_attack() {
    let sandbox = Sandbox::new();
    let hashcat = sandbox.hashcat("");
    let converter = sandbox.converter("HCPX", "HomeNet");
    let capture = sandbox.capture();
    fs::write(sandbox.path("home.key"), "h:001122334455:aabbccddeeff:HomeNet:letmein\n").unwrap();

    let pipeline = sandbox.pipeline(&hashcat, &converter);
    let mut ctx = AttackContext::new(&capture);
    ctx.wordlist = Some(WordList::new("big", sandbox.path("big.txt")));
    let progress = ProgressHandle::new();

    let outcome = pipeline.crack(&mut ctx, &progress, None).await.unwrap();

    assert_eq!(outcome.status, status::COMPLETED);
    assert_eq!(outcome.key.as_deref(), Some("letmein"));
    assert!(sandbox.invocations().is_empty(), "hashcat must not run");
    assert_eq!(progress.snapshot().key.as_deref(), Some("letmein"));
}

#[tokio::test]
async fn test_no_handshakes_skips_every_attack() {
    let sandbox = Sandbox::new();
    let hashcat = sandbox.hashcat("");
    let converter = sandbox.converter("", "HomeNet");
    let capture = sandbox.capture();

    let pipeline = sandbox.pipeline(&hashcat, &converter);
    let mut ctx = AttackContext::new(&capture);
    let progress = ProgressHandle::new();

    let outcome = pipeline.crack(&mut ctx, &progress, None).await.unwrap();

    assert_eq!(outcome.status, status::NO_HANDSHAKES);
    assert_eq!(outcome.key, None);
    assert!(sandbox.invocations().is_empty());
}

#[tokio::test]
async fn test_strategies_stop_after_key_is_found() {
    let sandbox = Sandbox::new();
    let hashcat = sandbox.hashcat(
        r#"case "$*" in *digits_8.txt*) printf 'h:001122334455:aabbccddeeff:HomeNet:12345678\n' > "$outfile"; exit 0 ;; esac"#,
    );
    let converter = sandbox.converter("HCPX", "HomeNet");
    let capture = sandbox.capture();

    let pipeline = sandbox.pipeline(&hashcat, &converter);
    let mut ctx = AttackContext::new(&capture);
    ctx.wordlist = Some(WordList::new("big", sandbox.path("big.txt")));
    let progress = ProgressHandle::new();

    let outcome = pipeline.crack(&mut ctx, &progress, None).await.unwrap();
    assert_eq!(outcome.status, status::COMPLETED);
    assert_eq!(outcome.key.as_deref(), Some("12345678"));

    let calls = sandbox.invocations();
    // essid+digits, essid|best64 (2 processes), weak|best64 (2 processes), digits8
    assert_eq!(calls.len(), 6, "{:#?}", calls);
    assert!(calls.iter().any(|c| c.contains("-a1") && c.contains("essid.txt")));
    assert_eq!(calls.iter().filter(|c| c.contains("--stdout")).count(), 2);
    assert!(calls.last().unwrap().contains("digits_8.txt"));
    assert!(!calls.iter().any(|c| c.contains("big.txt")), "main wordlist must be skipped");

    let essid_words = fs::read_to_string(sandbox.path("resources/wordlists/essid.txt")).unwrap();
    assert!(essid_words.lines().any(|w| w == "HomeNet"));

    let metrics = &ctx.metrics;
    assert!(metrics.step("digits8").is_some());
    assert!(metrics.step("main_wordlist").is_none());
}

#[tokio::test]
async fn test_piped_consumer_reads_candidates() {
    let sandbox = Sandbox::new();
    // crack only when the candidates actually arrive on stdin
    let hashcat = sandbox.script(
        "hashcat",
        &format!(
            r#"echo "$*" >> "{log}"
for arg in "$@"; do
  case "$arg" in
    --outfile=*) outfile="${{arg#--outfile=}}" ;;
    --stdout) printf 'password\nletmein\n'; exit 0 ;;
  esac
done
if grep -q letmein; then printf 'h:a:b:HomeNet:letmein\n' > "$outfile"; exit 0; fi
exit 1
"#,
            log = sandbox.log()
        ),
    );
    let converter = sandbox.converter("HCPX", "");
    let capture = sandbox.capture();

    let pipeline = sandbox.pipeline(&hashcat, &converter);
    let mut ctx = AttackContext::new(&capture);
    let progress = ProgressHandle::new();

    let outcome = pipeline.crack(&mut ctx, &progress, None).await.unwrap();

    assert_eq!(outcome.key.as_deref(), Some("letmein"));
    // no ESSID: the weak|best64 pipe is the first step and cracks it
    assert_eq!(sandbox.invocations().len(), 2);
}

#[tokio::test]
async fn test_main_wordlist_reports_progress() {
    let sandbox = Sandbox::new();
    let hashcat = sandbox.hashcat(&format!(
        "case \"$*\" in *--session=*) {}; {}; exit 1 ;; esac",
        status_line(50, 200),
        status_line(200, 200)
    ));
    let converter = sandbox.converter("HCPX", "");
    let capture = sandbox.capture();

    let pipeline = sandbox.pipeline(&hashcat, &converter);
    let mut ctx = AttackContext::new(&capture);
    ctx.wordlist = Some(WordList::new("big", sandbox.path("big.txt")));
    let progress = ProgressHandle::new();
    let mut changes = progress.subscribe();

    let outcome = pipeline.crack(&mut ctx, &progress, None).await.unwrap();

    assert_eq!(outcome.status, status::COMPLETED);
    assert_eq!(outcome.key, None);
    assert_eq!(progress.snapshot().progress, 100.0);

    let mut seen = Vec::new();
    while let Ok(change) = changes.try_recv() {
        if let wpacrack::ProgressChange::ProgressUpdated { progress } = change {
            seen.push(progress);
        }
    }
    assert_eq!(seen, vec![25.0, 100.0]);

    let main = sandbox.invocations().into_iter().find(|c| c.contains("big.txt")).unwrap();
    assert!(main.contains("--session=home"));
    assert!(main.contains("--status --status-timer=20 --machine-readable"));
}

#[tokio::test]
async fn test_converter_failure_aborts_pipeline() {
    let sandbox = Sandbox::new();
    let hashcat = sandbox.hashcat("");
    let converter = sandbox.script("cap2hccapx", "echo 'bad capture' >&2\nexit 2\n");
    let capture = sandbox.capture();

    let pipeline = sandbox.pipeline(&hashcat, &converter);
    let mut ctx = AttackContext::new(&capture);
    let progress = ProgressHandle::new();

    let err = pipeline.crack(&mut ctx, &progress, None).await.unwrap_err();

    assert!(format!("{:#}", err).contains("bad capture"));
    assert!(sandbox.invocations().is_empty());
}

#[tokio::test]
async fn test_engine_failure_reports_errors_only() {
    let sandbox = Sandbox::new();
    let hashcat = sandbox.hashcat(
        "echo 'nvmlDeviceGetFanSpeed(): Not Supported' >&2\necho 'No devices found/left' >&2\nexit 255",
    );
    let converter = sandbox.converter("HCPX", "");
    let capture = sandbox.capture();

    let pipeline = sandbox.pipeline(&hashcat, &converter);
    let mut ctx = AttackContext::new(&capture);
    let progress = ProgressHandle::new();

    let err = pipeline.crack(&mut ctx, &progress, None).await.unwrap_err();
    let text = format!("{:#}", err);

    assert!(text.contains("No devices found/left"), "{}", text);
    assert!(!text.contains("nvml"), "{}", text);
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::ProcessFailure { code: Some(255), .. })
    ));
}

/// Collects formatted log records in memory
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_failed_job_still_logs_step_timings() {
    let sandbox = Sandbox::new();
    let hashcat = sandbox.hashcat("echo 'No devices found/left' >&2\nexit 255");
    let converter = sandbox.converter("HCPX", "");
    let capture = sandbox.capture();

    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _default = tracing::subscriber::set_default(subscriber);

    let pipeline = sandbox.pipeline(&hashcat, &converter);
    let mut ctx = AttackContext::new(&capture);
    let progress = ProgressHandle::new();

    assert!(pipeline.crack(&mut ctx, &progress, None).await.is_err());

    assert!(ctx.metrics.step("cap2hccapx").is_some());
    assert!(ctx.metrics.step("weak_passwords").is_none());
    let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(text.contains("Timer cap2hccapx"), "{}", text);
    assert!(text.contains("Total strategy time for"), "{}", text);
}

#[tokio::test]
async fn test_cancel_before_first_attack() {
    let sandbox = Sandbox::new();
    let hashcat = sandbox.hashcat("");
    let converter = sandbox.converter("HCPX", "");
    let capture = sandbox.capture();

    let pipeline = sandbox.pipeline(&hashcat, &converter);
    let mut ctx = AttackContext::new(&capture);
    let progress = ProgressHandle::new();
    progress.request_cancel();

    let err = pipeline.crack(&mut ctx, &progress, None).await.unwrap_err();

    assert!(matches!(err.downcast_ref::<EngineError>(), Some(EngineError::Cancelled)));
    assert!(sandbox.invocations().is_empty());
}
