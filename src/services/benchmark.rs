use crate::services::command::CommandBuilder;
use crate::services::process::{check_success, subprocess_call};
use anyhow::{Context, Result};
use camino::Utf8Path;
use chrono::{Local, NaiveDateTime};
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

/// Serializes appends to the benchmark log within this process.
static BENCHMARK_FILE_LOCK: Mutex<()> = Mutex::new(());

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One line of the benchmark log
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSample {
    pub date: NaiveDateTime,
    /// Summed hashes per second over all devices
    pub speed: u64,
}

/// Total speed of `mode` in `hashcat -b --machine-readable` output.
///
/// Device lines look like `<device>:<mode>:<name>:<...>:<ms>:<hashes/s>`; lines for other
/// modes, or anything else, are ignored.
pub fn parse_benchmark(stdout: &str, mode: u32) -> u64 {
    let pattern = format!(r"^\d+:{}:.*:.*:\d+\.\d+:\d+$", mode);
    let Ok(pattern) = Regex::new(&pattern) else {
        return 0;
    };

    stdout
        .lines()
        .map(str::trim_end)
        .filter(|line| pattern.is_match(line))
        .filter_map(|line| line.rsplit(':').next()?.parse::<u64>().ok())
        .sum()
}

/// Append a `<date>,<speed>` sample.
pub fn append_sample(path: &Utf8Path, speed: u64) -> Result<()> {
    let _guard = BENCHMARK_FILE_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create benchmark directory: {}", parent))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open benchmark file: {}", path))?;
    writeln!(file, "{},{}", Local::now().format(DATE_FORMAT), speed)
        .with_context(|| format!("Failed to write benchmark file: {}", path))?;
    Ok(())
}

/// Samples recorded so far; unreadable lines are skipped.
pub fn read_benchmark_history(path: &Utf8Path) -> Result<Vec<BenchmarkSample>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read benchmark file: {}", path))?;

    Ok(content
        .lines()
        .filter_map(|line| {
            let (date, speed) = line.split_once(',')?;
            Some(BenchmarkSample {
                date: NaiveDateTime::parse_from_str(date.trim(), DATE_FORMAT).ok()?,
                speed: speed.trim().parse().ok()?,
            })
        })
        .collect())
}

/// Benchmark `mode` and append the result to `benchmark_file`.
///
/// Returns the measured speed, or `None` when nothing was recorded. Errors are logged, never
/// returned: a failed benchmark must not affect the service.
pub async fn run_benchmark(builder: &CommandBuilder, mode: u32, benchmark_file: &Utf8Path) -> Option<u64> {
    match try_benchmark(builder, mode, benchmark_file).await {
        Ok(Some(speed)) => {
            tracing::info!("Benchmark -m{}: {} H/s", mode, speed);
            Some(speed)
        }
        Ok(None) => {
            tracing::info!("Benchmark -m{} produced no samples", mode);
            None
        }
        Err(e) => {
            tracing::debug!("Benchmark -m{} failed: {:#}", mode, e);
            None
        }
    }
}

async fn try_benchmark(builder: &CommandBuilder, mode: u32, benchmark_file: &Utf8Path) -> Result<Option<u64>> {
    let output = subprocess_call(&builder.build_benchmark(mode)).await?;
    check_success(&output)?;

    let speed = parse_benchmark(&output.stdout, mode);
    if speed == 0 {
        return Ok(None);
    }
    append_sample(benchmark_file, speed)?;
    Ok(Some(speed))
}
