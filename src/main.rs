//! wpacrack - command-line entry point.
//!
//! # Overview
//!
//! Loads `wpacrack.yaml` from the configuration directory, sets up logging, and runs one of:
//!
//! - `crack <capture>`: submits a job to a [`HashcatWorker`], waits for it (Ctrl-C terminates
//!   it and the startup benchmark), then prints the persisted task record
//! - `benchmark`: measures hashcat speed, appends a sample to the benchmark log and prints
//!   the recorded samples
//! - `split-stderr <file>`: shows which lines of a hashcat stderr dump are real errors

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::sync::Arc;
use wpacrack::cli::{Args, Command};
use wpacrack::logging::{LogOptions, setup_logging};
use wpacrack::models::ResourceCatalog;
use wpacrack::services::{CommandBuilder, read_benchmark_history, run_benchmark, split_warnings_errors};
use wpacrack::store::TaskStore;
use wpacrack::{APP_NAME, AttackRequest, ConfigManager, HashcatWorker, Settings, TaskRecord, VERSION, YamlTaskStore};

fn main() -> Result<()> {
    let args = Args::parse();

    let config_manager = ConfigManager::new(&args.config)?;
    let settings = config_manager.load_settings()?;

    let log_options = LogOptions::from_settings(&settings, APP_NAME).with_console(args.verbose);
    let _guard = setup_logging(&log_options)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("wpacrack-worker")
        .build()?;

    let result = runtime.block_on(async move {
        match args.command {
            Command::Crack {
                capture,
                wordlist,
                rule,
                timeout,
            } => {
                let timeout = timeout.or(settings.default_timeout_minutes);
                crack(&settings, capture, wordlist, rule, timeout).await
            }
            Command::Benchmark => benchmark(&settings).await,
            Command::SplitStderr { file } => {
                let stderr = fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file))?;
                let (warnings, errors) = split_warnings_errors(&stderr);
                println!("--- warnings ---\n{}", warnings);
                println!("--- errors ---\n{}", errors);
                Ok(())
            }
        }
    });

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    tracing::info!("Shutdown complete");

    result
}

async fn crack(
    settings: &Settings,
    capture: camino::Utf8PathBuf,
    wordlist: Option<String>,
    rule: Option<String>,
    timeout_minutes: Option<u64>,
) -> Result<()> {
    let store = Arc::new(YamlTaskStore::open(&settings.tasks_file)?);
    let task_id = store.next_id();
    let mut record = TaskRecord::new(task_id, capture.clone());
    record.wordlist = wordlist.clone();
    record.rule = rule.clone();
    let uploaded_time = record.uploaded_time;
    store.insert(record)?;
    store.commit()?;
    tracing::info!("Task {} recorded in {}", task_id, store.path());

    let catalog = ResourceCatalog::new(&settings.resources_dir);
    let mut request = AttackRequest::new(task_id, capture).with_uploaded_time(uploaded_time);
    if let Some(name) = wordlist {
        request = request.with_wordlist(catalog.wordlist(&name));
    }
    if let Some(name) = rule {
        request = request.with_rule(catalog.rule(&name));
    }

    let worker = HashcatWorker::from_settings(settings, store.clone());
    let job_id = worker.submit_crack(request, timeout_minutes);

    tokio::select! {
        _ = worker.wait_idle() => {}
        _ = tokio::signal::ctrl_c() => {
            // also drops the startup benchmark if it still holds the pool
            tracing::warn!("Interrupted, terminating job {}", job_id);
            worker.terminate();
            worker.wait_idle().await;
        }
    }

    let record = store.load(task_id)?;
    println!("Task {}: {}", record.id, record.capture);
    println!("Status: {}", record.status);
    println!("Progress: {:.2}%", record.progress);
    match record.found_key {
        Some(key) => println!("Key: {}", key),
        None => println!("Key: not found"),
    }
    if let Some(duration) = record.duration {
        println!("Duration: {:.1}s", duration.as_secs_f64());
    }
    Ok(())
}

async fn benchmark(settings: &Settings) -> Result<()> {
    let builder = CommandBuilder::from_settings(settings);
    let mode = settings.benchmark_mode();
    match run_benchmark(&builder, mode, &settings.benchmark_file).await {
        Some(speed) => println!("-m{}: {} H/s", mode, speed),
        None => println!("Benchmark produced no sample"),
    }

    for sample in read_benchmark_history(&settings.benchmark_file)? {
        println!("{} {} H/s", sample.date, sample.speed);
    }
    Ok(())
}
