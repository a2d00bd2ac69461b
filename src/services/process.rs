use crate::services::command::EngineCommand;
use crate::services::monitor::{EngineError, ProcessOutput, collect, spawn, split_warnings_errors, to_argv};
use std::io;
use std::process::Stdio;

/// hashcat exit codes that are not failures: 0 = cracked, 1 = exhausted.
pub const ENGINE_OK_CODES: &[i32] = &[0, 1];

/// Run a command to completion, capturing stdout and stderr.
pub async fn subprocess_call(command: &[String]) -> Result<ProcessOutput, EngineError> {
    let argv = to_argv(command)?;
    tracing::debug!(">>> {}", command.join(" "));

    let child = spawn(&argv, Stdio::null())?;
    let output = child.wait_with_output().await?;

    Ok(ProcessOutput {
        program: argv[0].clone(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run `producer | consumer` as two linked processes and wait for both.
///
/// Returns `(producer, consumer)` outputs; the producer's stdout is empty since it fed the
/// consumer's stdin.
pub async fn run_piped(
    producer: &[String],
    consumer: &[String],
) -> Result<(ProcessOutput, ProcessOutput), EngineError> {
    let producer_argv = to_argv(producer)?;
    let consumer_argv = to_argv(consumer)?;
    tracing::debug!(">>> {} | {}", producer.join(" "), consumer.join(" "));

    let mut producer_child = spawn(&producer_argv, Stdio::null())?;
    let candidates: Stdio = producer_child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("producer stdout not captured"))?
        .try_into()?;
    let producer_stderr = collect(producer_child.stderr.take());

    let consumer_child = spawn(&consumer_argv, candidates)?;

    let (producer_status, consumer_output) =
        tokio::try_join!(producer_child.wait(), consumer_child.wait_with_output())?;

    let producer_output = ProcessOutput {
        program: producer_argv[0].clone(),
        code: producer_status.code(),
        stdout: String::new(),
        stderr: producer_stderr.await.unwrap_or_default(),
    };
    let consumer_output = ProcessOutput {
        program: consumer_argv[0].clone(),
        code: consumer_output.status.code(),
        stdout: String::from_utf8_lossy(&consumer_output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&consumer_output.stderr).into_owned(),
    };

    Ok((producer_output, consumer_output))
}

/// Run a built engine command, direct or piped, and check every stage's exit code.
pub async fn run_engine(command: &EngineCommand) -> Result<ProcessOutput, EngineError> {
    match command {
        EngineCommand::Direct(tokens) => {
            let output = subprocess_call(tokens).await?;
            check_engine_output(&output)?;
            Ok(output)
        }
        EngineCommand::Piped { producer, consumer } => {
            let (producer_output, consumer_output) = run_piped(producer, consumer).await?;
            check_engine_output(&consumer_output)?;
            // the producer may die of SIGPIPE once the consumer stops reading
            if producer_output.code.is_some() {
                check_engine_output(&producer_output)?;
            }
            Ok(consumer_output)
        }
    }
}

/// Fail on an exit code outside [`ENGINE_OK_CODES`], reporting only the genuine stderr errors.
/// Known benign warnings are logged and otherwise ignored.
pub fn check_engine_output(output: &ProcessOutput) -> Result<(), EngineError> {
    let (warnings, errors) = split_warnings_errors(&output.stderr);
    if !warnings.is_empty() {
        tracing::warn!("{} warnings:\n{}", output.program, warnings);
    }

    match output.code {
        Some(code) if ENGINE_OK_CODES.contains(&code) => Ok(()),
        code => Err(EngineError::ProcessFailure {
            program: output.program.clone(),
            code,
            stderr: errors,
        }),
    }
}

/// Fail unless the process exited with status 0.
pub fn check_success(output: &ProcessOutput) -> Result<(), EngineError> {
    if output.code == Some(0) {
        return Ok(());
    }
    let (_, errors) = split_warnings_errors(&output.stderr);
    Err(EngineError::ProcessFailure {
        program: output.program.clone(),
        code: output.code,
        stderr: errors,
    })
}
