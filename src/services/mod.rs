//! Services module - the attack orchestration engine.
//!
//! Everything that builds, runs and supervises external processes lives here. The services
//! know nothing about job scheduling or persistence; those are in [`crate::scheduler`] and
//! [`crate::store`].
//!
//! # Components
//!
//! - [`command`]: [`CommandSpec`] + [`CommandBuilder`] assemble shell-safe hashcat argument
//!   lists for the three invocation kinds (plain, capture, stdout) and plan piped attacks.
//! - [`monitor`]: [`run_with_status`] streams hashcat's machine-readable status records into a
//!   [`ProgressHandle`](crate::state::ProgressHandle), enforcing cancellation and timeout at
//!   line boundaries; [`split_warnings_errors`] separates benign NVML noise from real errors.
//! - [`process`]: one-shot calls and two-stage `producer | consumer` pipelines with both exit
//!   codes checked.
//! - [`wordlist`]: candidates derived from the network identifier.
//! - [`attack`]: [`StrategyPipeline`], the ordered strategies run against one capture.
//! - [`benchmark`]: startup throughput measurement appended to the benchmark log.
//!
//! # Usage Example
//!
//! ```ignore
//! use wpacrack::services::{AttackContext, StrategyPipeline};
//! use wpacrack::state::ProgressHandle;
//!
//! let pipeline = StrategyPipeline::from_settings(&settings);
//! let mut ctx = AttackContext::new("/uploads/home.cap");
//! let progress = ProgressHandle::new();
//!
//! let outcome = pipeline.crack(&mut ctx, &progress, None).await?;
//! println!("{} {:?}", outcome.status, outcome.key);
//! ```

pub mod attack;
pub mod benchmark;
pub mod command;
pub mod monitor;
pub mod process;
pub mod wordlist;

pub use attack::{AttackContext, AttackOutcome, StrategyPipeline};
pub use benchmark::{BenchmarkSample, read_benchmark_history, run_benchmark};
pub use command::{CommandBuilder, CommandSpec, EngineCommand, InvocationKind};
pub use monitor::{EngineError, ProcessOutput, run_with_status, split_warnings_errors};
