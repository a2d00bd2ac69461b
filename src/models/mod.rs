//! Data models for wpacrack.
//!
//! - [`Settings`]: runtime configuration loaded from `wpacrack.yaml`
//! - [`WordList`], [`Rule`], [`Mask`], [`ResourceCatalog`]: opaque path-bearing references to
//!   the static assets handed to hashcat
//! - [`TaskRecord`], [`TaskUpdate`], [`AttackRequest`]: the durable job entity and the request
//!   that starts a job
//! - [`MAX_CONCURRENT_ATTACKS`]: capacity of the job pool (always 1, hashcat saturates every
//!   device by itself)

pub mod config;
pub mod resources;
pub mod task;

pub use config::Settings;
pub use resources::{Mask, ResourceCatalog, Rule, WordList};
pub use task::{AttackRequest, TaskRecord, TaskUpdate, status};

/// Maximum number of attacks running at the same time.
///
/// A single hashcat invocation already uses every available device, so a second concurrent
/// job would only contend for the same hardware. Enforced by the scheduler with a
/// `tokio::sync::Semaphore`.
pub const MAX_CONCURRENT_ATTACKS: usize = 1;
