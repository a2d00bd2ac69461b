use crate::models::{Rule, WordList};
use camino::Utf8PathBuf;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Status texts written to task records.
pub mod status {
    pub const SCHEDULED: &str = "Scheduled";
    pub const RUNNING: &str = "Running";
    pub const COMPLETED: &str = "Completed";
    pub const CANCELLED: &str = "Cancelled";
    pub const NO_HANDSHAKES: &str = "0 handshakes captured";
}

/// Durable record of one uploaded capture and its cracking outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: u64,
    pub capture: Utf8PathBuf,
    pub wordlist: Option<String>,
    pub rule: Option<String>,
    pub uploaded_time: DateTime<Local>,
    pub status: String,
    pub progress: f64,
    pub found_key: Option<String>,
    #[serde(default, with = "duration_secs")]
    pub duration: Option<Duration>,
}

impl TaskRecord {
    pub fn new(id: u64, capture: impl Into<Utf8PathBuf>) -> Self {
        Self {
            id,
            capture: capture.into(),
            wordlist: None,
            rule: None,
            uploaded_time: Local::now(),
            status: status::SCHEDULED.to_string(),
            progress: 0.0,
            found_key: None,
            duration: None,
        }
    }
}

/// Final state copied into a [`TaskRecord`] when a job has been reconciled.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUpdate {
    pub status: String,
    pub progress: f64,
    pub found_key: Option<String>,
    pub duration: Duration,
}

impl TaskUpdate {
    pub fn apply(&self, record: &mut TaskRecord) {
        record.status = self.status.clone();
        record.progress = self.progress;
        record.found_key = self.found_key.clone();
        record.duration = Some(self.duration);
    }
}

/// A crack request: the capture and the optional user-selected wordlist/rule pair.
#[derive(Debug, Clone)]
pub struct AttackRequest {
    pub task_id: u64,
    pub capture: Utf8PathBuf,
    pub wordlist: Option<WordList>,
    pub rule: Option<Rule>,
    pub uploaded_time: DateTime<Local>,
}

impl AttackRequest {
    pub fn new(task_id: u64, capture: impl Into<Utf8PathBuf>) -> Self {
        Self {
            task_id,
            capture: capture.into(),
            wordlist: None,
            rule: None,
            uploaded_time: Local::now(),
        }
    }

    pub fn with_wordlist(mut self, wordlist: WordList) -> Self {
        self.wordlist = Some(wordlist);
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn with_uploaded_time(mut self, uploaded_time: DateTime<Local>) -> Self {
        self.uploaded_time = uploaded_time;
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(d)?;
        Ok(secs.filter(|s| s.is_finite() && *s >= 0.0).map(Duration::from_secs_f64))
    }
}
