use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Runtime settings loaded from `wpacrack.yaml`.
///
/// Every field has a serde default so a partial (or empty) file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// hashcat executable (looked up on `PATH` when not absolute)
    #[serde(rename = "Hashcat Bin", default = "default_hashcat_bin")]
    pub hashcat_bin: String,

    /// `.cap` to `.hccapx` converter executable
    #[serde(rename = "Converter Bin", default = "default_converter_bin")]
    pub converter_bin: String,

    /// hashcat `-m` code of the captured handshakes
    #[serde(rename = "Hash Mode", default = "default_hash_mode")]
    pub hash_mode: u32,

    /// hashcat `-d` device index, fixed so benchmarks and attacks share a device
    #[serde(rename = "Device Index", default = "default_device_index")]
    pub device_index: u32,

    /// Seconds between machine-readable status records
    #[serde(rename = "Status Timer", default = "default_status_timer")]
    pub status_timer_secs: u32,

    /// Directory holding the wordlists and rules shipped with the service
    #[serde(rename = "Resources Dir", default = "default_resources_dir")]
    pub resources_dir: Utf8PathBuf,

    /// CSV file receiving `<date>,<hashes/s>` benchmark samples
    #[serde(rename = "Benchmark File", default = "default_benchmark_file")]
    pub benchmark_file: Utf8PathBuf,

    /// Hash mode benchmarked at startup; falls back to `hash_mode`
    #[serde(rename = "Benchmark Mode", default)]
    pub benchmark_mode: Option<u32>,

    /// Budget for the user wordlist step; `None` means unlimited
    #[serde(rename = "Timeout Minutes", default)]
    pub default_timeout_minutes: Option<u64>,

    /// YAML file backing the task records
    #[serde(rename = "Tasks File", default = "default_tasks_file")]
    pub tasks_file: Utf8PathBuf,

    #[serde(rename = "Log Dir", default = "default_log_dir")]
    pub log_dir: Utf8PathBuf,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,

    /// Write the log file as JSON lines
    #[serde(rename = "Json Logs", default)]
    pub json_logs: bool,
}

impl Settings {
    /// Hash mode used by the startup benchmark
    pub fn benchmark_mode(&self) -> u32 {
        self.benchmark_mode.unwrap_or(self.hash_mode)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hashcat_bin: default_hashcat_bin(),
            converter_bin: default_converter_bin(),
            hash_mode: default_hash_mode(),
            device_index: default_device_index(),
            status_timer_secs: default_status_timer(),
            resources_dir: default_resources_dir(),
            benchmark_file: default_benchmark_file(),
            benchmark_mode: None,
            default_timeout_minutes: None,
            tasks_file: default_tasks_file(),
            log_dir: default_log_dir(),
            debug_mode: false,
            json_logs: false,
        }
    }
}

fn default_hashcat_bin() -> String {
    "hashcat".to_string()
}

fn default_converter_bin() -> String {
    "cap2hccapx".to_string()
}

fn default_hash_mode() -> u32 {
    2500
}

fn default_device_index() -> u32 {
    1
}

fn default_status_timer() -> u32 {
    20
}

fn default_resources_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("resources")
}

fn default_benchmark_file() -> Utf8PathBuf {
    Utf8PathBuf::from("benchmark.csv")
}

fn default_tasks_file() -> Utf8PathBuf {
    Utf8PathBuf::from("tasks.yaml")
}

fn default_log_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("logs")
}
