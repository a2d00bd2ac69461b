//! Fake hashcat/converter executables for process-level tests
#![allow(dead_code)]
#![cfg(unix)]

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;
use wpacrack::models::ResourceCatalog;
use wpacrack::services::{CommandBuilder, StrategyPipeline};

/// Shell prelude shared by fake hashcat scripts: logs the argv, extracts `--outfile=`, and
/// prints two candidates for `--stdout` invocations.
const HASHCAT_PRELUDE: &str = r#"
echo "$*" >> "__LOG__"
outfile=""
for arg in "$@"; do
  case "$arg" in
    --outfile=*) outfile="${arg#--outfile=}" ;;
    --stdout) printf 'password\nletmein\n'; exit 0 ;;
  esac
done
cat > /dev/null
"#;

pub struct Sandbox {
    _dir: TempDir,
    pub root: Utf8PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        Self { _dir: dir, root }
    }

    pub fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    /// Executable `/bin/sh` script with `body`
    pub fn script(&self, name: &str, body: &str) -> Utf8PathBuf {
        let path = self.path(name);
        fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    /// Fake hashcat: logs every invocation to `hashcat.log`, then runs `behaviour`
    /// (with `$outfile` set) and exits 1 (exhausted) unless `behaviour` exits first.
    pub fn hashcat(&self, behaviour: &str) -> Utf8PathBuf {
        let prelude = HASHCAT_PRELUDE.replace("__LOG__", self.log().as_str());
        self.script("hashcat", &format!("{}{}\nexit 1\n", prelude, behaviour))
    }

    /// Fake converter writing `hccapx` bytes and announcing `essid`.
    pub fn converter(&self, hccapx: &str, essid: &str) -> Utf8PathBuf {
        self.script(
            "cap2hccapx",
            &format!(
                "printf '{}' > \"$2\"\necho 'Networks detected: 1'\necho '[*] BSSID=00:11:22:33:44:55 ESSID={} (Length: {})'\n",
                hccapx,
                essid,
                essid.len()
            ),
        )
    }

    pub fn log(&self) -> Utf8PathBuf {
        self.path("hashcat.log")
    }

    /// Logged hashcat invocations, one argv per entry
    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(self.log())
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn capture(&self) -> Utf8PathBuf {
        self.capture_named("home.cap")
    }

    pub fn capture_named(&self, name: &str) -> Utf8PathBuf {
        let capture = self.path(name);
        fs::write(&capture, b"pcap").unwrap();
        capture
    }

    pub fn pipeline(&self, hashcat: &Utf8Path, converter: &Utf8Path) -> StrategyPipeline {
        StrategyPipeline::new(
            CommandBuilder::new(hashcat.as_str()),
            ResourceCatalog::new(self.path("resources")),
            converter.as_str(),
            2500,
        )
    }
}

/// Status record in hashcat's machine-readable layout
pub fn status_line(tried: u64, total: u64) -> String {
    format!("printf 'STATUS\\t3\\tSPEED\\t1000\\t1000\\tPROGRESS\\t{}\\t{}\\tRECHASH\\t0\\t1\\n'", tried, total)
}
