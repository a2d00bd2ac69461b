use crate::models::{Mask, Rule, Settings, WordList};
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// Environment toggle disabling the hashcat potfile (local debugging only).
pub const DISABLE_POTFILE_ENV: &str = "DISABLE_POTFILE";

/// Declarative description of one hashcat attack.
///
/// Masks and dictionaries are mutually exclusive in hashcat: when a mask is set the
/// wordlists are left out of the built command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSpec {
    /// hashcat `-m` hash-type code
    pub mode: u32,
    /// Where hashcat writes recovered keys (`--outfile=`)
    pub outfile: Option<Utf8PathBuf>,
    pub session: Option<String>,
    pub rules: Vec<Rule>,
    pub wordlists: Vec<Utf8PathBuf>,
    pub mask: Option<Mask>,
    /// Passed through verbatim, e.g. `-a1` for a combinator attack
    pub extra_args: Vec<String>,
    /// Run the wordlists and rules through `--stdout` and feed the candidates to a second,
    /// cracking invocation instead of attacking directly.
    pub pipe_word_candidates: bool,
}

impl CommandSpec {
    pub fn new(mode: u32, outfile: impl Into<Utf8PathBuf>) -> Self {
        Self {
            mode,
            outfile: Some(outfile.into()),
            ..Default::default()
        }
    }

    pub fn add_rule(&mut self, rule: Rule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn add_wordlist(&mut self, wordlist: &WordList) -> &mut Self {
        self.wordlists.push(wordlist.path.clone());
        self
    }

    pub fn add_wordlist_path(&mut self, path: impl Into<Utf8PathBuf>) -> &mut Self {
        self.wordlists.push(path.into());
        self
    }

    pub fn set_mask(&mut self, mask: Mask) -> &mut Self {
        self.mask = Some(mask);
        self
    }

    pub fn set_session(&mut self, session: impl Into<String>) -> &mut Self {
        self.session = Some(session.into());
        self
    }

    pub fn add_custom_argument(&mut self, argument: impl Into<String>) -> &mut Self {
        self.extra_args.push(argument.into());
        self
    }

    pub fn pipe_word_candidates(&mut self, enabled: bool) -> &mut Self {
        self.pipe_word_candidates = enabled;
        self
    }
}

/// Shape of one hashcat invocation. Each kind contributes its own trailing arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationKind {
    /// Bare attack: options and attack positionals only.
    Plain,
    /// Attack against a handshake file with machine-readable status reporting.
    Capture { hcap_file: Utf8PathBuf },
    /// Emit candidate passwords instead of cracking; the receiving side owns the outfile.
    Stdout,
}

/// A fully built engine command, ready for [`crate::services::process`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Direct(Vec<String>),
    /// `producer | consumer`, run as two linked processes
    Piped {
        producer: Vec<String>,
        consumer: Vec<String>,
    },
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineCommand::Direct(tokens) => write!(f, "{}", tokens.join(" ")),
            EngineCommand::Piped { producer, consumer } => {
                write!(f, "{} | {}", producer.join(" "), consumer.join(" "))
            }
        }
    }
}

/// Assembles hashcat argument lists.
///
/// Every path-valued token is shell-quoted on its own, so the joined tokens form a safe shell
/// line and [`crate::services::monitor::to_argv`] recovers the exact paths.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    pub hashcat_bin: String,
    pub device_index: u32,
    pub status_timer_secs: u32,
    pub potfile_disable: bool,
}

impl CommandBuilder {
    pub fn new(hashcat_bin: impl Into<String>) -> Self {
        Self {
            hashcat_bin: hashcat_bin.into(),
            device_index: 1,
            status_timer_secs: 20,
            potfile_disable: false,
        }
    }

    /// Builder configured from settings; reads `DISABLE_POTFILE` once.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            hashcat_bin: settings.hashcat_bin.clone(),
            device_index: settings.device_index,
            status_timer_secs: settings.status_timer_secs,
            potfile_disable: potfile_disabled_by_env(),
        }
    }

    /// Build the token list for one invocation of `kind`.
    pub fn build(&self, spec: &CommandSpec, kind: &InvocationKind) -> Vec<String> {
        let mut command = vec![quote(&self.hashcat_bin), format!("-d{}", self.device_index)];

        for rule in &spec.rules {
            command.push(format!("--rules={}", quote(rule.path.as_str())));
        }

        command.push(format!("-m{}", spec.mode));

        if *kind != InvocationKind::Stdout {
            if let Some(outfile) = &spec.outfile {
                command.push(format!("--outfile={}", quote(outfile.as_str())));
            }
            if let Some(session) = &spec.session {
                command.push(format!("--session={}", quote(session)));
            }
        }

        command.extend(spec.extra_args.iter().cloned());

        match kind {
            InvocationKind::Plain => {}
            InvocationKind::Capture { hcap_file } => self.append_capture_args(&mut command, hcap_file),
            InvocationKind::Stdout => command.push("--stdout".to_string()),
        }

        match &spec.mask {
            Some(mask) => {
                command.push("-a3".to_string());
                command.push(quote(mask.path.as_str()));
            }
            None => command.extend(spec.wordlists.iter().map(|w| quote(w.as_str()))),
        }

        command.push("--force".to_string());
        command
    }

    /// Build the command(s) attacking `hcap_file` according to `spec`.
    pub fn plan(&self, spec: &CommandSpec, hcap_file: &Utf8Path) -> EngineCommand {
        let capture = InvocationKind::Capture {
            hcap_file: hcap_file.to_path_buf(),
        };

        if !spec.pipe_word_candidates {
            return EngineCommand::Direct(self.build(spec, &capture));
        }

        let producer = self.build(spec, &InvocationKind::Stdout);

        // the candidates arrive on stdin, so the cracking side has no dictionary of its own
        let receiving = CommandSpec {
            rules: Vec::new(),
            wordlists: Vec::new(),
            mask: None,
            extra_args: Vec::new(),
            pipe_word_candidates: false,
            ..spec.clone()
        };
        let consumer = self.build(&receiving, &capture);

        EngineCommand::Piped { producer, consumer }
    }

    /// `hashcat -b` for one hash mode, machine readable.
    pub fn build_benchmark(&self, mode: u32) -> Vec<String> {
        vec![
            quote(&self.hashcat_bin),
            format!("-d{}", self.device_index),
            format!("-m{}", mode),
            "-b".to_string(),
            "--machine-readable".to_string(),
            "--quiet".to_string(),
            "--force".to_string(),
        ]
    }

    fn append_capture_args(&self, command: &mut Vec<String>, hcap_file: &Utf8Path) {
        if self.potfile_disable {
            command.push("--potfile-disable".to_string());
        }
        command.push("--status".to_string());
        command.push(format!("--status-timer={}", self.status_timer_secs));
        command.push("--machine-readable".to_string());
        command.push(quote(hcap_file.as_str()));
    }
}

/// POSIX shell quoting of a single token.
pub fn quote(token: &str) -> String {
    shell_words::quote(token).into_owned()
}

fn potfile_disabled_by_env() -> bool {
    std::env::var(DISABLE_POTFILE_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .is_some_and(|v| v != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> CommandBuilder {
        CommandBuilder {
            hashcat_bin: "hashcat".to_string(),
            device_index: 1,
            status_timer_secs: 20,
            potfile_disable: false,
        }
    }

    fn capture() -> InvocationKind {
        InvocationKind::Capture {
            hcap_file: Utf8PathBuf::from("/caps/home.hccapx"),
        }
    }

    #[test]
    fn test_capture_command_layout() {
        let mut spec = CommandSpec::new(2500, "/caps/home.key");
        spec.add_wordlist_path("/wl/weak.txt");

        let cmd = builder().build(&spec, &capture());
        assert_eq!(
            cmd,
            vec![
                "hashcat",
                "-d1",
                "-m2500",
                "--outfile=/caps/home.key",
                "--status",
                "--status-timer=20",
                "--machine-readable",
                "/caps/home.hccapx",
                "/wl/weak.txt",
                "--force",
            ]
        );
    }

    #[test]
    fn test_mask_excludes_wordlists() {
        let mut spec = CommandSpec::new(2500, "/caps/home.key");
        spec.add_wordlist_path("/wl/weak.txt");
        spec.set_mask(Mask::new("8digits", "/masks/8digits.hcmask"));

        let cmd = builder().build(&spec, &InvocationKind::Plain);
        assert!(!cmd.iter().any(|t| t.contains("weak.txt")));
        let pos = cmd.iter().position(|t| t == "-a3").unwrap();
        assert_eq!(cmd[pos + 1], "/masks/8digits.hcmask");
    }

    #[test]
    fn test_paths_are_quoted() {
        let mut spec = CommandSpec::new(2500, "/caps/my home.key");
        spec.add_rule(Rule::new("odd", "/rules/it's.rule"));
        spec.set_session("job; rm -rf /");

        let cmd = builder().build(&spec, &InvocationKind::Plain);
        assert!(cmd.contains(&"--outfile='/caps/my home.key'".to_string()));
        assert!(cmd.contains(&"--session='job; rm -rf /'".to_string()));
        assert!(cmd.iter().any(|t| t.starts_with("--rules='/rules/it")));
    }

    #[test]
    fn test_potfile_disable_precedes_status() {
        let mut b = builder();
        b.potfile_disable = true;
        let spec = CommandSpec::new(2500, "/k");

        let cmd = b.build(&spec, &capture());
        let potfile = cmd.iter().position(|t| t == "--potfile-disable").unwrap();
        let status = cmd.iter().position(|t| t == "--status").unwrap();
        assert!(potfile < status);
    }

    #[test]
    fn test_force_is_last() {
        let spec = CommandSpec::new(2500, "/k");
        for kind in [InvocationKind::Plain, capture(), InvocationKind::Stdout] {
            let cmd = builder().build(&spec, &kind);
            assert_eq!(cmd.last().map(String::as_str), Some("--force"));
        }
    }

    #[test]
    fn test_stdout_variant_has_no_outfile() {
        let mut spec = CommandSpec::new(2500, "/caps/home.key");
        spec.set_session("s1");
        let cmd = builder().build(&spec, &InvocationKind::Stdout);
        assert!(cmd.contains(&"--stdout".to_string()));
        assert!(!cmd.iter().any(|t| t.starts_with("--outfile")));
        assert!(!cmd.iter().any(|t| t.starts_with("--session")));
    }

    #[test]
    fn test_plan_piped_splits_rules_and_outfile() {
        let mut spec = CommandSpec::new(2500, "/caps/home.key");
        spec.add_wordlist_path("/wl/essid.txt")
            .add_rule(Rule::new("best64", "/rules/best64.rule"))
            .pipe_word_candidates(true);

        let plan = builder().plan(&spec, Utf8Path::new("/caps/home.hccapx"));
        let EngineCommand::Piped { producer, consumer } = plan else {
            panic!("expected piped command");
        };

        assert!(producer.contains(&"--stdout".to_string()));
        assert!(producer.contains(&"--rules=/rules/best64.rule".to_string()));
        assert!(producer.contains(&"/wl/essid.txt".to_string()));

        assert!(consumer.contains(&"--outfile=/caps/home.key".to_string()));
        assert!(!consumer.iter().any(|t| t.starts_with("--rules")));
        assert!(!consumer.contains(&"/wl/essid.txt".to_string()));
        assert!(consumer.contains(&"/caps/home.hccapx".to_string()));
    }

    #[test]
    fn test_plan_direct_display() {
        let spec = CommandSpec::new(2500, "/k");
        let plan = builder().plan(&spec, Utf8Path::new("/h.hccapx"));
        assert!(matches!(plan, EngineCommand::Direct(_)));
        assert!(plan.to_string().starts_with("hashcat -d1 -m2500"));
    }

    #[test]
    fn test_benchmark_command() {
        let cmd = builder().build_benchmark(22000);
        assert!(cmd.contains(&"-m22000".to_string()));
        assert!(cmd.contains(&"-b".to_string()));
        assert!(cmd.contains(&"--machine-readable".to_string()));
    }
}
