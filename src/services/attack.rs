use crate::metrics::AttackMetrics;
use crate::models::{AttackRequest, ResourceCatalog, Rule, Settings, WordList, status};
use crate::services::command::{CommandBuilder, CommandSpec, InvocationKind, quote};
use crate::services::monitor::{EngineError, run_with_status};
use crate::services::process::{check_engine_output, check_success, run_engine, subprocess_call};
use crate::services::wordlist::write_essid_wordlist;
use crate::state::ProgressHandle;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::time::{Duration, Instant};

const ESSID_MARKER: &str = "ESSID=";
const ESSID_END_MARKER: &str = " (Length:";

const STEP_CONVERT: &str = "cap2hccapx";
const STEP_ESSID_DIGITS: &str = "essid_digits";
const STEP_ESSID_RULE: &str = "essid_rule";
const STEP_WEAK: &str = "weak_passwords";
const STEP_DIGITS_8: &str = "digits8";
const STEP_MAIN: &str = "main_wordlist";

/// Working state of one capture while the strategies run.
#[derive(Debug, Clone)]
pub struct AttackContext {
    pub capture_path: Utf8PathBuf,
    /// Converted handshakes (`.hccapx`)
    pub hcap_file: Utf8PathBuf,
    /// hashcat outfile; its existence means the key was recovered
    pub key_file: Utf8PathBuf,
    pub essid: Option<String>,
    pub wordlist: Option<WordList>,
    pub rule: Option<Rule>,
    pub metrics: AttackMetrics,
}

impl AttackContext {
    pub fn new(capture_path: impl Into<Utf8PathBuf>) -> Self {
        let capture_path = capture_path.into();
        Self {
            hcap_file: as_capture(&capture_path, "hccapx"),
            key_file: as_capture(&capture_path, "key"),
            capture_path,
            essid: None,
            wordlist: None,
            rule: None,
            metrics: AttackMetrics::new(),
        }
    }

    pub fn from_request(request: &AttackRequest) -> Self {
        let mut ctx = Self::new(&request.capture);
        ctx.wordlist = request.wordlist.clone();
        ctx.rule = request.rule.clone();
        ctx
    }

    pub fn is_already_cracked(&self) -> bool {
        self.key_file.exists()
    }

    /// Handshakes were extracted and no key has been found yet
    pub fn is_attack_needed(&self) -> bool {
        has_handshakes(&self.hcap_file) && !self.is_already_cracked()
    }

    /// Final `(key, status)` once the strategies are done
    pub fn key_status(&self) -> Result<(Option<String>, &'static str)> {
        if self.key_file.exists() {
            let content = fs::read_to_string(&self.key_file)
                .with_context(|| format!("Failed to read key file: {}", self.key_file))?;
            return Ok((extract_key(&content), status::COMPLETED));
        }
        if !has_handshakes(&self.hcap_file) {
            return Ok((None, status::NO_HANDSHAKES));
        }
        Ok((None, status::COMPLETED))
    }
}

/// Sibling of `capture` with its extension replaced by `ext`.
pub fn as_capture(capture: &Utf8Path, ext: &str) -> Utf8PathBuf {
    capture.with_extension(ext)
}

fn has_handshakes(hcap_file: &Utf8Path) -> bool {
    fs::metadata(hcap_file).is_ok_and(|m| m.len() > 0)
}

/// Network identifier printed by the converter: the text between `ESSID=` and ` (Length:`.
pub fn parse_essid(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        let start = line.find(ESSID_MARKER)? + ESSID_MARKER.len();
        let end = line[start..].find(ESSID_END_MARKER)? + start;
        let essid = &line[start..end];
        (!essid.is_empty()).then(|| essid.to_string())
    })
}

/// Recovered key from a hashcat outfile.
///
/// Lines look like `<hash>:<mac_ap>:<mac_sta>:<essid>:<key>`; the key is everything after the
/// fourth separator so keys containing `:` survive.
pub fn extract_key(content: &str) -> Option<String> {
    let line = content.lines().map(str::trim_end).find(|l| !l.is_empty())?;
    let fields: Vec<&str> = line.splitn(5, ':').collect();
    if fields.len() == 5 {
        return Some(fields[4].to_string());
    }
    line.rsplit(':').next().map(str::to_string)
}

/// Final state of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct AttackOutcome {
    pub status: String,
    pub key: Option<String>,
}

/// Ordered cracking strategies, cheapest first, stopping once a key is found.
#[derive(Debug, Clone)]
pub struct StrategyPipeline {
    pub builder: CommandBuilder,
    pub catalog: ResourceCatalog,
    pub converter_bin: String,
    pub hash_mode: u32,
}

impl StrategyPipeline {
    pub fn new(builder: CommandBuilder, catalog: ResourceCatalog, converter_bin: impl Into<String>, hash_mode: u32) -> Self {
        Self {
            builder,
            catalog,
            converter_bin: converter_bin.into(),
            hash_mode,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            CommandBuilder::from_settings(settings),
            ResourceCatalog::new(&settings.resources_dir),
            &settings.converter_bin,
            settings.hash_mode,
        )
    }

    /// Run every strategy for `ctx`, then store the outcome in `progress`.
    ///
    /// Strategies: handshake conversion, ESSID-derived candidates, weak passwords, long digit
    /// strings, and finally the user wordlist (the only step whose progress is reported and
    /// the only one bound by `timeout`).
    pub async fn crack(
        &self,
        ctx: &mut AttackContext,
        progress: &ProgressHandle,
        timeout: Option<Duration>,
    ) -> Result<AttackOutcome> {
        tracing::info!("Cracking {}", ctx.capture_path);

        let result = self.run_strategies(ctx, progress, timeout).await;
        ctx.metrics.log_summary(ctx.capture_path.as_str());
        result?;

        let (key, status) = ctx.key_status()?;
        progress.set_result(status, key.clone());
        tracing::info!("Finished cracking {}: {}", ctx.capture_path, status);

        Ok(AttackOutcome {
            status: status.to_string(),
            key,
        })
    }

    async fn run_strategies(
        &self,
        ctx: &mut AttackContext,
        progress: &ProgressHandle,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let start = Instant::now();
        ctx.essid = self.cap2hccapx(ctx).await?;
        ctx.metrics.record_step(STEP_CONVERT, start.elapsed());

        self.run_essid_attack(ctx, progress).await?;

        ensure_not_cancelled(progress)?;
        let start = Instant::now();
        if self.run_weak_passwords(ctx).await? {
            ctx.metrics.record_step(STEP_WEAK, start.elapsed());
        }

        ensure_not_cancelled(progress)?;
        let start = Instant::now();
        if self.run_digits8(ctx).await? {
            ctx.metrics.record_step(STEP_DIGITS_8, start.elapsed());
        }

        ensure_not_cancelled(progress)?;
        let start = Instant::now();
        if self.run_main_wordlist(ctx, progress, timeout).await? {
            ctx.metrics.record_step(STEP_MAIN, start.elapsed());
        }
        Ok(())
    }

    /// Convert the raw capture to `.hccapx`; returns the ESSID the converter reported.
    pub async fn cap2hccapx(&self, ctx: &AttackContext) -> Result<Option<String>> {
        let command = vec![
            quote(&self.converter_bin),
            quote(ctx.capture_path.as_str()),
            quote(ctx.hcap_file.as_str()),
        ];
        let output = subprocess_call(&command).await?;
        check_success(&output)?;

        let essid = parse_essid(&output.stdout);
        tracing::debug!("{}: ESSID {:?}", ctx.capture_path, essid);
        Ok(essid)
    }

    /// ESSID + digit suffix combinator attack, then ESSID through best64.
    pub async fn run_essid_attack(&self, ctx: &mut AttackContext, progress: &ProgressHandle) -> Result<()> {
        let Some(essid) = ctx.essid.clone() else {
            return Ok(());
        };
        if !ctx.is_attack_needed() {
            return Ok(());
        }

        let essid_wordlist = self.catalog.essid_wordlist();
        write_essid_wordlist(&essid, &essid_wordlist.path)?;

        ensure_not_cancelled(progress)?;
        let start = Instant::now();
        self.run_essid_digits(ctx, &essid_wordlist).await?;
        ctx.metrics.record_step(STEP_ESSID_DIGITS, start.elapsed());

        ensure_not_cancelled(progress)?;
        let start = Instant::now();
        if self.run_essid_rule(ctx, &essid_wordlist).await? {
            ctx.metrics.record_step(STEP_ESSID_RULE, start.elapsed());
        }
        Ok(())
    }

    async fn run_essid_digits(&self, ctx: &AttackContext, essid_wordlist: &WordList) -> Result<()> {
        let mut spec = self.new_spec(ctx);
        spec.add_wordlist(essid_wordlist)
            .add_wordlist(&self.catalog.digits_append())
            .add_custom_argument("-a1");
        self.run(&spec, ctx).await
    }

    async fn run_essid_rule(&self, ctx: &AttackContext, essid_wordlist: &WordList) -> Result<bool> {
        // the combinator run may already have found it
        if !ctx.is_attack_needed() {
            return Ok(false);
        }
        let mut spec = self.new_spec(ctx);
        spec.add_wordlist(essid_wordlist)
            .add_rule(self.catalog.best64())
            .pipe_word_candidates(true);
        self.run(&spec, ctx).await?;
        Ok(true)
    }

    /// Shallow, commonly used weak passwords through best64.
    pub async fn run_weak_passwords(&self, ctx: &AttackContext) -> Result<bool> {
        if !ctx.is_attack_needed() {
            return Ok(false);
        }
        let mut spec = self.new_spec(ctx);
        spec.add_wordlist(&self.catalog.weak())
            .add_rule(self.catalog.best64())
            .pipe_word_candidates(true);
        self.run(&spec, ctx).await?;
        Ok(true)
    }

    /// Birthdays and patterned digit strings of eight or more digits.
    pub async fn run_digits8(&self, ctx: &AttackContext) -> Result<bool> {
        if !ctx.is_attack_needed() {
            return Ok(false);
        }
        let mut spec = self.new_spec(ctx);
        spec.add_wordlist(&self.catalog.digits_8());
        self.run(&spec, ctx).await?;
        Ok(true)
    }

    /// The user-selected wordlist and rule, monitored for progress, cancellation and timeout.
    pub async fn run_main_wordlist(
        &self,
        ctx: &AttackContext,
        progress: &ProgressHandle,
        timeout: Option<Duration>,
    ) -> Result<bool> {
        let Some(wordlist) = &ctx.wordlist else {
            return Ok(false);
        };
        if !ctx.is_attack_needed() {
            return Ok(false);
        }

        let mut spec = self.new_spec(ctx);
        spec.add_wordlist(wordlist);
        if let Some(rule) = &ctx.rule {
            spec.add_rule(rule.clone());
        }
        if let Some(stem) = ctx.capture_path.file_stem() {
            spec.set_session(stem);
        }

        let capture = InvocationKind::Capture {
            hcap_file: ctx.hcap_file.clone(),
        };
        let command = self.builder.build(&spec, &capture);
        let output = run_with_status(&command, progress, timeout).await?;
        check_engine_output(&output)?;
        Ok(true)
    }

    fn new_spec(&self, ctx: &AttackContext) -> CommandSpec {
        CommandSpec::new(self.hash_mode, &ctx.key_file)
    }

    async fn run(&self, spec: &CommandSpec, ctx: &AttackContext) -> Result<()> {
        let command = self.builder.plan(spec, &ctx.hcap_file);
        run_engine(&command)
            .await
            .with_context(|| format!("Strategy failed for {}", ctx.capture_path))?;
        Ok(())
    }
}

fn ensure_not_cancelled(progress: &ProgressHandle) -> Result<(), EngineError> {
    if progress.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    Ok(())
}
