use anyhow::{Context, Result};
use camino::Utf8Path;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::sync::LazyLock;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("Invalid non-alphanumeric regex"));

static NON_ALPHABETIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z]").expect("Invalid non-alphabetic regex"));

/// Split before every uppercase letter: `"MyWiFi"` -> `["My", "Wi", "Fi"]`.
pub fn split_uppercase(word: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    for c in word.chars() {
        if c.is_uppercase() && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// First character uppercased, the rest lowercased.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn case_variants(word: &str) -> [String; 5] {
    [
        word.to_string(),
        word.to_lowercase(),
        word.to_uppercase(),
        capitalize(word),
        capitalize(&word.to_lowercase()),
    ]
}

/// Candidate passwords derived from a network identifier (ESSID).
///
/// Fragments are the identifier itself, its pieces between non-alphanumeric characters and its
/// pieces between uppercase letters, each stripped to letters only. Every fragment, plus the
/// untouched identifier, contributes its case variants. Empty strings are dropped.
pub fn essid_candidates(essid: &str) -> BTreeSet<String> {
    let mut fragments: BTreeSet<String> = BTreeSet::new();
    fragments.insert(essid.to_string());
    fragments.extend(NON_ALPHANUMERIC.split(essid).map(str::to_string));
    fragments.extend(split_uppercase(essid));

    let mut candidates = BTreeSet::new();
    for fragment in &fragments {
        let letters = NON_ALPHABETIC.replace_all(fragment, "");
        candidates.extend(case_variants(&letters));
    }
    candidates.extend(case_variants(essid));
    candidates.retain(|candidate| !candidate.is_empty());
    candidates
}

/// Write the identifier candidates to `path`, one per line. Returns how many were written.
pub fn write_essid_wordlist(essid: &str, path: &Utf8Path) -> Result<usize> {
    let candidates = essid_candidates(essid);
    let mut content = String::new();
    for candidate in &candidates {
        content.push_str(candidate);
        content.push('\n');
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create wordlist directory: {}", parent))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write ESSID wordlist: {}", path))?;

    tracing::debug!("Wrote {} ESSID candidates to {}", candidates.len(), path);
    Ok(candidates.len())
}
