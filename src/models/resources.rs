use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named dictionary file passed to hashcat as a positional argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordList {
    pub name: String,
    pub path: Utf8PathBuf,
}

/// A named hashcat rule file (`--rules=`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub path: Utf8PathBuf,
}

/// A named mask file used with `-a3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mask {
    pub name: String,
    pub path: Utf8PathBuf,
}

macro_rules! impl_resource {
    ($ty:ident) => {
        impl $ty {
            pub fn new(name: impl Into<String>, path: impl Into<Utf8PathBuf>) -> Self {
                Self {
                    name: name.into(),
                    path: path.into(),
                }
            }

            pub fn path(&self) -> &Utf8Path {
                &self.path
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} ({})", self.name, self.path)
            }
        }
    };
}

impl_resource!(WordList);
impl_resource!(Rule);
impl_resource!(Mask);

/// Built-in wordlists used by the cheap strategies.
const ESSID_WORDLIST: &str = "essid.txt";
const DIGITS_APPEND_WORDLIST: &str = "digits_append.txt";
const DIGITS_8_WORDLIST: &str = "digits_8.txt";
const WEAK_WORDLIST: &str = "weak.txt";
const BEST_64_RULE: &str = "best64.rule";

/// Resolves resource names to paths under the resources directory.
///
/// Layout:
/// - `<dir>/wordlists/*.txt`
/// - `<dir>/rules/*.rule`
///
/// Catalog values are immutable once built; the strategies only ever read them.
#[derive(Debug, Clone)]
pub struct ResourceCatalog {
    root: Utf8PathBuf,
}

impl ResourceCatalog {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn wordlists_dir(&self) -> Utf8PathBuf {
        self.root.join("wordlists")
    }

    pub fn rules_dir(&self) -> Utf8PathBuf {
        self.root.join("rules")
    }

    /// Scratch file overwritten with the identifier-derived candidates of the running job.
    pub fn essid_wordlist(&self) -> WordList {
        self.builtin_wordlist("essid", ESSID_WORDLIST)
    }

    /// Digit suffixes combined with the identifier wordlist (`-a1`).
    pub fn digits_append(&self) -> WordList {
        self.builtin_wordlist("digits_append", DIGITS_APPEND_WORDLIST)
    }

    /// Birthdays and patterned digit strings of 8+ characters.
    pub fn digits_8(&self) -> WordList {
        self.builtin_wordlist("digits_8", DIGITS_8_WORDLIST)
    }

    /// Shallow but common weak passwords.
    pub fn weak(&self) -> WordList {
        self.builtin_wordlist("weak", WEAK_WORDLIST)
    }

    pub fn best64(&self) -> Rule {
        Rule::new("best64", self.rules_dir().join(BEST_64_RULE))
    }

    /// Resolves a user-chosen wordlist: a name inside `wordlists/`, or an existing path.
    pub fn wordlist(&self, name_or_path: &str) -> WordList {
        WordList::new(
            display_name(name_or_path),
            resolve(&self.wordlists_dir(), name_or_path),
        )
    }

    pub fn rule(&self, name_or_path: &str) -> Rule {
        Rule::new(
            display_name(name_or_path),
            resolve(&self.rules_dir(), name_or_path),
        )
    }

    fn builtin_wordlist(&self, name: &str, file: &str) -> WordList {
        WordList::new(name, self.wordlists_dir().join(file))
    }
}

fn display_name(name_or_path: &str) -> String {
    Utf8Path::new(name_or_path)
        .file_stem()
        .unwrap_or(name_or_path)
        .to_string()
}

fn resolve(dir: &Utf8Path, name_or_path: &str) -> Utf8PathBuf {
    let candidate = Utf8Path::new(name_or_path);
    if candidate.is_absolute() || candidate.exists() {
        candidate.to_path_buf()
    } else {
        dir.join(candidate)
    }
}
