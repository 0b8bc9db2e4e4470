//! Prometheus-style relabeling of label sets.
//!
//! Rules run in order against the label set built for an entry. A rule can
//! rewrite labels, drop them, or drop the whole set. The handler treats the
//! rule set as a pure function and hides every internal (`__`) label once the
//! rules have run, so rules are where internal labels get promoted to public
//! names.

use std::fmt;

use md5::{Digest, Md5};
use regex::Regex;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::event::labels::{LabelBuilder, LabelSet, valid_label_name};

/// A transformation applied to every label set before internal labels are
/// stripped.
pub trait Relabeler: Send + Sync {
    fn relabel(&self, labels: LabelSet) -> LabelSet;
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    Replace,
    Keep,
    Drop,
    HashMod,
    LabelMap,
    LabelDrop,
    LabelKeep,
    Lowercase,
    Uppercase,
    KeepEqual,
    DropEqual,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Replace => "replace",
            Action::Keep => "keep",
            Action::Drop => "drop",
            Action::HashMod => "hashmod",
            Action::LabelMap => "labelmap",
            Action::LabelDrop => "labeldrop",
            Action::LabelKeep => "labelkeep",
            Action::Lowercase => "lowercase",
            Action::Uppercase => "uppercase",
            Action::KeepEqual => "keepequal",
            Action::DropEqual => "dropequal",
        };
        f.write_str(name)
    }
}

const DEFAULT_SEPARATOR: &str = ";";
const DEFAULT_REGEX: &str = "(.*)";
const DEFAULT_REPLACEMENT: &str = "$1";

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_owned()
}

fn default_regex() -> String {
    DEFAULT_REGEX.to_owned()
}

fn default_replacement() -> String {
    DEFAULT_REPLACEMENT.to_owned()
}

/// One relabeling rule as written in the configuration file.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RelabelConfig {
    /// Labels whose values are joined with `separator` and matched against `regex`.
    #[serde(default)]
    pub source_labels: Vec<String>,

    #[serde(default = "default_separator")]
    pub separator: String,

    /// Matched against the whole joined value; the pattern is always anchored.
    #[serde(default = "default_regex")]
    pub regex: String,

    #[serde(default)]
    pub modulus: u64,

    #[serde(default)]
    pub target_label: String,

    #[serde(default = "default_replacement")]
    pub replacement: String,

    #[serde(default)]
    pub action: Action,
}

impl Default for RelabelConfig {
    fn default() -> Self {
        Self {
            source_labels: Vec::new(),
            separator: default_separator(),
            regex: default_regex(),
            modulus: 0,
            target_label: String::new(),
            replacement: default_replacement(),
            action: Action::default(),
        }
    }
}

#[derive(Debug, Snafu)]
pub enum RelabelError {
    #[snafu(display("Relabel rule {} has an invalid regex {:?}: {}", index, regex, source))]
    InvalidRegex {
        index: usize,
        regex: String,
        source: regex::Error,
    },
    #[snafu(display("Relabel rule {} with action {} requires `target_label`.", index, action))]
    MissingTargetLabel { index: usize, action: Action },
    #[snafu(display(
        "Relabel rule {} has an invalid `target_label` {:?} for action {}.",
        index,
        target_label,
        action
    ))]
    InvalidTargetLabel {
        index: usize,
        target_label: String,
        action: Action,
    },
    #[snafu(display("Relabel rule {} with action hashmod requires a non-zero `modulus`.", index))]
    ZeroModulus { index: usize },
    #[snafu(display(
        "Relabel rule {} with action {} only accepts `regex`; found `{}`.",
        index,
        action,
        field
    ))]
    UnexpectedField {
        index: usize,
        action: Action,
        field: &'static str,
    },
}

#[derive(Debug)]
struct Rule {
    source_labels: Vec<String>,
    separator: String,
    regex: Regex,
    modulus: u64,
    target_label: String,
    replacement: String,
    action: Action,
}

impl Rule {
    fn compile(index: usize, config: RelabelConfig) -> Result<Self, RelabelError> {
        let action = config.action;

        let requires_target = matches!(
            action,
            Action::Replace
                | Action::HashMod
                | Action::Lowercase
                | Action::Uppercase
                | Action::KeepEqual
                | Action::DropEqual
        );
        if requires_target && config.target_label.is_empty() {
            return MissingTargetLabelSnafu { index, action }.fail();
        }

        let templated = action == Action::Replace && config.target_label.contains('$');
        if requires_target && !templated && !valid_label_name(&config.target_label) {
            return InvalidTargetLabelSnafu {
                index,
                target_label: config.target_label,
                action,
            }
            .fail();
        }

        if action == Action::HashMod && config.modulus == 0 {
            return ZeroModulusSnafu { index }.fail();
        }

        if matches!(action, Action::LabelDrop | Action::LabelKeep) {
            let field = if !config.source_labels.is_empty() {
                Some("source_labels")
            } else if !config.target_label.is_empty() {
                Some("target_label")
            } else if config.modulus != 0 {
                Some("modulus")
            } else if config.separator != DEFAULT_SEPARATOR {
                Some("separator")
            } else if config.replacement != DEFAULT_REPLACEMENT {
                Some("replacement")
            } else {
                None
            };
            if let Some(field) = field {
                return UnexpectedFieldSnafu {
                    index,
                    action,
                    field,
                }
                .fail();
            }
        }

        let regex = Regex::new(&format!("^(?:{})$", config.regex)).context(InvalidRegexSnafu {
            index,
            regex: config.regex.clone(),
        })?;

        Ok(Self {
            source_labels: config.source_labels,
            separator: config.separator,
            regex,
            modulus: config.modulus,
            target_label: config.target_label,
            replacement: config.replacement,
            action,
        })
    }

    fn source_value(&self, builder: &LabelBuilder) -> String {
        self.source_labels
            .iter()
            .map(|name| builder.get(name).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    /// Returns `false` when the rule drops the whole label set.
    fn apply(&self, builder: &mut LabelBuilder) -> bool {
        let value = self.source_value(builder);

        match self.action {
            Action::Drop => {
                if self.regex.is_match(&value) {
                    return false;
                }
            }
            Action::Keep => {
                if !self.regex.is_match(&value) {
                    return false;
                }
            }
            Action::DropEqual => {
                if builder.get(&self.target_label).unwrap_or_default() == value {
                    return false;
                }
            }
            Action::KeepEqual => {
                if builder.get(&self.target_label).unwrap_or_default() != value {
                    return false;
                }
            }
            Action::Replace => self.replace(builder, &value),
            Action::Lowercase => {
                builder.set(self.target_label.as_str(), value.to_lowercase());
            }
            Action::Uppercase => {
                builder.set(self.target_label.as_str(), value.to_uppercase());
            }
            Action::HashMod => {
                let modded = hash_of(&value) % self.modulus;
                builder.set(self.target_label.as_str(), modded.to_string());
            }
            Action::LabelMap => {
                let mapped: Vec<(String, String)> = builder
                    .iter()
                    .filter(|(name, _)| self.regex.is_match(name))
                    .map(|(name, value)| {
                        let renamed = self.regex.replace_all(name, self.replacement.as_str());
                        (renamed.into_owned(), value.to_owned())
                    })
                    .collect();
                for (name, value) in mapped {
                    builder.set(name, value);
                }
            }
            Action::LabelDrop | Action::LabelKeep => {
                let drop_matching = self.action == Action::LabelDrop;
                let doomed: Vec<String> = builder
                    .iter()
                    .filter(|(name, _)| self.regex.is_match(name) == drop_matching)
                    .map(|(name, _)| name.to_owned())
                    .collect();
                for name in doomed {
                    builder.del(&name);
                }
            }
        }

        true
    }

    fn replace(&self, builder: &mut LabelBuilder, value: &str) {
        let Some(captures) = self.regex.captures(value) else {
            return;
        };

        let mut target = String::new();
        captures.expand(&self.target_label, &mut target);
        if !valid_label_name(&target) {
            return;
        }

        let mut replaced = String::new();
        captures.expand(&self.replacement, &mut replaced);
        builder.set(target, replaced);
    }
}

// The low 64 bits of the MD5 digest, read big-endian.
fn hash_of(value: &str) -> u64 {
    let digest = Md5::digest(value.as_bytes());
    let mut low = [0u8; 8];
    low.copy_from_slice(&digest[8..16]);
    u64::from_be_bytes(low)
}

/// An ordered, validated list of relabeling rules.
#[derive(Debug, Default)]
pub struct RelabelRules {
    rules: Vec<Rule>,
}

impl RelabelRules {
    pub fn new(configs: impl IntoIterator<Item = RelabelConfig>) -> Result<Self, RelabelError> {
        let rules = configs
            .into_iter()
            .enumerate()
            .map(|(index, config)| Rule::compile(index, config))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Runs every rule in order; `None` means a `keep`/`drop` style rule
    /// discarded the label set.
    pub fn process(&self, labels: LabelSet) -> Option<LabelSet> {
        let mut builder = LabelBuilder::from_labels(labels);
        for rule in &self.rules {
            if !rule.apply(&mut builder) {
                return None;
            }
        }
        Some(builder.into_labels())
    }
}

impl Relabeler for RelabelRules {
    fn relabel(&self, labels: LabelSet) -> LabelSet {
        self.process(labels).unwrap_or_default()
    }
}
