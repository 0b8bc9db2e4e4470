use std::{collections::BTreeMap, fmt::Write as _};

use crate::relabel::Relabeler;

/// Label names starting with this prefix are internal and never leave the
/// pipeline unless relabeled to a public name.
pub const INTERNAL_PREFIX: &str = "__";

/// The one internal label that survives post-processing; downstream sinks use
/// it to route the entry to a tenant.
pub const RESERVED_LABEL_TENANT_ID: &str = "__tenant_id__";

/// Label name to label value, sorted by name.
pub type LabelSet = BTreeMap<String, String>;

/// Incrementally builds a [`LabelSet`].
///
/// Setting a label to an empty value removes it, so a missing header and an
/// empty header produce the same label set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelBuilder {
    labels: LabelSet,
}

impl LabelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_labels(labels: LabelSet) -> Self {
        Self { labels }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        if value.is_empty() {
            self.labels.remove(&name);
        } else {
            self.labels.insert(name, value);
        }
        self
    }

    pub fn del(&mut self, name: &str) -> &mut Self {
        self.labels.remove(name);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn labels(&self) -> LabelSet {
        self.labels.clone()
    }

    pub fn into_labels(self) -> LabelSet {
        self.labels
    }
}

/// Label names follow the Prometheus data model: `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(ch) => {
            (ch.is_ascii_alphabetic() || ch == '_')
                && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        None => false,
    }
}

/// Values are UTF-8 by construction; an empty value means "unset".
pub fn valid_label_value(value: &str) -> bool {
    !value.is_empty()
}

pub fn is_internal(name: &str) -> bool {
    name.starts_with(INTERNAL_PREFIX)
}

/// Applies the relabeling stage, then strips internal labels (except the
/// tenant label) and anything the label grammar rejects.
pub fn finalize(builder: &LabelBuilder, relabeler: Option<&dyn Relabeler>) -> LabelSet {
    let labels = match relabeler {
        Some(relabeler) => relabeler.relabel(builder.labels()),
        None => builder.labels(),
    };

    labels
        .into_iter()
        .filter(|(name, value)| {
            if is_internal(name) && name != RESERVED_LABEL_TENANT_ID {
                return false;
            }
            valid_label_name(name) && valid_label_value(value)
        })
        .collect()
}

/// Renders labels the way Loki and Prometheus print them: `{a="b", c="d"}`.
pub fn format_labels(labels: &LabelSet) -> String {
    let mut out = String::from("{");
    for (i, (name, value)) in labels.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}={:?}", name, value);
    }
    out.push('}');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rename;

    impl Relabeler for Rename {
        fn relabel(&self, mut labels: LabelSet) -> LabelSet {
            if let Some(value) = labels.remove("__aws_owner") {
                labels.insert("owner".into(), value);
            }
            labels.insert("bad-name".into(), "x".into());
            labels
        }
    }

    #[test]
    fn valid_label_names() {
        assert!(valid_label_name("name"));
        assert!(valid_label_name("bee_bop"));
        assert!(valid_label_name("a09b"));
        assert!(valid_label_name("_"));
        assert!(valid_label_name("__tenant_id__"));

        assert!(!valid_label_name("0ab"));
        assert!(!valid_label_name("*"));
        assert!(!valid_label_name(""));
        assert!(!valid_label_name(" name"));
        assert!(!valid_label_name("log-group"));
        assert!(!valid_label_name("naïve"));
    }

    #[test]
    fn empty_value_unsets_label() {
        let mut builder = LabelBuilder::new();
        builder.set("job", "firehose");
        assert_eq!(builder.get("job"), Some("firehose"));

        builder.set("job", "");
        assert_eq!(builder.get("job"), None);

        builder.set("never_set", "");
        assert!(builder.labels().is_empty());
    }

    #[test]
    fn later_set_overwrites() {
        let mut builder = LabelBuilder::new();
        builder.set("job", "a").set("job", "b");
        assert_eq!(builder.get("job"), Some("b"));
        assert_eq!(builder.labels().len(), 1);
    }

    #[test]
    fn finalize_strips_internal_labels_but_keeps_tenant() {
        let mut builder = LabelBuilder::new();
        builder
            .set("__aws_firehose_request_id", "abc")
            .set(RESERVED_LABEL_TENANT_ID, "team-a")
            .set("job", "firehose");

        let labels = finalize(&builder, None);

        assert_eq!(labels.len(), 2);
        assert_eq!(labels[RESERVED_LABEL_TENANT_ID], "team-a");
        assert_eq!(labels["job"], "firehose");
    }

    #[test]
    fn finalize_drops_invalid_names_produced_by_relabeling() {
        let mut builder = LabelBuilder::new();
        builder.set("__aws_owner", "123456789012");

        let labels = finalize(&builder, Some(&Rename));

        assert_eq!(labels.len(), 1);
        assert_eq!(labels["owner"], "123456789012");
    }

    #[test]
    fn formats_labels() {
        let mut builder = LabelBuilder::new();
        builder.set("b", "2").set("a", "say \"hi\"");
        assert_eq!(
            format_labels(&builder.labels()),
            r#"{a="say \"hi\"", b="2"}"#
        );
        assert_eq!(format_labels(&LabelSet::new()), "{}");
    }
}
