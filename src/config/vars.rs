//! `${VAR}` interpolation of configuration text.

use std::{collections::HashMap, sync::LazyLock};

use regex::{Captures, Regex};

// `$$` escapes a dollar sign. Names are `[:word:]` characters plus `.` and
// never start with a digit, so `$1` and `${1}` reach relabel rules untouched.
static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$|
        \$([[:alpha:]_][[:word:].]*)|
        \$\{([[:alpha:]_][[:word:].]*)(?:(:?-|:?\?)([^}]*))?\}",
    )
    .expect("interpolation pattern is valid")
});

/// What a `${NAME<op>arg}` expansion does when the variable is missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fallback<'a> {
    /// `$NAME`, `${NAME}`: expand to nothing and warn.
    Warn,
    /// `${NAME:-default}`: use `default` when unset or empty.
    DefaultIfEmpty(&'a str),
    /// `${NAME-default}`: use `default` when unset.
    DefaultIfUnset(&'a str),
    /// `${NAME:?message}`: fail when unset or empty.
    RequireNonEmpty(&'a str),
    /// `${NAME?message}`: fail when unset.
    RequireSet(&'a str),
}

impl<'a> Fallback<'a> {
    fn from_captures(caps: &Captures<'a>) -> Self {
        let arg = caps.get(4).map_or("", |m| m.as_str());
        match caps.get(3).map(|m| m.as_str()) {
            Some(":-") => Fallback::DefaultIfEmpty(arg),
            Some("-") => Fallback::DefaultIfUnset(arg),
            Some(":?") => Fallback::RequireNonEmpty(arg),
            Some("?") => Fallback::RequireSet(arg),
            _ => Fallback::Warn,
        }
    }
}

/// Interpolated text plus any warnings about unknown variables.
#[derive(Debug, PartialEq, Eq)]
pub struct Interpolated {
    pub text: String,
    pub warnings: Vec<String>,
}

/// Expands environment variable references in `input`.
///
/// Returns every required-but-missing variable as an error.
pub fn interpolate(
    input: &str,
    vars: &HashMap<String, String>,
) -> Result<Interpolated, Vec<String>> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let text = VARIABLE
        .replace_all(input, |caps: &Captures<'_>| {
            let Some(name) = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()) else {
                return "$".to_owned();
            };
            let value = vars.get(name).map(String::as_str);

            let expanded = match (Fallback::from_captures(caps), value) {
                (Fallback::DefaultIfEmpty(default), None | Some("")) => default,
                (Fallback::DefaultIfUnset(default), None) => default,
                (Fallback::RequireNonEmpty(message), None | Some("")) => {
                    errors.push(format!(
                        "Non-empty environment variable required in config. name = {:?}, error = {:?}",
                        name, message
                    ));
                    ""
                }
                (Fallback::RequireSet(message), None) => {
                    errors.push(format!(
                        "Missing environment variable required in config. name = {:?}, error = {:?}",
                        name, message
                    ));
                    ""
                }
                (Fallback::Warn, None) => {
                    warnings.push(format!(
                        "Unknown environment variable in config. name = {:?}",
                        name
                    ));
                    ""
                }
                (_, Some(value)) => value,
            };
            expanded.to_owned()
        })
        .into_owned();

    if errors.is_empty() {
        Ok(Interpolated { text, warnings })
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<String, String> {
        [
            ("ADDRESS", "0.0.0.0:9000"),
            ("TENANT", "team-a"),
            ("JAVA.STYLE", "dotted"),
            ("EMPTY", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
    }

    fn text(input: &str) -> String {
        interpolate(input, &vars()).unwrap().text
    }

    #[test]
    fn expands_references() {
        assert_eq!(text("$ADDRESS"), "0.0.0.0:9000");
        assert_eq!(text("${ADDRESS}"), "0.0.0.0:9000");
        assert_eq!(text(r#"address = "${ADDRESS}""#), r#"address = "0.0.0.0:9000""#);
        assert_eq!(text("x${TENANT}y"), "xteam-ay");
        assert_eq!(text("$JAVA.STYLE"), "dotted");
        assert_eq!(text("$TENANT-b"), "team-a-b");
    }

    #[test]
    fn leaves_non_references_alone() {
        assert_eq!(text("$ x"), "$ x");
        assert_eq!(text("$$TENANT"), "$TENANT");
        assert_eq!(text("${TENANT x"), "${TENANT x");
        assert_eq!(text("${}"), "${}");
        assert_eq!(text("(.*)"), "(.*)");
        assert_eq!(text("$${1}_seen"), "${1}_seen");
    }

    #[test]
    fn leaves_capture_group_references_alone() {
        assert_eq!(text("$1"), "$1");
        assert_eq!(text("${1}"), "${1}");
        assert_eq!(text("${TENANT}-$1-${2}"), "team-a-$1-${2}");

        let interpolated = interpolate("replacement = \"$1\"", &vars()).unwrap();
        assert_eq!(interpolated.text, "replacement = \"$1\"");
        assert!(interpolated.warnings.is_empty());
    }

    #[test]
    fn defaults() {
        assert_eq!(text("${TENANT:-other}"), "team-a");
        assert_eq!(text("${MISSING:-other}"), "other");
        assert_eq!(text("${EMPTY:-other}"), "other");
        assert_eq!(text("${MISSING-other}"), "other");
        assert_eq!(text("${EMPTY-other}"), "");
        assert_eq!(text("${MISSING:-}"), "");
    }

    #[test]
    fn required_variables() {
        assert_eq!(text("${TENANT:?tenant required}"), "team-a");
        assert_eq!(text("${EMPTY?set but empty is fine}"), "");
        assert!(interpolate("${EMPTY:?must not be empty}", &vars()).is_err());
        assert!(interpolate("${MISSING?required}", &vars()).is_err());

        let errors = interpolate("${A?a} ${B:?b}", &vars()).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn warns_about_unknown_variables() {
        let interpolated = interpolate("$MISSING", &vars()).unwrap();
        assert_eq!(interpolated.text, "");
        assert_eq!(interpolated.warnings.len(), 1);
    }
}
