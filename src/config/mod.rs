use std::{
    collections::HashMap,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::{
    sinks::SinkConfig,
    sources::aws_firehose::{AwsFirehoseConfig, BuildError},
};

pub mod format;
mod vars;

pub use format::Format;
pub use vars::{Interpolated, interpolate};

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Could not read config file {:?}: {}", path, source))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "Could not determine format of config file {:?}; expected a .toml, .yaml, .yml or .json extension.",
        path
    ))]
    UnknownFormat { path: PathBuf },
    #[snafu(display("Could not interpolate environment variables: {}", errors.join("; ")))]
    Interpolate { errors: Vec<String> },
    #[snafu(display("Could not parse {} config: {}", format, message))]
    Parse { format: Format, message: String },
    #[snafu(display("Invalid source configuration: {}", source))]
    Source { source: BuildError },
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Serve Prometheus metrics on this address. Disabled when unset.
    #[serde(default)]
    pub address: Option<SocketAddr>,
}

/// The complete receiver configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub source: AwsFirehoseConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Checks everything that can be checked without binding sockets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.source.relabeler().context(SourceSnafu)?;
        Ok(())
    }
}

/// Loads the config file at `path`, picking the format from its extension.
pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
    let format = Format::from_path(path).ok_or_else(|| ConfigError::UnknownFormat {
        path: path.to_owned(),
    })?;
    let input = std::fs::read_to_string(path).context(ReadSnafu { path })?;
    load_from_str(&input, format)
}

/// Interpolates environment variables into `input`, then parses and validates
/// it.
pub fn load_from_str(input: &str, format: Format) -> Result<Config, ConfigError> {
    let vars = std::env::vars().collect();
    load_with_vars(input, format, &vars)
}

fn load_with_vars(
    input: &str,
    format: Format,
    vars: &HashMap<String, String>,
) -> Result<Config, ConfigError> {
    let Interpolated { text, warnings } =
        interpolate(input, vars).map_err(|errors| ConfigError::Interpolate { errors })?;
    for warning in warnings {
        warn!("{}", warning);
    }

    let config: Config = format
        .deserialize(&text)
        .map_err(|message| ConfigError::Parse { format, message })?;
    config.validate()?;
    Ok(config)
}
