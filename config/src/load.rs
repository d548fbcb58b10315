use std::path::{Path, PathBuf};

use rust_cli_config::FileFormat;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "APP";

/// Separator between environment variable prefix and key segments.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
const ENV_SEPARATOR: &str = "__";

/// Errors that can occur while loading a configuration file and its overrides.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    /// The configuration file does not exist or is not a regular file.
    #[error("configuration file `{0}` does not exist")]
    MissingFile(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("failed to load configuration from `{path}`: {source}")]
    FileLoad {
        path: PathBuf,
        #[source]
        source: rust_cli_config::ConfigError,
    },

    /// The configuration was parsed but does not match the expected structure.
    #[error("failed to deserialize configuration from `{path}`: {source}")]
    Deserialization {
        path: PathBuf,
        #[source]
        source: rust_cli_config::ConfigError,
    },
}

/// Loads a configuration of type `T` from the file at `path`.
///
/// Files ending in `.json` are parsed as JSON, everything else as YAML. Values from
/// `APP_`-prefixed environment variables override the file, with nested keys separated by
/// double underscores (`APP_TARGET__URL`).
pub fn load_config_from_path<T>(path: &Path) -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    if !path.is_file() {
        return Err(LoadConfigError::MissingFile(path.to_path_buf()));
    }

    let file_source =
        rust_cli_config::File::new(&path.to_string_lossy(), file_format_for(path)).required(true);

    let environment_source = rust_cli_config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR);

    let settings = rust_cli_config::Config::builder()
        .add_source(file_source)
        .add_source(environment_source)
        .build()
        .map_err(|source| LoadConfigError::FileLoad {
            path: path.to_path_buf(),
            source,
        })?;

    settings
        .try_deserialize::<T>()
        .map_err(|source| LoadConfigError::Deserialization {
            path: path.to_path_buf(),
            source,
        })
}

fn file_format_for(path: &Path) -> FileFormat {
    match path.extension().and_then(|extension| extension.to_str()) {
        Some(extension) if extension.eq_ignore_ascii_case("json") => FileFormat::Json,
        _ => FileFormat::Yaml,
    }
}
