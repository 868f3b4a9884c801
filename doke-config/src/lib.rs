//! Settings for the doke matcher, assembler and CLI output.
//!
//! Every key has a value in `defaults/doke.default.toml`, which is compiled in.
//! A project can adjust them with a `doke.toml` next to its root config, and a
//! single run can adjust them again with `--settings` and command-line flags.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/doke.default.toml");

/// Top-level settings consumed by doke applications.
#[derive(Debug, Clone, Deserialize)]
pub struct DokeSettings {
    pub matching: MatchingSettings,
    pub assembly: AssemblySettings,
    pub output: OutputSettings,
}

/// Knobs of the sentence matcher.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    pub case_sensitive: bool,
    pub max_depth: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssemblySettings {
    pub exhaustive: bool,
}

/// Controls how assembled value graphs are printed.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Json,
    Debug,
}

/// Name of the per-project settings file, looked up beside the root config.
pub const PROJECT_FILE: &str = "doke.toml";

/// Resolves [`DokeSettings`] from up to four layers, later ones winning:
///
/// 1. the embedded defaults
/// 2. `doke.toml` in the project directory, when present
/// 3. a settings file named explicitly by the user
/// 4. single-key overrides from command-line flags
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let defaults = File::from_str(DEFAULT_TOML, FileFormat::Toml);
        Self {
            builder: Config::builder().add_source(defaults),
        }
    }

    /// Layer `doke.toml` from the project directory, if the project has one.
    pub fn with_project_dir(self, dir: impl AsRef<Path>) -> Self {
        self.with_toml(dir.as_ref().join(PROJECT_FILE), false)
    }

    /// Layer a settings file the user asked for; a missing file fails [`Loader::load`].
    pub fn with_settings_file(self, path: impl AsRef<Path>) -> Self {
        self.with_toml(path, true)
    }

    fn with_toml(mut self, path: impl AsRef<Path>, required: bool) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(required);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Override one dotted key, as in `output.format`.
    pub fn with_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Merge the layers and check the result.
    pub fn load(self) -> Result<DokeSettings, ConfigError> {
        let settings: DokeSettings = self.builder.build()?.try_deserialize()?;
        if settings.matching.max_depth == 0 {
            return Err(ConfigError::Message(
                "matching.max_depth must be at least 1".to_string(),
            ));
        }
        Ok(settings)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings with nothing layered over the defaults.
pub fn load_defaults() -> Result<DokeSettings, ConfigError> {
    Loader::new().load()
}
