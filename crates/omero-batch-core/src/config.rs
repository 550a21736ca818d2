use crate::params::BatchParameters;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::PathBuf;

/// Where the images of a run come from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "from", rename_all = "kebab-case")]
pub enum InputConfig {
    Local {
        directory: PathBuf,
        #[serde(default)]
        recursive: bool,
        #[serde(default)]
        ignore_patterns: Vec<String>,
    },
    Remote {
        dataset_id: i64,
    },
}

/// The analysis script and the inputs handed to it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Legacy comma-separated `name=value` list.
    pub arguments: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub params: BatchParameters,
    #[serde(default)]
    pub script: ScriptConfig,
}

/// Reads `Config.toml` (optional) and `BATCH__*` environment overrides.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    load_configuration_from("Config")
}

pub fn load_configuration_from(name: &str) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name(name).required(false))
        .add_source(Environment::with_prefix("BATCH").separator("__"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RoiMode;
    use config::FileFormat;

    fn parse(toml: &str) -> AppConfig {
        Config::builder()
            .add_source(ConfigFile::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_local_input_with_defaults() {
        let config = parse(
            r#"
            [input]
            from = "local"
            directory = "/data/plates"
            "#,
        );
        assert_eq!(
            config.input,
            InputConfig::Local {
                directory: PathBuf::from("/data/plates"),
                recursive: false,
                ignore_patterns: vec![],
            }
        );
        assert_eq!(config.params, BatchParameters::default());
        assert!(config.script.command.is_none());
    }

    #[test]
    fn test_remote_input_and_params() {
        let config = parse(
            r#"
            [input]
            from = "remote"
            dataset_id = 42

            [params]
            roi_mode = "to-overlay"
            save_rois = true
            output_on_remote = true
            output_dataset_id = 7
            suffix = "_seg"

            [script]
            command = "segment.sh"
            arguments = "threshold=12,mode=otsu"
            "#,
        );
        assert_eq!(config.input, InputConfig::Remote { dataset_id: 42 });
        assert_eq!(config.params.roi_mode, RoiMode::ToOverlay);
        assert!(config.params.save_rois);
        assert_eq!(config.params.output_dataset_id, Some(7));
        assert_eq!(config.params.suffix, "_seg");
        assert_eq!(config.script.command.as_deref(), Some("segment.sh"));
        assert_eq!(config.script.arguments, "threshold=12,mode=otsu");
    }
}
