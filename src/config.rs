use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::constants::{
    CONFIG_FILE_PATH_ENV, DEFAULT_CONFIG_PATH, DEFAULT_REFERENCE_TIMEZONE, DEPLOYMENT_ENV_ENV,
    ENVIRONMENT_PLACEHOLDER,
};
use crate::domain::EntityKind;
use crate::error::ConfigError;
use crate::pipeline::ingestion::archive::{compile_exclusion_pattern, WalkOptions};
use crate::timestamp::TimestampNormalizer;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub deployment_env: String,
    pub ingest: IngestConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub xml_filename_exclusion_regex_pattern: Option<String>,
    pub reference_timezone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub root_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
    pub files: OutputFilesConfig,
}

/// File name per record kind, relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputFilesConfig {
    pub person: String,
    pub person_v2: String,
    pub manuscript: String,
    pub manuscript_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: String,
    pub file_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deployment_env: "ci".to_string(),
            ingest: IngestConfig::default(),
            source: SourceConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            xml_filename_exclusion_regex_pattern: None,
            reference_timezone: DEFAULT_REFERENCE_TIMEZONE.to_string(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root_dir: "data".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "output".to_string(),
            files: OutputFilesConfig::default(),
        }
    }
}

impl Default for OutputFilesConfig {
    fn default() -> Self {
        Self {
            person: "Person.json".to_string(),
            person_v2: "PersonV2.json".to_string(),
            manuscript: "Manuscript.json".to_string(),
            manuscript_version: "ManuscriptVersion.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            file_prefix: "ejp_xml_pipeline.log".to_string(),
        }
    }
}

impl OutputFilesConfig {
    pub fn file_for(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Person => &self.person,
            EntityKind::PersonV2 => &self.person_v2,
            EntityKind::Manuscript => &self.manuscript,
            EntityKind::ManuscriptVersion => &self.manuscript_version,
        }
    }
}

impl Config {
    /// Loads from `path`, else `EJP_XML_CONFIG_FILE_PATH`, else `config.toml`.
    /// Only the implicit default path may be absent, in which case the
    /// built-in defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| env::var(CONFIG_FILE_PATH_ENV).ok().map(PathBuf::from));
        let deployment_env = env::var(DEPLOYMENT_ENV_ENV).ok();

        match explicit {
            Some(path) => Self::load_from(&path, deployment_env.as_deref()),
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::load_from(path, deployment_env.as_deref())
                } else {
                    warn!("{} not found, using default configuration", DEFAULT_CONFIG_PATH);
                    let mut config = Self::default();
                    config.resolve(deployment_env.as_deref())?;
                    Ok(config)
                }
            }
        }
    }

    pub fn load_from(path: &Path, deployment_env: Option<&str>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        debug!("loaded configuration from {}", path.display());
        Self::from_toml_str(&content, deployment_env)
    }

    /// Parses, applies the deployment environment override, substitutes
    /// `{ENV}` and validates
    pub fn from_toml_str(content: &str, deployment_env: Option<&str>) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.resolve(deployment_env)?;
        Ok(config)
    }

    fn resolve(&mut self, deployment_env: Option<&str>) -> Result<(), ConfigError> {
        if let Some(deployment_env) = deployment_env.filter(|value| !value.trim().is_empty()) {
            self.deployment_env = deployment_env.trim().to_string();
        }
        self.substitute_environment();
        self.validate()
    }

    fn substitute_environment(&mut self) {
        let env = self.deployment_env.clone();
        let fields = [
            &mut self.source.root_dir,
            &mut self.output.directory,
            &mut self.output.files.person,
            &mut self.output.files.person_v2,
            &mut self.output.files.manuscript,
            &mut self.output.files.manuscript_version,
            &mut self.logging.directory,
            &mut self.logging.file_prefix,
            &mut self.ingest.reference_timezone,
        ];
        for field in fields {
            *field = substitute(field, &env);
        }
        if let Some(pattern) = self.ingest.xml_filename_exclusion_regex_pattern.as_mut() {
            *pattern = substitute(pattern, &env);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.timestamp_normalizer()?;
        self.exclusion_regex()?;
        Ok(())
    }

    pub fn timestamp_normalizer(&self) -> Result<TimestampNormalizer, ConfigError> {
        TimestampNormalizer::from_timezone_name(&self.ingest.reference_timezone)
    }

    fn exclusion_regex(&self) -> Result<Option<regex::Regex>, ConfigError> {
        match self
            .ingest
            .xml_filename_exclusion_regex_pattern
            .as_deref()
            .map(str::trim)
        {
            Some(pattern) if !pattern.is_empty() => Ok(Some(compile_exclusion_pattern(pattern)?)),
            _ => Ok(None),
        }
    }

    /// Walk settings for this configuration, with an optional pattern that
    /// replaces the configured one
    pub fn walk_options(&self, exclusion_override: Option<&str>) -> Result<WalkOptions, ConfigError> {
        let regex = match exclusion_override {
            Some(pattern) if !pattern.trim().is_empty() => {
                Some(compile_exclusion_pattern(pattern.trim())?)
            }
            _ => self.exclusion_regex()?,
        };
        Ok(WalkOptions::new(self.timestamp_normalizer()?).with_exclusion_regex(regex))
    }
}

fn substitute(value: &str, deployment_env: &str) -> String {
    value.replace(ENVIRONMENT_PLACEHOLDER, deployment_env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
deployment_env = "ci"

[ingest]
xml_filename_exclusion_regex_pattern = "ignored-.*"
reference_timezone = "US/Eastern"

[source]
root_dir = "data/{ENV}"

[output]
directory = "output/{ENV}"

[output.files]
person_v2 = "PersonV2-{ENV}.json"
"#;

    #[test]
    fn test_environment_placeholder_is_substituted() {
        let config = Config::from_toml_str(SAMPLE, None).unwrap();
        assert_eq!(config.source.root_dir, "data/ci");
        assert_eq!(config.output.directory, "output/ci");
        assert_eq!(config.output.files.person_v2, "PersonV2-ci.json");
        assert_eq!(config.output.files.person, "Person.json");
    }

    #[test]
    fn test_deployment_env_override() {
        let config = Config::from_toml_str(SAMPLE, Some("prod")).unwrap();
        assert_eq!(config.deployment_env, "prod");
        assert_eq!(config.source.root_dir, "data/prod");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_toml_str("", None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.output.files.file_for(EntityKind::ManuscriptVersion), "ManuscriptVersion.json");
    }

    #[test]
    fn test_invalid_timezone_is_rejected() {
        let err = Config::from_toml_str("[ingest]\nreference_timezone = \"Mars/Olympus\"", None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Timezone(name) if name == "Mars/Olympus"));
    }

    #[test]
    fn test_invalid_exclusion_pattern_is_rejected() {
        let err = Config::from_toml_str("[ingest]\nxml_filename_exclusion_regex_pattern = \"(\"", None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ExclusionPattern(_)));
    }

    #[test]
    fn test_walk_options_override() {
        let config = Config::from_toml_str(SAMPLE, None).unwrap();
        let configured = config.walk_options(None).unwrap();
        assert!(configured.is_excluded("ignored-1.xml"));

        let overridden = config.walk_options(Some("other-.*")).unwrap();
        assert!(!overridden.is_excluded("ignored-1.xml"));
        assert!(overridden.is_excluded("other-1.xml"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = Config::load_from(file.path(), Some("staging")).unwrap();
        assert_eq!(config.output.directory, "output/staging");
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Config::load_from(Path::new("/nonexistent/config.toml"), None).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
