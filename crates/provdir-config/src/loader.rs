//! Layered settings loading

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::merger::{ConfigSource, Layer};
use crate::settings::Settings;
use crate::{ConfigError, Result};

/// Packaged defaults, always the lowest layer
const DEFAULTS: &str = include_str!("../resources/provdir.toml");

/// Override file name looked up under each search directory
pub const CONFIG_FILE_NAME: &str = "provdir.toml";

/// Override directories relative to the search root, lowest priority first
const SEARCH_DIRS: [&str; 2] = ["conf", "../conf"];

/// Builds a validated [`Settings`] snapshot from defaults and override files
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    search_root: PathBuf,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    /// Loader that resolves override files against the current directory
    pub fn new() -> Self {
        Self {
            search_root: PathBuf::from("."),
        }
    }

    pub fn with_search_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_root = root.into();
        self
    }

    /// Candidate override files, lowest priority first
    pub fn candidate_files(&self) -> Vec<PathBuf> {
        SEARCH_DIRS
            .iter()
            .map(|dir| self.search_root.join(dir).join(CONFIG_FILE_NAME))
            .collect()
    }

    /// Load every layer, merge, and validate.
    ///
    /// A missing override file is skipped. An unreadable or malformed one, or a
    /// configuration that fails [`Settings::validate`], is an error.
    pub fn load(&self) -> Result<Settings> {
        let settings = self.load_unvalidated()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and merge every layer without validating.
    ///
    /// For callers that apply runtime overrides first; they must call
    /// [`Settings::validate`] on the final snapshot.
    pub fn load_unvalidated(&self) -> Result<Settings> {
        let mut layers = vec![Layer::from_toml(
            ConfigSource::Default,
            "defaults",
            DEFAULTS,
        )?];

        for path in self.candidate_files() {
            if let Some(layer) = read_layer(&path)? {
                layers.push(layer);
            }
        }

        let settings = Settings::from_layers(layers);
        info!(
            layers = settings.applied_layers().len(),
            properties = settings.property_names().len(),
            "Loaded exporter settings"
        );
        Ok(settings)
    }
}

fn read_layer(path: &Path) -> Result<Option<Layer>> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist, skipping");
        return Ok(None);
    }

    let origin = path.display().to_string();
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::io(origin.clone(), e))?;
    debug!(path = %origin, "Read config file");
    Layer::from_toml(ConfigSource::File, origin, &content).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;
    use std::fs;

    fn write_conf(dir: &Path, body: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(CONFIG_FILE_NAME), body).unwrap();
    }

    #[test]
    fn test_defaults_only() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = SettingsLoader::new()
            .with_search_root(tmp.path())
            .load()
            .unwrap();

        assert_eq!(
            settings.get(keys::BASE_DIRECTORY).as_deref(),
            Some(keys::DEFAULT_BASE_DIRECTORY)
        );
        assert!(settings.get_bool(keys::TRANSACTION_BUNDLE));
        assert!(!settings.get_bool(keys::COMPRESS_DATA));
        assert!(settings.get_bool("exporter.hospital.fhir.export"));
        assert!(!settings.get_bool("exporter.practitioner.fhir_dstu2.export"));
        assert_eq!(
            settings.get_u64_or(keys::HTTP_TIMEOUT_SECONDS, 0),
            keys::DEFAULT_HTTP_TIMEOUT_SECONDS
        );
        assert_eq!(settings.applied_layers().len(), 1);
        assert_eq!(settings.version(), 0);
    }

    #[test]
    fn test_parent_conf_wins_over_conf() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("run");
        write_conf(
            &root.join("conf"),
            "[exporter]\nbaseDirectory = \"./from-conf/\"\n[exporter.fhir]\ntransaction_bundle = false\n",
        );
        write_conf(
            &tmp.path().join("conf"),
            "[exporter]\nbaseDirectory = \"./from-parent/\"\n",
        );

        let settings = SettingsLoader::new().with_search_root(&root).load().unwrap();

        assert_eq!(
            settings.get(keys::BASE_DIRECTORY).as_deref(),
            Some("./from-parent/")
        );
        assert!(!settings.get_bool(keys::TRANSACTION_BUNDLE));
        assert_eq!(settings.applied_layers().len(), 3);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_conf(&tmp.path().join("conf"), "[exporter\n");

        let err = SettingsLoader::new()
            .with_search_root(tmp.path())
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_fails_fast_on_incomplete_upload_settings() {
        let tmp = tempfile::tempdir().unwrap();
        write_conf(
            &tmp.path().join("conf"),
            "[exporter.aws.s3]\nexport_enabled = true\nbucket_name = \"synthetic\"\n",
        );

        let err = SettingsLoader::new()
            .with_search_root(tmp.path())
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains(keys::AWS_S3_BUCKET_BASE_PATH));
    }

    #[test]
    fn test_overrides_can_complete_upload_settings() {
        let tmp = tempfile::tempdir().unwrap();
        write_conf(
            &tmp.path().join("conf"),
            "[exporter.aws.s3]\nexport_enabled = true\nbucket_name = \"synthetic\"\n",
        );

        let settings = SettingsLoader::new()
            .with_search_root(tmp.path())
            .load_unvalidated()
            .unwrap();
        assert!(settings.validate().is_err());

        let settings = settings
            .with_override(keys::AWS_S3_BUCKET_BASE_PATH, "exports")
            .with_override(keys::AWS_S3_ACCESS_KEY, "AKIA")
            .with_override(keys::AWS_S3_SECRET_KEY, "secret");
        settings.validate().unwrap();
        assert_eq!(settings.version(), 3);
    }
}
