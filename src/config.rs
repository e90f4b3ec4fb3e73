use std::{fs, time::Duration};

use ron::{Options, extensions::Extensions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::webdb::RetryConfig;

pub const CONFIG_VERSION: f32 = 0.1;
/// Prefix for environment overrides, ex. `CALIBDB__VERSION`
pub const ENV_PREFIX: &str = "CALIBDB";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("loading config `{0}`")]
    Load(#[from] ::config::ConfigError),
    #[error("parsing config `{0}`")]
    Ron(#[from] ron::error::SpannedError),
    #[error("reading config `{0}`")]
    Io(#[from] std::io::Error),
    #[error("wrong config version. got {got}, expected {expected}")]
    Version { got: f32, expected: f32 },
    #[error("unknown folder `{0}`")]
    UnknownFolder(String),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CalibConfig {
    pub version: f32,
    pub folders: Vec<FolderConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FolderConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Fixes the retry jitter, mostly for reproducing runs
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl FolderConfig {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            tag: None,
            retry: RetryConfig::default(),
            seed: None,
            request_timeout_secs: None,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl CalibConfig {
    /// Reads a RON file, then applies `CALIBDB__*` environment overrides
    pub fn from_file(file_path: &str) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(file_path)?;
        // ron points at the offending line, the layered loader doesn't
        Self::parse_unchecked(&text)?;

        let settings = ::config::Config::builder()
            .add_source(::config::File::from_str(&text, ::config::FileFormat::Ron))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        let cfg: Self = settings.try_deserialize()?;
        cfg.check_version()?;
        Ok(cfg)
    }

    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let cfg = Self::parse_unchecked(s)?;
        cfg.check_version()?;
        Ok(cfg)
    }

    fn parse_unchecked(s: &str) -> Result<Self, ConfigError> {
        let options = Options::default()
            .with_default_extension(Extensions::IMPLICIT_SOME)
            .with_default_extension(Extensions::UNWRAP_NEWTYPES);
        Ok(options.from_str(s)?)
    }

    fn check_version(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Version {
                got: self.version,
                expected: CONFIG_VERSION,
            });
        }
        Ok(())
    }

    pub fn folder(&self, name: &str) -> Result<&FolderConfig, ConfigError> {
        self.folders
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| ConfigError::UnknownFolder(name.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const CONFIG: &str = r#"
(
    version: 0.1,
    folders: [
        (
            name: "channelstatus_data",
            url: "https://conditions.example/app/",
            tag: "v1r0",
            retry: (max_attempts: 3, base_delay_ms: 250),
            seed: 9,
            request_timeout_secs: 30,
        ),
        (
            name: "pedestals",
            url: "https://conditions.example/app",
        ),
    ],
)
"#;

    #[test]
    fn test_parse() {
        let cfg = CalibConfig::parse(CONFIG).unwrap();
        assert_eq!(cfg.folders.len(), 2);

        let status = cfg.folder("channelstatus_data").unwrap();
        assert_eq!(status.tag.as_deref(), Some("v1r0"));
        assert_eq!(status.retry.max_attempts, 3);
        assert_eq!(status.retry.base_delay_ms, 250);
        assert_eq!(status.seed, Some(9));
        assert_eq!(status.request_timeout(), Some(Duration::from_secs(30)));

        let peds = cfg.folder("pedestals").unwrap();
        assert_eq!(peds, &FolderConfig::new("pedestals", "https://conditions.example/app"));

        assert!(matches!(cfg.folder("gains"), Err(ConfigError::UnknownFolder(_))));
    }

    #[test]
    fn test_version_check() {
        let res = CalibConfig::parse("(version: 9.0, folders: [])");
        assert!(matches!(res, Err(ConfigError::Version { .. })));
        assert!(CalibConfig::parse("(folders: [])").is_err());
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("calibdb_test_{}.ron", std::process::id()));
        fs::write(&path, CONFIG).unwrap();

        let path_str = path.to_str().unwrap();
        let cfg = CalibConfig::from_file(path_str).unwrap();
        assert_eq!(cfg.folders[1].name, "pedestals");
        assert_eq!(cfg.folders[0].seed, Some(9));

        // syntax errors come back from ron with a position
        fs::write(&path, "(version: 0.1, folders: [(name: \"x\",]").unwrap();
        assert!(matches!(
            CalibConfig::from_file(path_str),
            Err(ConfigError::Ron(_))
        ));

        fs::remove_file(&path).unwrap();
    }
}
