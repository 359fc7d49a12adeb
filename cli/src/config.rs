use crate::api::{DEFAULT_BASE_URL, DEFAULT_GENERATE_PATH};
use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_FILE_NAME: &str = "storyreel.log";
const ENV_CONFIG_PATH: &str = "STORYREEL_CONFIG_PATH";
const ENV_BACKEND_URL: &str = "STORYREEL_BACKEND_URL";
const ENV_GENERATE_PATH: &str = "STORYREEL_GENERATE_PATH";
const ENV_DEFAULT_SCENES: &str = "STORYREEL_DEFAULT_SCENES";
const ENV_TTS_MODE: &str = "STORYREEL_TTS_MODE";
const ENV_DOWNLOAD_DIR: &str = "STORYREEL_DOWNLOAD_DIR";
const ENV_REQUEST_TIMEOUT: &str = "STORYREEL_REQUEST_TIMEOUT";
const ENV_SPEECH_COMMAND: &str = "STORYREEL_SPEECH_COMMAND";

pub const DEFAULT_DESIRED_SCENES: u32 = 3;
const DEFAULT_TTS_MODE: &str = "server";
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 300;

#[derive(Debug, Clone)]
pub struct AppConfig {
    backend_url: Option<String>,
    generate_path: String,
    default_desired_scenes: u32,
    tts_mode: String,
    download_dir: PathBuf,
    request_timeout_seconds: u64,
    speech_command: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let path = match config_file_override() {
            Some(path) => path,
            None => Self::default_config_path()?,
        };
        if path.exists() {
            let partial = read_partial(&path)?;
            config.apply_partial(partial);
        }

        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn backend_url(&self) -> &str {
        self.backend_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn generate_path(&self) -> &str {
        &self.generate_path
    }

    pub fn default_desired_scenes(&self) -> u32 {
        self.default_desired_scenes
    }

    pub fn tts_mode(&self) -> &str {
        &self.tts_mode
    }

    pub fn download_dir(&self) -> &PathBuf {
        &self.download_dir
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn speech_command(&self) -> Option<&str> {
        self.speech_command.as_deref()
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn log_path() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        let dir = dirs.data_local_dir();
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
        Ok(dir.join(LOG_FILE_NAME))
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(url) = partial.backend_url {
            self.backend_url = Some(url);
        }
        if let Some(path) = partial.generate_path {
            self.generate_path = path;
        }
        if let Some(scenes) = partial.default_desired_scenes.filter(|scenes| *scenes > 0) {
            self.default_desired_scenes = scenes;
        }
        if let Some(mode) = partial.tts_mode {
            self.tts_mode = mode;
        }
        if let Some(dir) = partial.download_dir {
            self.download_dir = dir;
        }
        if let Some(timeout) = partial.request_timeout_seconds {
            self.request_timeout_seconds = timeout;
        }
        if let Some(command) = partial.speech_command {
            self.speech_command = Some(command);
        }
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_BACKEND_URL) {
            if value.trim().is_empty() {
                self.backend_url = None;
            } else {
                self.backend_url = Some(value);
            }
        }
        if let Some(value) = lookup(ENV_GENERATE_PATH).filter(|v| !v.trim().is_empty()) {
            self.generate_path = value;
        }
        if let Some(value) = lookup(ENV_DEFAULT_SCENES).filter(|v| !v.trim().is_empty()) {
            let parsed = value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|scenes| *scenes > 0)
                .ok_or_else(|| anyhow!("{ENV_DEFAULT_SCENES} must be a positive integer"))?;
            self.default_desired_scenes = parsed;
        }
        if let Some(value) = lookup(ENV_TTS_MODE).filter(|v| !v.trim().is_empty()) {
            self.tts_mode = value;
        }
        if let Some(value) = lookup(ENV_DOWNLOAD_DIR).filter(|v| !v.trim().is_empty()) {
            self.download_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_REQUEST_TIMEOUT).filter(|v| !v.trim().is_empty()) {
            self.request_timeout_seconds = value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{ENV_REQUEST_TIMEOUT} must be a number of seconds"))?;
        }
        if let Some(value) = lookup(ENV_SPEECH_COMMAND) {
            if value.trim().is_empty() {
                self.speech_command = None;
            } else {
                self.speech_command = Some(value);
            }
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            generate_path: DEFAULT_GENERATE_PATH.into(),
            default_desired_scenes: DEFAULT_DESIRED_SCENES,
            tts_mode: DEFAULT_TTS_MODE.into(),
            download_dir: default_download_dir(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            speech_command: None,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "Storyreel", "Storyreel")
        .ok_or_else(|| anyhow!("unable to determine config directory"))
}

fn config_file_override() -> Option<PathBuf> {
    let value = env::var_os(ENV_CONFIG_PATH)?;
    if value.is_empty() {
        return None;
    }
    let path = PathBuf::from(value);
    if path.is_dir() {
        return Some(path.join(CONFIG_FILE_NAME));
    }
    Some(path)
}

fn read_partial(path: &Path) -> Result<PartialConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let partial: PartialConfig =
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(partial)
}

fn default_download_dir() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join("Downloads").join("Storyreel"))
        .unwrap_or_else(|| PathBuf::from("./downloads"))
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PartialConfig {
    backend_url: Option<String>,
    generate_path: Option<String>,
    default_desired_scenes: Option<u32>,
    tts_mode: Option<String>,
    download_dir: Option<PathBuf>,
    request_timeout_seconds: Option<u64>,
    speech_command: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_backend_contract() {
        let config = AppConfig::default();
        assert_eq!(config.backend_url(), DEFAULT_BASE_URL);
        assert_eq!(config.generate_path(), "/api/generate");
        assert_eq!(config.default_desired_scenes(), 3);
        assert_eq!(config.request_timeout(), Duration::from_secs(300));
        assert!(config.speech_command().is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "backend_url = \"http://story.local:8080\"\ndefault_desired_scenes = 5\ntts_mode = \"browser\"\n",
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.apply_partial(read_partial(&path).unwrap());

        assert_eq!(config.backend_url(), "http://story.local:8080");
        assert_eq!(config.default_desired_scenes(), 5);
        assert_eq!(config.tts_mode(), "browser");
        assert_eq!(config.generate_path(), DEFAULT_GENERATE_PATH);
    }

    #[test]
    fn zero_scene_default_in_file_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_partial(PartialConfig {
            default_desired_scenes: Some(0),
            ..PartialConfig::default()
        });
        assert_eq!(config.default_desired_scenes(), DEFAULT_DESIRED_SCENES);
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "default_desired_scenes = \"many\"").unwrap();
        let err = read_partial(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn env_overrides_and_clears_values() {
        let mut config = AppConfig::default();
        config.backend_url = Some("http://from-file".into());
        config
            .apply_env(lookup(&[
                (ENV_BACKEND_URL, "  "),
                (ENV_DEFAULT_SCENES, "4"),
                (ENV_DOWNLOAD_DIR, "/tmp/stories"),
                (ENV_REQUEST_TIMEOUT, "30"),
                (ENV_SPEECH_COMMAND, "espeak"),
            ]))
            .unwrap();

        assert_eq!(config.backend_url(), DEFAULT_BASE_URL);
        assert_eq!(config.default_desired_scenes(), 4);
        assert_eq!(config.download_dir(), &PathBuf::from("/tmp/stories"));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.speech_command(), Some("espeak"));
    }

    #[test]
    fn invalid_numeric_env_fails() {
        let mut config = AppConfig::default();
        assert!(config.apply_env(lookup(&[(ENV_DEFAULT_SCENES, "0")])).is_err());
        assert!(config.apply_env(lookup(&[(ENV_REQUEST_TIMEOUT, "soon")])).is_err());
    }
}
