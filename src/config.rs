use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::EnsGuardError;

pub static CONFIG: OnceCell<Config> = OnceCell::new();

const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "ENSGUARD_";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub ensguard: String,
}

impl LoggingConfig {
    const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    const ENSGUARD_LEVEL: &str = "info";

    fn default() -> Self {
        LoggingConfig {
            ensguard: Self::ENSGUARD_LEVEL.to_string(),
        }
    }

    fn ensure_valid(&mut self) {
        let str_original = self.ensguard.clone();
        self.ensguard = self.ensguard.trim().to_ascii_lowercase();
        if !Self::LOG_LEVELS.contains(&self.ensguard.as_str()) {
            eprintln!(
                "Config error: ensguard log level of '{}' is invalid - using default of '{}'",
                str_original,
                Self::ENSGUARD_LEVEL
            );
            self.ensguard = Self::ENSGUARD_LEVEL.to_owned();
        }
    }

    /// flexi_logger spec: our own crate at the configured level, everything
    /// else at warn
    pub fn log_spec(&self) -> String {
        format!("warn, ensguard={}", self.ensguard)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Reject assessments for ids missing from the catalog
    pub validate_measure_ids: bool,
    /// Relative paths resolve against the data directory
    pub snapshot_file: String,
    /// Optional JSON catalog replacing the built-in ENS catalog
    pub catalog_file: Option<String>,
    /// Seed the demo assessments when no snapshot exists yet
    pub seed_demo: bool,
}

impl StoreConfig {
    const SNAPSHOT_FILE: &str = "assessments.json";

    fn default() -> Self {
        StoreConfig {
            validate_measure_ids: true,
            snapshot_file: Self::SNAPSHOT_FILE.to_owned(),
            catalog_file: None,
            seed_demo: true,
        }
    }

    fn ensure_valid(&mut self) {
        if self.snapshot_file.trim().is_empty() {
            eprintln!(
                "Config error: snapshot_file is empty - using default of '{}'",
                Self::SNAPSHOT_FILE
            );
            self.snapshot_file = Self::SNAPSHOT_FILE.to_owned();
        }
        if let Some(catalog_file) = &self.catalog_file {
            if catalog_file.trim().is_empty() {
                self.catalog_file = None;
            }
        }
    }

    pub fn snapshot_path(&self, data_dir: &Path) -> PathBuf {
        resolve(data_dir, &self.snapshot_file)
    }

    pub fn catalog_path(&self, data_dir: &Path) -> Option<PathBuf> {
        self.catalog_file
            .as_deref()
            .map(|file| resolve(data_dir, file))
    }
}

fn resolve(data_dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file.trim());
    if path.is_absolute() {
        path.to_owned()
    } else {
        data_dir.join(path)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    const HOST: &str = "127.0.0.1";
    const PORT: u16 = 8080;

    fn default() -> Self {
        ServerConfig {
            host: Self::HOST.to_owned(),
            port: Self::PORT,
        }
    }

    fn ensure_valid(&mut self) {
        self.host = self.host.trim().to_owned();
        if self.host.is_empty() {
            eprintln!(
                "Config error: server host is empty - using default of '{}'",
                Self::HOST
            );
            self.host = Self::HOST.to_owned();
        }
        if self.port == 0 {
            eprintln!(
                "Config error: server port 0 is invalid - using default of {}",
                Self::PORT
            );
            self.port = Self::PORT;
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReportsConfig {
    /// Pause between report sections so progress can be observed
    pub step_delay_ms: u64,
}

impl ReportsConfig {
    const STEP_DELAY_MS: u64 = 250;
    const MAX_STEP_DELAY_MS: u64 = 10_000;

    fn default() -> Self {
        ReportsConfig {
            step_delay_ms: Self::STEP_DELAY_MS,
        }
    }

    fn ensure_valid(&mut self) {
        if self.step_delay_ms > Self::MAX_STEP_DELAY_MS {
            eprintln!(
                "Config error: reports step_delay_ms of {} exceeds {} - using {}",
                self.step_delay_ms,
                Self::MAX_STEP_DELAY_MS,
                Self::MAX_STEP_DELAY_MS
            );
            self.step_delay_ms = Self::MAX_STEP_DELAY_MS;
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub reports: ReportsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            logging: LoggingConfig::default(),
            store: StoreConfig::default(),
            server: ServerConfig::default(),
            reports: ReportsConfig::default(),
        }
    }
}

impl Config {
    pub fn project_dirs() -> Result<ProjectDirs, EnsGuardError> {
        ProjectDirs::from("", "", "ensguard")
            .ok_or_else(|| EnsGuardError::Error("Could not determine project directories".into()))
    }

    /// Loads the configuration from a TOML file located in the app's data directory.
    /// If the file is missing or fails to parse, defaults are used.
    /// Additionally, writes the default config to disk if no file exists.
    pub fn load_config(project_dirs: &ProjectDirs) -> Self {
        let config_path = project_dirs.data_local_dir().join(CONFIG_FILE);
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Self {
        let default_config = Config::default();

        // If the config file doesn't exist, write the default configuration to disk.
        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    eprintln!(
                        "Failed to create configuration directory {}: {}",
                        parent.display(),
                        e
                    );
                }
            }
            match toml::to_string_pretty(&default_config) {
                Ok(toml_string) => {
                    if let Err(e) = fs::write(config_path, toml_string) {
                        eprintln!(
                            "Failed to write default config to {}: {}",
                            config_path.display(),
                            e
                        );
                    }
                }
                Err(_) => eprintln!("Failed to serialize default config."),
            }
        }

        // Defaults, then the TOML file, then ENSGUARD_* environment variables
        let figment = Figment::from(Serialized::defaults(default_config.clone()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: Config = figment.extract().unwrap_or_else(|err| {
            eprintln!(
                "Could not load config file {}: {}. Using default configuration.",
                config_path.display(),
                err
            );
            default_config
        });

        config.ensure_valid();

        config
    }

    /// Loads once per process; later calls return the first result
    pub fn init(project_dirs: &ProjectDirs) -> &'static Config {
        CONFIG.get_or_init(|| Self::load_config(project_dirs))
    }

    /// The process configuration, or defaults if `init` was never called
    pub fn get() -> Config {
        CONFIG.get().cloned().unwrap_or_default()
    }

    fn ensure_valid(&mut self) {
        self.logging.ensure_valid();
        self.store.ensure_valid();
        self.server.ensure_valid();
        self.reports.ensure_valid();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_missing_file_writes_defaults() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("conf").join(CONFIG_FILE);
            let config = Config::load_from(&path);

            assert_eq!(config, Config::default());
            assert!(path.exists());
            let written = fs::read_to_string(&path).unwrap();
            assert!(written.contains("[server]"));
            Ok(())
        });
    }

    #[test]
    fn test_file_values_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [logging]
                ensguard = "DEBUG"

                [store]
                validate_measure_ids = false
                snapshot_file = "/var/lib/ensguard/state.json"
                seed_demo = false

                [server]
                host = "0.0.0.0"
                port = 9000

                [reports]
                step_delay_ms = 0
                "#,
            )?;

            let config = Config::load_from(Path::new(CONFIG_FILE));
            assert_eq!(config.logging.ensguard, "debug");
            assert!(!config.store.validate_measure_ids);
            assert!(!config.store.seed_demo);
            assert_eq!(config.server.host, "0.0.0.0");
            assert_eq!(config.server.port, 9000);
            assert_eq!(config.reports.step_delay_ms, 0);
            assert_eq!(
                config.store.snapshot_path(Path::new("/data")),
                PathBuf::from("/var/lib/ensguard/state.json")
            );
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE, "[server]\nport = 9000\n")?;
            jail.set_env("ENSGUARD_SERVER__PORT", "9100");
            jail.set_env("ENSGUARD_LOGGING__ENSGUARD", "trace");

            let config = Config::load_from(Path::new(CONFIG_FILE));
            assert_eq!(config.server.port, 9100);
            assert_eq!(config.logging.ensguard, "trace");
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_fall_back() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [logging]
                ensguard = "loud"

                [store]
                validate_measure_ids = true
                snapshot_file = "  "
                catalog_file = ""
                seed_demo = true

                [server]
                host = ""
                port = 0

                [reports]
                step_delay_ms = 999999
                "#,
            )?;

            let config = Config::load_from(Path::new(CONFIG_FILE));
            assert_eq!(config.logging.ensguard, "info");
            assert_eq!(config.store.snapshot_file, "assessments.json");
            assert_eq!(config.store.catalog_file, None);
            assert_eq!(config.server.host, "127.0.0.1");
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.reports.step_delay_ms, 10_000);
            Ok(())
        });
    }

    #[test]
    fn test_unparseable_file_uses_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE, "[server]\nport = \"not a number\"\n")?;
            let config = Config::load_from(Path::new(CONFIG_FILE));
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_relative_paths_resolve_against_data_dir() {
        let store = StoreConfig {
            catalog_file: Some("catalog.json".into()),
            ..StoreConfig::default()
        };
        assert_eq!(
            store.snapshot_path(Path::new("/data")),
            PathBuf::from("/data/assessments.json")
        );
        assert_eq!(
            store.catalog_path(Path::new("/data")),
            Some(PathBuf::from("/data/catalog.json"))
        );
    }

    #[test]
    fn test_log_spec() {
        let logging = LoggingConfig {
            ensguard: "debug".into(),
        };
        assert_eq!(logging.log_spec(), "warn, ensguard=debug");
    }
}
