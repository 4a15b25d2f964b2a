use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Root folder that receives the generated archives.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
    /// Root folder of the on-disk sample store.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Base URL the archive file name is appended to in notifications.
    #[serde(default = "default_download_url")]
    pub download_url: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_reports_dir() -> String {
    "./reports".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_download_url() -> String {
    "http://localhost/reports/".to_string()
}

fn default_database_path() -> String {
    "pin_report.db".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            data_dir: default_data_dir(),
            download_url: default_download_url(),
            database_path: default_database_path(),
        }
    }
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("PIN_REPORT"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
