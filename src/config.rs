use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AtlasError, Result};

const DEFAULT_BASE_URL: &str = "https://regulatedplants.unu.edu";
const DEFAULT_GEOJSON_PATH: &str = "/static/data/geographic/";

/// Konfiguracja aplikacji ze zmiennych środowiskowych (i opcjonalnego `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    /// Adres API bazy roślin regulowanych
    pub base_url: String,
    /// Ścieżka, pod którą serwer udostępnia pliki GeoJSON
    pub geojson_path: String,
    /// Katalog z palette.json i branding/
    pub data_dir: PathBuf,
    pub export_dir: PathBuf,
    pub log_file: PathBuf,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            geojson_path: DEFAULT_GEOJSON_PATH.to_string(),
            data_dir: PathBuf::from("data"),
            export_dir: PathBuf::from("."),
            log_file: PathBuf::from("weed-atlas.log"),
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Składa konfigurację z dowolnego źródła klucz → wartość (testy nie dotykają env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let http_timeout = match var("WEED_ATLAS_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    AtlasError::Config(format!("WEED_ATLAS_HTTP_TIMEOUT_SECS must be a number of seconds, got {raw:?}"))
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.http_timeout,
        };

        let mut geojson_path = var("WEED_ATLAS_GEOJSON_PATH").unwrap_or(defaults.geojson_path);
        if !geojson_path.ends_with('/') {
            geojson_path.push('/');
        }

        Ok(Self {
            base_url: var("WEED_ATLAS_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            geojson_path,
            data_dir: var("WEED_ATLAS_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            export_dir: var("WEED_ATLAS_EXPORT_DIR").map(PathBuf::from).unwrap_or(defaults.export_dir),
            log_file: var("WEED_ATLAS_LOG_FILE").map(PathBuf::from).unwrap_or(defaults.log_file),
            http_timeout,
        })
    }

    pub fn log_summary(&self) {
        tracing::info!(
            base_url = %self.base_url,
            geojson_path = %self.geojson_path,
            data_dir = %self.data_dir.display(),
            export_dir = %self.export_dir.display(),
            timeout_secs = self.http_timeout.as_secs(),
            "Configuration loaded"
        );
    }
}
