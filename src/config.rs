use std::collections::BTreeSet;
use std::fmt;

use config::{Case, Config, ConfigError, Environment, File};
use serde::{de, Deserialize, Deserializer};

use crate::weather::ForecastSection;

pub const DEFAULT_ONECALL_URL: &str = "https://api.openweathermap.org/data/3.0/onecall";
pub const DEFAULT_GEOCODING_URL: &str = "https://api.openweathermap.org/geo/1.0/direct";

#[derive(Deserialize, Clone)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// OpenWeatherMap API key
    pub openweathermap_api_key: String,

    /// One Call API endpoint
    #[serde(default = "default_onecall_url")]
    pub onecall_url: String,

    /// Direct geocoding API endpoint
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,

    /// City used by the widget when none is given
    #[serde(default = "default_city")]
    pub default_city: String,

    /// Forecast sections left out of every One Call request
    #[serde(
        default = "default_excluded_sections",
        deserialize_with = "deserialize_excluded_sections"
    )]
    pub excluded_sections: BTreeSet<ForecastSection>,

    /// Outbound HTTP client settings
    #[serde(default)]
    pub http: HttpClientConfig,

    /// Widget timeline settings
    #[serde(default)]
    pub widget: WidgetConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpClientConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetConfig {
    /// Maximum number of hourly entries in a timeline
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

// The API key must never reach the logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("openweathermap_api_key", &"<redacted>")
            .field("onecall_url", &self.onecall_url)
            .field("geocoding_url", &self.geocoding_url)
            .field("default_city", &self.default_city)
            .field("excluded_sections", &self.excluded_sections)
            .field("http", &self.http)
            .field("widget", &self.widget)
            .finish()
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_onecall_url() -> String {
    DEFAULT_ONECALL_URL.to_string()
}

fn default_geocoding_url() -> String {
    DEFAULT_GEOCODING_URL.to_string()
}

fn default_city() -> String {
    "Toronto".to_string()
}

fn default_excluded_sections() -> BTreeSet<ForecastSection> {
    BTreeSet::from([ForecastSection::Minutely])
}

/// Blank items are skipped so `HOURCAST_EXCLUDED_SECTIONS=` means "exclude nothing"
fn deserialize_excluded_sections<'de, D>(
    deserializer: D,
) -> Result<BTreeSet<ForecastSection>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    let mut sections = BTreeSet::new();

    for item in raw.iter().filter(|item| !item.trim().is_empty()) {
        let section: ForecastSection = item.parse().map_err(de::Error::custom)?;
        if !section.is_excludable() {
            return Err(de::Error::custom(format!(
                "forecast section `{section}` is required and cannot be excluded"
            )));
        }
        sections.insert(section);
    }

    Ok(sections)
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_max_entries() -> usize {
    7
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            .set_default("host", default_host())?
            .set_default("port", default_port())?
            .set_default("default_city", default_city())?
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config.local").required(false))
            .add_source(environment())
            .build()?;

        config.try_deserialize()
    }
}

/// HOURCAST_OPENWEATHERMAP_API_KEY, HOURCAST_WIDGET__MAX_ENTRIES, ...
fn environment() -> Environment {
    Environment::with_prefix("HOURCAST")
        .prefix_separator("_")
        .separator("__")
        .convert_case(Case::Snake)
        .list_separator(",")
        .with_list_parse_key("excluded_sections")
        .try_parsing(true)
}
