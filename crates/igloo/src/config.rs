use igloo_connector_split_reader::SplitReaderConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub reader: SplitReaderConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_num_splits")]
    pub num_splits: usize,
    #[serde(default = "default_records_per_split")]
    pub records_per_split: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_num_splits() -> usize {
    4
}

fn default_records_per_split() -> usize {
    1000
}

impl Settings {
    /// Loads settings from `config_path` (or `IGLOO_SPLIT_READER_CONFIG_PATH`),
    /// then applies `IGLOO_SPLIT_READER__*` environment overrides.
    pub fn new(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let (config_file_path, required) = match config_path {
            Some(path) => (path.to_string(), true),
            None => (
                std::env::var("IGLOO_SPLIT_READER_CONFIG_PATH")
                    .unwrap_or_else(|_| "crates/igloo/config/default.toml".to_string()),
                false,
            ),
        };

        let s = config::Config::builder()
            .add_source(config::File::with_name(&config_file_path).required(required))
            .add_source(config::Environment::with_prefix("IGLOO_SPLIT_READER").separator("__"))
            .build()?;
        s.try_deserialize()
    }
}
