use serde::Serialize;

use travo_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Serialize)]
struct EffectiveConfig {
    database_url: String,
    database_max_connections: u32,
    database_timeout_secs: u64,
    order_prefix: String,
    order_sequence_width: usize,
    taxonomy_path: Option<String>,
    logging_level: String,
    logging_format: &'static str,
}

pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            let effective = EffectiveConfig {
                database_url: config.database.url.clone(),
                database_max_connections: config.database.max_connections,
                database_timeout_secs: config.database.timeout_secs,
                order_prefix: config.order_numbers.prefix.clone(),
                order_sequence_width: config.order_numbers.sequence_width,
                taxonomy_path: config
                    .taxonomy
                    .path
                    .as_ref()
                    .map(|path| path.display().to_string()),
                logging_level: config.logging.level.clone(),
                logging_format: match config.logging.format {
                    LogFormat::Compact => "compact",
                    LogFormat::Pretty => "pretty",
                    LogFormat::Json => "json",
                },
            };
            serde_json::to_string_pretty(&effective)
                .unwrap_or_else(|error| format!("{{\"error\":\"serialization failed: {error}\"}}"))
        }
        Err(error) => {
            format!("{{\"error\":\"configuration issue: {}\"}}", error.to_string().replace('"', "'"))
        }
    }
}
