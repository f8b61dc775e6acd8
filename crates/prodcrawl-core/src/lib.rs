pub mod app_config;
pub mod config;
pub mod product;
pub mod ruleset;

pub use app_config::{AppConfig, BrowserSettings, Environment, HttpSettings};
pub use config::{load_app_config, load_app_config_from_env};
pub use product::ProductRecord;
pub use ruleset::{
    builtin_registry, load_rulesets, DetailsTable, ExtractionRule, Field, ImageRules,
    ImageSource, Ruleset, RulesetRegistry, Source,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read rulesets file {path}: {source}")]
    RulesetsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rulesets file: {0}")]
    RulesetsFileParse(#[source] serde_yaml::Error),

    #[error("ruleset validation failed: {0}")]
    Validation(String),
}
