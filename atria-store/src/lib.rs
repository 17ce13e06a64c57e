pub mod app_config;
pub mod seed;

pub use app_config::{BusinessRules, Config, ServerConfig};
