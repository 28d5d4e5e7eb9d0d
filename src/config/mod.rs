pub mod pair_config;
pub mod settings;
