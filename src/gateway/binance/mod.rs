pub mod binance_client;
pub mod binance_config;
pub mod binance_gateway;
