pub mod instrument_context;
pub mod position_sizer;
pub mod price_calculator;
pub mod scalp_monitor;
pub mod strategies;
pub mod strategy;
pub mod strategy_helpers;
