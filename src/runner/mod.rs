pub mod stop_signal;
pub mod strategy_runner;
pub mod supervisor;
