pub mod market_making;
pub mod scalping;
