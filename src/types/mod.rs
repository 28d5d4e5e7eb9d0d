pub mod balance;
pub mod instrument;
pub mod market_limits;
pub mod market_snapshot;
pub mod price;
pub mod quote;
pub mod quote_target;
