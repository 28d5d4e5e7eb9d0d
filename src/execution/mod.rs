pub mod order_action;
pub mod order_executor;
pub mod order_reconciler;
pub mod order_report;
pub mod types;
