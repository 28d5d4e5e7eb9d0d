#[allow(clippy::module_inception)]
pub mod scenario;
pub mod strategies;
pub mod venues;
