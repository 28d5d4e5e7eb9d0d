/// Quote-currency balance snapshot, refreshed once per cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Balance {
    /// Spendable quote (e.g. USDT).
    pub free: f64,
    /// Quote held by resting orders.
    pub locked: f64,
}

impl Balance {
    pub fn new(free: f64, locked: f64) -> Self {
        Self { free, locked }
    }

    pub fn total(&self) -> f64 {
        self.free + self.locked
    }

    pub fn can_fund(&self, notional: f64) -> bool {
        self.free >= notional
    }
}
