use thiserror::Error;

/// Failure reported by an exchange gateway. Callers only care that a call failed.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct GatewayError(#[from] anyhow::Error);

impl GatewayError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self(anyhow::anyhow!(message.into()))
    }
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("sizing failed: {0}")]
    SizingFailed(String),

    #[error("order size {size} ({notional:.4} quote) is below the exchange floor (min size {min_amount}, min notional {min_notional}); increase the trade value")]
    InsufficientNotional {
        size: f64,
        notional: f64,
        min_amount: f64,
        min_notional: f64,
    },

    #[error("insufficient data: need {required} candles, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("insufficient balance: {available:.4} available, {required:.4} required")]
    InsufficientBalance { available: f64, required: f64 },

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// What the runner does after a failed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Stop this worker.
    Abort,
    /// Wait the fixed error backoff, then retry the cycle.
    Backoff,
    /// Skip this cycle and wait the normal interval.
    SkipCycle,
}

impl StrategyError {
    pub fn recovery(&self) -> Recovery {
        match self {
            StrategyError::Configuration(_) => Recovery::Abort,
            StrategyError::Gateway(_) => Recovery::Backoff,
            StrategyError::SizingFailed(_)
            | StrategyError::InsufficientNotional { .. }
            | StrategyError::InsufficientData { .. }
            | StrategyError::InsufficientBalance { .. } => Recovery::SkipCycle,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.recovery() == Recovery::Abort
    }
}
