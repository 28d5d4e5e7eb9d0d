use std::fmt;

use crate::types::price::Price;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalpPosition {
    None,
    Open {
        entry: Price,
        size: f64,
        stop_loss: Price,
        target: Price,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    Target,
    StopLoss,
}

impl fmt::Display for ExitTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitTrigger::Target => write!(f, "target"),
            ExitTrigger::StopLoss => write!(f, "stop-loss"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalpExit {
    pub trigger: ExitTrigger,
    pub entry: Price,
    pub exit: Price,
    pub size: f64,
}

impl ScalpExit {
    /// Gross quote profit of the round, before fees.
    pub fn gross_pnl(&self) -> f64 {
        (self.exit - self.entry) * self.size
    }
}

/// Running totals over every closed round of one worker.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScalpStats {
    pub rounds: u64,
    pub targets: u64,
    pub stop_losses: u64,
    pub gross_pnl: f64,
}

impl ScalpStats {
    fn record(&mut self, exit: &ScalpExit) {
        self.rounds += 1;
        match exit.trigger {
            ExitTrigger::Target => self.targets += 1,
            ExitTrigger::StopLoss => self.stop_losses += 1,
        }
        self.gross_pnl += exit.gross_pnl();
    }
}

/// Tracks the single scalp position of one pair from entry to exit.
///
/// An open position leaves only through [`ScalpMonitor::close`], after
/// [`ScalpMonitor::evaluate`] reported a target or stop-loss trigger.
#[derive(Debug, Clone)]
pub struct ScalpMonitor {
    stop_loss_fraction: f64,
    profit_target_fraction: f64,
    position: ScalpPosition,
    stats: ScalpStats,
}

impl ScalpMonitor {
    pub fn new(stop_loss_fraction: f64, profit_target_fraction: f64) -> Self {
        Self {
            stop_loss_fraction,
            profit_target_fraction,
            position: ScalpPosition::None,
            stats: ScalpStats::default(),
        }
    }

    pub fn position(&self) -> ScalpPosition {
        self.position
    }

    pub fn is_open(&self) -> bool {
        matches!(self.position, ScalpPosition::Open { .. })
    }

    pub fn stats(&self) -> ScalpStats {
        self.stats
    }

    /// Stop-loss and target prices for an entry at `entry`.
    pub fn levels(&self, entry: Price) -> (Price, Price) {
        let entry = entry.as_f64();

        (
            Price::new(entry * (1.0 - self.stop_loss_fraction)),
            Price::new(entry * (1.0 + self.profit_target_fraction)),
        )
    }

    /// Returns `false` and changes nothing when a position is already open.
    pub fn open(&mut self, entry: Price, size: f64) -> bool {
        if self.is_open() {
            return false;
        }

        let (stop_loss, target) = self.levels(entry);
        self.position = ScalpPosition::Open {
            entry,
            size,
            stop_loss,
            target,
        };

        true
    }

    pub fn evaluate(&self, price: Price) -> Option<ExitTrigger> {
        match self.position {
            ScalpPosition::None => None,
            ScalpPosition::Open {
                stop_loss, target, ..
            } => {
                if price >= target {
                    Some(ExitTrigger::Target)
                } else if price <= stop_loss {
                    Some(ExitTrigger::StopLoss)
                } else {
                    None
                }
            }
        }
    }

    pub fn close(&mut self, trigger: ExitTrigger, exit: Price) -> Option<ScalpExit> {
        let ScalpPosition::Open { entry, size, .. } = self.position else {
            return None;
        };

        let record = ScalpExit {
            trigger,
            entry,
            exit,
            size,
        };

        self.position = ScalpPosition::None;
        self.stats.record(&record);

        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> ScalpMonitor {
        ScalpMonitor::new(0.015, 0.005)
    }

    fn approx(a: Price, b: f64) -> bool {
        (a.as_f64() - b).abs() < 1e-9
    }

    #[test]
    fn computes_stop_and_target_from_entry() {
        let mut monitor = monitor();
        assert!(monitor.open(Price::new(100.0), 1.0));

        let ScalpPosition::Open {
            stop_loss, target, ..
        } = monitor.position()
        else {
            panic!("position should be open");
        };

        assert!(approx(stop_loss, 98.5));
        assert!(approx(target, 100.5));
    }

    #[test]
    fn ticks_trigger_target_stop_or_nothing() {
        let mut monitor = monitor();
        monitor.open(Price::new(100.0), 1.0);

        assert_eq!(monitor.evaluate(Price::new(100.6)), Some(ExitTrigger::Target));
        assert_eq!(monitor.evaluate(Price::new(98.4)), Some(ExitTrigger::StopLoss));
        assert_eq!(monitor.evaluate(Price::new(99.0)), None);
    }

    #[test]
    fn nothing_triggers_without_a_position() {
        assert_eq!(monitor().evaluate(Price::new(1_000.0)), None);
    }

    #[test]
    fn cannot_reopen_while_open() {
        let mut monitor = monitor();
        monitor.open(Price::new(100.0), 1.0);

        assert!(!monitor.open(Price::new(90.0), 2.0));
        assert!(matches!(
            monitor.position(),
            ScalpPosition::Open { entry, size, .. } if entry == Price::new(100.0) && size == 1.0
        ));
    }

    #[test]
    fn close_records_the_exit_and_resets() {
        let mut monitor = monitor();
        monitor.open(Price::new(100.0), 2.0);

        let exit = monitor
            .close(ExitTrigger::Target, Price::new(100.6))
            .unwrap();

        assert_eq!(monitor.position(), ScalpPosition::None);
        assert!((exit.gross_pnl() - 1.2).abs() < 1e-9);
        assert_eq!(monitor.stats().rounds, 1);
        assert_eq!(monitor.stats().targets, 1);
        assert!((monitor.stats().gross_pnl - 1.2).abs() < 1e-9);
        assert!(monitor.close(ExitTrigger::StopLoss, Price::new(1.0)).is_none());
    }
}
