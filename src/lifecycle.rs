//! Running -> Draining -> Stopped state shared between a tick loop and its observers.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Running,
    /// No new work is accepted; queued work is still being processed.
    Draining,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Running => "running",
            Phase::Draining => "draining",
            Phase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Lifecycle {
    name: &'static str,
    tx: Arc<watch::Sender<Phase>>,
}

impl Lifecycle {
    pub fn new(name: &'static str) -> Self {
        let (tx, _rx) = watch::channel(Phase::Running);
        Self {
            name,
            tx: Arc::new(tx),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.tx.borrow()
    }

    /// Moves forward to `next`. Transitions never go backwards.
    pub fn advance(&self, next: Phase) {
        let changed = self.tx.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::info!(component = self.name, phase = %next, "Lifecycle phase changed.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_only_move_forward() {
        let lifecycle = Lifecycle::new("test");
        assert_eq!(lifecycle.phase(), Phase::Running);

        lifecycle.advance(Phase::Draining);
        lifecycle.advance(Phase::Running);
        assert_eq!(lifecycle.phase(), Phase::Draining);

        lifecycle.advance(Phase::Stopped);
        assert_eq!(lifecycle.phase(), Phase::Stopped);
    }
}
