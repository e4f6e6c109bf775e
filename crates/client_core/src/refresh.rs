//! Generation counter linking writers of the collection to the list view.
//!
//! A successful create bumps the counter instead of patching the local list;
//! the list controller observes the new generation and re-fetches.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Clone)]
pub struct RefreshTrigger {
    tx: Arc<watch::Sender<u64>>,
}

impl RefreshTrigger {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Advances the generation and returns the new value.
    pub fn bump(&self) -> u64 {
        self.tx.send_modify(|generation| *generation += 1);
        self.generation()
    }

    pub fn generation(&self) -> u64 {
        *self.tx.borrow()
    }

    /// A receiver that has already seen the current generation.
    pub fn signal(&self) -> RefreshSignal {
        RefreshSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for RefreshTrigger {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct RefreshSignal {
    rx: watch::Receiver<u64>,
}

impl RefreshSignal {
    pub fn generation(&self) -> u64 {
        *self.rx.borrow()
    }

    /// Returns the new generation if it moved since the last observation.
    pub fn take_change(&mut self) -> Option<u64> {
        if self.rx.has_changed().unwrap_or(false) {
            Some(*self.rx.borrow_and_update())
        } else {
            None
        }
    }

    /// Marks the current generation as seen.
    pub fn mark_seen(&mut self) -> u64 {
        *self.rx.borrow_and_update()
    }

    /// Waits for the next bump. `None` once every trigger has been dropped.
    pub async fn changed(&mut self) -> Option<u64> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_starts_with_current_generation_seen() {
        let trigger = RefreshTrigger::new();
        trigger.bump();
        let mut signal = trigger.signal();
        assert_eq!(signal.generation(), 1);
        assert_eq!(signal.take_change(), None);
    }

    #[test]
    fn take_change_reports_each_bump_once() {
        let trigger = RefreshTrigger::new();
        let mut signal = trigger.signal();
        assert_eq!(trigger.bump(), 1);
        assert_eq!(trigger.bump(), 2);
        assert_eq!(signal.take_change(), Some(2));
        assert_eq!(signal.take_change(), None);
    }

    #[tokio::test]
    async fn changed_resolves_after_bump_and_ends_when_trigger_dropped() {
        let trigger = RefreshTrigger::new();
        let mut signal = trigger.signal();

        let clone = trigger.clone();
        tokio::spawn(async move {
            clone.bump();
        });
        assert_eq!(signal.changed().await, Some(1));

        drop(trigger);
        assert_eq!(signal.changed().await, None);
    }
}
