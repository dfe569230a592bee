//! Counted completion gate
//!
//! N independent loads each fill one slot. The waiter resolves once, after
//! the last slot is filled, with every value in slot order. Arrival order
//! does not matter.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

struct GateState<T> {
    slots: Vec<Option<T>>,
    remaining: usize,
    notify: Option<oneshot::Sender<Vec<T>>>,
}

/// Shared handle used by the loads to report their terminal value
pub struct CompletionGate<T> {
    inner: Arc<Mutex<GateState<T>>>,
}

impl<T> Clone for CompletionGate<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Receiving side of a [`CompletionGate`]
pub struct GateWaiter<T> {
    rx: oneshot::Receiver<Vec<T>>,
}

impl<T> CompletionGate<T> {
    pub fn new(expected: usize) -> (Self, GateWaiter<T>) {
        let (tx, rx) = oneshot::channel();
        let mut state = GateState {
            slots: (0..expected).map(|_| None).collect(),
            remaining: expected,
            notify: Some(tx),
        };
        if expected == 0 {
            state.release();
        }
        (
            Self {
                inner: Arc::new(Mutex::new(state)),
            },
            GateWaiter { rx },
        )
    }

    /// Fill slot `index`. Returns `false` when the slot was already filled
    /// or does not exist; such calls do not count toward completion.
    pub fn complete(&self, index: usize, value: T) -> bool {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if index >= state.slots.len() {
            tracing::warn!(
                "completion gate: slot {} out of range ({} slots)",
                index,
                state.slots.len()
            );
            return false;
        }
        if state.slots[index].is_some() {
            tracing::warn!("completion gate: slot {} reported twice", index);
            return false;
        }
        state.slots[index] = Some(value);
        state.remaining -= 1;
        if state.remaining == 0 {
            state.release();
        }
        true
    }

    /// Fill every still-empty slot with `fill(index)`, for loads that ended
    /// without reporting. Returns how many slots were filled.
    pub fn fill_remaining(&self, mut fill: impl FnMut(usize) -> T) -> usize {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let empty: Vec<usize> = state
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(index, _)| index)
            .collect();
        for &index in &empty {
            state.slots[index] = Some(fill(index));
        }
        state.remaining -= empty.len();
        if state.remaining == 0 {
            state.release();
        }
        empty.len()
    }

    pub fn remaining(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remaining
    }
}

impl<T> GateState<T> {
    fn release(&mut self) {
        if let Some(tx) = self.notify.take() {
            let values = std::mem::take(&mut self.slots).into_iter().flatten().collect();
            // The waiter may already be gone; nobody is left to tell.
            let _ = tx.send(values);
        }
    }
}

impl<T> GateWaiter<T> {
    /// Wait for every slot. Returns `None` if all gate handles were dropped
    /// before the last slot was filled.
    pub async fn wait(self) -> Option<Vec<T>> {
        self.rx.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[tokio::test]
    async fn resolves_in_slot_order_regardless_of_arrival() {
        let (gate, waiter) = CompletionGate::new(3);
        assert!(gate.complete(2, "c"));
        assert!(gate.complete(0, "a"));
        assert_eq!(gate.remaining(), 1);
        assert!(gate.complete(1, "b"));

        assert_eq!(waiter.wait().await, Some(vec!["a", "b", "c"]));
    }

    #[tokio::test]
    async fn empty_gate_is_already_open() {
        let (_gate, waiter) = CompletionGate::<u8>::new(0);
        assert_eq!(waiter.wait().await, Some(vec![]));
    }

    #[tokio::test]
    async fn duplicate_and_out_of_range_do_not_count() {
        let (gate, waiter) = CompletionGate::new(2);
        assert!(gate.complete(0, 1));
        assert!(!gate.complete(0, 99));
        assert!(!gate.complete(5, 99));
        assert_eq!(gate.remaining(), 1);
        assert!(gate.complete(1, 2));

        assert_eq!(waiter.wait().await, Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn abandoned_gate_reports_none() {
        let (gate, waiter) = CompletionGate::new(2);
        gate.complete(0, ());
        drop(gate);
        assert_eq!(waiter.wait().await, None);
    }

    #[tokio::test]
    async fn fill_remaining_only_touches_empty_slots() {
        let (gate, waiter) = CompletionGate::new(3);
        gate.complete(0, "loaded");
        gate.complete(2, "loaded");

        assert_eq!(gate.fill_remaining(|_| "missing"), 1);
        assert_eq!(gate.fill_remaining(|_| "again"), 0);
        assert_eq!(gate.remaining(), 0);
        assert_eq!(waiter.wait().await, Some(vec!["loaded", "missing", "loaded"]));
    }

    #[tokio::test]
    async fn concurrent_tasks_fire_once() {
        let (gate, waiter) = CompletionGate::new(16);
        for i in 0..16u64 {
            let gate = gate.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(16 - i)).await;
                gate.complete(i as usize, i);
            });
        }
        drop(gate);

        let values = waiter.wait().await.unwrap();
        assert_eq!(values, (0..16).collect::<Vec<_>>());
    }
}
