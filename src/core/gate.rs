//! Lifecycle gate coordinating teardown with in-flight work
//!
//! A gate counts units of in-flight work. Units are refused once closing
//! has begun, and the closer can block until every unit taken before the
//! close has been released. Units are RAII guards, so an early return or
//! a panic in the guarded call still releases them.

use crate::core::sync::recover_poison;
use std::sync::{Arc, Condvar, Mutex};

#[derive(Debug, Default)]
struct GateState {
    closing: bool,
    in_flight: usize,
}

/// Open/close gate with in-flight accounting
#[derive(Debug, Default)]
pub struct LifecycleGate {
    state: Mutex<GateState>,
    drained: Condvar,
}

impl LifecycleGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin one unit of work borrowed from the gate
    ///
    /// Returns `None` once closing has begun.
    pub fn enter(&self) -> Option<GateUnit<'_>> {
        self.acquire().then_some(GateUnit { gate: self })
    }

    /// Begin one unit of work that can outlive the current borrow
    ///
    /// Used for long-lived holders (sessions) that keep the gate from
    /// draining until they are torn down.
    pub fn enter_owned(self: &Arc<Self>) -> Option<OwnedGateUnit> {
        self.acquire().then(|| OwnedGateUnit {
            gate: Arc::clone(self),
        })
    }

    /// Begin closing the gate
    ///
    /// Returns `true` for the caller that actually closed it; later callers
    /// get `false` and must not repeat the teardown.
    pub fn close(&self) -> bool {
        let mut state = recover_poison(self.state.lock());
        if state.closing {
            return false;
        }
        state.closing = true;
        true
    }

    /// Block until every unit taken before the close has been released
    pub fn wait_drained(&self) {
        let mut state = recover_poison(self.state.lock());
        while state.in_flight > 0 {
            state = recover_poison(self.drained.wait(state));
        }
    }

    pub fn is_closing(&self) -> bool {
        recover_poison(self.state.lock()).closing
    }

    pub fn in_flight(&self) -> usize {
        recover_poison(self.state.lock()).in_flight
    }

    fn acquire(&self) -> bool {
        let mut state = recover_poison(self.state.lock());
        if state.closing {
            return false;
        }
        state.in_flight += 1;
        true
    }

    fn release(&self) {
        let mut state = recover_poison(self.state.lock());
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight == 0 {
            self.drained.notify_all();
        }
    }
}

/// Unit of in-flight work borrowed from a gate
#[derive(Debug)]
pub struct GateUnit<'a> {
    gate: &'a LifecycleGate,
}

impl Drop for GateUnit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

/// Unit of in-flight work holding its gate alive
#[derive(Debug)]
pub struct OwnedGateUnit {
    gate: Arc<LifecycleGate>,
}

impl Drop for OwnedGateUnit {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_units_are_counted_and_released() {
        let gate = LifecycleGate::new();
        let first = gate.enter().expect("gate should be open");
        let second = gate.enter().expect("gate should be open");
        assert_eq!(gate.in_flight(), 2);

        drop(first);
        assert_eq!(gate.in_flight(), 1);
        drop(second);
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn test_close_refuses_new_units() {
        let gate = Arc::new(LifecycleGate::new());
        assert!(gate.close());
        assert!(gate.is_closing());
        assert!(gate.enter().is_none());
        assert!(gate.enter_owned().is_none());
    }

    #[test]
    fn test_close_only_succeeds_once() {
        let gate = LifecycleGate::new();
        assert!(gate.close());
        assert!(!gate.close());
    }

    #[test]
    fn test_wait_drained_returns_immediately_when_idle() {
        let gate = LifecycleGate::new();
        gate.close();
        gate.wait_drained();
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn test_wait_drained_blocks_until_owned_unit_released() {
        let gate = Arc::new(LifecycleGate::new());
        let unit = gate.enter_owned().expect("gate should be open");
        let released = Arc::new(AtomicBool::new(false));

        let released_clone = Arc::clone(&released);
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            released_clone.store(true, Ordering::Release);
            drop(unit);
        });

        assert!(gate.close());
        gate.wait_drained();
        assert!(
            released.load(Ordering::Acquire),
            "close must wait for the in-flight unit"
        );
        worker.join().unwrap();
    }
}
