//! Input pump: one host event at a time, in arrival order.
//!
//! The pump holds events until the engine is initialized, and never hands out
//! the next one while a previous handler is still running or while any
//! request is awaiting its reply. The caller drives it:
//!
//! ```text
//! while let Some(event) = pump.begin(gateway.is_idle()) {
//!     dispatch(event);
//!     pump.finish();
//! }
//! ```

use std::collections::VecDeque;

use tracing::debug;

use crate::types::HostEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    /// The engine has not signalled initialization yet.
    AwaitingInit,
    Idle,
    /// A handler is running.
    Draining,
}

#[derive(Debug)]
pub struct InputPump {
    state: PumpState,
    queue: VecDeque<HostEvent>,
}

impl Default for InputPump {
    fn default() -> Self {
        Self::new()
    }
}

impl InputPump {
    pub fn new() -> Self {
        Self {
            state: PumpState::AwaitingInit,
            queue: VecDeque::new(),
        }
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn enqueue(&mut self, event: HostEvent) {
        self.queue.push_back(event);
    }

    pub fn init_completed(&mut self) {
        if self.state == PumpState::AwaitingInit {
            debug!(queued = self.queue.len(), "pump released");
            self.state = PumpState::Idle;
        }
    }

    /// Pop the next event if it may run now. `engine_idle` is whether the
    /// pending-reply table is empty.
    pub fn begin(&mut self, engine_idle: bool) -> Option<HostEvent> {
        if self.state != PumpState::Idle || !engine_idle {
            return None;
        }
        let event = self.queue.pop_front()?;
        self.state = PumpState::Draining;
        Some(event)
    }

    pub fn finish(&mut self) {
        if self.state == PumpState::Draining {
            self.state = PumpState::Idle;
        }
    }
}
