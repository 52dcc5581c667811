//! Frame scheduling capability injected into visualizers

use std::cell::{Cell, RefCell};

/// Identifies one requested frame; also the handle used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameToken(u64);

/// Host-provided "call me on the next frame" primitive. The host delivers
/// due tokens to the visualizers that requested them.
pub trait FrameScheduler {
    fn request_frame(&self) -> FrameToken;
    fn cancel_frame(&self, token: FrameToken);
}

/// Scheduler stepped by hand: each [`FrameStepper::step`] is one display
/// refresh.
#[derive(Debug, Default)]
pub struct FrameStepper {
    next: Cell<u64>,
    pending: RefCell<Vec<FrameToken>>,
}

impl FrameStepper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every pending request, oldest first
    pub fn step(&self) -> Vec<FrameToken> {
        self.pending.take()
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl FrameScheduler for FrameStepper {
    fn request_frame(&self) -> FrameToken {
        let token = FrameToken(self.next.get());
        self.next.set(self.next.get() + 1);
        self.pending.borrow_mut().push(token);
        token
    }

    fn cancel_frame(&self, token: FrameToken) {
        self.pending.borrow_mut().retain(|t| *t != token);
    }
}
