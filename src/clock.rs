/// Identifies one requested repaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Host-side repaint scheduling: ask for the next frame, or withdraw a
/// request that has not been served yet.
pub trait RepaintScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    Running,
}

/// Drives ticks from host repaints. At most one frame request is
/// outstanding at any time.
#[derive(Debug, Clone)]
pub struct FrameClock {
    state: ClockState,
    pending: Option<FrameHandle>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            state: ClockState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Idle -> Running. Returns `false` when already running, in which case
    /// nothing new is scheduled.
    pub fn start<S: RepaintScheduler + ?Sized>(&mut self, scheduler: &mut S) -> bool {
        if self.is_running() {
            return false;
        }
        self.state = ClockState::Running;
        self.pending = Some(scheduler.request_frame());
        true
    }

    /// Consume the served frame. Returns `true` when a tick should run;
    /// repaints nobody asked for (or that were cancelled) never tick.
    pub fn fire(&mut self, handle: FrameHandle) -> bool {
        if self.is_running() && self.pending == Some(handle) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Request the frame after the one just ticked.
    pub fn schedule_next<S: RepaintScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if self.is_running() && self.pending.is_none() {
            self.pending = Some(scheduler.request_frame());
        }
    }

    /// Running -> Idle, cancelling the outstanding request. Idempotent.
    pub fn stop<S: RepaintScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if let Some(handle) = self.pending.take() {
            scheduler.cancel_frame(handle);
        }
        self.state = ClockState::Idle;
    }
}

/// Scheduler that only records requests; the owner decides when a request
/// is served. Used by the window loop and by tests.
#[derive(Debug, Default, Clone)]
pub struct FrameQueue {
    next: u64,
    outstanding: Option<FrameHandle>,
    requested: u64,
    cancelled: u64,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// The request currently waiting to be served, if any.
    pub fn outstanding(&self) -> Option<FrameHandle> {
        self.outstanding
    }

    /// Serve the outstanding request, handing its handle to the caller.
    pub fn serve(&mut self) -> Option<FrameHandle> {
        self.outstanding.take()
    }

    pub fn requested(&self) -> u64 {
        self.requested
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}

impl RepaintScheduler for FrameQueue {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next);
        self.next += 1;
        self.requested += 1;
        if let Some(stale) = self.outstanding.replace(handle) {
            log::warn!("frame {:?} replaced before it was served", stale);
        }
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.outstanding == Some(handle) {
            self.outstanding = None;
            self.cancelled += 1;
        }
    }
}
