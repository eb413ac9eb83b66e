//! Progress reporting for long-running editor operations
//!
//! Pipelines report progress through an explicit sink object instead of
//! returning resumable iterators. Hosts hand in whatever implementation
//! suits them (a modal dialog, a status bar, nothing at all); stages wrap
//! the sink in [`ScaledProgress`] so nested work maps onto its slice of the
//! overall bar.

/// Receiver for progress updates from a running operation.
pub trait ProgressSink {
    /// Report the current completion fraction (0.0 to 1.0) and a short
    /// status message.
    fn update(&mut self, fraction: f32, message: &str);

    /// Whether the user asked to cancel. Operations poll this between
    /// units of work; an in-flight unit always runs to completion.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A sink that discards all updates.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn update(&mut self, _fraction: f32, _message: &str) {}
}

/// Adapter that maps a child operation's [0, 1] range onto a sub-range of a
/// parent sink.
pub struct ScaledProgress<'a> {
    inner: &'a mut dyn ProgressSink,
    start: f32,
    end: f32,
}

impl<'a> ScaledProgress<'a> {
    pub fn new(inner: &'a mut dyn ProgressSink, start: f32, end: f32) -> Self {
        Self { inner, start, end }
    }
}

impl ProgressSink for ScaledProgress<'_> {
    fn update(&mut self, fraction: f32, message: &str) {
        let t = fraction.clamp(0.0, 1.0);
        self.inner.update(self.start + (self.end - self.start) * t, message);
    }

    fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }
}
