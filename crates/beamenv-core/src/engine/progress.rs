/// Events emitted while a machine is built and a beam is pushed through it.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// A step with no element count, such as parsing the lattice.
    PhaseStart { name: &'static str },
    PhaseFinish,

    /// `total_elements` is the length of the requested index range.
    PropagationStart { total_elements: u64 },
    /// Element `index` has been applied to the state.
    ElementAdvanced { index: usize },
    PropagationFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards propagation events to an optional callback.
///
/// Without a callback every report is a no-op, so library code reports
/// unconditionally.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
