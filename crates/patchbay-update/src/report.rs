/// Outcome of one descriptor that could not be updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpdate {
    pub path: String,
    pub error: String,
}

/// Aggregate outcome of one batch application.
///
/// Every descriptor in the input lands in exactly one of `updated` or
/// `failed`, in completion order. `permission_denied` is raised when any
/// failure was an OS access-control rejection, so the caller can offer
/// an elevated re-run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub updated: Vec<String>,
    pub failed: Vec<FailedUpdate>,
    pub permission_denied: bool,
}

impl BatchReport {
    pub fn is_all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Tunables for one batch application.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// How many fetch+install pipelines may run at once.
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}
