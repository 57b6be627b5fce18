use std::sync::Arc;

/// A phase of a synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Catalog,
    Games,
    Songs,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Catalog => write!(f, "Fetch game list"),
            Stage::Games => write!(f, "Fetch game info"),
            Stage::Songs => write!(f, "Fetch song info"),
        }
    }
}

/// How a single resource was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The cached snapshot was trusted.
    Reused,
    /// The resource was fetched and its snapshot written.
    Fetched,
    /// The fetch failed and the run carried on without it.
    Failed,
}

/// Progress notifications emitted while synchronizing.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A stage has started; `total` is the number of resources it will resolve.
    StageStarted { stage: Stage, total: u64 },
    /// One resource of the stage was resolved.
    Resolved {
        stage: Stage,
        label: String,
        outcome: Outcome,
    },
    StageFinished { stage: Stage },
}

/// A callback function for synchronization events.
pub type OnSyncEvent = Arc<dyn Fn(SyncEvent) + Send + Sync>;
