//! Error type shared by the service and unit-of-work layers.
//!
//! Collaborator failures are never retried or suppressed here: whatever a
//! repository or persistence context reports is wrapped once and handed to
//! the caller with the original cause reachable through `source()`. Missing
//! records are not errors at all; those surface as `Ok(None)` / `Ok(false)`
//! from the service.

use thiserror::Error;

/// Boxed error accepted from repositories and persistence contexts.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by [`CrudService`](crate::CrudService) operations and
/// [`UnitOfWorkScope`](crate::UnitOfWorkScope) saves.
#[derive(Debug, Error)]
pub enum CrudError {
    /// A repository or persistence context failed. The underlying cause is
    /// preserved and reachable through `source()`.
    #[error("persistence error: {0}")]
    Persistence(#[source] BoxError),

    /// One or more concurrent context saves failed. Sibling saves that
    /// succeeded are not rolled back; every failure is carried here.
    #[error("{} context save(s) failed", .0.len())]
    Aggregate(Vec<CrudError>),

    /// The scope was used after `dispose()`.
    #[error("unit of work scope already disposed")]
    ScopeDisposed,
}

impl CrudError {
    /// Wraps a collaborator error as a persistence failure.
    pub fn persistence(err: impl Into<BoxError>) -> Self {
        Self::Persistence(err.into())
    }
}
