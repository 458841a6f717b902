use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::CrudError;

/// Commit point for staged work.
///
/// Repositories stage mutations; nothing reaches the store until one of the
/// save operations runs. [`ScopedUnitOfWork`](crate::ScopedUnitOfWork) is
/// the scope-backed implementation.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Saves pending changes synchronously.
    ///
    /// # Errors
    /// [`CrudError::Persistence`] when the store rejects the save, or
    /// [`CrudError::ScopeDisposed`] from a disposed scope.
    fn save_changes(&self) -> Result<(), CrudError>;

    /// Saves pending changes and returns the number of affected rows.
    ///
    /// # Errors
    /// As [`save_changes`](Self::save_changes); scope-backed implementations
    /// report concurrent failures as [`CrudError::Aggregate`].
    async fn save_changes_async(&self) -> Result<u64, CrudError>;
}

/// Wrapper around exactly one persistence-context instance.
///
/// The wrapped context lives exactly as long as the wrapper. A scope caches
/// one instance per context type and drives the save and dispose fan-out
/// through this trait.
#[async_trait]
pub trait UnitOfWorkContext: Send + Sync {
    /// Saves this context's pending changes synchronously.
    ///
    /// # Errors
    /// Any store failure, as [`CrudError::Persistence`].
    fn save_changes(&self) -> Result<(), CrudError>;

    /// Saves this context's pending changes and returns the affected-row
    /// count.
    ///
    /// # Errors
    /// Any store failure, as [`CrudError::Persistence`].
    async fn save_changes_async(&self) -> Result<u64, CrudError>;

    /// Releases the wrapped context. The owning scope calls this exactly
    /// once per instance.
    fn dispose(&self);
}

/// Builds the per-type context instances a scope caches.
///
/// One factory serves every context type its scope needs, one `impl` per
/// type. [`create_context`](Self::create_context) runs at most once per type
/// per scope; racing first lookups are serialized by the scope's lock.
pub trait ContextFactory<C>: Send + Sync {
    /// Builds the context wrapper for `C`.
    ///
    /// # Errors
    /// [`CrudError::Persistence`] when the context cannot be constructed.
    fn create_context(&self) -> Result<Arc<dyn UnitOfWorkContext>, CrudError>;
}
