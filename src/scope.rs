//! Type-keyed unit-of-work scope.
//!
//! Design goals:
//! - One persistence context per context type per scope, created lazily
//!   through an injected [`ContextFactory`].
//! - Saves and disposal fan out to every cached context, so callers never
//!   track individual contexts.
//! - A single mutex guards the map and the disposal flag; the asynchronous
//!   save never holds it across an await.
//!
//! Typical flows:
//! - A request handler creates one scope and builds a [`ScopedUnitOfWork`]
//!   handle per context type over it, handing those to repositories and
//!   services.
//! - The first `context()` call for a type invokes the factory and caches
//!   the result; later calls return the cached instance.
//! - `save_changes_async` commits every enrolled context concurrently and
//!   sums their affected-row counts.
//! - At the end of the request the scope is disposed, explicitly or by
//!   `Drop`, releasing every context exactly once.
//!
//! Implementation details:
//! - Key = `TypeId` of the context type; the type name is kept per entry for
//!   log fields.
//! - Value = `Arc<dyn UnitOfWorkContext>`, shared with whoever holds the
//!   context between staging and save.
//! - The asynchronous save snapshots the entries under the lock and releases
//!   it before any save runs; contexts enrolled mid-save join the next save.
//!
//! Notes:
//! - A disposed scope rejects further use with [`CrudError::ScopeDisposed`];
//!   disposal itself is idempotent.
//! - Failures of concurrent saves are collected into
//!   [`CrudError::Aggregate`] so no cause is dropped.

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::errors::CrudError;
use crate::unit_of_work::{ContextFactory, UnitOfWork, UnitOfWorkContext};

/// Cached context plus its type name for log fields.
struct ContextEntry {
    type_name: &'static str,
    context: Arc<dyn UnitOfWorkContext>,
}

/// Map and disposal flag share one mutex so disposal cannot race enrollment.
struct ScopeState {
    contexts: HashMap<TypeId, ContextEntry>,
    disposed: bool,
}

/// Lazily populated registry of one [`UnitOfWorkContext`] per context type,
/// with save and dispose fanning out to every cached entry.
pub struct UnitOfWorkScope<F> {
    factory: F,
    state: Mutex<ScopeState>,
}

impl<F> UnitOfWorkScope<F> {
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            state: Mutex::new(ScopeState {
                contexts: HashMap::new(),
                disposed: false,
            }),
        }
    }

    /// Returns the cached context for `C`, invoking the factory on first
    /// use.
    ///
    /// Racing first lookups are serialized by the scope's lock, so the
    /// factory runs at most once per context type.
    ///
    /// # Errors
    /// [`CrudError::ScopeDisposed`] after disposal; factory errors propagate
    /// and nothing is cached for `C` in that case.
    pub fn context<C>(&self) -> Result<Arc<dyn UnitOfWorkContext>, CrudError>
    where
        C: 'static,
        F: ContextFactory<C>,
    {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(CrudError::ScopeDisposed);
        }
        if let Some(entry) = state.contexts.get(&TypeId::of::<C>()) {
            return Ok(Arc::clone(&entry.context));
        }
        let context = self.factory.create_context()?;
        debug!(context_type = type_name::<C>(), "created unit of work context");
        state.contexts.insert(
            TypeId::of::<C>(),
            ContextEntry {
                type_name: type_name::<C>(),
                context: Arc::clone(&context),
            },
        );
        Ok(context)
    }

    /// Synchronously saves every cached context, stopping at the first
    /// failure.
    ///
    /// # Errors
    /// [`CrudError::ScopeDisposed`] after disposal; otherwise the first
    /// failing context's error.
    pub fn save_changes(&self) -> Result<(), CrudError> {
        let state = self.state.lock();
        if state.disposed {
            return Err(CrudError::ScopeDisposed);
        }
        for entry in state.contexts.values() {
            entry.context.save_changes()?;
        }
        Ok(())
    }

    /// Concurrently saves every cached context and sums the affected-row
    /// counts.
    ///
    /// The snapshot is taken under the lock and the lock released before any
    /// save runs; contexts enrolled while the saves are in flight are not
    /// part of this call.
    ///
    /// # Errors
    /// [`CrudError::ScopeDisposed`] after disposal. Save failures are
    /// collected into [`CrudError::Aggregate`]; sibling saves that succeeded
    /// are not rolled back.
    pub async fn save_changes_async(&self) -> Result<u64, CrudError> {
        let snapshot: Vec<Arc<dyn UnitOfWorkContext>> = {
            let state = self.state.lock();
            if state.disposed {
                return Err(CrudError::ScopeDisposed);
            }
            state
                .contexts
                .values()
                .map(|entry| Arc::clone(&entry.context))
                .collect()
        };

        debug!(contexts = snapshot.len(), "saving all contexts");
        let results = join_all(snapshot.iter().map(|context| context.save_changes_async())).await;

        let mut affected = 0_u64;
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(count) => affected += count,
                Err(err) => failures.push(err),
            }
        }
        if failures.is_empty() {
            Ok(affected)
        } else {
            warn!(failed = failures.len(), "context save(s) failed");
            Err(CrudError::Aggregate(failures))
        }
    }

    /// Disposes every cached context exactly once and empties the scope.
    ///
    /// Idempotent; later calls are no-ops. `Drop` also runs this, so a
    /// leaked scope still releases its contexts.
    pub fn dispose(&self) {
        let drained: Vec<ContextEntry> = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.contexts.drain().map(|(_, entry)| entry).collect()
        };
        for entry in drained {
            debug!(context_type = entry.type_name, "disposing unit of work context");
            entry.context.dispose();
        }
    }

    /// Number of currently cached contexts.
    #[must_use]
    pub fn context_count(&self) -> usize {
        self.state.lock().contexts.len()
    }

    /// Whether no context is cached. Also true after disposal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().contexts.is_empty()
    }
}

impl<F> Drop for UnitOfWorkScope<F> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Typed [`UnitOfWork`] handle backed by a shared scope.
///
/// One handle per context type. Handles built over the same scope stay in
/// the same save and dispose fan-out, which is what ties multiple
/// repositories into one logical unit of work.
pub struct ScopedUnitOfWork<C, F> {
    scope: Arc<UnitOfWorkScope<F>>,
    _context: PhantomData<fn() -> C>,
}

impl<C, F> ScopedUnitOfWork<C, F>
where
    C: 'static,
    F: ContextFactory<C>,
{
    #[must_use]
    pub fn new(scope: Arc<UnitOfWorkScope<F>>) -> Self {
        Self {
            scope,
            _context: PhantomData,
        }
    }

    /// Returns the scope's context for `C`, enrolling it into subsequent
    /// save and dispose fan-outs on first use.
    ///
    /// # Errors
    /// See [`UnitOfWorkScope::context`].
    pub fn context(&self) -> Result<Arc<dyn UnitOfWorkContext>, CrudError> {
        self.scope.context::<C>()
    }

    /// The scope this handle delegates to.
    #[must_use]
    pub fn scope(&self) -> &Arc<UnitOfWorkScope<F>> {
        &self.scope
    }
}

#[async_trait]
impl<C, F> UnitOfWork for ScopedUnitOfWork<C, F>
where
    C: 'static,
    F: ContextFactory<C>,
{
    fn save_changes(&self) -> Result<(), CrudError> {
        self.scope.save_changes()
    }

    async fn save_changes_async(&self) -> Result<u64, CrudError> {
        self.scope.save_changes_async().await
    }
}
