use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::CrudError;

/// Persisted record with integer identity and audit stamps.
///
/// `id` is assigned by the persistence layer; `0` marks a record that has
/// not been persisted yet. The service owns the stamps: `created_utc` is
/// written once at creation and survives every update, `modified_utc` is
/// refreshed on create and update.
pub trait CrudEntity: Send + Sync {
    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
    fn created_utc(&self) -> DateTime<Utc>;
    fn set_created_utc(&mut self, at: DateTime<Utc>);
    fn modified_utc(&self) -> DateTime<Utc>;
    fn set_modified_utc(&mut self, at: DateTime<Utc>);
}

/// Transfer object carrying an entity's identity alongside its business
/// fields.
pub trait CrudDto: Send + Sync {
    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
}

/// Pure mapping between an entity type and its DTO.
///
/// All four operations are side-effect free beyond populating the value they
/// are given. Implementations must not assume `id` survives
/// [`dto_to_entity`](Self::dto_to_entity): the service clears it before
/// creating.
pub trait CrudDtoMapper<E, D>: Send + Sync
where
    E: CrudEntity,
    D: CrudDto,
{
    /// Maps an entity onto a fresh DTO.
    fn entity_to_dto(&self, entity: &E) -> D;

    /// Maps an entity onto an existing DTO, so the caller keeps the DTO
    /// value it already holds.
    fn merge_entity_into_dto(&self, entity: &E, dto: &mut D);

    /// Maps a DTO onto a fresh entity.
    fn dto_to_entity(&self, dto: &D) -> E;

    /// Maps a DTO onto an existing entity.
    fn merge_dto_into_entity(&self, dto: &D, entity: &mut E);
}

/// Data access contract consumed by [`CrudService`](crate::CrudService).
///
/// `add`, `update` and `delete` are staging calls: they queue the mutation
/// for the next unit-of-work save and never commit on their own.
#[async_trait]
pub trait CrudRepository<E>: Send + Sync
where
    E: CrudEntity,
{
    /// Fetches an entity by id, `Ok(None)` when no record matches.
    ///
    /// # Errors
    /// Any store failure, as [`CrudError::Persistence`].
    async fn get_by_id(&self, id: i64) -> Result<Option<E>, CrudError>;

    /// Stages an insert. The generated identity must be visible on `entity`
    /// no later than the save that follows; in-memory and buffering
    /// implementations assign it here.
    ///
    /// # Errors
    /// Any staging failure, as [`CrudError::Persistence`].
    fn add(&self, entity: &mut E) -> Result<(), CrudError>;

    /// Stages an update of an already-persisted entity.
    ///
    /// # Errors
    /// Any staging failure, as [`CrudError::Persistence`].
    fn update(&self, entity: &E) -> Result<(), CrudError>;

    /// Stages removal of an already-persisted entity.
    ///
    /// # Errors
    /// Any staging failure, as [`CrudError::Persistence`].
    fn delete(&self, entity: &E) -> Result<(), CrudError>;
}
