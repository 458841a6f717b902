use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};

use crate::errors::CrudError;
use crate::traits::{CrudDto, CrudDtoMapper, CrudEntity, CrudRepository};
use crate::unit_of_work::UnitOfWork;

/// Generic CRUD orchestrator over a repository, a unit of work and a mapper.
///
/// Stateless: every operation is one fetch/map/mutate/save round trip, with
/// mutations staged through the repository and committed through the unit of
/// work. Identity and audit stamps are owned by this layer; callers cannot
/// choose an id on create, and the stored creation stamp survives updates.
///
/// ```rust,ignore
/// let customers = CrudService::new(repository, unit_of_work, mapper);
/// let created = customers.add(new_customer_dto).await?;
/// let fetched = customers.get_by_id(created.id()).await?;
/// ```
pub struct CrudService<E, D, R, U, M> {
    repository: Arc<R>,
    unit_of_work: Arc<U>,
    mapper: Arc<M>,
    _marker: PhantomData<fn() -> (E, D)>,
}

impl<E, D, R, U, M> CrudService<E, D, R, U, M>
where
    E: CrudEntity,
    D: CrudDto,
    R: CrudRepository<E>,
    U: UnitOfWork,
    M: CrudDtoMapper<E, D>,
{
    /// All three collaborators are required by value, so a service cannot
    /// be built with one missing.
    #[must_use]
    pub fn new(repository: Arc<R>, unit_of_work: Arc<U>, mapper: Arc<M>) -> Self {
        Self {
            repository,
            unit_of_work,
            mapper,
            _marker: PhantomData,
        }
    }

    /// Fetches the entity with `id` and maps it onto a fresh DTO. `Ok(None)`
    /// when no record matches.
    ///
    /// # Errors
    /// Repository failures propagate as [`CrudError::Persistence`].
    #[instrument(skip(self), fields(entity_type = type_name::<E>()))]
    pub async fn get_by_id(&self, id: i64) -> Result<Option<D>, CrudError> {
        let found = self.repository.get_by_id(id).await?;
        Ok(found.map(|entity| self.mapper.entity_to_dto(&entity)))
    }

    /// Creates a new record from `dto` and returns it carrying the generated
    /// identity and audit stamps.
    ///
    /// Whatever id the caller put on `dto` is discarded; identity is
    /// assigned by the persistence layer. Both audit stamps are set to now.
    ///
    /// # Errors
    /// Repository and save failures propagate; see
    /// [`UnitOfWork::save_changes_async`] for the save error shape.
    #[instrument(skip(self, dto), fields(entity_type = type_name::<E>()))]
    pub async fn add(&self, mut dto: D) -> Result<D, CrudError> {
        dto.set_id(0);
        let mut entity = self.mapper.dto_to_entity(&dto);
        let now = Utc::now();
        entity.set_created_utc(now);
        entity.set_modified_utc(now);
        self.repository.add(&mut entity)?;
        self.unit_of_work.save_changes_async().await?;
        self.mapper.merge_entity_into_dto(&entity, &mut dto);
        debug!(id = entity.id(), "created");
        Ok(dto)
    }

    /// Applies `dto` to the stored entity with the same id and returns the
    /// updated DTO, or `Ok(None)` when no record matches.
    ///
    /// The stored `created_utc` wins over whatever the DTO carries;
    /// `modified_utc` is set to now.
    ///
    /// # Errors
    /// Repository and save failures propagate; see
    /// [`UnitOfWork::save_changes_async`] for the save error shape.
    #[instrument(skip(self, dto), fields(entity_type = type_name::<E>()))]
    pub async fn update(&self, mut dto: D) -> Result<Option<D>, CrudError> {
        let Some(mut entity) = self.repository.get_by_id(dto.id()).await? else {
            debug!(id = dto.id(), "not found");
            return Ok(None);
        };
        let created_utc = entity.created_utc();
        self.mapper.merge_dto_into_entity(&dto, &mut entity);
        entity.set_created_utc(created_utc);
        entity.set_modified_utc(Utc::now());
        self.repository.update(&entity)?;
        self.unit_of_work.save_changes_async().await?;
        self.mapper.merge_entity_into_dto(&entity, &mut dto);
        Ok(Some(dto))
    }

    /// Deletes the record with `id`. `Ok(false)` when nothing matches, and
    /// in that case nothing is staged or saved.
    ///
    /// # Errors
    /// Repository and save failures propagate; see
    /// [`UnitOfWork::save_changes_async`] for the save error shape.
    #[instrument(skip(self), fields(entity_type = type_name::<E>()))]
    pub async fn delete(&self, id: i64) -> Result<bool, CrudError> {
        let Some(entity) = self.repository.get_by_id(id).await? else {
            debug!(id, "not found");
            return Ok(false);
        };
        self.repository.delete(&entity)?;
        self.unit_of_work.save_changes_async().await?;
        debug!(id, "deleted");
        Ok(true)
    }
}
