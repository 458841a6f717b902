pub mod errors;
pub mod scope;
pub mod service;
pub mod traits;
pub mod unit_of_work;

pub use errors::{BoxError, CrudError};
pub use scope::{ScopedUnitOfWork, UnitOfWorkScope};
pub use service::CrudService;
pub use traits::{CrudDto, CrudDtoMapper, CrudEntity, CrudRepository};
pub use unit_of_work::{ContextFactory, UnitOfWork, UnitOfWorkContext};
