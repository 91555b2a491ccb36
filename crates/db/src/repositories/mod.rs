//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod item_repo;
pub mod model_job_repo;
pub mod session_repo;
pub mod user_repo;

pub use item_repo::ItemRepo;
pub use model_job_repo::ModelJobRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
