pub mod auth;
pub mod items;
pub mod model_jobs;
