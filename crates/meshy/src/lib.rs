//! Adapter for the Meshy image-to-3D API.
//!
//! Encapsulates the vendor's request/response contract: arity-based
//! endpoint selection, task-ID extraction across response shapes,
//! polling with endpoint fallback, and result-URL extraction. Nothing
//! outside this crate speaks the vendor vocabulary.

pub mod client;
pub mod endpoint;
pub mod extract;
pub mod status;

pub use client::{FetchOutcome, MeshyClient, MeshyConfig, MeshyError, SubmitOptions, SubmitOutcome};
pub use endpoint::Endpoint;
pub use status::TaskOutcome;
