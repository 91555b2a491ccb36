//! The 3D-model generation pipeline: asset resolution, provider
//! orchestration (start/sync), and artifact materialization.
//!
//! Both `start` and `sync` are synchronous to the caller; there is no
//! background polling loop. The hard part is state correctness, so the
//! transition functions are written to be idempotent and safe to
//! repeat.

pub mod machine;
pub mod materializer;
pub mod resolver;

pub use machine::{PipelineError, StartOptions, StartOutput, SyncOptions, SyncOutput};
