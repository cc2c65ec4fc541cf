//! Core contracts for bws-cache: the secret/project data model and the
//! backend invocation contract shared by the real subprocess backend and the
//! in-memory emulator. This crate is intentionally small to keep dependency
//! surface minimal.

pub mod backend;
pub mod model;

pub use backend::{Backend, BackendError, MemoryBws};
pub use model::{Project, Secret};
