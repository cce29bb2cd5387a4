//! Particle storage and the chunking engine for IonFS.
//!
//! A particle is one opaque blob addressed by a UUID. The particle store has
//! no hierarchy and no notion of files; the chunking engine ("burst") splits
//! a payload into particles and reassembles it in metadata order.
//!
//! # Design Principles
//! - Every particle call yields a status code, never a panic
//! - Batches run with bounded parallelism and report a complete status map
//! - No retries and no rollback; the caller decides what a failure means

pub mod burst;
pub mod client;
pub mod http;
pub mod local;
pub mod memory;

pub use burst::{
    chunk_count, effective_max_size, split, Burst, BurstEngine, Download, DEFAULT_CONCURRENCY,
    HARD_MAX_SIZE,
};
pub use client::{status_for_error, ParticleResponse, ParticleStore, DELETE_TIMEOUT};
pub use http::HttpParticleStore;
pub use local::LocalParticleStore;
pub use memory::MemoryParticleStore;
