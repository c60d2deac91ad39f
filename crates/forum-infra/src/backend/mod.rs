//! Backends that run without the hosted service.

mod memory;

pub use memory::InMemoryBackend;
