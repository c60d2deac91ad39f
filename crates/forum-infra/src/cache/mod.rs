//! Query caching - the raw cache store and the query client on top of it.

mod memory;
mod query;

pub use memory::InMemoryCache;
pub use query::QueryClient;
