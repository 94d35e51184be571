//! Generic resource CRUD + typed search, layered over a [`crate::session::Session`]
//! (§4.4, §4.7).

mod provider;
mod search;

pub use provider::{ReadResult, ResourceProvider, SearchResult};
pub use search::matches_search;
