//! Per-token isolated resource stores (§3, §4.1, §4.2).

mod session;
mod store;

pub use session::Session;
pub use store::{spawn_sweeper, SessionStore};
