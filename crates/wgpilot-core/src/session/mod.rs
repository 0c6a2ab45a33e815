// ── Session storage ──
//
// The single active session per store, plus the persistence seam that
// makes it survive restarts.

mod persistence;
mod store;

pub use persistence::{MemoryPersistence, SessionPersistence};
pub use store::{SessionRecord, SessionStore, SessionWriter};
