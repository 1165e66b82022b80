//! Session persistence port

use chrono::{DateTime, Utc};

use crate::domain::result::Result;
use crate::domain::Session;

/// Local storage for the single active session
///
/// At most one session exists at a time; `save` replaces any previous one.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>>;

    fn save(&self, session: &Session) -> Result<()>;

    /// Record activity on the stored session
    fn touch(&self, at: DateTime<Utc>) -> Result<()>;

    fn clear(&self) -> Result<()>;
}
