//! sea-orm entities owned by the auth service.

pub mod rate_limits;
pub mod refresh_tokens;
pub mod users;
