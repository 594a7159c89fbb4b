pub mod password;
pub mod password_reset;
pub mod rate_limit;
pub mod session;
pub mod token;
pub mod user;
pub mod verification;
