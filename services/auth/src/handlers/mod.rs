pub mod client;
pub mod email;
pub mod health;
pub mod password;
pub mod token;
pub mod user;
