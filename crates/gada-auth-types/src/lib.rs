//! Auth types shared across Gada services.
//!
//! Provides the access-token codec, refresh-cookie builders, and the
//! `Identity` / `Caller` / `AdminIdentity` extractors.

pub mod cookie;
pub mod identity;
pub mod token;
