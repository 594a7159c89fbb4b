//! Service plumbing shared by Gada services: configuration loading, tracing,
//! request ids and the common extractor error.

pub mod config;
pub mod error;
pub mod middleware;
pub mod serde;
pub mod tracing;
