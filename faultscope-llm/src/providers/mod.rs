//! Provider-specific model clients

pub mod google;
