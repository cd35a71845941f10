//! Offline config bootstrappers for specific named transit systems.

pub mod nyc;
