//! Data models for the gallery gateway.
//!
//! The gateway keeps no state of its own; these types describe what the
//! storage backend reports about objects under the gallery namespace.

pub mod image;
