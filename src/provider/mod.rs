//! # Provider Plugin Layer
//!
//! Everything needed to drive an out-of-process provider plugin: the narrow
//! RPC capability traits ([`ProviderClient`], [`ProviderLauncher`]), the
//! per-alias process driver ([`ProviderDriver`]) and the static configuration
//! sent to each alias. The rest of the crate only ever sees the
//! [`ResourceReader`] capability.

pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod mock;

pub use client::{
    Diagnostic, Diagnostics, ProviderClient, ProviderLauncher, ProviderSchema, ReadResourceArgs,
    ReadResourceResponse, ResourceReader, SchemaMap, Severity, StructuredValue,
};
pub use config::ProviderConfig;
pub use driver::{ProviderDriver, ALIAS_ATTRIBUTE};
pub use error::ProviderError;
