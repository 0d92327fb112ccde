//! Provider driver errors.

use thiserror::Error;

use super::client::Diagnostics;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The plugin binary could not be located. Fatal for the whole provider.
    #[error("provider plugin binary not found: {0}")]
    PluginNotFound(String),

    /// The plugin process started but its RPC channel could not be opened.
    #[error("failed to start provider RPC channel for alias {alias}: {reason}")]
    ChannelStart { alias: String, reason: String },

    /// The `Configure` RPC came back with error diagnostics. The alias stays
    /// unconfigured; the driver does not retry configuration on its own.
    #[error("provider configuration failed for alias {alias}: {diagnostics}")]
    Configure {
        alias: String,
        diagnostics: Diagnostics,
    },

    /// No schema is known for the requested resource type.
    #[error("no provider schema for resource type {0}")]
    UnsupportedType(String),

    /// `ReadResource` returned error diagnostics.
    #[error("ReadResource returned an error: {diagnostics}")]
    Read { diagnostics: Diagnostics },

    /// `ReadResource` returned a null state together with non-fatal
    /// diagnostics. Retryable, unlike a clean null state which means the
    /// resource no longer exists.
    #[error("state returned by ReadResource is null: {diagnostics}")]
    NullState { diagnostics: Diagnostics },

    /// Transport-level RPC failure.
    #[error("provider RPC transport failure: {0}")]
    Transport(String),
}
