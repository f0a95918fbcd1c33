//! Error taxonomy for the render engine and its control plane.

use thiserror::Error;

/// Errors surfaced across the render core.
///
/// Each protocol-facing variant maps to one of the JSON-RPC-style error codes
/// in [`crate::protocol`]; [`LumenError::Internal`] wraps adapter-layer
/// failures that are not part of the wire protocol.
#[derive(Debug, Error)]
pub enum LumenError {
    /// The request body was not valid JSON.
    #[error("parse error")]
    Parse,
    /// The request was not a JSON object, or was missing `method`/`params`.
    #[error("invalid request")]
    InvalidRequest,
    /// No handler is registered for the requested method.
    #[error("method not found")]
    MethodNotFound,
    /// Parameters were missing, malformed, or out of range.
    #[error("invalid params: {0}")]
    InvalidParams(String),
    /// `stop_song`/audio query issued while no audio is active.
    #[error("no music currently playing")]
    NoMusicPlaying,
    /// `stop_animation_playlist` issued while no playlist is running.
    #[error("no animation playlist is currently playing")]
    NoPlaylistPlaying,
    /// Opaque failure from a collaborator (hardware, accept loop, ...).
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience alias for fallible operations within the render core.
pub type Result<T> = std::result::Result<T, LumenError>;
