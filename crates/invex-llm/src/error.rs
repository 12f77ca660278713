//! Error types for the language-model layer.

use thiserror::Error;

/// Errors that can occur while invoking a language model.
#[derive(Error, Debug)]
pub enum LlmError {
    /// No API key was supplied to the client.
    #[error("missing API key")]
    MissingApiKey,

    /// Failed to build the HTTP client.
    #[error("failed to create client: {0}")]
    ClientCreate(String),

    /// The HTTP request could not be sent or completed.
    #[error("request failed: {0}")]
    Request(String),

    /// The request exceeded the configured timeout.
    #[error("request to {model} timed out")]
    Timeout { model: String },

    /// The service answered with a non-success status.
    #[error("{model} returned status {status}: {body}")]
    Status {
        model: String,
        status: u16,
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The response carried no text.
    #[error("{model} returned no text: {reason}")]
    EmptyResponse { model: String, reason: String },
}
