//! Decoder port definition.

use bytes::Bytes;

use crate::domain::errors::FetchError;

/// Turns a fetched payload into the cached value type.
///
/// Decoding is CPU-bound; callers run it on the blocking pool.
pub trait Decoder<V>: Send + Sync {
    /// Decodes a payload.
    ///
    /// # Errors
    /// Returns [`FetchError::Decode`] if the payload is not a valid `V`.
    fn decode(&self, payload: &Bytes) -> Result<V, FetchError>;
}
