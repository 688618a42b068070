//! Transport port definition.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::TransferRequest;
use crate::domain::errors::FetchError;

/// Port for the network layer.
///
/// Dropping the returned future must abort the transfer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Retrieves the payload for a request.
    async fn transfer(&self, request: TransferRequest) -> Result<Bytes, FetchError>;
}
