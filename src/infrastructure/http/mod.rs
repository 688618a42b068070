//! Network transport adapters.

pub mod transport;

pub use transport::ReqwestTransport;
