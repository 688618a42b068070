//! Infrastructure layer with transport, decoding, caching and configuration adapters.

/// In-memory keyed cache.
pub mod cache;
/// Application configuration.
pub mod config;
/// Payload decoders.
pub mod decode;
/// HTTP transport.
pub mod http;
/// Photo manifest loading.
pub mod manifest;

pub use cache::{CacheStats, KeyedCache};
pub use config::{AppConfig, CliArgs, ConfigError, LogLevel, StorageManager};
pub use decode::{ImageDecoder, RawBytesDecoder};
pub use http::ReqwestTransport;
pub use manifest::{ManifestError, PhotoReference, load_manifest, parse_manifest};
