//! Download helper for hatch.
//!
//! A small blocking HTTP/1.1 client over `std::net`, with HTTPS through the
//! optional rustls provider (`tls-rustls` feature). The [`Download`] type
//! wraps a fetch with a byte counter, unit conversions and progress events.

pub mod download;
pub mod http;
pub mod tls;
pub mod url;

/// A single file fetch with counters and conversions.
pub use download::Download;
/// Transfer event hooks (data, end, close, error).
pub use download::DownloadObserver;
/// Unit picked by auto-scaling.
pub use download::ByteUnit;
/// Observer that keeps only the default hooks.
pub use download::NoopObserver;
/// Timeouts, redirect limit and user agent for requests.
pub use http::HttpOptions;
/// TLS client provider trait.
pub use tls::TlsProvider;
#[cfg(feature = "tls-rustls")]
/// rustls-backed TLS provider using the webpki root store.
pub use tls::RustlsTlsProvider;
/// Parsed absolute http/https URL.
pub use url::Url;
