//! TLS provider abstraction.
//!
//! The HTTP client only knows about [`TlsProvider`]; the rustls-backed
//! implementation is compiled in with the `tls-rustls` feature.

use std::io::{Read, Write};
use std::net::TcpStream;

use hatch_types::error::Result;

/// A bidirectional byte stream the HTTP client can speak over.
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send> Transport for T {}

/// Provides TLS client connections.
pub trait TlsProvider: Send + Sync {
    /// Wrap `stream` in a TLS client session.
    ///
    /// `server_name` is used for SNI and certificate verification.
    fn connect_tls(&self, stream: TcpStream, server_name: &str) -> Result<Box<dyn Transport>>;
}

#[cfg(feature = "tls-rustls")]
pub use self::rustls_provider::RustlsTlsProvider;

#[cfg(feature = "tls-rustls")]
mod rustls_provider {
    use std::net::TcpStream;
    use std::sync::Arc;

    use hatch_types::error::{HatchError, Result};
    use rustls::ClientConfig;
    use rustls_pki_types::ServerName;

    use super::{TlsProvider, Transport};

    /// Shared, reusable TLS client configuration (one per process).
    pub struct RustlsTlsProvider {
        config: Arc<ClientConfig>,
    }

    impl RustlsTlsProvider {
        /// Build a provider that trusts Mozilla's root CA bundle.
        pub fn new() -> Self {
            let root_store =
                rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

            let config = ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth();

            Self {
                config: Arc::new(config),
            }
        }
    }

    impl Default for RustlsTlsProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TlsProvider for RustlsTlsProvider {
        fn connect_tls(&self, stream: TcpStream, server_name: &str) -> Result<Box<dyn Transport>> {
            let sni = ServerName::try_from(server_name.to_owned())
                .map_err(|e| HatchError::Network(format!("invalid server name: {e}")))?;

            let conn = rustls::ClientConnection::new(Arc::clone(&self.config), sni)
                .map_err(|e| HatchError::Network(format!("TLS init: {e}")))?;

            // The handshake runs on first read/write.
            Ok(Box::new(rustls::StreamOwned::new(conn, stream)))
        }
    }
}
