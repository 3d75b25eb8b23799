//! [`Transport`] backed by rustls + ring.
//!
//! Enabled by the `tls-rustls` feature. Gemini servers commonly use
//! self-signed certificates, so the verifier accepts any chain and records
//! the end-entity fingerprint; trust is decided afterwards against the
//! certificate store.

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gemview_types::error::{GemviewError, Result};
use ring::digest;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};

use crate::transport::{Connection, PeerCertificate, Transport};
use crate::url::Url;

const DEFAULT_PORT: u16 = 1965;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Records the fingerprint of the certificate presented during the
/// handshake.
#[derive(Debug)]
struct RecordingVerifier {
    provider: Arc<CryptoProvider>,
    seen: Mutex<Option<Vec<u8>>>,
}

impl ServerCertVerifier for RecordingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let fp = digest::digest(&digest::SHA256, end_entity.as_ref());
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        *seen = Some(fp.as_ref().to_vec());
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// TCP + TLS transport.
#[derive(Debug, Default)]
pub struct RustlsTransport;

impl RustlsTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for RustlsTransport {
    fn connect(&self, url: &Url) -> Result<Connection> {
        let port = url.port.unwrap_or(DEFAULT_PORT);
        let tcp = tcp_connect(&url.host, port)?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let verifier = Arc::new(RecordingVerifier {
            provider: Arc::clone(&provider),
            seen: Mutex::new(None),
        });
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| GemviewError::Tls(format!("protocol versions: {e}")))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::clone(&verifier) as Arc<dyn ServerCertVerifier>)
            .with_no_client_auth();

        let sni = ServerName::try_from(url.host.clone())
            .map_err(|e| GemviewError::Tls(format!("invalid server name: {e}")))?;
        let conn = rustls::ClientConnection::new(Arc::new(config), sni)
            .map_err(|e| GemviewError::Tls(format!("TLS init: {e}")))?;
        let mut stream = rustls::StreamOwned::new(conn, tcp);
        while stream.conn.is_handshaking() {
            stream
                .conn
                .complete_io(&mut stream.sock)
                .map_err(|e| GemviewError::Tls(format!("handshake: {e}")))?;
        }

        let fingerprint = verifier
            .seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .unwrap_or_default();
        Ok(Connection {
            stream: Box::new(stream),
            certificate: Some(PeerCertificate {
                fingerprint,
                subject: url.host.clone(),
                not_after: None,
                domain_verified: false,
            }),
        })
    }
}

fn tcp_connect(host: &str, port: u16) -> Result<TcpStream> {
    let addr = format!("{host}:{port}")
        .to_socket_addrs()
        .map_err(|e| GemviewError::Network(format!("DNS resolution failed: {e}")))?
        .next()
        .ok_or_else(|| GemviewError::Network(format!("no addresses for {host}:{port}")))?;
    let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
        .map_err(|e| GemviewError::Network(format!("TCP connect failed: {e}")))?;
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolvable_host_is_network_error() {
        let url = Url::parse("gemini://no-such-host.invalid/").unwrap();
        let err = RustlsTransport::new().connect(&url).err().unwrap();
        assert!(matches!(err, GemviewError::Network(_)));
    }
}
