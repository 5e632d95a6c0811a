use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::connection::EventSink;
use crate::transport::socket::SocketType;
use crate::transport::tls::TlsConfig;
use boring::x509::X509VerifyResult;
use std::net::SocketAddr;
use tokio::net::TcpStream;
use url::Url;

/// DNS -> TCP -> TLS for one request.
pub struct ConnectJob;

impl ConnectJob {
    pub async fn connect(
        url: &Url,
        tls: &TlsConfig,
        sink: &EventSink,
    ) -> Result<SocketType, NetError> {
        let host = url.host_str().ok_or(NetError::InvalidUrl)?;
        let port = url.port_or_known_default().ok_or(NetError::InvalidUrl)?;
        // IPv6 literals come bracketed from the URL.
        let bare_host = host.trim_start_matches('[').trim_end_matches(']');

        // 1. DNS
        let addrs: Vec<SocketAddr> =
            tokio::net::lookup_host((bare_host, port)).await.dns_context(bare_host)?.collect();
        if addrs.is_empty() {
            return Err(NetError::NameNotResolved);
        }

        // 2. TCP, first address that accepts
        let mut last_error = NetError::ConnectionFailed;
        let mut stream = None;
        for addr in addrs {
            match TcpStream::connect(addr).await.connection_context(bare_host, port) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_error = e,
            }
        }
        let stream = stream.ok_or(last_error)?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::trace!(error = %e, "set_nodelay failed");
        }

        if url.scheme() != "https" {
            return Ok(SocketType::Tcp(stream));
        }

        // 3. TLS. Server trust evaluation is the challenge point.
        sink.challenge();

        let connector = tls.connector()?;
        let mut config = connector.configure().map_err(|_| NetError::SslProtocolError)?;
        if !TlsConfig::should_set_sni(bare_host) {
            config.set_use_server_name_indication(false);
        }
        if !tls.verify_peer {
            config.set_verify_hostname(false);
        }

        let tls_stream = tokio_boring::connect(config, bare_host, stream).await.map_err(|e| {
            let untrusted = e.ssl().map_or(false, |ssl| ssl.verify_result() != X509VerifyResult::OK);
            tracing::debug!(host = %bare_host, error = %e, "TLS handshake failed");
            if untrusted {
                NetError::CertAuthorityInvalid
            } else {
                NetError::SslProtocolError
            }
        })?;

        Ok(SocketType::Ssl(tls_stream))
    }
}
