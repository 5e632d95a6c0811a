use crate::base::neterror::NetError;
use boring::ssl::{SslConnector, SslMethod, SslVerifyMode, SslVersion};
use std::path::PathBuf;

/// TLS settings for the default transport.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub min_version: Option<SslVersion>,
    pub max_version: Option<SslVersion>,
    /// OpenSSL-style cipher string; `None` keeps BoringSSL's defaults.
    pub cipher_list: Option<String>,
    /// Only HTTP/1.1 is spoken, so this is advertised alone by default.
    pub alpn_protos: Vec<String>,
    /// Verify the server certificate chain and hostname.
    pub verify_peer: bool,
    /// Extra trust anchors (PEM), e.g. a private CA.
    pub ca_file: Option<PathBuf>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            min_version: Some(SslVersion::TLS1_2),
            max_version: Some(SslVersion::TLS1_3),
            cipher_list: None,
            alpn_protos: vec!["http/1.1".to_string()],
            verify_peer: true,
            ca_file: None,
        }
    }
}

impl TlsConfig {
    /// Build a connector from these settings.
    pub fn connector(&self) -> Result<SslConnector, NetError> {
        let mut builder =
            SslConnector::builder(SslMethod::tls()).map_err(|_| NetError::SslProtocolError)?;

        builder.set_min_proto_version(self.min_version).map_err(|_| NetError::SslProtocolError)?;
        builder.set_max_proto_version(self.max_version).map_err(|_| NetError::SslProtocolError)?;

        if let Some(ciphers) = &self.cipher_list {
            builder.set_cipher_list(ciphers).map_err(|_| NetError::SslProtocolError)?;
        }

        if !self.alpn_protos.is_empty() {
            let mut alpn_wire = Vec::new();
            for proto in &self.alpn_protos {
                if proto.is_empty() || proto.len() > 255 {
                    return Err(NetError::SslProtocolError);
                }
                alpn_wire.push(proto.len() as u8);
                alpn_wire.extend_from_slice(proto.as_bytes());
            }
            builder.set_alpn_protos(&alpn_wire).map_err(|_| NetError::SslProtocolError)?;
        }

        if let Some(ca_file) = &self.ca_file {
            builder.set_ca_file(ca_file).map_err(|_| NetError::CertAuthorityInvalid)?;
        }

        if self.verify_peer {
            builder.set_verify(SslVerifyMode::PEER);
        } else {
            builder.set_verify(SslVerifyMode::NONE);
        }

        Ok(builder.build())
    }

    /// SNI must not carry a literal IP address (RFC 6066).
    pub fn should_set_sni(host: &str) -> bool {
        host.trim_matches(|c| c == '[' || c == ']')
            .parse::<std::net::IpAddr>()
            .is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_connector_builds() {
        assert!(TlsConfig::default().connector().is_ok());
    }

    #[test]
    fn test_rejects_oversized_alpn() {
        let config = TlsConfig {
            alpn_protos: vec!["x".repeat(300)],
            ..Default::default()
        };
        assert_eq!(config.connector().unwrap_err(), NetError::SslProtocolError);
    }

    #[test]
    fn test_sni_skipped_for_ip_literals() {
        assert!(TlsConfig::should_set_sni("example.com"));
        assert!(!TlsConfig::should_set_sni("127.0.0.1"));
        assert!(!TlsConfig::should_set_sni("[::1]"));
    }
}
