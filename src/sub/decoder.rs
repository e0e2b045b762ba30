//! Link decoding: resolving a candidate link to a (host, port) endpoint
//!
//! Pure string-to-endpoint resolution with no network or file I/O.
//! `vmess://` links carry a base64-encoded JSON body; every other scheme is
//! handled by generic URI parsing.

use crate::sub::models::Endpoint;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

const VMESS_PREFIX: &str = "vmess://";

/// Port used when a vmess payload has no usable port field
const DEFAULT_VMESS_PORT: &str = "443";

/// Failure modes when resolving a link to an endpoint
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("no host in vmess payload")]
    NoHostFound,

    #[error("cannot extract host/port from link")]
    CannotExtractHostPort,

    #[error("unknown scheme")]
    UnknownScheme,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid vmess JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URI: {0}")]
    Url(#[from] url::ParseError),
}

/// The subset of a vmess JSON body needed to resolve an endpoint
#[derive(Debug, Deserialize)]
struct VmessPayload {
    #[serde(default)]
    add: Option<String>,
    #[serde(default)]
    server: Option<String>,
    #[serde(default)]
    port: VmessPort,
}

/// The port field as it appears in the wild: text, a number, or anything else
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VmessPort {
    Text(String),
    Number(f64),
    Other(serde_json::Value),
}

impl Default for VmessPort {
    fn default() -> Self {
        VmessPort::Other(serde_json::Value::Null)
    }
}

impl VmessPort {
    /// Text verbatim, numbers as integer strings, anything else the default
    fn into_port_string(self) -> String {
        match self {
            VmessPort::Text(port) => port,
            VmessPort::Number(port) => format!("{port:.0}"),
            VmessPort::Other(_) => DEFAULT_VMESS_PORT.to_string(),
        }
    }
}

/// Resolve a candidate link to the endpoint it points at
pub fn decode_endpoint(link: &str) -> Result<Endpoint, DecodeError> {
    let link = link.trim();

    if let Some(payload) = link.strip_prefix(VMESS_PREFIX) {
        return decode_vmess(payload);
    }

    // Rejects already-stripped or otherwise malformed entries early.
    if !link.contains("://") {
        return Err(DecodeError::UnknownScheme);
    }

    let parsed = Url::parse(link)?;
    let host = parsed.host_str().unwrap_or_default();
    let port = parsed.port().map(|p| p.to_string()).unwrap_or_default();
    if host.is_empty() || port.is_empty() {
        return Err(DecodeError::CannotExtractHostPort);
    }

    Ok(Endpoint::new(host.to_string(), port))
}

/// Decode the base64 JSON body of a `vmess://` link
///
/// Host resolution falls back from `add` to `server`; both absent or empty
/// is a failure. The standard base64 alphabet is tried padded first, then
/// unpadded.
fn decode_vmess(payload: &str) -> Result<Endpoint, DecodeError> {
    let bytes = STANDARD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))?;
    let body: VmessPayload = serde_json::from_slice(&bytes)?;

    let host = body
        .add
        .filter(|host| !host.is_empty())
        .or(body.server.filter(|host| !host.is_empty()))
        .ok_or(DecodeError::NoHostFound)?;

    Ok(Endpoint::new(host, body.port.into_port_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vmess_link(json: &str) -> String {
        format!("vmess://{}", STANDARD.encode(json))
    }

    #[test]
    fn test_vmess_with_add_and_numeric_port() {
        let link = vmess_link(r#"{"add":"1.2.3.4","port":8443}"#);
        let endpoint = decode_endpoint(&link).unwrap();
        assert_eq!(endpoint.host, "1.2.3.4");
        assert_eq!(endpoint.port, "8443");
    }

    #[test]
    fn test_vmess_server_fallback_and_default_port() {
        let link = vmess_link(r#"{"server":"example.com"}"#);
        let endpoint = decode_endpoint(&link).unwrap();
        assert_eq!(endpoint.host, "example.com");
        assert_eq!(endpoint.port, "443");
    }

    #[test]
    fn test_vmess_string_port_verbatim() {
        let link = vmess_link(r#"{"add":"example.com","port":"8080"}"#);
        let endpoint = decode_endpoint(&link).unwrap();
        assert_eq!(endpoint.port, "8080");
    }

    #[test]
    fn test_vmess_port_of_unexpected_type_defaults() {
        let link = vmess_link(r#"{"add":"example.com","port":true}"#);
        let endpoint = decode_endpoint(&link).unwrap();
        assert_eq!(endpoint.port, "443");
    }

    #[test]
    fn test_vmess_empty_add_falls_back_to_server() {
        let link = vmess_link(r#"{"add":"","server":"fallback.net","port":"22"}"#);
        let endpoint = decode_endpoint(&link).unwrap();
        assert_eq!(endpoint.host, "fallback.net");
    }

    #[test]
    fn test_vmess_no_host_at_all() {
        let link = vmess_link(r#"{"port":443}"#);
        assert!(matches!(
            decode_endpoint(&link),
            Err(DecodeError::NoHostFound)
        ));
    }

    #[test]
    fn test_vmess_unpadded_base64() {
        let unpadded = STANDARD_NO_PAD.encode(r#"{"add":"1.2.3.4","port":80}"#);
        let endpoint = decode_endpoint(&format!("vmess://{unpadded}")).unwrap();
        assert_eq!(endpoint.host, "1.2.3.4");
        assert_eq!(endpoint.port, "80");
    }

    #[test]
    fn test_vmess_invalid_base64() {
        assert!(matches!(
            decode_endpoint("vmess://!!!not-base64!!!"),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn test_vmess_invalid_json() {
        let link = vmess_link("not json at all");
        assert!(matches!(decode_endpoint(&link), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_trojan_generic_uri() {
        let endpoint = decode_endpoint("trojan://user@example.com:443?x=1").unwrap();
        assert_eq!(endpoint.host, "example.com");
        assert_eq!(endpoint.port, "443");
    }

    #[test]
    fn test_vless_generic_uri() {
        let endpoint =
            decode_endpoint("vless://uuid@10.0.0.1:8443?security=tls#label").unwrap();
        assert_eq!(endpoint.host, "10.0.0.1");
        assert_eq!(endpoint.port, "8443");
    }

    #[test]
    fn test_uri_without_port() {
        assert!(matches!(
            decode_endpoint("trojan://user@example.com"),
            Err(DecodeError::CannotExtractHostPort)
        ));
    }

    #[test]
    fn test_no_scheme_rejected() {
        assert!(matches!(
            decode_endpoint("example.com:443"),
            Err(DecodeError::UnknownScheme)
        ));
    }

    #[test]
    fn test_decoding_is_idempotent() {
        let link = "trojan://user@example.com:443?x=1";
        let first = decode_endpoint(link).unwrap();
        let second = decode_endpoint(link).unwrap();
        assert_eq!(first, second);

        let bad = "no-scheme-here";
        assert!(matches!(decode_endpoint(bad), Err(DecodeError::UnknownScheme)));
        assert!(matches!(decode_endpoint(bad), Err(DecodeError::UnknownScheme)));
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let endpoint = decode_endpoint("  trojan://user@example.com:443  ").unwrap();
        assert_eq!(endpoint.host, "example.com");
    }
}
