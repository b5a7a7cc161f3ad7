// ABOUTME: Plain HTTP/1.1 health probe built on hyper.
// ABOUTME: One GET per check; any 2xx response counts as healthy.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::Uri;
use hyper::header::{HOST, USER_AGENT};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use super::{Probe, ProbeError};

#[derive(Debug, Clone, Default)]
pub struct HttpProbe;

impl HttpProbe {
    pub fn new() -> Self {
        Self
    }
}

/// Parse and validate a health check URL.
pub(crate) fn parse_url(url: &str) -> Result<Uri, ProbeError> {
    let uri = url.parse::<Uri>().map_err(|e| ProbeError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    if uri.scheme_str() != Some("http") {
        return Err(ProbeError::UnsupportedScheme(url.to_string()));
    }

    if uri.host().is_none() {
        return Err(ProbeError::InvalidUrl {
            url: url.to_string(),
            message: "missing host".to_string(),
        });
    }

    Ok(uri)
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self, url: &str) -> Result<(), ProbeError> {
        let uri = parse_url(url)?;
        let host = uri
            .host()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
            .unwrap_or_default();
        let port = uri.port_u16().unwrap_or(80);

        let stream = TcpStream::connect((host, port)).await?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!("health probe connection error: {}", e);
            }
        });

        let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        let authority = uri.authority().map(|a| a.as_str()).unwrap_or(host);

        let req = hyper::Request::builder()
            .method("GET")
            .uri(path)
            .header(HOST, authority)
            .header(USER_AGENT, concat!("releasekit/", env!("CARGO_PKG_VERSION")))
            .body(Empty::<Bytes>::new())
            .map_err(|e| ProbeError::Other(format!("failed to build request: {}", e)))?;

        let resp = sender.send_request(req).await?;
        let status = resp.status();

        // Drain the body so the server sees a complete exchange.
        let _ = resp.into_body().collect().await;

        if status.is_success() {
            Ok(())
        } else {
            Err(ProbeError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_url_requires_http() {
        assert!(parse_url("http://127.0.0.1:8080/health").is_ok());
        assert!(matches!(
            parse_url("https://example.com/health"),
            Err(ProbeError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            parse_url("/health"),
            Err(ProbeError::UnsupportedScheme(_))
        ));
    }
}
