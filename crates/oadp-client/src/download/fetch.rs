//! Downloads the content behind a signed URL.

use std::{io::Read, time::Duration};

use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::{
    StatusCode,
    header::{CONTENT_ENCODING, HeaderMap},
};
use snafu::{ResultExt, Snafu};
use tracing::debug;

type Result<T, E = Error> = std::result::Result<T, E>;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Longest part of an error response body kept in the error message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to build the http client"))]
    BuildHttpClient { source: reqwest::Error },

    #[snafu(display("failed to download from signed url"))]
    Request { source: reqwest::Error },

    #[snafu(display("download failed with status {status}: {body}"))]
    HttpStatus { status: u16, body: String },

    #[snafu(display("failed to read the response body"))]
    ReadBody { source: reqwest::Error },

    #[snafu(display("failed to decompress gzip content"))]
    Decompress { source: std::io::Error },

    #[snafu(display("downloaded content is not valid utf-8"))]
    InvalidUtf8 { source: std::string::FromUtf8Error },
}

/// Retrieves the artifact behind a signed URL as text.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// `assume_gzip` decodes gzip content even if the response doesn't declare
    /// a gzip `Content-Encoding`.
    async fn fetch(&self, url: &str, assume_gzip: bool) -> Result<String>;
}

/// [`ArtifactFetcher`] doing a plain HTTP GET.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// `insecure_skip_tls_verify` disables certificate checks for object
    /// stores with self-signed certificates.
    pub fn new(insecure_skip_tls_verify: bool, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure_skip_tls_verify)
            .build()
            .context(BuildHttpClientSnafu)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, assume_gzip: bool) -> Result<String> {
        let response = self.client.get(url).send().await.context(RequestSnafu)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let declared_gzip = declares_gzip(response.headers());

        let bytes = response.bytes().await.context(ReadBodySnafu)?;
        debug!(len = bytes.len(), declared_gzip, "downloaded artifact");

        decode_body(&bytes, declared_gzip, assume_gzip)
    }
}

/// Whether the response says its body is gzip encoded.
fn declares_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(CONTENT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|coding| coding.trim().eq_ignore_ascii_case("gzip"))
}

/// Object stores answer failures with an XML document, its start is enough to
/// see what went wrong.
fn status_error(status: StatusCode, body: &str) -> Error {
    let body = body.trim();
    let body = match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_owned(),
    };

    Error::HttpStatus {
        status: status.as_u16(),
        body,
    }
}

/// Turns a downloaded body into text.
///
/// Declared gzip is always decoded. Assumed gzip is only decoded if the body
/// starts with the gzip magic bytes, otherwise it is taken as plain text.
pub fn decode_body(bytes: &[u8], declared_gzip: bool, assume_gzip: bool) -> Result<String> {
    let gzipped = declared_gzip || (assume_gzip && bytes.starts_with(&GZIP_MAGIC));

    let raw = if gzipped {
        let mut decoded = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut decoded)
            .context(DecompressSnafu)?;
        decoded
    } else {
        bytes.to_vec()
    };

    String::from_utf8(raw).context(InvalidUtf8Snafu)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::{Compression, write::GzEncoder};
    use rstest::rstest;

    use super::*;

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[rstest]
    #[case(true, false)]
    #[case(false, true)]
    #[case(true, true)]
    fn decodes_gzip(#[case] declared_gzip: bool, #[case] assume_gzip: bool) {
        let text = "time=\"2024-05-01T10:00:00Z\" level=info msg=\"backup completed\"\n";

        let decoded = decode_body(&gzip(text), declared_gzip, assume_gzip).unwrap();

        assert_eq!(decoded, text);
    }

    #[test]
    fn assumed_gzip_falls_back_to_plain_text() {
        let decoded = decode_body(br#"{"errors":{}}"#, false, true).unwrap();
        assert_eq!(decoded, r#"{"errors":{}}"#);
    }

    #[test]
    fn gzip_is_left_alone_unless_asked_for() {
        let compressed = gzip("hello");
        let result = decode_body(&compressed, false, false);
        assert!(matches!(result, Err(Error::InvalidUtf8 { .. })), "{result:?}");
    }

    #[rstest]
    #[case(Some("gzip"), true)]
    #[case(Some("GZIP"), true)]
    #[case(Some("br, gzip"), true)]
    #[case(Some("identity"), false)]
    #[case(None, false)]
    fn content_encoding_header(#[case] encoding: Option<&'static str>, #[case] expected: bool) {
        let mut headers = HeaderMap::new();
        if let Some(encoding) = encoding {
            headers.insert(CONTENT_ENCODING, encoding.parse().unwrap());
        }

        assert_eq!(declares_gzip(&headers), expected);
    }

    #[test]
    fn expired_url_reports_status_and_body() {
        let body = "\n<?xml version=\"1.0\"?><Error><Code>AccessDenied</Code></Error>\n";

        let error = status_error(StatusCode::FORBIDDEN, body);

        assert_eq!(
            error.to_string(),
            r#"download failed with status 403: <?xml version="1.0"?><Error><Code>AccessDenied</Code></Error>"#
        );
    }

    #[test]
    fn long_error_bodies_are_cut() {
        let body = "x".repeat(2 * MAX_ERROR_BODY);

        let Error::HttpStatus { status, body } = status_error(StatusCode::BAD_GATEWAY, &body) else {
            panic!("expected an http status error");
        };

        assert_eq!(status, 502);
        assert_eq!(body.len(), MAX_ERROR_BODY + 3);
        assert!(body.ends_with("..."));
    }

    #[test]
    fn broken_declared_gzip_is_an_error() {
        let result = decode_body(b"definitely not gzip", true, false);
        assert!(matches!(result, Err(Error::Decompress { .. })), "{result:?}");
    }
}
