use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::error::TransferError;

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// What a HEAD request reveals about a remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub status:         u16,
    pub content_length: Option<u64>,
    /// `Accept-Ranges: bytes` was advertised.
    pub accepts_ranges: bool,
}

/// Status line, range header and streaming body of a GET.
pub struct HttpResponse<E> {
    pub status:        u16,
    pub content_range: Option<String>,
    pub body:          BoxStream<'static, Result<Bytes, E>>,
}

impl<E> HttpResponse<E> {
    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
}

/// Asynchronous HTTP client abstraction.
///
/// This trait provides the minimal interface the download stages need.
/// Implementations own their timeout, redirect and TLS configuration; the
/// caller builds the client once and passes it to every stage.
///
/// # Implementations
///
/// - [`ReqwestClient`]: Production implementation using `reqwest`
/// - Scripted clients in tests
pub trait HttpClient: Send + Sync {
    /// Error type for HTTP operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Issue a HEAD request.
    ///
    /// Non-success statuses are returned in [`RemoteMetadata::status`], not
    /// as errors.
    fn head(&self, url: &str) -> impl Future<Output = Result<RemoteMetadata, Self::Error>> + Send;

    /// Issue a GET, with a `Range` header when `range` is set.
    ///
    /// Non-success statuses are returned in [`HttpResponse::status`], not
    /// as errors.
    fn get(
        &self,
        url: &str,
        range: Option<&str>,
    ) -> impl Future<Output = Result<HttpResponse<Self::Error>, Self::Error>> + Send;
}

/// Read a body that must be exactly `expected` bytes long.
///
/// Stops as soon as the body overruns, so a misbehaving server cannot make
/// the caller buffer a whole file in place of a chunk.
pub async fn read_body<E: Display>(
    mut body: BoxStream<'static, Result<Bytes, E>>,
    expected: u64,
) -> Result<Vec<u8>, TransferError> {
    let mut buf = Vec::with_capacity(expected as usize);
    while let Some(piece) = body.next().await {
        let piece = piece.map_err(|e| TransferError::Transport(e.to_string()))?;
        buf.extend_from_slice(&piece);
        if buf.len() as u64 > expected {
            return Err(TransferError::BodyLength {
                expected,
                actual: buf.len() as u64,
            });
        }
    }
    crate::core::check_body_length(expected, buf.len() as u64)?;
    Ok(buf)
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::time::Duration;

    use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, RANGE};

    use super::*;

    /// Production HTTP client implementation using reqwest.
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        /// Create a client applying `timeout` to every request.
        pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
            let client = reqwest::Client::builder().timeout(timeout).build()?;
            Ok(Self { client })
        }

        pub fn from_client(client: reqwest::Client) -> Self { Self { client } }
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn head(&self, url: &str) -> Result<RemoteMetadata, Self::Error> {
            let response = self.client.head(url).send().await?;
            let headers = response.headers();
            let content_length = headers
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            let accepts_ranges = headers
                .get_all(ACCEPT_RANGES)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(','))
                .any(|unit| unit.trim().eq_ignore_ascii_case("bytes"));

            Ok(RemoteMetadata {
                status: response.status().as_u16(),
                content_length,
                accepts_ranges,
            })
        }

        async fn get(
            &self,
            url: &str,
            range: Option<&str>,
        ) -> Result<HttpResponse<Self::Error>, Self::Error> {
            let mut request = self.client.get(url);
            if let Some(range) = range {
                request = request.header(RANGE, range);
            }

            let response = request.send().await?;
            let status = response.status().as_u16();
            let content_range = response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            Ok(HttpResponse {
                status,
                content_range,
                body: Box::pin(response.bytes_stream()),
            })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;

#[cfg(test)]
mod tests {
    use super::*;

    fn body(pieces: &[&'static [u8]]) -> BoxStream<'static, Result<Bytes, std::io::Error>> {
        let items: Vec<_> = pieces.iter().map(|p| Ok(Bytes::from_static(p))).collect();
        Box::pin(futures_util::stream::iter(items))
    }

    #[tokio::test]
    async fn read_body_joins_pieces() {
        let data = read_body(body(&[b"ab", b"cd", b"e"]), 5).await.unwrap();
        assert_eq!(data, b"abcde");
    }

    #[tokio::test]
    async fn read_body_rejects_short_body() {
        let err = read_body(body(&[b"ab"]), 5).await.unwrap_err();
        assert!(matches!(err, TransferError::BodyLength { expected: 5, actual: 2 }));
    }

    #[tokio::test]
    async fn read_body_stops_on_overrun() {
        let err = read_body(body(&[b"abc", b"def", b"never read"]), 4).await.unwrap_err();
        assert!(matches!(err, TransferError::BodyLength { expected: 4, actual: 6 }));
    }

    #[tokio::test]
    async fn read_body_maps_stream_errors() {
        let items: Vec<Result<Bytes, std::io::Error>> =
            vec![Ok(Bytes::from_static(b"a")), Err(std::io::Error::other("reset"))];
        let err = read_body(Box::pin(futures_util::stream::iter(items)), 2).await.unwrap_err();
        assert!(matches!(err, TransferError::Transport(ref m) if m == "reset"));
    }
}
