//! HTTP access to the attendance API.
//!
//! The two components see the API through [StatisticsSource] and
//! [FaceIdentifier]. [AttendanceClient] implements both over reqwest.
//! Any completed exchange is `Ok(HttpReply)` whatever its status.
//! Transport failures, timeouts included, are `Err`.

use crate::{config::HttpConfig, types::HttpReply};
use eyre::{Result, WrapErr};
use reqwest::{
    Client, RequestBuilder, Response,
    multipart::{Form, Part},
};
use std::future::Future;
use tracing::debug;

/// Header the attendance API reads its session token from.
pub const AUTH_HEADER: &str = "x-auth-token";
/// Multipart field carrying the face crop.
pub const FACE_FIELD: &str = "faceImage";
pub const FACE_FILE_NAME: &str = "face.jpg";
pub const FACE_MIME: &str = "image/jpeg";

/// Fetches the raw attendance statistics.
pub trait StatisticsSource {
    fn fetch_statistics(&self) -> impl Future<Output = Result<HttpReply>> + Send;
}

/// Submits a JPEG face crop for identification.
pub trait FaceIdentifier {
    fn identify(&self, jpeg: Vec<u8>) -> impl Future<Output = Result<HttpReply>> + Send;
}

/// reqwest client bound to one endpoint of the attendance API.
#[derive(Debug, Clone)]
pub struct AttendanceClient {
    http: Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl AttendanceClient {
    pub fn new(endpoint: impl Into<String>, config: &HttpConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .wrap_err("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            auth_token: config.auth_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.header(AUTH_HEADER, token),
            None => request,
        }
    }

    async fn read_reply(&self, response: Response) -> Result<HttpReply> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .wrap_err_with(|| format!("Failed to read response body from {}", self.endpoint))?;

        debug!(endpoint = %self.endpoint, status, bytes = body.len(), "Received response");
        Ok(HttpReply { status, body })
    }
}

impl StatisticsSource for AttendanceClient {
    async fn fetch_statistics(&self) -> Result<HttpReply> {
        let response = self
            .authorize(self.http.get(&self.endpoint))
            .send()
            .await
            .wrap_err_with(|| format!("GET {} failed", self.endpoint))?;

        self.read_reply(response).await
    }
}

impl FaceIdentifier for AttendanceClient {
    async fn identify(&self, jpeg: Vec<u8>) -> Result<HttpReply> {
        let part = Part::bytes(jpeg)
            .file_name(FACE_FILE_NAME)
            .mime_str(FACE_MIME)
            .wrap_err("Invalid face image MIME type")?;
        let form = Form::new().part(FACE_FIELD, part);

        let response = self
            .authorize(self.http.post(&self.endpoint))
            .multipart(form)
            .send()
            .await
            .wrap_err_with(|| format!("POST {} failed", self.endpoint))?;

        self.read_reply(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        sync::oneshot,
        time::Instant,
    };

    fn config(timeout: Duration, token: Option<&str>) -> HttpConfig {
        HttpConfig {
            request_timeout: timeout,
            auth_token: token.map(str::to_string),
        }
    }

    /// Serve one request, answer with `status` and hand back the raw request.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/attendance", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;

            let reply = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).await.unwrap();
            let _ = tx.send(request);
        });

        (url, rx)
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let headers = text[..header_end].to_ascii_lowercase();
            let body_len = buf.len() - header_end - 4;
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok());

            let complete = match content_length {
                Some(len) => body_len >= len,
                None if headers.contains("transfer-encoding: chunked") => {
                    text.ends_with("0\r\n\r\n")
                }
                None => true,
            };
            if complete {
                break;
            }
        }

        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn test_identify_sends_face_part_with_token() {
        let (url, request) = serve_once("201 Created", r#"{"student":{}}"#).await;
        let client =
            AttendanceClient::new(url, &config(Duration::from_secs(5), Some("tok"))).unwrap();

        let reply = client.identify(vec![0xFF, 0xD8, 0xFF, 0xD9]).await.unwrap();
        assert_eq!(reply, HttpReply::new(201, r#"{"student":{}}"#));

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /api/attendance "), "{request}");
        assert!(request.to_ascii_lowercase().contains("x-auth-token: tok\r\n"), "{request}");
        assert!(
            request
                .to_ascii_lowercase()
                .contains("content-type: multipart/form-data; boundary=")
        );
        assert!(
            request.contains(
                r#"Content-Disposition: form-data; name="faceImage"; filename="face.jpg""#
            ),
            "{request}"
        );
        assert!(request.contains("Content-Type: image/jpeg"), "{request}");
    }

    #[tokio::test]
    async fn test_fetch_statistics_without_token() {
        let (url, request) = serve_once("200 OK", "[]").await;
        let client = AttendanceClient::new(url, &config(Duration::from_secs(5), None)).unwrap();

        let reply = client.fetch_statistics().await.unwrap();
        assert_eq!(reply, HttpReply::new(200, "[]"));

        let request = request.await.unwrap();
        assert!(request.starts_with("GET /api/attendance "), "{request}");
        assert!(!request.to_ascii_lowercase().contains(AUTH_HEADER));
    }

    #[tokio::test]
    async fn test_error_status_is_a_reply() {
        let (url, _request) = serve_once("500 Internal Server Error", "Server error").await;
        let client = AttendanceClient::new(url, &config(Duration::from_secs(5), None)).unwrap();

        let reply = client.fetch_statistics().await.unwrap();
        assert_eq!(reply, HttpReply::new(500, "Server error"));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/attendance/stats", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            // Accept and hold the connection without answering
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let timeout = Duration::from_millis(300);
        let client = AttendanceClient::new(url, &config(timeout, None)).unwrap();

        let started = Instant::now();
        let err = client.fetch_statistics().await.unwrap_err();
        let elapsed = started.elapsed();
        server.abort();

        assert!(elapsed >= timeout, "returned after {elapsed:?}");
        assert!(elapsed < Duration::from_secs(5), "returned after {elapsed:?}");
        assert!(
            err.chain().any(|cause| cause
                .downcast_ref::<reqwest::Error>()
                .is_some_and(reqwest::Error::is_timeout)),
            "{err:#}"
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let config = config(Duration::from_secs(2), None);
        // Port 9 (discard) is not expected to accept HTTP on loopback
        let client = AttendanceClient::new("http://127.0.0.1:9/api/attendance/stats", &config)
            .unwrap();

        assert!(client.fetch_statistics().await.is_err());
        assert!(client.identify(vec![0xFF, 0xD8]).await.is_err());
    }

    #[test]
    fn test_endpoint_is_kept() {
        let client = AttendanceClient::new("http://example.invalid/mark", &HttpConfig::default())
            .unwrap();
        assert_eq!(client.endpoint(), "http://example.invalid/mark");
    }
}
