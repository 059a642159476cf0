//! HTTP transport abstraction
//!
//! Every remote read goes through [`HttpClient`] so catalog, cache and
//! provisioning logic can be exercised without a network. The production
//! implementation wraps a blocking `ureq` agent and runs it on tokio's
//! blocking pool.

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("bazelisk/", env!("CARGO_PKG_VERSION"));

/// Why a single HTTP request did not produce a body
#[derive(Error, Debug)]
pub enum FetchFailure {
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("{0}")]
    Transport(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

/// Abstract HTTP client
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET `url` and return the full body; `token` is sent as a bearer token
    async fn get(&self, url: &str, token: Option<&str>) -> Result<Vec<u8>, FetchFailure>;

    /// GET `url` and stream the body into `dest`, returning the byte count
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchFailure>;
}

/// [`HttpClient`] backed by `ureq`
#[derive(Clone)]
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    fn call(
        agent: &ureq::Agent,
        url: &str,
        token: Option<&str>,
    ) -> Result<ureq::http::Response<ureq::Body>, FetchFailure> {
        let mut request = agent.get(url).header("User-Agent", USER_AGENT);
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        match request.call() {
            Ok(response) => Ok(response),
            Err(ureq::Error::StatusCode(code)) => Err(FetchFailure::Status(code)),
            Err(e) => Err(FetchFailure::Transport(e.to_string())),
        }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for UreqClient {
    async fn get(&self, url: &str, token: Option<&str>) -> Result<Vec<u8>, FetchFailure> {
        debug!("GET {}", url);
        let agent = self.agent.clone();
        let url = url.to_string();
        let token = token.map(str::to_string);

        tokio::task::spawn_blocking(move || {
            let mut response = Self::call(&agent, &url, token.as_deref())?;
            response
                .body_mut()
                .with_config()
                .limit(u64::MAX)
                .read_to_vec()
                .map_err(|e| FetchFailure::Transport(e.to_string()))
        })
        .await
        .map_err(|e| FetchFailure::Transport(e.to_string()))?
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchFailure> {
        debug!("Downloading {} into {}", url, dest.display());
        let agent = self.agent.clone();
        let url = url.to_string();
        let dest: PathBuf = dest.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let response = Self::call(&agent, &url, None)?;
            let length = response.body().content_length();
            let reader = response.into_body().into_reader();

            let mut file = File::create(&dest).map_err(|e| FetchFailure::Io {
                context: format!("creating {}", dest.display()),
                source: e,
            })?;

            let progress = progress_bar(length);
            let copied = io::copy(&mut progress.wrap_read(reader), &mut file).map_err(|e| {
                FetchFailure::Io {
                    context: format!("writing {}", dest.display()),
                    source: e,
                }
            });
            progress.finish_and_clear();
            copied
        })
        .await
        .map_err(|e| FetchFailure::Transport(e.to_string()))?
    }
}

/// Progress bar on stderr; hidden when the length is unknown or stderr is not
/// a terminal
fn progress_bar(length: Option<u64>) -> ProgressBar {
    let Some(length) = length else {
        return ProgressBar::hidden();
    };

    let pb = ProgressBar::with_draw_target(Some(length), ProgressDrawTarget::stderr());
    if let Ok(style) =
        ProgressStyle::with_template("[{bar:60.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}


#[cfg(test)]
mod tests {
    use super::testing::FakeHttp;
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Answer one request on a local port with `body`, returning its URL
    fn serve_once(body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/releases.json", listener.local_addr().unwrap());

        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
        });

        url
    }

    #[test]
    fn failure_display() {
        assert_eq!(
            FetchFailure::Status(503).to_string(),
            "unexpected HTTP status 503"
        );
    }

    #[test]
    fn hidden_progress_without_length() {
        assert!(progress_bar(None).is_hidden());
    }

    #[tokio::test]
    async fn large_bodies_are_read_in_full() {
        let body = vec![b'x'; 11 * 1024 * 1024];
        let url = serve_once(body.clone());

        let read = UreqClient::new().get(&url, None).await.unwrap();

        assert_eq!(read.len(), body.len());
    }

    #[tokio::test]
    async fn fake_serves_routes_and_records_calls() {
        let http = FakeHttp::new()
            .route("https://example.com/a", "hello")
            .fail("https://example.com/b", 500);

        assert_eq!(
            http.get("https://example.com/a", Some("t")).await.unwrap(),
            b"hello"
        );
        assert!(matches!(
            http.get("https://example.com/b", None).await,
            Err(FetchFailure::Status(500))
        ));
        assert_eq!(http.calls().len(), 2);
        assert_eq!(http.tokens()[0].as_deref(), Some("t"));
    }
}
