use std::time::Duration;

use futures_util::TryStreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, HeaderMap, LOCATION};
use reqwest::{StatusCode, Url};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::drain::drain_discard;
use crate::{AuthToken, SvnError};

/// An authenticated HTTP GET client that follows `301`/`302`/`303` redirects
/// itself, up to a fixed bound.
///
/// Obtain one from [`crate::CheckoutClient::fetcher`]. Cloning is cheap and
/// shares the underlying connection pool.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    pub(crate) client: reqwest::Client,
    pub(crate) auth: AuthToken,
    pub(crate) max_redirects: usize,
    pub(crate) transport_retries: u32,
    pub(crate) retry_backoff: Duration,
}

/// The final (non-redirect) response of an [`HttpFetcher::get`] call.
///
/// Any status is returned as-is; use [`FetchResponse::error_for_status`] to
/// turn non-success statuses into errors.
#[derive(Debug)]
pub struct FetchResponse {
    url: Url,
    redirects: usize,
    response: reqwest::Response,
}

impl HttpFetcher {
    /// Returns the configured redirect bound.
    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    /// Issues an authenticated GET for `url`, following redirects.
    ///
    /// Each redirect body is drained before the next request is sent. Fails
    /// with [`SvnError::TooManyRedirects`] once the redirect count reaches the
    /// configured bound.
    pub async fn get(&self, url: Url) -> Result<FetchResponse, SvnError> {
        let mut url = url;
        let mut response = self.send(&url).await?;
        let mut redirects = 0usize;

        while is_redirect(response.status()) {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            drain_discard(Some(body_reader(response))).await;

            redirects += 1;
            if redirects >= self.max_redirects {
                return Err(SvnError::TooManyRedirects {
                    redirects,
                    limit: self.max_redirects,
                });
            }

            let Some(location) = location else {
                return Err(SvnError::InvalidRedirect(format!(
                    "{url}: missing Location header"
                )));
            };
            let next = url
                .join(&location)
                .map_err(|err| SvnError::InvalidRedirect(format!("{url} -> {location}: {err}")))?;
            debug!(from = %url, to = %next, redirects, "following redirect");
            url = next;
            response = self.send(&url).await?;
        }

        Ok(FetchResponse {
            url,
            redirects,
            response,
        })
    }

    async fn send(&self, url: &Url) -> Result<reqwest::Response, SvnError> {
        let mut attempt = 0u32;
        loop {
            let result = self
                .client
                .get(url.clone())
                .header(AUTHORIZATION, self.auth.as_str())
                .send()
                .await
                .map_err(SvnError::from);
            match result {
                Ok(response) => {
                    debug!(%url, status = response.status().as_u16(), "GET");
                    return Ok(response);
                }
                Err(err) if attempt < self.transport_retries && err.is_transient() => {
                    let delay = retry_delay(attempt, self.retry_backoff);
                    debug!(%url, attempt, ?delay, error = %err, "transport error; retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl FetchResponse {
    /// Returns the HTTP status of the final response.
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// Returns the headers of the final response.
    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    /// Returns the URL that produced the final response.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns how many redirects were followed.
    pub fn redirects(&self) -> usize {
        self.redirects
    }

    /// Returns the declared `Content-Length`, if present and well-formed.
    pub fn content_length(&self) -> Option<u64> {
        self.headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
    }

    /// Converts a non-success status into an error, draining the body first.
    ///
    /// `401` and `403` map to [`SvnError::AuthFailed`]; every other non-2xx
    /// status maps to [`SvnError::HttpStatus`].
    pub async fn error_for_status(self) -> Result<Self, SvnError> {
        let status = self.status();
        if status.is_success() {
            return Ok(self);
        }
        let url = self.url.to_string();
        self.discard().await;
        let status = status.as_u16();
        if matches!(status, 401 | 403) {
            Err(SvnError::AuthFailed { url, status })
        } else {
            Err(SvnError::HttpStatus { url, status })
        }
    }

    /// Streams the body into `out`, returning the number of bytes written.
    pub async fn copy_to<W>(&mut self, out: &mut W) -> Result<u64, SvnError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = 0u64;
        while let Some(chunk) = self.response.chunk().await? {
            out.write_all(&chunk).await?;
            written = written.saturating_add(chunk.len() as u64);
        }
        Ok(written)
    }

    /// Returns the body as an [`AsyncRead`], for use with the drain helpers.
    pub fn into_reader(self) -> impl AsyncRead + Unpin + Send {
        body_reader(self.response)
    }

    /// Reads and discards the remaining body.
    pub async fn discard(self) {
        drain_discard(Some(self.into_reader())).await;
    }
}

fn body_reader(response: reqwest::Response) -> impl AsyncRead + Unpin + Send {
    StreamReader::new(Box::pin(
        response.bytes_stream().map_err(std::io::Error::other),
    ))
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
    )
}

/// Delay before retry number `retry_count` (0-based): `base * 2^retry_count`.
pub(crate) fn retry_delay(retry_count: u32, base: Duration) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(retry_count))
}
