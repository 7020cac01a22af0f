//! I/O: the HTTP client seam and the retrying fetcher built on it.

use std::future::Future;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::mirror_urls;
use crate::data::{RetryPolicy, Timeouts};
use crate::error::{FetchError, Result};

/// Minimal HTTP surface the fetcher needs.
///
/// Implementations handle redirects and timeouts themselves and must
/// report a non-success status as an error rather than handing back the
/// error page body.
pub trait HttpClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Issue a GET and return the complete response body.
    fn get_bytes(
        &self,
        url: &str,
    ) -> impl Future<Output = std::result::Result<Bytes, Self::Error>> + Send;
}

/// Production client backed by reqwest.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(timeouts: Timeouts) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.request)
            .build()
            .map_err(|e| FetchError::Client(Box::new(e)))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    type Error = reqwest::Error;

    async fn get_bytes(&self, url: &str) -> std::result::Result<Bytes, Self::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        response.bytes().await
    }
}

/// Downloads a payload from a primary/backup mirror pair, giving each
/// mirror a bounded number of tries.
pub struct Fetcher<C: HttpClient> {
    client: C,
    policy: RetryPolicy,
}

impl<C: HttpClient> Fetcher<C> {
    pub fn new(client: C, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Fetch the full payload, walking the mirror list in order.
    ///
    /// Each mirror gets [`RetryPolicy::attempts`] tries with the
    /// policy's backoff between them; a transport error, non-success
    /// status, or truncated body all advance to the next try. The first
    /// complete body wins. When everything is exhausted the error
    /// carries the total attempt count and the last underlying failure.
    ///
    /// Cancellation interrupts both the backoff sleeps and the in-flight
    /// request; a fired token returns [`FetchError::Cancelled`] promptly
    /// instead of waiting out the configured timeouts.
    pub async fn fetch(
        &self,
        primary: &str,
        backup: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        let mut attempts = 0u32;
        let mut last: Option<FetchError> = None;

        for url in mirror_urls(primary, backup) {
            match self.fetch_one(url, cancel, &mut attempts).await {
                Ok(bytes) => return Ok(bytes),
                Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
                Err(err) => {
                    warn!(url, error = %err, "mirror exhausted, trying next");
                    last = Some(err);
                }
            }
        }

        // The mirror list always holds at least the primary, so a fall
        // through the loop recorded an error.
        match last {
            Some(err) => Err(FetchError::Exhausted {
                attempts,
                last: Box::new(err),
            }),
            None => Err(FetchError::Cancelled),
        }
    }

    async fn fetch_one(
        &self,
        url: &str,
        cancel: &CancellationToken,
        attempts: &mut u32,
    ) -> Result<Bytes> {
        let mut last: Option<FetchError> = None;

        for attempt in 0..self.policy.attempts() {
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            *attempts += 1;
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                outcome = self.client.get_bytes(url) => outcome,
            };
            match outcome {
                Ok(bytes) => {
                    debug!(url, bytes = bytes.len(), attempt, "download complete");
                    return Ok(bytes);
                }
                Err(err) => {
                    debug!(url, attempt, error = %err, "attempt failed");
                    last = Some(FetchError::Http(Box::new(err)));
                }
            }
        }

        match last {
            Some(err) => Err(err),
            None => Err(FetchError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    struct MockError(&'static str);

    impl std::fmt::Display for MockError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for MockError {}

    /// Scripted client: pops one canned outcome per call and URL.
    struct MockHttpClient {
        responses: Mutex<HashMap<String, Vec<std::result::Result<Bytes, MockError>>>>,
        calls: AtomicU32,
        hang: bool,
    }

    impl MockHttpClient {
        fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                calls: AtomicU32::new(0),
                hang: false,
            }
        }

        fn hanging() -> Self {
            Self {
                hang: true,
                ..Self::new()
            }
        }

        fn script(
            self,
            url: &str,
            outcomes: Vec<std::result::Result<Bytes, MockError>>,
        ) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), outcomes);
            self
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl HttpClient for MockHttpClient {
        type Error = MockError;

        async fn get_bytes(&self, url: &str) -> std::result::Result<Bytes, Self::Error> {
            if self.hang {
                return std::future::pending().await;
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(url) {
                Some(outcomes) if !outcomes.is_empty() => outcomes.remove(0),
                _ => Err(MockError("unexpected request")),
            }
        }
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn falls_back_to_backup_mirror() {
        let client = MockHttpClient::new()
            .script("http://x/a.bin", vec![Err(MockError("refused"))])
            .script("http://y/a.bin", vec![Ok(Bytes::from_static(b"backup"))]);
        let fetcher = Fetcher::new(client, quick_policy());

        let bytes = fetcher
            .fetch("http://x/a.bin", Some("http://y/a.bin"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(bytes, Bytes::from_static(b"backup"));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_the_same_mirror_before_giving_up() {
        let client = MockHttpClient::new().script(
            "http://x/a.bin",
            vec![
                Err(MockError("timeout")),
                Err(MockError("timeout")),
                Ok(Bytes::from_static(b"third time lucky")),
            ],
        );
        let fetcher = Fetcher::new(client, RetryPolicy::default());

        let bytes = fetcher
            .fetch("http://x/a.bin", None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(bytes, Bytes::from_static(b"third time lucky"));
        assert_eq!(fetcher.client.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_counts_every_attempt() {
        let client = MockHttpClient::new()
            .script(
                "http://x/a.bin",
                vec![
                    Err(MockError("down")),
                    Err(MockError("down")),
                    Err(MockError("down")),
                ],
            )
            .script(
                "http://y/a.bin",
                vec![
                    Err(MockError("down")),
                    Err(MockError("down")),
                    Err(MockError("also down")),
                ],
            );
        let fetcher = Fetcher::new(client, RetryPolicy::default());

        let err = fetcher
            .fetch("http://x/a.bin", Some("http://y/a.bin"), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            FetchError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 6);
                assert!(matches!(*last, FetchError::Http(_)));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_an_inflight_request() {
        let fetcher = Fetcher::new(MockHttpClient::hanging(), RetryPolicy::default());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = fetcher
            .fetch("http://x/a.bin", None, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_before_the_first_attempt() {
        let client = MockHttpClient::new()
            .script("http://x/a.bin", vec![Ok(Bytes::from_static(b"unused"))]);
        let fetcher = Fetcher::new(client, RetryPolicy::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fetcher
            .fetch("http://x/a.bin", None, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Cancelled));
        assert_eq!(fetcher.client.calls(), 0);
    }
}
