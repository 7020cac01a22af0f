//! The batch pipeline and single-item operations.

use std::path::Path;
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use patchbay_catalog::CatalogItem;
use patchbay_fetch::{Fetcher, HttpClient};
use patchbay_manifest::UpdateDescriptor;

use crate::error::{Result, UpdateError, render_chain};
use crate::report::{BatchOptions, BatchReport, FailedUpdate};

/// Runs update pipelines against the local content tree.
///
/// One value serves any number of concurrent callers; batch calls each
/// get their own worker pool, while single-item operations share one
/// process-wide lock.
pub struct Updater<C: HttpClient> {
    fetcher: Arc<Fetcher<C>>,
    options: BatchOptions,
    item_lock: tokio::sync::Mutex<()>,
}

impl<C: HttpClient + 'static> Updater<C> {
    pub fn new(fetcher: Fetcher<C>, options: BatchOptions) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            options,
            item_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Fetch and install every descriptor, at most
    /// [`BatchOptions::concurrency`] pipelines at a time.
    ///
    /// Individual failures never abort the batch; they are recorded and
    /// the rest keeps going. The call returns once every worker has
    /// finished. An empty input returns an empty successful report
    /// without spawning anything.
    pub async fn apply(
        &self,
        items: Vec<UpdateDescriptor>,
        cancel: &CancellationToken,
    ) -> BatchReport {
        if items.is_empty() {
            return BatchReport::default();
        }

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency));
        let report = Arc::new(Mutex::new(BatchReport::default()));
        let mut workers = FuturesUnordered::new();

        for item in items {
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);
            let report = Arc::clone(&report);
            let cancel = cancel.clone();

            workers.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };

                let outcome = apply_one(&fetcher, &item, &cancel).await;

                // The only state shared between workers; held for the
                // append, never across I/O.
                let mut report = report.lock().unwrap_or_else(|e| e.into_inner());
                match outcome {
                    Ok(()) => report.updated.push(item.relative_path),
                    Err(err) => {
                        if err.is_permission_denied() {
                            report.permission_denied = true;
                        }
                        report.failed.push(FailedUpdate {
                            path: item.relative_path,
                            error: render_chain(&err),
                        });
                    }
                }
            }));
        }

        while let Some(joined) = workers.next().await {
            if let Err(err) = joined {
                error!(error = %err, "update worker panicked");
            }
        }

        match Arc::try_unwrap(report) {
            Ok(report) => report.into_inner().unwrap_or_else(|e| e.into_inner()),
            Err(report) => report.lock().unwrap_or_else(|e| e.into_inner()).clone(),
        }
    }

    /// Install one catalog item under its configured file name.
    ///
    /// Single-item operations are fully serialized: at most one catalog
    /// file mutation runs at any instant, regardless of target.
    ///
    /// Returns the number of bytes written.
    pub async fn install_item(
        &self,
        item: &CatalogItem,
        target_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let _guard = self.item_lock.lock().await;

        info!(name = %item.name, dir = %target_dir.display(), "installing item");
        let bytes = self.fetcher.fetch(&item.file_url, None, cancel).await?;
        let written = patchbay_fs::install_bytes(target_dir, &item.target_file, &bytes)?;
        info!(name = %item.name, bytes = written, "item installed");
        Ok(written)
    }

    /// Remove an installed catalog item. An already-absent target is
    /// success. Shares the single-item lock with [`Self::install_item`].
    pub async fn uninstall_item(&self, item: &CatalogItem, target_dir: &Path) -> Result<()> {
        let _guard = self.item_lock.lock().await;

        let path = target_dir.join(&item.target_file);
        if patchbay_fs::remove_existing(&path)? {
            info!(path = %path.display(), "item removed");
        } else {
            info!(path = %path.display(), "item already absent, nothing to remove");
        }
        Ok(())
    }
}

/// One worker's pipeline: fetch from the descriptor's mirrors, install
/// atomically at its target path.
async fn apply_one<C: HttpClient>(
    fetcher: &Fetcher<C>,
    item: &UpdateDescriptor,
    cancel: &CancellationToken,
) -> Result<()> {
    info!(path = %item.relative_path, "updating file");

    let bytes = fetcher
        .fetch(&item.url, Some(&item.backup_url), cancel)
        .await?;

    let file_name = item
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| UpdateError::BadTarget(item.path.clone()))?;
    let target_dir = item
        .path
        .parent()
        .ok_or_else(|| UpdateError::BadTarget(item.path.clone()))?;

    patchbay_fs::install_bytes(target_dir, file_name, &bytes)?;
    info!(path = %item.relative_path, "updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use bytes::Bytes;
    use tempfile::tempdir;

    use patchbay_fetch::RetryPolicy;

    #[derive(Debug)]
    struct MockError(&'static str);

    impl std::fmt::Display for MockError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for MockError {}

    /// Canned client: each URL either yields fixed bytes or fails.
    /// Tracks how many requests are in flight at once; the counters are
    /// shared handles so tests keep them after the client moves into a
    /// fetcher.
    struct MockHttpClient {
        responses: HashMap<String, Option<Bytes>>,
        delay: Duration,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    impl MockHttpClient {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                delay: Duration::ZERO,
                in_flight: Arc::new(AtomicUsize::new(0)),
                max_in_flight: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn ok(mut self, url: &str, body: &'static [u8]) -> Self {
            self.responses
                .insert(url.to_string(), Some(Bytes::from_static(body)));
            self
        }

        fn failing(mut self, url: &str) -> Self {
            self.responses.insert(url.to_string(), None);
            self
        }
    }

    impl HttpClient for MockHttpClient {
        type Error = MockError;

        async fn get_bytes(&self, url: &str) -> std::result::Result<Bytes, Self::Error> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.responses.get(url) {
                Some(Some(bytes)) => Ok(bytes.clone()),
                Some(None) => Err(MockError("scripted failure")),
                None => Err(MockError("unexpected request")),
            }
        }
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    fn updater(client: MockHttpClient, concurrency: usize) -> Updater<MockHttpClient> {
        Updater::new(
            Fetcher::new(client, quick_policy()),
            BatchOptions { concurrency },
        )
    }

    fn descriptor(base: &Path, relative: &str, url: &str) -> UpdateDescriptor {
        UpdateDescriptor {
            name: relative.to_string(),
            relative_path: relative.to_string(),
            path: base.join(relative),
            size_expected: 0,
            url: url.to_string(),
            backup_url: "0".to_string(),
        }
    }

    fn item(slug: &str, url: &str, target_file: &str) -> CatalogItem {
        CatalogItem {
            name: slug.to_string(),
            slug: slug.to_string(),
            category: "graphics".to_string(),
            file_url: url.to_string(),
            image_url: String::new(),
            target_file: target_file.to_string(),
        }
    }

    #[tokio::test]
    async fn empty_batch_is_an_immediate_success() {
        let updater = updater(MockHttpClient::new(), 4);

        let report = updater.apply(Vec::new(), &CancellationToken::new()).await;

        assert!(report.updated.is_empty());
        assert!(report.failed.is_empty());
        assert!(!report.permission_denied);
    }

    #[tokio::test]
    async fn every_descriptor_lands_in_exactly_one_bucket() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::new()
            .ok("http://x/a", b"aaa")
            .ok("http://x/b", b"bbbb")
            .failing("http://x/c");
        let updater = updater(client, 4);

        let items = vec![
            descriptor(dir.path(), "data/a.bin", "http://x/a"),
            descriptor(dir.path(), "data/b.bin", "http://x/b"),
            descriptor(dir.path(), "data/c.bin", "http://x/c"),
        ];

        let report = updater.apply(items, &CancellationToken::new()).await;

        let mut updated = report.updated.clone();
        updated.sort();
        assert_eq!(updated, ["data/a.bin", "data/b.bin"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, "data/c.bin");
        assert!(!report.permission_denied);

        assert_eq!(
            std::fs::read(dir.path().join("data").join("a.bin")).unwrap(),
            b"aaa"
        );
        assert_eq!(
            std::fs::read(dir.path().join("data").join("b.bin")).unwrap(),
            b"bbbb"
        );
        assert!(!dir.path().join("data").join("c.bin").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn worker_pool_respects_the_configured_width() {
        let dir = tempdir().unwrap();
        let mut client = MockHttpClient::new().with_delay(Duration::from_millis(10));
        let mut items = Vec::new();
        for i in 0..8 {
            let url = format!("http://x/{i}");
            client = client.ok(&url, b"data");
            items.push(descriptor(dir.path(), &format!("data/{i}.bin"), &url));
        }
        let max_in_flight = Arc::clone(&client.max_in_flight);
        let updater = updater(client, 2);

        let report = updater.apply(items, &CancellationToken::new()).await;

        assert_eq!(report.updated.len(), 8);
        let max = max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 2, "observed {max} concurrent downloads");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn permission_failure_raises_the_batch_flag() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        let client = MockHttpClient::new().ok("http://x/a", b"aaa");
        let updater = updater(client, 4);
        let items = vec![descriptor(dir.path(), "locked/a.bin", "http://x/a")];

        let report = updater.apply(items, &CancellationToken::new()).await;

        assert!(report.updated.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert!(report.permission_denied);

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[tokio::test]
    async fn cancelled_batch_records_every_descriptor_as_failed() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::new().ok("http://x/a", b"aaa");
        let updater = updater(client, 4);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let items = vec![
            descriptor(dir.path(), "data/a.bin", "http://x/a"),
            descriptor(dir.path(), "data/b.bin", "http://x/b"),
        ];

        let report = updater.apply(items, &cancel).await;

        assert!(report.updated.is_empty());
        assert_eq!(report.failed.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn single_item_operations_never_interleave() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::new()
            .with_delay(Duration::from_millis(10))
            .ok("http://x/one", b"one")
            .ok("http://x/two", b"two");
        let max_in_flight = Arc::clone(&client.max_in_flight);
        let updater = updater(client, 4);
        let cancel = CancellationToken::new();

        let first = item("one", "http://x/one", "shared.pak");
        let second = item("two", "http://x/two", "shared.pak");

        let (a, b) = tokio::join!(
            updater.install_item(&first, dir.path(), &cancel),
            updater.install_item(&second, dir.path(), &cancel),
        );
        a.unwrap();
        b.unwrap();

        let max = max_in_flight.load(Ordering::SeqCst);
        assert_eq!(max, 1, "item installs overlapped");

        let content = std::fs::read(dir.path().join("shared.pak")).unwrap();
        assert!(content == b"one" || content == b"two");
    }

    #[tokio::test]
    async fn install_item_reports_bytes_written() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::new().ok("http://x/pak", b"payload");
        let updater = updater(client, 4);

        let written = updater
            .install_item(
                &item("thing", "http://x/pak", "thing.pak"),
                dir.path(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(written, 7);
        assert_eq!(std::fs::read(dir.path().join("thing.pak")).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn uninstall_is_idempotent() {
        let dir = tempdir().unwrap();
        let updater = updater(MockHttpClient::new(), 4);
        let item = item("thing", "http://x/pak", "thing.pak");

        // Absent target: success, no mutation.
        updater.uninstall_item(&item, dir.path()).await.unwrap();

        std::fs::write(dir.path().join("thing.pak"), b"x").unwrap();
        updater.uninstall_item(&item, dir.path()).await.unwrap();
        assert!(!dir.path().join("thing.pak").exists());

        updater.uninstall_item(&item, dir.path()).await.unwrap();
    }

    #[tokio::test]
    async fn descriptor_without_a_file_name_fails_cleanly() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::new().ok("http://x/a", b"aaa");
        let updater = updater(client, 4);

        let mut bad = descriptor(dir.path(), "data/a.bin", "http://x/a");
        bad.path = PathBuf::from("/");
        bad.relative_path = String::new();

        let report = updater.apply(vec![bad], &CancellationToken::new()).await;

        assert_eq!(report.failed.len(), 1);
        assert!(!report.permission_denied);
    }
}
