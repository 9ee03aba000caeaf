use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{StreamExt, stream};
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::listing::fetch_listing;
use crate::path::{reject_symlink, validate_entry_name};
use crate::{
    AuthToken, CheckoutOptions, Credentials, HttpFetcher, ListingEntry, RepoUrl, SvnError,
};

/// `User-Agent` sent with every request unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("svn-web/", env!("CARGO_PKG_VERSION"));
/// Redirects followed by a single fetch before it fails.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;
/// Largest listing page accepted.
pub const DEFAULT_MAX_LISTING_BYTES: usize = 16 * 1024 * 1024;

/// A reusable configuration object for mirroring Subversion web listings.
///
/// The authorization value is derived from the [`Credentials`] once, at
/// construction. Each [`CheckoutClient::checkout`] call walks the remote tree
/// breadth-first and recreates it under the destination directory.
///
/// # Example
///
/// ```rust,no_run
/// # use svn_web::{CheckoutClient, Credentials};
/// # async fn demo() -> svn_web::Result<()> {
/// let client = CheckoutClient::new(Credentials::new("alice", "secret"));
/// client
///     .checkout("https://svn.example.com/svn/project/trunk/", "project")
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct CheckoutClient {
    username: String,
    auth: AuthToken,
    user_agent: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    max_redirects: usize,
    max_listing_bytes: usize,
    transport_retries: u32,
    retry_backoff: Duration,
    concurrency: usize,
}

impl CheckoutClient {
    /// Creates a client that authenticates every request with `credentials`.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            auth: AuthToken::basic(&credentials),
            username: credentials.username().to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_listing_bytes: DEFAULT_MAX_LISTING_BYTES,
            transport_retries: 0,
            retry_backoff: Duration::from_millis(500),
            concurrency: 1,
        }
    }

    /// Returns the configured username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the `User-Agent` sent with every request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Returns the configured connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the configured read timeout.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns the configured redirect bound.
    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    /// Returns the largest accepted listing page, in bytes.
    pub fn max_listing_bytes(&self) -> usize {
        self.max_listing_bytes
    }

    /// Returns the number of retries for transient transport failures.
    pub fn transport_retries(&self) -> u32 {
        self.transport_retries
    }

    /// Returns the maximum number of in-flight fetches per stage.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Sets the `User-Agent` header value.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Sets the read timeout (maximum idle time between body reads).
    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Sets the redirect bound.
    #[must_use]
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Sets the largest accepted listing page, in bytes.
    #[must_use]
    pub fn with_max_listing_bytes(mut self, max_listing_bytes: usize) -> Self {
        self.max_listing_bytes = max_listing_bytes;
        self
    }

    /// Retries connect/timeout/send failures up to `retries` times.
    ///
    /// Redirect loops and HTTP status failures are never retried.
    #[must_use]
    pub fn with_transport_retries(mut self, retries: u32) -> Self {
        self.transport_retries = retries;
        self
    }

    /// Sets the base delay for transport retries (`base * 2^attempt`).
    #[must_use]
    pub fn with_retry_backoff(mut self, base: Duration) -> Self {
        self.retry_backoff = base;
        self
    }

    /// Sets how many directory listings of one depth, and how many file
    /// downloads of one directory, may be in flight at once.
    ///
    /// `1` (the default) walks the tree strictly sequentially. Values below
    /// `1` are clamped.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Builds an [`HttpFetcher`] with this client's credentials and settings.
    pub fn fetcher(&self) -> Result<HttpFetcher, SvnError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(self.user_agent.as_str())
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout)
            .build()?;
        Ok(HttpFetcher {
            client,
            auth: self.auth.clone(),
            max_redirects: self.max_redirects,
            transport_retries: self.transport_retries,
            retry_backoff: self.retry_backoff,
        })
    }

    /// Fetches and parses the listing of one remote directory.
    pub async fn list(&self, url: &str) -> Result<Vec<ListingEntry>, SvnError> {
        let root = RepoUrl::parse(url)?;
        let fetcher = self.fetcher()?;
        fetch_listing(&fetcher, root.join("")?, self.max_listing_bytes).await
    }

    /// Recursively mirrors the directory at `url` into `dest`.
    ///
    /// Directories (including empty ones) are created, files are overwritten,
    /// and local files absent remotely are left alone. On error, whatever was
    /// already written stays in place.
    pub async fn checkout(&self, url: &str, dest: impl AsRef<Path>) -> Result<(), SvnError> {
        self.checkout_with_options(url, dest, &CheckoutOptions::default())
            .await
    }

    /// Like [`CheckoutClient::checkout`], with a cancellation token and/or deadline.
    ///
    /// Cancellation is observed between network reads. A file write or
    /// rename that has already started runs to completion, and the temporary
    /// file of an interrupted download is removed before this returns. Files
    /// already renamed into place are kept.
    ///
    /// Dropping the returned future instead of cancelling can leave a
    /// `.svn-web.*.tmp` file behind.
    pub async fn checkout_with_options(
        &self,
        url: &str,
        dest: impl AsRef<Path>,
        options: &CheckoutOptions,
    ) -> Result<(), SvnError> {
        let root = RepoUrl::parse(url)?;
        let checkout = Checkout {
            fetcher: self.fetcher()?,
            root,
            dest: dest.as_ref().to_path_buf(),
            max_listing_bytes: self.max_listing_bytes,
            concurrency: self.concurrency,
            cancel: options
                .cancel
                .as_ref()
                .map(CancellationToken::child_token)
                .unwrap_or_default(),
            deadline: options
                .deadline
                .and_then(|deadline| Instant::now().checked_add(deadline)),
            dirs: AtomicU64::new(0),
            files: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            next_tmp_id: AtomicU64::new(0),
        };
        checkout.run().await
    }
}

/// A remote directory still to be listed, and its local counterpart.
#[derive(Debug)]
struct PendingDir {
    /// Raw relative URL path; empty for the root, otherwise ends with `/`.
    rel: String,
    local: PathBuf,
}

/// State of one checkout run.
struct Checkout {
    fetcher: HttpFetcher,
    root: RepoUrl,
    dest: PathBuf,
    max_listing_bytes: usize,
    concurrency: usize,
    /// Fired by the caller, or by the first failing task so its siblings wind down.
    cancel: CancellationToken,
    deadline: Option<Instant>,
    dirs: AtomicU64,
    files: AtomicU64,
    bytes: AtomicU64,
    next_tmp_id: AtomicU64,
}

impl Checkout {
    async fn run(&self) -> Result<(), SvnError> {
        let mut queue = VecDeque::from([PendingDir {
            rel: String::new(),
            local: self.dest.clone(),
        }]);
        let mut seen = HashSet::from([String::new()]);

        // Drain one depth at a time: every directory of a depth is mirrored
        // before any of its subdirectories is listed.
        while !queue.is_empty() {
            let depth: Vec<PendingDir> = queue.drain(..).collect();
            let results: Vec<Result<Vec<PendingDir>, SvnError>> = stream::iter(depth)
                .map(|dir| async move {
                    self.mirror_dir(dir)
                        .await
                        .inspect_err(|_| self.cancel.cancel())
                })
                .buffered(self.concurrency)
                .collect()
                .await;
            let children = first_error(results)?;

            for dir in children.into_iter().flatten() {
                if seen.insert(dir.rel.clone()) {
                    queue.push_back(dir);
                } else {
                    debug!(rel = %dir.rel, "directory already queued; skipping");
                }
            }
        }

        info!(
            url = %self.root,
            dest = %self.dest.display(),
            dirs = self.dirs.load(Ordering::Relaxed),
            files = self.files.load(Ordering::Relaxed),
            bytes = self.bytes.load(Ordering::Relaxed),
            "checkout complete"
        );
        Ok(())
    }

    /// Runs `fut` unless the checkout is cancelled or past its deadline first.
    ///
    /// Only network steps go through here; filesystem steps always finish.
    async fn interruptible<T>(
        &self,
        fut: impl Future<Output = Result<T, SvnError>>,
    ) -> Result<T, SvnError> {
        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SvnError::Cancelled),
            _ = deadline => Err(SvnError::Cancelled),
            result = fut => result,
        }
    }

    /// Lists `dir`, creates it locally, downloads its files, and returns its
    /// subdirectories in listing order.
    async fn mirror_dir(&self, dir: PendingDir) -> Result<Vec<PendingDir>, SvnError> {
        let url = self.root.join(&dir.rel)?;
        let entries = self
            .interruptible(fetch_listing(&self.fetcher, url, self.max_listing_bytes))
            .await?;

        reject_symlink(&dir.local).await?;
        tokio::fs::create_dir_all(&dir.local).await?;
        self.dirs.fetch_add(1, Ordering::Relaxed);
        debug!(path = %dir.local.display(), "mkdir");

        let mut names = HashSet::new();
        let mut subdirs = Vec::new();
        let mut files = Vec::new();
        for entry in entries {
            let name = validate_entry_name(&entry.name)?;
            if !names.insert(name.clone()) {
                return Err(SvnError::InvalidPath(format!(
                    "entries map to the same local name {name:?} in {}",
                    dir.local.display()
                )));
            }
            let child = PendingDir {
                rel: format!("{}{}", dir.rel, entry.name),
                local: dir.local.join(name),
            };
            if entry.is_dir {
                subdirs.push(child);
            } else {
                files.push(child);
            }
        }

        let results: Vec<Result<(), SvnError>> = stream::iter(files)
            .map(|file| async move {
                self.download(file)
                    .await
                    .inspect_err(|_| self.cancel.cancel())
            })
            .buffered(self.concurrency)
            .collect()
            .await;
        first_error(results)?;

        Ok(subdirs)
    }

    async fn download(&self, file: PendingDir) -> Result<(), SvnError> {
        let url = self.root.join(&file.rel)?;
        reject_symlink(&file.local).await?;
        let response = self.interruptible(self.fetcher.get(url)).await?;
        let mut response = self.interruptible(response.error_for_status()).await?;

        let tmp = self.new_tmp_path(&file.local);
        let result = async {
            let mut out = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&tmp)
                .await?;
            let copied = self.interruptible(response.copy_to(&mut out)).await;
            // Flushing also waits for a write still in flight on the blocking pool.
            let flushed = out.flush().await;
            drop(out);
            let written = copied?;
            flushed?;
            tokio::fs::rename(&tmp, &file.local).await?;
            Ok::<_, SvnError>(written)
        }
        .await;

        let written = match result {
            Ok(written) => written,
            Err(err) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(err);
            }
        };

        self.files.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(written, Ordering::Relaxed);
        debug!(
            path = %file.local.display(),
            url = %response.url(),
            bytes = written,
            "download"
        );
        Ok(())
    }

    fn new_tmp_path(&self, dest: &Path) -> PathBuf {
        let parent = dest.parent().unwrap_or(self.dest.as_path());
        let mut name = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());

        name.retain(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if name.is_empty() {
            name = "file".to_string();
        }

        let id = self.next_tmp_id.fetch_add(1, Ordering::Relaxed);
        parent.join(format!(".svn-web.{name}.{}.{id}.tmp", std::process::id()))
    }
}

/// Collects the results of one stage. A real failure wins over the
/// `Cancelled` results it caused in sibling tasks.
fn first_error<T>(results: Vec<Result<T, SvnError>>) -> Result<Vec<T>, SvnError> {
    let mut values = Vec::with_capacity(results.len());
    let mut cancelled = false;
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(SvnError::Cancelled) => cancelled = true,
            Err(err) => return Err(err),
        }
    }
    if cancelled {
        return Err(SvnError::Cancelled);
    }
    Ok(values)
}
