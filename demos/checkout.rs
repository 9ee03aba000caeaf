//! Mirror a Subversion web listing into a local directory.

use std::path::PathBuf;
use std::time::Duration;

use svn_web::{CheckoutClient, CheckoutOptions, Credentials};
use tracing_subscriber::EnvFilter;

fn main() -> svn_web::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("svn_web=info")),
        )
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run())
}

/// Reads an optional numeric variable; `Err` carries a message for the user.
fn parse_u64_env(name: &str) -> Result<Option<u64>, String> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| format!("invalid {name} '{raw}' (expected a non-negative integer)"))
}

async fn run() -> svn_web::Result<()> {
    let url = match std::env::var("SVN_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Set SVN_URL=https://host/svn/repo/ and SVN_USERNAME/SVN_PASSWORD.");
            eprintln!("Then set SVN_DEST=/path/to/output-dir (optional SVN_CONCURRENCY, SVN_DEADLINE_SECS).");
            eprintln!("Set SVN_LIST_ONLY=1 to print the top-level listing instead.");
            return Ok(());
        }
    };

    let username = std::env::var("SVN_USERNAME").unwrap_or_default();
    let password = std::env::var("SVN_PASSWORD").unwrap_or_default();

    let mut client = CheckoutClient::new(Credentials::new(username, password))
        .with_connect_timeout(Duration::from_secs(10))
        .with_read_timeout(Duration::from_secs(60))
        .with_transport_retries(2);
    let (concurrency, deadline_secs) = match (
        parse_u64_env("SVN_CONCURRENCY"),
        parse_u64_env("SVN_DEADLINE_SECS"),
    ) {
        (Ok(concurrency), Ok(deadline_secs)) => (concurrency, deadline_secs),
        (Err(message), _) | (_, Err(message)) => {
            eprintln!("{message}");
            return Ok(());
        }
    };
    if let Some(concurrency) = concurrency {
        client = client.with_concurrency(usize::try_from(concurrency).unwrap_or(usize::MAX));
    }

    if std::env::var_os("SVN_LIST_ONLY").is_some() {
        for entry in client.list(&url).await? {
            let kind = if entry.is_dir { "dir " } else { "file" };
            println!("{kind} {}", entry.name);
        }
        return Ok(());
    }

    let dest = match std::env::var("SVN_DEST") {
        Ok(dest) => PathBuf::from(dest),
        Err(_) => {
            eprintln!("Set SVN_DEST=/path/to/output-dir");
            return Ok(());
        }
    };

    let mut options = CheckoutOptions::new();
    if let Some(secs) = deadline_secs {
        options = options.with_deadline(Duration::from_secs(secs));
    }

    client.checkout_with_options(&url, &dest, &options).await?;
    println!("checked out {url} to {}", dest.display());
    Ok(())
}
