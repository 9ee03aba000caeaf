//! Mirror a Subversion repository exposed only through its HTTP(S) web
//! listing onto the local filesystem.
//!
//! This crate reads the browsable HTML directory pages a Subversion web
//! front-end serves, recreates the directory tree under a local path, and
//! downloads every file. It does **not** speak the WebDAV/DeltaV protocol and
//! does not produce a working copy; every run is a full overwrite.
//!
//! Most users should start with [`CheckoutClient`].
//!
//! ## Getting started
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use svn_web::{CheckoutClient, Credentials};
//!
//! fn main() -> svn_web::Result<()> {
//!     let rt = tokio::runtime::Builder::new_current_thread()
//!         .enable_all()
//!         .build()?;
//!
//!     rt.block_on(async {
//!         let client = CheckoutClient::new(Credentials::new("alice", "secret"))
//!             .with_read_timeout(Duration::from_secs(30));
//!         client
//!             .checkout("https://svn.example.com/svn/project/trunk/", "project")
//!             .await
//!     })
//! }
//! ```
//!
//! ## Features
//!
//! - `serde`: enables `Serialize`/`Deserialize` for public data types.
//!
//! ## Listing format
//!
//! Only listings made of `<li><a href="NAME">` items are understood; see
//! [`parse_listing`]. Directory entries end with `/`.

#![deny(unsafe_code)]

mod auth;
mod checkout;
mod drain;
mod error;
mod fetch;
mod listing;
mod options;
mod path;
mod types;
mod url;

pub use auth::{AuthToken, Credentials};
pub use checkout::{
    CheckoutClient, DEFAULT_MAX_LISTING_BYTES, DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT,
};
pub use drain::{drain_capped, drain_discard, drain_sized};
pub use error::SvnError;
pub use fetch::{FetchResponse, HttpFetcher};
pub use listing::parse_listing;
/// Convenience alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, SvnError>;
pub use options::CheckoutOptions;
pub use types::ListingEntry;
pub use url::RepoUrl;
