use reqwest::Url;

use crate::SvnError;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
/// A normalized repository directory URL served over HTTP(S).
///
/// Supported schemes: `http://` and `https://`.
///
/// The stored URL always ends with exactly one `/`, so relative entry paths
/// taken from a listing can be appended verbatim.
pub struct RepoUrl {
    /// Hostname (or IP) portion of the URL.
    pub host: String,
    /// Full normalized URL string.
    pub url: String,
}

impl RepoUrl {
    /// Parses a repository URL and normalizes it to a directory URL.
    ///
    /// # Examples
    ///
    /// ```
    /// # use svn_web::RepoUrl;
    /// let url = RepoUrl::parse("https://svn.example.com/svn/project//").unwrap();
    /// assert_eq!(url.url, "https://svn.example.com/svn/project/");
    /// ```
    pub fn parse(input: &str) -> Result<Self, SvnError> {
        let input = input.trim();
        let parsed =
            Url::parse(input).map_err(|err| SvnError::InvalidUrl(format!("{input}: {err}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SvnError::InvalidUrl(
                "only http:// and https:// URLs are supported".to_string(),
            ));
        }
        let Some(host) = parsed.host_str().filter(|h| !h.is_empty()) else {
            return Err(SvnError::InvalidUrl(format!(
                "missing host in url: {input}"
            )));
        };
        if parsed.password().is_some() {
            return Err(SvnError::InvalidUrl(
                "URL passwords are not supported (pass credentials to the client)".to_string(),
            ));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(SvnError::InvalidUrl(format!(
                "url must not carry a query or fragment: {input}"
            )));
        }

        let host = host.to_string();
        let url = format!("{}/", parsed.as_str().trim_end_matches('/'));
        Ok(Self { host, url })
    }

    /// Returns the normalized URL string.
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Appends a listing-relative path (raw hrefs, already URL-encoded by the
    /// server) to this directory URL.
    pub fn join(&self, rel: &str) -> Result<Url, SvnError> {
        let joined = format!("{}{rel}", self.url);
        Url::parse(&joined).map_err(|err| SvnError::InvalidUrl(format!("{joined}: {err}")))
    }
}

impl std::fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

impl std::str::FromStr for RepoUrl {
    type Err = SvnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
