use base64::Engine;

/// A username/password pair supplied once when building a
/// [`crate::CheckoutClient`].
///
/// The `Debug` output never includes the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials. Empty values are accepted; the server decides.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the username.
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A precomputed `Authorization` header value (`Basic <base64(user:pass)>`).
///
/// Built once per client and never recomputed.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Encodes `credentials` as an HTTP Basic authorization value.
    pub fn basic(credentials: &Credentials) -> Self {
        let raw = format!("{}:{}", credentials.username, credentials.password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(raw.as_bytes());
        Self(format!("Basic {encoded}"))
    }

    /// Returns the header value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Credentials> for AuthToken {
    fn from(credentials: &Credentials) -> Self {
        Self::basic(credentials)
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}
