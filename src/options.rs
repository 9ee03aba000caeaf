//! Builder-style option types for a single checkout call.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, Default)]
/// Options for [`crate::CheckoutClient::checkout_with_options`].
pub struct CheckoutOptions {
    /// Token that aborts the checkout when cancelled.
    pub cancel: Option<CancellationToken>,
    /// Upper bound on the total runtime of the checkout.
    pub deadline: Option<Duration>,
}

impl CheckoutOptions {
    /// Creates options with no cancellation token and no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Aborts the checkout with [`crate::SvnError::Cancelled`] once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Aborts the checkout with [`crate::SvnError::Cancelled`] after `deadline`.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}
