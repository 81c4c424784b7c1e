//! Bearer-token authentication for the directory.

use reqwest::RequestBuilder;

/// Static bearer token attached to every request.
///
/// The [`Debug`] impl redacts the token to keep it out of log output.
#[derive(Clone)]
pub struct ScimAuth {
    token: String,
}

impl ScimAuth {
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Add the `Authorization` header to a request.
    #[must_use]
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.token)
    }
}

impl std::fmt::Debug for ScimAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bearer")
            .field("token", &"[REDACTED]")
            .finish()
    }
}
