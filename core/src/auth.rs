//! Credential header injection.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;
use crate::http::HttpRequest;
use crate::plugin::Plugin;

/// Supplies an authentication token for each request.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Option<String>;
}

#[async_trait]
impl<P: TokenProvider + ?Sized> TokenProvider for Arc<P> {
    async fn token(&self) -> Option<String> {
        (**self).token().await
    }
}

/// Adds `<header_field>: <prefix> <token>` to every request.
///
/// Defaults to `Authorization: Bearer <token>`. A missing or empty token
/// leaves the request untouched. An empty prefix sends the bare token.
/// Refreshing on 401 is left to another plugin.
pub struct AuthPlugin {
    provider: Arc<dyn TokenProvider>,
    header_field: String,
    prefix: String,
}

impl AuthPlugin {
    pub fn new(provider: impl TokenProvider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
            header_field: "Authorization".to_string(),
            prefix: "Bearer".to_string(),
        }
    }

    pub fn header_field(mut self, field: impl Into<String>) -> Self {
        self.header_field = field.into();
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

#[async_trait]
impl Plugin for AuthPlugin {
    async fn prepare(&self, request: &mut HttpRequest) -> Result<(), BoxError> {
        let Some(token) = self.provider.token().await.filter(|t| !t.is_empty()) else {
            return Ok(());
        };
        let value = if self.prefix.is_empty() {
            token
        } else {
            format!("{} {token}", self.prefix)
        };
        request.headers.set(self.header_field.as_str(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::http::HttpMethod;

    struct Fixed(Option<&'static str>);

    #[async_trait]
    impl TokenProvider for Fixed {
        async fn token(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn request() -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, Url::parse("https://example.com/me").unwrap())
    }

    #[tokio::test]
    async fn sets_bearer_header_by_default() {
        let mut req = request();
        AuthPlugin::new(Fixed(Some("abc123")))
            .prepare(&mut req)
            .await
            .unwrap();
        assert_eq!(req.headers.get("Authorization"), Some("Bearer abc123"));
    }

    #[tokio::test]
    async fn custom_field_and_prefix() {
        let mut req = request();
        AuthPlugin::new(Fixed(Some("k")))
            .header_field("X-Api-Key")
            .prefix("")
            .prepare(&mut req)
            .await
            .unwrap();
        assert_eq!(req.headers.get("X-Api-Key"), Some("k"));
        assert!(!req.headers.contains("Authorization"));
    }

    #[tokio::test]
    async fn missing_or_empty_token_leaves_request_untouched() {
        for token in [None, Some("")] {
            let mut req = request();
            AuthPlugin::new(Fixed(token)).prepare(&mut req).await.unwrap();
            assert_eq!(req, request());
        }
    }
}
