use async_trait::async_trait;
use courier_core::TokenProvider;

/// A `TokenProvider` that returns a fixed token.
#[derive(Debug, Clone, Default)]
pub struct MockTokenProvider {
    value: Option<String>,
}

impl MockTokenProvider {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            value: token.map(str::to_string),
        }
    }
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn token(&self) -> Option<String> {
        self.value.clone()
    }
}
