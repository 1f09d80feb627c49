//! Cold, single-value stream over a client call.

use futures::stream::{self, BoxStream, StreamExt};
use serde::de::DeserializeOwned;

use crate::client::Client;
use crate::endpoint::Endpoint;
use crate::error::NetworkError;

impl Client {
    /// Wraps `request` as a stream that does nothing until first polled,
    /// then yields the decoded value or the classified error and ends.
    pub fn publisher<T, E>(&self, endpoint: E) -> BoxStream<'static, Result<T, NetworkError>>
    where
        T: DeserializeOwned + Send + 'static,
        E: Endpoint + Send + Sync + 'static,
    {
        let client = self.clone();
        stream::once(async move { client.request::<T, E>(&endpoint).await }).boxed()
    }
}
