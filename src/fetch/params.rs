use std::collections::BTreeMap;

use crate::fetch::client::HttpClient;
use async_trait::async_trait;

/// An [`HttpClient`] wrapper that appends a feed's configured query pairs to
/// every request, including the `gbfs.json` manifest.
///
/// Some providers gate their feeds behind a key passed this way
/// (e.g. `?key=...`). With no pairs configured the request is passed through
/// untouched.
pub struct QueryParams<C> {
    pub inner: C,
    pub pairs: Vec<(String, String)>,
}

impl<C> QueryParams<C> {
    pub fn new(inner: C, params: &BTreeMap<String, String>) -> Self {
        Self {
            inner,
            pairs: params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for QueryParams<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        if !self.pairs.is_empty() {
            let mut query = req.url_mut().query_pairs_mut();
            for (name, value) in &self.pairs {
                query.append_pair(name, value);
            }
        }
        self.inner.execute(req).await
    }
}
