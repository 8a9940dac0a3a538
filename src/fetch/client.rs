use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport seam for every GBFS request, so wrappers and test fixtures can
/// stand in for a real client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for &C {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        (**self).execute(req).await
    }
}
