use anyhow::Result;
use async_trait::async_trait;

/// Performs one outbound submission of an opaque payload.
///
/// Implementations return the normalized result string: `"Status: <code>\n<body>"`
/// on a received response or `"Error: <message>"` on failure. An `Err` is also
/// tolerated; callers convert it into the `"Error:"` form.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn send(&self, payload: &str) -> Result<String>;
}

/// Local notification surface.
///
/// `ongoing` notices are non-dismissable and are overwritten in place when the
/// same `id` is reused. Delivery is best-effort: callers ignore the error.
pub trait Notifier: Send + Sync {
    fn notify(&self, id: u32, title: &str, body: &str, ongoing: bool) -> Result<()>;
}
