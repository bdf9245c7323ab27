use async_trait::async_trait;

use crate::request::IncomingRequest;
use crate::response::FunctionResponse;

/// A deployable function: one request in, one response out.
///
/// Implementations hold their dependencies (config, clients) and keep no
/// per-request state between invocations.
#[async_trait]
pub trait Function: Send + Sync {
    /// Routing name, e.g. "upload_media".
    fn name(&self) -> &str;

    /// Handle one invocation. Failures are already folded into the response.
    async fn handle(&self, request: IncomingRequest) -> FunctionResponse;
}
