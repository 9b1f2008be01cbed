//! RPC middleware running each call through a [`Recaller`].
//!
//! Uses the onion model: a middleware receives the context, the request and
//! the next step of the chain. [`recall_middleware`] binds the request id and
//! the procedure name to the context sink and runs `next` under the policy, so a failing call gets
//! its debug records recalled.
//!
//! # Example
//! ```rust,ignore
//! let policy = Recaller::new(Context::background())
//!     .with_error_filter(|err: &RpcError| !err.is_client_error());
//! let middleware = recall_middleware(policy);
//!
//! let response = middleware(ctx, request, next).await?;
//! ```

use crate::constants::{PROCEDURE_KEY, REQUEST_ID_KEY};
use crate::context::Context;
use crate::error::PanicError;
use crate::policy::Recaller;
use crate::sink::attr;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Request information passed to middleware
#[derive(Clone, Debug)]
pub struct Request {
    /// Full path of the procedure (e.g., "users.get")
    pub path: String,
    /// Input data as JSON
    pub input: Value,
    /// Request metadata (headers)
    pub metadata: HashMap<String, String>,
}

impl Request {
    /// Creates a request without metadata.
    pub fn new(path: impl Into<String>, input: Value) -> Self {
        Self {
            path: path.into(),
            input,
            metadata: HashMap::new(),
        }
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Get the procedure name (last part of path)
    pub fn procedure(&self) -> &str {
        self.path.split('.').next_back().unwrap_or(&self.path)
    }

    /// Returns the caller-supplied request id, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.metadata.get(REQUEST_ID_KEY).map(String::as_str)
    }
}

/// Response type (JSON value)
pub type Response = Value;

/// Next function in the middleware chain
pub type Next<T, E> =
    Arc<dyn Fn(Context<T>, Request) -> BoxFuture<'static, Result<Response, E>> + Send + Sync>;

/// Middleware function type
pub type MiddlewareFn<T, E> = Arc<
    dyn Fn(Context<T>, Request, Next<T, E>) -> BoxFuture<'static, Result<Response, E>>
        + Send
        + Sync,
>;

/// Create a `Next` from an async function
pub fn next_fn<T, E, F, Fut>(f: F) -> Next<T, E>
where
    T: Send + Sync + 'static,
    F: Fn(Context<T>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, E>> + Send + 'static,
{
    Arc::new(move |ctx, req| Box::pin(f(ctx, req)))
}

/// Create middleware from an async function
pub fn from_fn<T, E, F, Fut>(f: F) -> MiddlewareFn<T, E>
where
    T: Send + Sync + 'static,
    F: Fn(Context<T>, Request, Next<T, E>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, E>> + Send + 'static,
{
    Arc::new(move |ctx, req, next| Box::pin(f(ctx, req, next)))
}

/// Generates a request id for calls that arrive without one.
fn generate_request_id() -> String {
    uuid::Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)).to_string()
}

/// Creates middleware that runs `next` under `policy`.
///
/// Every setting of `policy` applies; its context is replaced per call by
/// the context flowing through the chain, with the request id bound onto the
/// sink under `x-request-id` and the procedure name under `procedure`. With the default strategy `next` may be called
/// twice for one request.
pub fn recall_middleware<T, E>(policy: Recaller<T, E>) -> MiddlewareFn<T, E>
where
    T: Send + Sync + 'static,
    E: From<PanicError> + Send + 'static,
{
    from_fn(move |ctx: Context<T>, req: Request, next: Next<T, E>| {
        let policy = policy.clone();
        async move {
            let request_id = req
                .request_id()
                .map(str::to_string)
                .unwrap_or_else(generate_request_id);
            let sink = ctx.sink().with_attrs(vec![
                attr(REQUEST_ID_KEY, request_id),
                attr(PROCEDURE_KEY, req.procedure()),
            ]);
            let policy = policy.with_context(ctx.with_sink(sink));

            policy
                .call_async(|call_ctx| next(call_ctx, req.clone()))
                .await
        }
    })
}
