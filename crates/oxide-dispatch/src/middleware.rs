//! Middleware support for request/response processing.
//!
//! Routes and groups refer to middleware by alias. The alias is the
//! middleware's identity: a group that lists `"auth"` and a nested route that
//! lists `"auth"` again run it once.

use futures::future::BoxFuture;
use tracing::info;

use crate::request::Request;
use crate::response::Response;

/// Result of middleware processing.
pub enum MiddlewareResult {
    /// Continue to the next middleware/handler.
    Continue(Request),
    /// Stop processing and return this response.
    Response(Response),
}

/// Trait for middleware that processes requests and responses.
///
/// Middleware can:
/// - Modify the request before it reaches the handler
/// - Short-circuit processing and return a response
/// - Modify the response after the handler runs
///
/// # Example
///
/// ```ignore
/// struct RequireJson;
///
/// impl Middleware for RequireJson {
///     fn before<'a>(&'a self, req: Request) -> BoxFuture<'a, MiddlewareResult> {
///         Box::pin(async move {
///             if req.get_header("Content-Type") == Some("application/json") {
///                 MiddlewareResult::Continue(req)
///             } else {
///                 MiddlewareResult::Response(Response::new(415))
///             }
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync {
    /// Called before the request handler.
    ///
    /// Can modify the request or short-circuit with a response.
    fn before<'a>(&'a self, req: Request) -> BoxFuture<'a, MiddlewareResult>;

    /// Called after the request handler.
    ///
    /// Can modify the response.
    fn after<'a>(&'a self, res: Response) -> BoxFuture<'a, Response> {
        Box::pin(async move { res })
    }
}

/// Middleware that logs requests.
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn before<'a>(&'a self, req: Request) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(async move {
            info!(method = %req.method, path = %req.path, "request");
            MiddlewareResult::Continue(req)
        })
    }

    fn after<'a>(&'a self, res: Response) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            info!(status = res.status, "response");
            res
        })
    }
}

/// Appends `extra` to `base`, skipping aliases already present.
pub(crate) fn merge_aliases(base: &mut Vec<String>, extra: &[String]) {
    for alias in extra {
        if !base.contains(alias) {
            base.push(alias.clone());
        }
    }
}
