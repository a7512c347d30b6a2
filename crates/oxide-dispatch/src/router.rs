//! Request matching and dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::binding::{BindingFailure, BindingResolver, Entity};
use crate::config::RouterConfig;
use crate::error::{Result, RouterError};
use crate::middleware::{Middleware, MiddlewareResult};
use crate::request::{Method, ParamValue, PathParams, Request};
use crate::response::Response;
use crate::route::Route;
use crate::table::RouteTable;
use crate::url::{self, UrlParams};

/// Outcome of matching one request.
#[derive(Debug)]
pub enum MatchResult<'r> {
    /// A route accepted the request.
    Matched {
        /// The winning route.
        route: &'r Route,
        /// Captured parameters, with bound entities filled in.
        params: PathParams,
    },
    /// No route accepted the request and there is no fallback.
    Unmatched,
    /// No route accepted the request; the fallback takes it.
    FallbackMatched {
        /// The fallback route.
        route: &'r Route,
    },
    /// A route matched but one of its bound parameters did not resolve.
    BindingNotFound {
        /// The route whose binding failed.
        route: &'r Route,
        /// The bound parameter.
        param: String,
        /// Why it failed.
        reason: BindingFailure,
    },
}

impl<'r> MatchResult<'r> {
    /// Returns `true` for [`MatchResult::Matched`].
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    /// The route the outcome refers to, if any.
    pub fn route(&self) -> Option<&'r Route> {
        match self {
            Self::Matched { route, .. }
            | Self::FallbackMatched { route }
            | Self::BindingNotFound { route, .. } => Some(route),
            Self::Unmatched => None,
        }
    }

    /// The captured parameters of a successful match.
    pub fn params(&self) -> Option<&PathParams> {
        match self {
            Self::Matched { params, .. } => Some(params),
            _ => None,
        }
    }
}

/// Per-request limits for the binding step.
#[derive(Debug, Clone, Default)]
pub struct MatchOptions {
    /// Instant by which every binding lookup must have answered.
    pub deadline: Option<Instant>,
    /// Cancels pending binding lookups when triggered.
    pub cancel: Option<CancellationToken>,
}

impl MatchOptions {
    /// Options without deadline or cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the deadline.
    #[must_use]
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// A sealed router. Cheap to share behind an [`Arc`]; all methods take
/// `&self`.
pub struct Router {
    table: RouteTable,
    fallback: Option<Route>,
    aliases: HashMap<String, Arc<dyn Middleware>>,
    global_middleware: Vec<Arc<dyn Middleware>>,
    resolver: Option<Arc<dyn BindingResolver>>,
    config: RouterConfig,
}

impl Router {
    pub(crate) fn new(
        table: RouteTable,
        fallback: Option<Route>,
        aliases: HashMap<String, Arc<dyn Middleware>>,
        global_middleware: Vec<Arc<dyn Middleware>>,
        resolver: Option<Arc<dyn BindingResolver>>,
        config: RouterConfig,
    ) -> Self {
        Self {
            table,
            fallback,
            aliases,
            global_middleware,
            resolver,
            config,
        }
    }

    /// The route table.
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// The configuration the router was built with.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The fallback route, if one was registered.
    pub fn fallback(&self) -> Option<&Route> {
        self.fallback.as_ref()
    }

    /// Returns `true` if a route carries `name`.
    pub fn has_route(&self, name: &str) -> bool {
        self.table.by_name(name).is_some()
    }

    /// Looks a route up by name.
    pub fn route_by_name(&self, name: &str) -> Option<&Route> {
        self.table.by_name(name)
    }

    /// Matches a bare method and path.
    pub async fn match_route(&self, method: Method, path: &str) -> MatchResult<'_> {
        self.match_request(&Request::new(method, path), &MatchOptions::default())
            .await
    }

    /// Matches a request.
    ///
    /// Routes are tried in registration order and the first one whose method,
    /// host, path and constraints accept the request wins. Its bound
    /// parameters are then resolved; a failure there is final.
    pub async fn match_request<'r>(
        &'r self,
        request: &Request,
        options: &MatchOptions,
    ) -> MatchResult<'r> {
        let found = self
            .table
            .find(request.method, request.effective_host(), &request.path);

        let Some((route, params)) = found else {
            return match &self.fallback {
                Some(route) => MatchResult::FallbackMatched { route },
                None => MatchResult::Unmatched,
            };
        };

        if route.bindings().is_empty() {
            return MatchResult::Matched { route, params };
        }
        self.bind(route, params, options).await
    }

    async fn bind<'r>(
        &'r self,
        route: &'r Route,
        mut params: PathParams,
        options: &MatchOptions,
    ) -> MatchResult<'r> {
        let deadline = self.deadline(options);

        for (param, binding) in route.bindings() {
            let Some(raw) = params.get(param).map(str::to_string) else {
                continue;
            };

            let outcome = match &self.resolver {
                Some(resolver) => {
                    let key = binding.key.as_deref();
                    resolve_one(resolver.as_ref(), param, &raw, key, deadline, options).await
                }
                None => Err(BindingFailure::NoResolver),
            };

            match outcome {
                Ok(entity) => params.set(param.clone(), ParamValue::Bound { raw, entity }),
                Err(reason) => {
                    debug!(route = %route.id(), %param, %reason, "binding failed");
                    return MatchResult::BindingNotFound {
                        route,
                        param: param.clone(),
                        reason,
                    };
                }
            }
        }

        MatchResult::Matched { route, params }
    }

    /// The earlier of the caller's deadline and the configured timeout.
    fn deadline(&self, options: &MatchOptions) -> Option<Instant> {
        let configured = self
            .config
            .binding_timeout()
            .map(|timeout| Instant::now() + timeout);
        match (options.deadline, configured) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Methods that would be accepted for `path`, for `Allow` headers.
    pub fn allowed_methods(&self, host: Option<&str>, path: &str) -> Vec<Method> {
        self.table.allowed_methods(host, path)
    }

    /// Generates the URL of a named route.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::UnknownRouteName`] for an unknown name,
    /// [`RouterError::MissingUrlParameter`] when a placeholder has no value and
    /// [`RouterError::InvalidHostLabel`] for a domain value that is not a host label.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_dispatch::{Response, RouteDef, RouteRegistrar, UrlParams};
    ///
    /// async fn profile(_req: oxide_dispatch::Request) -> Response {
    ///     Response::ok()
    /// }
    ///
    /// let mut routes = RouteRegistrar::new();
    /// routes
    ///     .add(RouteDef::get("/user/{id}/{name?}", profile).name("user.profile"))
    ///     .unwrap();
    /// let router = routes.into_router().unwrap();
    ///
    /// let url = router.url_for("user.profile", &UrlParams::from([("id", 1)])).unwrap();
    /// assert_eq!(url, "/user/1");
    /// ```
    pub fn url_for(&self, name: &str, params: &UrlParams) -> Result<String> {
        let route = self
            .table
            .by_name(name)
            .ok_or_else(|| RouterError::UnknownRouteName(name.to_string()))?;
        url::build(route, params)
    }

    /// Handles an incoming request: global middleware, matching, route
    /// middleware, handler.
    pub async fn handle(&self, mut request: Request) -> Response {
        for (i, mw) in self.global_middleware.iter().enumerate() {
            match mw.before(request).await {
                MiddlewareResult::Continue(req) => request = req,
                MiddlewareResult::Response(res) => {
                    return run_after(&self.global_middleware[..=i], res).await;
                }
            }
        }

        let response = self.dispatch(request).await;
        run_after(self.global_middleware.as_slice(), response).await
    }

    async fn dispatch(&self, mut request: Request) -> Response {
        let outcome = self
            .match_request(&request, &MatchOptions::default())
            .await;

        match outcome {
            MatchResult::Matched { route, params } => {
                request.params = params;
                self.run_route(route, request).await
            }
            MatchResult::FallbackMatched { route } => self.run_route(route, request).await,
            MatchResult::BindingNotFound { .. } => Response::not_found(),
            MatchResult::Unmatched => {
                let allowed = self.allowed_methods(request.effective_host(), &request.path);
                if allowed.is_empty() {
                    Response::not_found()
                } else {
                    let allow: Vec<&str> = allowed.iter().map(Method::as_str).collect();
                    Response::method_not_allowed(&allow.join(", "))
                }
            }
        }
    }

    async fn run_route(&self, route: &Route, mut request: Request) -> Response {
        let chain: Vec<Arc<dyn Middleware>> = route
            .middleware()
            .iter()
            .filter_map(|alias| self.aliases.get(alias).cloned())
            .collect();

        for (i, mw) in chain.iter().enumerate() {
            match mw.before(request).await {
                MiddlewareResult::Continue(req) => request = req,
                MiddlewareResult::Response(res) => {
                    return run_after(&chain[..=i], res).await;
                }
            }
        }

        let response = (route.handler())(request).await;
        run_after(&chain, response).await
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.table.len())
            .field("fallback", &self.fallback.is_some())
            .field("resolver", &self.resolver.is_some())
            .finish_non_exhaustive()
    }
}

/// Runs `after` hooks innermost first.
async fn run_after(middleware: &[Arc<dyn Middleware>], mut response: Response) -> Response {
    for mw in middleware.iter().rev() {
        response = mw.after(response).await;
    }
    response
}

async fn resolve_one(
    resolver: &dyn BindingResolver,
    param: &str,
    raw: &str,
    key: Option<&str>,
    deadline: Option<Instant>,
    options: &MatchOptions,
) -> std::result::Result<Entity, BindingFailure> {
    let timed_out = async {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    let cancelled = async {
        match &options.cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        () = cancelled => Err(BindingFailure::Cancelled),
        result = resolver.resolve(param, raw, key) => match result {
            Ok(Some(entity)) => Ok(entity),
            Ok(None) => Err(BindingFailure::Missing),
            Err(e) => {
                warn!(%param, error = %e, "binding lookup failed");
                Err(BindingFailure::Lookup(e.to_string()))
            }
        },
        () = timed_out => {
            warn!(%param, "binding lookup timed out");
            Err(BindingFailure::TimedOut)
        }
    }
}
