//! Route registration.

use std::collections::HashMap;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::debug;

use crate::binding::{Binding, BindingResolver};
use crate::config::RouterConfig;
use crate::constraint::{Constraint, ConstraintSet};
use crate::error::{Result, RouterError};
use crate::group::{join_paths, GroupAttributes, GroupStack};
use crate::middleware::{merge_aliases, Middleware};
use crate::pattern::Pattern;
use crate::request::{Method, Request};
use crate::response::Response;
use crate::route::{handler, PendingConstraint, Route, RouteDef, RouteId};
use crate::router::Router;
use crate::table::RouteTable;

/// Collects routes, then seals them into a [`Router`].
///
/// Registration is single-threaded and happens before serving starts.
/// Errors are returned as soon as the offending route is added.
///
/// # Example
///
/// ```
/// use oxide_dispatch::{GroupAttributes, Response, RouteDef, RouteRegistrar};
///
/// async fn index(_req: oxide_dispatch::Request) -> Response {
///     Response::text("users")
/// }
///
/// let mut routes = RouteRegistrar::new();
/// routes
///     .group(GroupAttributes::new().prefix("admin").name("admin."), |routes| {
///         routes.group(GroupAttributes::new().prefix("users").name("users."), |routes| {
///             routes.add(RouteDef::get("/", index).name("index"))?;
///             Ok(())
///         })
///     })
///     .unwrap();
///
/// let router = routes.into_router().unwrap();
/// let route = router.route_by_name("admin.users.index").unwrap();
/// assert_eq!(route.pattern().template(), "/admin/users");
/// ```
pub struct RouteRegistrar {
    config: RouterConfig,
    groups: GroupStack,
    routes: Vec<Route>,
    names: HashMap<String, RouteId>,
    patterns: ConstraintSet,
    fallback: Option<Route>,
    aliases: HashMap<String, Arc<dyn Middleware>>,
    global_middleware: Vec<Arc<dyn Middleware>>,
    resolver: Option<Arc<dyn BindingResolver>>,
}

impl Default for RouteRegistrar {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteRegistrar {
    /// Creates a registrar with the default configuration.
    pub fn new() -> Self {
        Self {
            config: RouterConfig::default(),
            groups: GroupStack::default(),
            routes: Vec::new(),
            names: HashMap::new(),
            patterns: ConstraintSet::new(),
            fallback: None,
            aliases: HashMap::new(),
            global_middleware: Vec::new(),
            resolver: None,
        }
    }

    /// Creates a registrar from a configuration, compiling its global
    /// patterns.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidConstraint`] if a configured pattern does not compile.
    pub fn with_config(config: RouterConfig) -> Result<Self> {
        let patterns = config.compile_patterns()?;
        Ok(Self {
            config,
            patterns,
            ..Self::new()
        })
    }

    /// Registers a route under the current group.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::PatternSyntax`] or [`RouterError::InvalidConstraint`]
    /// for a template or constraint that does not compile, and
    /// [`RouterError::DuplicateRouteName`] if the full name is taken.
    pub fn add(&mut self, def: RouteDef) -> Result<RouteId> {
        let frame = self.groups.current();

        let template = join_paths(&frame.prefix, &def.template);
        let pattern = Pattern::parse(&template)?;
        let domain = def
            .domain
            .as_deref()
            .or(frame.domain.as_deref())
            .map(Pattern::parse_domain)
            .transpose()?;
        let shared = domain.as_ref().and_then(|domain| {
            domain
                .param_names()
                .into_iter()
                .find(|param| pattern.has_param(param))
        });
        if let Some(shared) = shared {
            return Err(RouterError::pattern(
                &template,
                format!("parameter '{shared}' is declared by both the domain and the path"),
            ));
        }

        let name = def.name.map(|own| format!("{}{own}", frame.name_prefix));
        if let Some(name) = &name {
            if self.names.contains_key(name) {
                return Err(RouterError::DuplicateRouteName(name.clone()));
            }
        }

        let declares = |param: &str| {
            pattern.has_param(param) || domain.as_ref().is_some_and(|d| d.has_param(param))
        };

        let mut constraints = frame.constraints.clone();
        for (param, pending) in def.constraints {
            let constraint = match pending {
                PendingConstraint::Ready(constraint) => constraint,
                PendingConstraint::Regex(source) => Constraint::regex(&param, &source)?,
            };
            if !declares(&param) {
                debug!(%template, %param, "constraint names an undeclared parameter");
            }
            constraints.insert(param, constraint);
        }

        let mut bindings: Vec<(String, Binding)> = pattern
            .binding_keys()
            .iter()
            .map(|(param, key)| {
                (
                    param.clone(),
                    Binding {
                        key: Some(key.clone()),
                    },
                )
            })
            .collect();
        for (param, binding) in def.bindings {
            if !pattern.has_param(&param) {
                debug!(%template, %param, "binding names an undeclared parameter");
                continue;
            }
            match bindings.iter_mut().find(|(p, _)| *p == param) {
                Some((_, slot)) => *slot = binding,
                None => bindings.push((param, binding)),
            }
        }
        let order = pattern.param_names();
        bindings.sort_by_key(|(param, _)| order.iter().position(|p| *p == param.as_str()));

        let mut middleware = frame.middleware.clone();
        merge_aliases(&mut middleware, &def.middleware);

        let id = RouteId(self.routes.len());
        debug!(
            route = %id,
            methods = ?def.methods,
            template = pattern.template(),
            name = name.as_deref(),
            depth = self.groups.depth(),
            "registered route"
        );

        let route = Route {
            id,
            methods: def.methods,
            pattern,
            domain,
            name,
            constraints,
            middleware,
            bindings,
            handler: def.handler,
            lineage: frame.clone(),
        };
        if let Some(name) = &route.name {
            self.names.insert(name.clone(), id);
        }
        self.routes.push(route);
        Ok(id)
    }

    /// Shortcut for `add(RouteDef::get(template, handler))`.
    ///
    /// # Errors
    ///
    /// See [`RouteRegistrar::add`].
    pub fn get<F, Fut>(&mut self, template: &str, handler: F) -> Result<RouteId>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.add(RouteDef::get(template, handler))
    }

    /// Shortcut for `add(RouteDef::post(template, handler))`.
    ///
    /// # Errors
    ///
    /// See [`RouteRegistrar::add`].
    pub fn post<F, Fut>(&mut self, template: &str, handler: F) -> Result<RouteId>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.add(RouteDef::post(template, handler))
    }

    /// Runs `body` with a group frame pushed.
    ///
    /// The frame is popped when `body` returns, whether it succeeded, failed
    /// or panicked.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `body`.
    pub fn group<F>(&mut self, attributes: GroupAttributes, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.groups.push(&attributes);
        debug!(
            prefix = %self.groups.current().prefix,
            depth = self.groups.depth(),
            "entered route group"
        );
        let mut scope = GroupScope { registrar: self };
        body(&mut *scope)
    }

    /// Sets a global constraint for every route declaring `param`.
    ///
    /// Route and group constraints take precedence. Applies to routes added
    /// before and after this call.
    pub fn pattern(&mut self, param: impl Into<String>, constraint: Constraint) {
        self.patterns.insert(param, constraint);
    }

    /// Registers the handler used when no route matches.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::FallbackAlreadyRegistered`] on a second call.
    pub fn fallback<F, Fut>(&mut self, handler_fn: F) -> Result<()>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        if self.fallback.is_some() {
            return Err(RouterError::FallbackAlreadyRegistered);
        }
        let pattern = Pattern::parse("/")?;
        self.fallback = Some(Route {
            id: RouteId(usize::MAX),
            methods: Method::ALL.to_vec(),
            pattern,
            domain: None,
            name: None,
            constraints: ConstraintSet::new(),
            middleware: Vec::new(),
            bindings: Vec::new(),
            handler: handler(handler_fn),
            lineage: self.groups.current().clone(),
        });
        Ok(())
    }

    /// Declares a middleware alias routes and groups can refer to.
    pub fn alias_middleware(
        &mut self,
        alias: impl Into<String>,
        middleware: impl Middleware + 'static,
    ) {
        self.aliases.insert(alias.into(), Arc::new(middleware));
    }

    /// Adds middleware that wraps every request, matched or not.
    pub fn global_middleware(&mut self, middleware: impl Middleware + 'static) {
        self.global_middleware.push(Arc::new(middleware));
    }

    /// Installs the resolver for bound parameters.
    pub fn resolver(&mut self, resolver: impl BindingResolver + 'static) {
        self.resolver = Some(Arc::new(resolver));
    }

    /// Seals the routes into an immutable [`Router`].
    ///
    /// Global patterns are applied here and middleware aliases are checked.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::UnknownMiddleware`] if a route uses an alias that
    /// was never declared.
    pub fn into_router(self) -> Result<Router> {
        let mut routes = self.routes;
        for route in &mut routes {
            for alias in &route.middleware {
                if !self.aliases.contains_key(alias) {
                    return Err(RouterError::UnknownMiddleware(alias.clone()));
                }
            }
            route.constraints.extend_defaults(&self.patterns);
        }

        let fallback = match self.fallback {
            Some(mut route) => {
                route.id = RouteId(routes.len());
                Some(route)
            }
            None => None,
        };

        debug!(routes = routes.len(), fallback = fallback.is_some(), "sealed route table");
        Ok(Router::new(
            RouteTable::new(routes, self.config.trailing_slash),
            fallback,
            self.aliases,
            self.global_middleware,
            self.resolver,
            self.config,
        ))
    }
}

/// Registrar borrowed for the duration of a group body. Pops the group
/// frame on drop.
struct GroupScope<'a> {
    registrar: &'a mut RouteRegistrar,
}

impl Deref for GroupScope<'_> {
    type Target = RouteRegistrar;

    fn deref(&self) -> &Self::Target {
        self.registrar
    }
}

impl DerefMut for GroupScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.registrar
    }
}

impl Drop for GroupScope<'_> {
    fn drop(&mut self) {
        self.registrar.groups.pop();
        debug!(depth = self.registrar.groups.depth(), "left route group");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop(_req: Request) -> Response {
        Response::ok()
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut routes = RouteRegistrar::new();
        routes.add(RouteDef::get("/a", noop).name("dup")).unwrap();
        let err = routes
            .add(RouteDef::post("/b/{id}", noop).name("dup"))
            .unwrap_err();
        assert!(matches!(err, RouterError::DuplicateRouteName(name) if name == "dup"));
    }

    #[test]
    fn test_group_frame_is_popped_on_error() {
        let mut routes = RouteRegistrar::new();
        let result = routes.group(GroupAttributes::new().prefix("admin"), |routes| {
            routes.add(RouteDef::get("/{x?}/broken", noop))?;
            Ok(())
        });
        assert!(matches!(result, Err(RouterError::PatternSyntax { .. })));
        assert_eq!(routes.groups.depth(), 0);

        let id = routes.add(RouteDef::get("/users", noop)).unwrap();
        assert_eq!(routes.routes[id.index()].pattern().template(), "/users");
    }

    #[test]
    fn test_group_frame_is_popped_on_panic() {
        let mut routes = RouteRegistrar::new();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = routes.group(GroupAttributes::new().prefix("admin"), |_| {
                panic!("route declaration blew up");
            });
        }));
        assert!(outcome.is_err());
        assert_eq!(routes.groups.depth(), 0);
    }

    #[test]
    fn test_route_domain_overrides_group_domain() {
        let mut routes = RouteRegistrar::new();
        routes
            .group(GroupAttributes::new().domain("{account}.example.com"), |routes| {
                routes.add(RouteDef::get("/", noop).name("inherited"))?;
                routes.add(RouteDef::get("/", noop).name("own").domain("api.example.com"))?;
                Ok(())
            })
            .unwrap();

        let domain = |i: usize| routes.routes[i].domain().map(|d| d.template().to_string());
        assert_eq!(domain(0).as_deref(), Some("{account}.example.com"));
        assert_eq!(domain(1).as_deref(), Some("api.example.com"));
    }

    #[test]
    fn test_invalid_regex_constraint() {
        let mut routes = RouteRegistrar::new();
        let err = routes
            .add(RouteDef::get("/posts/{id}", noop).where_regex("id", "[0-9"))
            .unwrap_err();
        assert!(matches!(err, RouterError::InvalidConstraint { param, .. } if param == "id"));
    }

    #[test]
    fn test_second_fallback_is_rejected() {
        let mut routes = RouteRegistrar::new();
        routes.fallback(noop).unwrap();
        assert!(matches!(
            routes.fallback(noop),
            Err(RouterError::FallbackAlreadyRegistered)
        ));
    }

    #[test]
    fn test_unknown_middleware_alias() {
        let mut routes = RouteRegistrar::new();
        routes
            .add(RouteDef::get("/", noop).middleware(["auth"]))
            .unwrap();
        assert!(matches!(
            routes.into_router(),
            Err(RouterError::UnknownMiddleware(alias)) if alias == "auth"
        ));
    }

    #[test]
    fn test_bindings_follow_pattern_order() {
        let mut routes = RouteRegistrar::new();
        routes
            .add(
                RouteDef::get("/users/{user}/posts/{post:slug}", noop)
                    .bind("user")
                    .bind("missing"),
            )
            .unwrap();

        let bindings = routes.routes[0].bindings();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].0, "user");
        assert_eq!(bindings[0].1.key, None);
        assert_eq!(bindings[1].0, "post");
        assert_eq!(bindings[1].1.key.as_deref(), Some("slug"));
    }

    #[test]
    fn test_explicit_binding_overrides_inline_key() {
        let mut routes = RouteRegistrar::new();
        routes
            .add(RouteDef::get("/posts/{post:slug}", noop).bind_by("post", "uuid"))
            .unwrap();
        assert_eq!(routes.routes[0].bindings()[0].1.key.as_deref(), Some("uuid"));
    }
}
