//! Route declarations and compiled routes.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::binding::Binding;
use crate::constraint::{Constraint, ConstraintSet};
use crate::group::GroupFrame;
use crate::pattern::Pattern;
use crate::request::{Method, PathParams, Request};
use crate::response::Response;

/// A boxed async handler function.
///
/// The handler receives the request with [`Request::params`] filled in,
/// bound entities included.
pub type Handler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Boxes an async function or closure into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req: Request| -> BoxFuture<'static, Response> { Box::pin(f(req)) })
}

/// Identifier of a route: its position in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub(crate) usize);

impl RouteId {
    /// The registration index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum PendingConstraint {
    Ready(Constraint),
    Regex(String),
}

/// A route declaration, registered with [`crate::RouteRegistrar::add`].
///
/// # Example
///
/// ```ignore
/// registrar.add(
///     RouteDef::get("/posts/{post}", show_post)
///         .name("posts.show")
///         .where_number("post")
///         .bind("post"),
/// )?;
/// ```
pub struct RouteDef {
    pub(crate) methods: Vec<Method>,
    pub(crate) template: String,
    pub(crate) handler: Handler,
    pub(crate) name: Option<String>,
    pub(crate) constraints: Vec<(String, PendingConstraint)>,
    pub(crate) middleware: Vec<String>,
    pub(crate) domain: Option<String>,
    pub(crate) bindings: Vec<(String, Binding)>,
}

impl RouteDef {
    /// Declares a route for a set of methods.
    pub fn new<F, Fut>(methods: &[Method], template: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::with_handler(methods, template, self::handler(handler))
    }

    /// Declares a route with an already boxed handler.
    pub fn with_handler(methods: &[Method], template: &str, handler: Handler) -> Self {
        let mut unique = Vec::with_capacity(methods.len());
        for method in methods {
            if !unique.contains(method) {
                unique.push(*method);
            }
        }
        Self {
            methods: unique,
            template: template.to_string(),
            handler,
            name: None,
            constraints: Vec::new(),
            middleware: Vec::new(),
            domain: None,
            bindings: Vec::new(),
        }
    }

    /// Declares a GET route. HEAD requests match it too.
    pub fn get<F, Fut>(template: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::new(&[Method::Get], template, handler)
    }

    /// Declares a POST route.
    pub fn post<F, Fut>(template: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::new(&[Method::Post], template, handler)
    }

    /// Declares a PUT route.
    pub fn put<F, Fut>(template: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::new(&[Method::Put], template, handler)
    }

    /// Declares a PATCH route.
    pub fn patch<F, Fut>(template: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::new(&[Method::Patch], template, handler)
    }

    /// Declares a DELETE route.
    pub fn delete<F, Fut>(template: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::new(&[Method::Delete], template, handler)
    }

    /// Declares a route answering every method.
    pub fn any<F, Fut>(template: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::new(&Method::ALL, template, handler)
    }

    /// Sets the route name. The enclosing groups' name prefixes are prepended.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches a constraint to `param`.
    #[must_use]
    pub fn constrain(mut self, param: impl Into<String>, constraint: Constraint) -> Self {
        self.constraints
            .push((param.into(), PendingConstraint::Ready(constraint)));
        self
    }

    /// Constrains `param` with a regex. The source is compiled (and anchored)
    /// when the route is registered.
    #[must_use]
    pub fn where_regex(mut self, param: impl Into<String>, source: impl Into<String>) -> Self {
        self.constraints
            .push((param.into(), PendingConstraint::Regex(source.into())));
        self
    }

    /// Constrains `param` to digits.
    #[must_use]
    pub fn where_number(self, param: impl Into<String>) -> Self {
        self.constrain(param, Constraint::Number)
    }

    /// Constrains `param` to letters.
    #[must_use]
    pub fn where_alpha(self, param: impl Into<String>) -> Self {
        self.constrain(param, Constraint::Alpha)
    }

    /// Constrains `param` to letters and digits.
    #[must_use]
    pub fn where_alpha_numeric(self, param: impl Into<String>) -> Self {
        self.constrain(param, Constraint::AlphaNumeric)
    }

    /// Constrains `param` to one of `values`.
    #[must_use]
    pub fn where_in<I, S>(self, param: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constrain(param, Constraint::one_of(values))
    }

    /// Constrains `param` to a UUID.
    #[must_use]
    pub fn where_uuid(self, param: impl Into<String>) -> Self {
        self.constrain(param, Constraint::Uuid)
    }

    /// Constrains `param` to a ULID.
    #[must_use]
    pub fn where_ulid(self, param: impl Into<String>) -> Self {
        self.constrain(param, Constraint::Ulid)
    }

    /// Adds middleware aliases, after those of the enclosing groups.
    #[must_use]
    pub fn middleware<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.middleware.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Restricts the route to hosts matching `domain`.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Binds `param` through the resolver using its default key.
    #[must_use]
    pub fn bind(mut self, param: impl Into<String>) -> Self {
        self.bindings.push((param.into(), Binding { key: None }));
        self
    }

    /// Binds `param` through the resolver by the field `key`.
    #[must_use]
    pub fn bind_by(mut self, param: impl Into<String>, key: impl Into<String>) -> Self {
        self.bindings.push((
            param.into(),
            Binding {
                key: Some(key.into()),
            },
        ));
        self
    }
}

/// A compiled, immutable route.
#[derive(Clone)]
pub struct Route {
    pub(crate) id: RouteId,
    pub(crate) methods: Vec<Method>,
    pub(crate) pattern: Pattern,
    pub(crate) domain: Option<Pattern>,
    pub(crate) name: Option<String>,
    pub(crate) constraints: ConstraintSet,
    pub(crate) middleware: Vec<String>,
    pub(crate) bindings: Vec<(String, Binding)>,
    pub(crate) handler: Handler,
    pub(crate) lineage: GroupFrame,
}

impl Route {
    /// Internal id.
    pub fn id(&self) -> RouteId {
        self.id
    }

    /// Declared methods (HEAD is implied by GET and not listed).
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// The compiled path pattern, group prefixes included.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// The compiled domain pattern.
    pub fn domain(&self) -> Option<&Pattern> {
        self.domain.as_ref()
    }

    /// Full name, group name prefixes included.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Effective constraints: route, group and global, in that priority.
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Middleware aliases in execution order.
    pub fn middleware(&self) -> &[String] {
        &self.middleware
    }

    /// Bound parameters in pattern order.
    pub fn bindings(&self) -> &[(String, Binding)] {
        &self.bindings
    }

    /// The handler.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// The group attributes in effect when the route was registered.
    pub fn lineage(&self) -> &GroupFrame {
        &self.lineage
    }

    /// Returns `true` if the route answers `method`.
    pub fn allows(&self, method: Method) -> bool {
        self.methods.contains(&method)
            || (method == Method::Head && self.methods.contains(&Method::Get))
    }

    /// Structural match: host, path and constraints. Method is not checked.
    pub(crate) fn capture(&self, host: Option<&str>, parts: &[&str]) -> Option<PathParams> {
        let mut params = PathParams::new();

        if let Some(domain) = &self.domain {
            let host = strip_port(host?);
            let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
            if !domain.capture_host(&labels, &mut params) {
                return None;
            }
        }

        if !self.pattern.capture(parts, &mut params) {
            return None;
        }

        if let Err(param) = self.constraints.check(&params) {
            tracing::trace!(route = %self.id, param, "constraint rejected candidate");
            return None;
        }

        Some(params)
    }
}

/// Drops a trailing `:port`, leaving bracketed IPv6 literals intact.
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("methods", &self.methods)
            .field("pattern", &self.pattern.template())
            .field("domain", &self.domain.as_ref().map(Pattern::template))
            .field("name", &self.name)
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("acme.example.com:8080"), "acme.example.com");
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
        assert_eq!(strip_port("[::1]"), "[::1]");
        assert_eq!(strip_port("::1"), "::1");
    }

    #[test]
    fn test_ipv6_host_does_not_match_domain_route() {
        let route = Route {
            id: RouteId(0),
            methods: vec![Method::Get],
            pattern: Pattern::parse("/").unwrap(),
            domain: Some(Pattern::parse_domain("{account}.example.com").unwrap()),
            name: None,
            constraints: ConstraintSet::new(),
            middleware: Vec::new(),
            bindings: Vec::new(),
            handler: handler(|_req: Request| async { Response::ok() }),
            lineage: GroupFrame::default(),
        };

        assert!(route.capture(Some("[::1]:8080"), &[]).is_none());
        let params = route.capture(Some("acme.example.com:443"), &[]).unwrap();
        assert_eq!(params.get("account"), Some("acme"));
    }
}
