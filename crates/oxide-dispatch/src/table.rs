//! The sealed route table.

use std::collections::HashMap;

use tracing::trace;

use crate::request::{Method, PathParams};
use crate::route::{Route, RouteId};

/// Routes in registration order plus the name index.
///
/// Built once by [`crate::RouteRegistrar::into_router`] and never mutated
/// afterwards, so it can be shared across request tasks without locking.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    names: HashMap<String, RouteId>,
    trailing_slash: bool,
}

impl RouteTable {
    pub(crate) fn new(routes: Vec<Route>, trailing_slash: bool) -> Self {
        let names = routes
            .iter()
            .filter_map(|route| route.name().map(|name| (name.to_string(), route.id())))
            .collect();
        Self {
            routes,
            names,
            trailing_slash,
        }
    }

    /// All routes in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Looks a route up by id.
    pub fn get(&self, id: RouteId) -> Option<&Route> {
        self.routes.get(id.index())
    }

    /// Looks a route up by its full name.
    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.names.get(name).and_then(|id| self.get(*id))
    }

    /// Number of routes (the fallback is not counted).
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no route was registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Finds the first route, in registration order, whose method, host,
    /// path and constraints all accept the request.
    pub fn find(
        &self,
        method: Method,
        host: Option<&str>,
        path: &str,
    ) -> Option<(&Route, PathParams)> {
        let parts = self.split_path(path);

        self.routes.iter().find_map(|route| {
            if !route.allows(method) {
                trace!(route = %route.id(), %method, "method rejected candidate");
                return None;
            }
            route.capture(host, &parts).map(|params| (route, params))
        })
    }

    /// Methods of the routes that would match the path under some method.
    ///
    /// HEAD is listed whenever GET is.
    pub fn allowed_methods(&self, host: Option<&str>, path: &str) -> Vec<Method> {
        let parts = self.split_path(path);
        let mut allowed: Vec<Method> = Vec::new();

        for route in &self.routes {
            if route.capture(host, &parts).is_none() {
                continue;
            }
            for method in Method::ALL {
                if route.allows(method) && !allowed.contains(&method) {
                    allowed.push(method);
                }
            }
        }

        allowed.sort_by_key(|m| Method::ALL.iter().position(|x| x == m));
        allowed
    }

    /// Splits a request path into segments.
    ///
    /// The query string is dropped, and so is one trailing `/` when the table
    /// ignores trailing slashes. Interior empty segments are kept.
    pub(crate) fn split_path<'p>(&self, path: &'p str) -> Vec<&'p str> {
        let path = path.split('?').next().unwrap_or(path);
        let path = path.strip_prefix('/').unwrap_or(path);
        let path = if self.trailing_slash {
            path.strip_suffix('/').unwrap_or(path)
        } else {
            path
        };
        if path.is_empty() {
            Vec::new()
        } else {
            path.split('/').collect()
        }
    }
}
