//! # oxide-dispatch
//!
//! Request routing and dispatch: turns a method, host and path into a
//! handler call.
//!
//! This crate provides:
//! - Path templates with required, optional and inline-bound parameters
//! - Anchored parameter constraints, per route, per group or global
//! - Nested route groups (path prefix, name prefix, middleware, domain)
//! - Named routes with reverse URL generation
//! - Parameter binding through a pluggable resolver
//! - A fallback route for requests nothing else accepts
//!
//! ## Quick Start
//!
//! ```ignore
//! use oxide_dispatch::{Request, Response, RouteDef, RouteRegistrar};
//!
//! async fn show_post(req: Request) -> Response {
//!     let id = req.params.get("id").unwrap_or("unknown");
//!     Response::text(format!("Post {id}"))
//! }
//!
//! let mut routes = RouteRegistrar::new();
//! routes.add(RouteDef::get("/posts/{id}", show_post).name("posts.show").where_number("id"))?;
//! let router = routes.into_router()?;
//!
//! let response = router.handle(Request::get("/posts/42")).await;
//! ```
//!
//! ## Matching order
//!
//! Routes are tried in the order they were registered and the first one that
//! accepts the request wins. There is no specificity ranking, so
//! `/users/create` must be registered before `/users/{user}` to be reachable:
//!
//! ```ignore
//! routes.get("/users/create", create_form)?;
//! routes.get("/users/{user}", show_user)?;
//! ```
//!
//! ## Route Groups
//!
//! ```ignore
//! use oxide_dispatch::GroupAttributes;
//!
//! routes.group(
//!     GroupAttributes::new().prefix("admin").name("admin.").middleware(["auth"]),
//!     |routes| {
//!         routes.add(RouteDef::get("/users", list_users).name("users.index"))?;
//!         Ok(())
//!     },
//! )?;
//! // GET /admin/users, named "admin.users.index", behind "auth".
//! ```
//!
//! ## Named Routes
//!
//! ```ignore
//! let url = router.url_for("user.profile", &UrlParams::from([("id", 1)]))?;
//! assert_eq!(url, "/user/1");
//! ```
//!
//! ## Binding
//!
//! ```ignore
//! routes.add(RouteDef::get("/posts/{post:slug}", show_post))?;
//! routes.resolver(LookupResolver::new(database));
//! // `req.params.entity("post")` holds the looked-up record.
//! ```

mod binding;
mod config;
mod constraint;
mod error;
mod group;
mod middleware;
mod pattern;
mod registrar;
mod request;
mod response;
mod route;
mod router;
mod table;
mod url;

pub use binding::{
    Binding, BindingFailure, BindingResolver, Entity, EntityLookup, FnResolver, LookupError,
    LookupResolver, LookupResult,
};
pub use config::RouterConfig;
pub use constraint::{Constraint, ConstraintSet};
pub use error::{Result, RouterError};
pub use group::{GroupAttributes, GroupFrame};
pub use middleware::{LoggingMiddleware, Middleware, MiddlewareResult};
pub use pattern::{Pattern, Segment};
pub use registrar::RouteRegistrar;
pub use request::{Method, ParamValue, PathParams, Request};
pub use response::Response;
pub use route::{handler, Handler, Route, RouteDef, RouteId};
pub use router::{MatchOptions, MatchResult, Router};
pub use table::RouteTable;
pub use url::UrlParams;

pub use futures::future::BoxFuture;
