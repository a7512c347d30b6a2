//! Route parameter binding.
//!
//! Parameters marked as bound at registration are handed to a
//! [`BindingResolver`] after constraints pass. A miss ends the match attempt
//! with [`crate::MatchResult::BindingNotFound`]; the router does not try
//! later routes.

use std::collections::HashMap;
use std::fmt;

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;

/// A resolved domain entity, as a JSON record.
pub type Entity = serde_json::Value;

/// Error reported by a resolver or lookup that could not complete.
///
/// A lookup that completes without finding anything is a miss, `Ok(None)`,
/// not an error.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct LookupError(pub String);

/// Outcome of a single resolver call.
pub type LookupResult = Result<Option<Entity>, LookupError>;

/// The binding declared for one parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binding {
    /// Field to resolve by. `None` lets the resolver pick its default.
    pub key: Option<String>,
}

/// Why a bound parameter produced no entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingFailure {
    /// The resolver found nothing.
    Missing,
    /// The deadline passed before the resolver answered.
    TimedOut,
    /// The caller cancelled the match.
    Cancelled,
    /// The route binds parameters but the router has no resolver.
    NoResolver,
    /// The resolver failed.
    Lookup(String),
}

impl fmt::Display for BindingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "not found"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::NoResolver => write!(f, "no resolver configured"),
            Self::Lookup(message) => write!(f, "lookup failed: {message}"),
        }
    }
}

/// Translates a raw parameter into an entity.
pub trait BindingResolver: Send + Sync {
    /// Resolves `raw`, captured for `param`, optionally by the field `key`.
    fn resolve<'a>(
        &'a self,
        param: &'a str,
        raw: &'a str,
        key: Option<&'a str>,
    ) -> BoxFuture<'a, LookupResult>;
}

/// Persistence boundary used by [`LookupResolver`].
pub trait EntityLookup: Send + Sync {
    /// Finds the `entity_type` whose `key` field equals `value`.
    fn lookup<'a>(
        &'a self,
        entity_type: &'a str,
        key: &'a str,
        value: &'a str,
    ) -> BoxFuture<'a, LookupResult>;
}

/// A resolver that forwards to an [`EntityLookup`].
///
/// The entity type defaults to the parameter name (`{user}` looks up
/// `user`) and the key defaults to `id`.
///
/// ```ignore
/// let resolver = LookupResolver::new(db)
///     .model("author", "user")
///     .default_key("uuid");
/// ```
pub struct LookupResolver<L> {
    lookup: L,
    models: HashMap<String, String>,
    default_key: String,
}

impl<L: EntityLookup> LookupResolver<L> {
    /// Creates a resolver backed by `lookup`.
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            models: HashMap::new(),
            default_key: "id".to_string(),
        }
    }

    /// Maps a parameter name to an entity type.
    #[must_use]
    pub fn model(mut self, param: impl Into<String>, entity_type: impl Into<String>) -> Self {
        self.models.insert(param.into(), entity_type.into());
        self
    }

    /// Sets the key used when a binding does not name one.
    #[must_use]
    pub fn default_key(mut self, key: impl Into<String>) -> Self {
        self.default_key = key.into();
        self
    }

    fn entity_type<'a>(&'a self, param: &'a str) -> &'a str {
        self.models.get(param).map_or(param, String::as_str)
    }
}

impl<L: EntityLookup> BindingResolver for LookupResolver<L> {
    fn resolve<'a>(
        &'a self,
        param: &'a str,
        raw: &'a str,
        key: Option<&'a str>,
    ) -> BoxFuture<'a, LookupResult> {
        let entity_type = self.entity_type(param);
        let key = key.unwrap_or(self.default_key.as_str());
        self.lookup.lookup(entity_type, key, raw)
    }
}

/// A resolver built from a synchronous closure.
///
/// ```
/// use oxide_dispatch::FnResolver;
/// use serde_json::json;
///
/// let resolver = FnResolver::new(|param: &str, raw: &str, _key: Option<&str>| {
///     Ok((param == "user" && raw == "1").then(|| json!({"id": 1})))
/// });
/// # let _ = resolver;
/// ```
pub struct FnResolver<F>(F);

impl<F> FnResolver<F>
where
    F: Fn(&str, &str, Option<&str>) -> LookupResult + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> BindingResolver for FnResolver<F>
where
    F: Fn(&str, &str, Option<&str>) -> LookupResult + Send + Sync,
{
    fn resolve<'a>(
        &'a self,
        param: &'a str,
        raw: &'a str,
        key: Option<&'a str>,
    ) -> BoxFuture<'a, LookupResult> {
        futures::future::ready((self.0)(param, raw, key)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLookup {
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl EntityLookup for RecordingLookup {
        fn lookup<'a>(
            &'a self,
            entity_type: &'a str,
            key: &'a str,
            value: &'a str,
        ) -> BoxFuture<'a, LookupResult> {
            self.calls.lock().unwrap().push((
                entity_type.to_string(),
                key.to_string(),
                value.to_string(),
            ));
            Box::pin(async move { Ok(Some(json!({ "key": key, "value": value }))) })
        }
    }

    #[tokio::test]
    async fn test_lookup_resolver_defaults() {
        let resolver = LookupResolver::new(RecordingLookup::default());
        let entity = resolver.resolve("user", "7", None).await.unwrap();
        assert_eq!(entity, Some(json!({"key": "id", "value": "7"})));
        assert_eq!(
            resolver.lookup.calls.lock().unwrap()[0],
            ("user".to_string(), "id".to_string(), "7".to_string())
        );
    }

    #[tokio::test]
    async fn test_lookup_resolver_model_and_key() {
        let resolver = LookupResolver::new(RecordingLookup::default())
            .model("author", "user")
            .default_key("uuid");

        resolver.resolve("author", "abc", None).await.unwrap();
        resolver.resolve("author", "john", Some("slug")).await.unwrap();

        let calls = resolver.lookup.calls.lock().unwrap();
        assert_eq!(calls[0].0, "user");
        assert_eq!(calls[0].1, "uuid");
        assert_eq!(calls[1].1, "slug");
    }

    #[tokio::test]
    async fn test_fn_resolver_miss() {
        let resolver = FnResolver::new(|_: &str, _: &str, _: Option<&str>| Ok(None));
        assert_eq!(resolver.resolve("user", "1", None).await.unwrap(), None);
    }
}
