#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use oxide_dispatch::{
    BindingResolver, EntityLookup, LookupResult, MatchResult, Request, Response, Router,
};
use serde_json::{json, Value};

/// Installs a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Handler that answers with a fixed body.
pub fn text(body: &'static str) -> impl Fn(Request) -> BoxFuture<'static, Response> + Send + Sync {
    move |_req: Request| -> BoxFuture<'static, Response> {
        Box::pin(async move { Response::text(body) })
    }
}

/// Handler that echoes its captured parameters as `name=value` pairs.
pub async fn echo_params(req: Request) -> Response {
    let pairs: Vec<String> = req
        .params
        .iter()
        .map(|(name, value)| format!("{name}={}", value.as_str().unwrap_or("-")))
        .collect();
    Response::text(pairs.join("&"))
}

/// Name of the route a `Matched` outcome points at.
pub fn matched_name<'r>(outcome: &MatchResult<'r>) -> Option<&'r str> {
    match outcome {
        MatchResult::Matched { route, .. } => route.name(),
        other => panic!("Expected Matched, got {other:?}"),
    }
}

pub async fn body_of(router: &Router, request: Request) -> String {
    let response = router.handle(request).await;
    response
        .body_string()
        .unwrap_or_else(|| panic!("non-UTF-8 body, status {}", response.status))
}

/// In-memory rows keyed by `(entity type, key field, value)`.
#[derive(Default)]
pub struct MemoryLookup {
    rows: HashMap<(String, String, String), Value>,
    calls: Arc<AtomicUsize>,
}

impl MemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, entity_type: &str, key: &str, value: &str, row: Value) -> Self {
        self.rows.insert(
            (entity_type.to_string(), key.to_string(), value.to_string()),
            row,
        );
        self
    }

    /// Counter shared with the lookup, readable after it moved into a router.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl EntityLookup for MemoryLookup {
    fn lookup<'a>(
        &'a self,
        entity_type: &'a str,
        key: &'a str,
        value: &'a str,
    ) -> BoxFuture<'a, LookupResult> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let row = self.rows.get(&(
                entity_type.to_string(),
                key.to_string(),
                value.to_string(),
            ));
            Ok(row.cloned())
        })
    }
}

/// A resolver that answers after `delay`.
pub struct SlowResolver {
    pub delay: Duration,
}

impl BindingResolver for SlowResolver {
    fn resolve<'a>(
        &'a self,
        _param: &'a str,
        raw: &'a str,
        _key: Option<&'a str>,
    ) -> BoxFuture<'a, LookupResult> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(Some(json!({ "id": raw })))
        })
    }
}
