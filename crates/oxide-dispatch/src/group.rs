//! Route group attributes and the registration-time group stack.

use crate::constraint::{Constraint, ConstraintSet};
use crate::middleware::merge_aliases;

/// Attributes declared by one `group(...)` call.
///
/// ```
/// use oxide_dispatch::GroupAttributes;
///
/// let admin = GroupAttributes::new()
///     .prefix("admin")
///     .name("admin.")
///     .middleware(["auth"]);
/// # let _ = admin;
/// ```
#[derive(Debug, Clone, Default)]
pub struct GroupAttributes {
    prefix: Option<String>,
    name: Option<String>,
    middleware: Vec<String>,
    domain: Option<String>,
    constraints: Vec<(String, Constraint)>,
}

impl GroupAttributes {
    /// Creates empty attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Path prefix, joined to the parent prefix with a single `/`.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Name prefix, concatenated to the parent name prefix as-is.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Middleware aliases appended after the parent's.
    #[must_use]
    pub fn middleware<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.middleware.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Domain pattern for every route in the group.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Constraint applied to routes in the group that declare `param`.
    #[must_use]
    pub fn constrain(mut self, param: impl Into<String>, constraint: Constraint) -> Self {
        self.constraints.push((param.into(), constraint));
        self
    }
}

/// The merged attributes in effect at one nesting level.
///
/// Every route keeps a snapshot of the frame it was registered under.
#[derive(Debug, Clone, Default)]
pub struct GroupFrame {
    /// Normalized path prefix, `""` at the top level or `/a/b`.
    pub prefix: String,
    /// Concatenated name prefix.
    pub name_prefix: String,
    /// Middleware aliases, outermost first, without repeats.
    pub middleware: Vec<String>,
    /// Innermost domain declared so far.
    pub domain: Option<String>,
    /// Group-level constraints, inner groups overriding outer ones.
    pub constraints: ConstraintSet,
}

impl GroupFrame {
    /// Derives the frame for a nested group.
    pub fn child(&self, attributes: &GroupAttributes) -> Self {
        let prefix = match &attributes.prefix {
            Some(own) => join_paths(&self.prefix, own),
            None => self.prefix.clone(),
        };

        let mut name_prefix = self.name_prefix.clone();
        if let Some(own) = &attributes.name {
            name_prefix.push_str(own);
        }

        let mut middleware = self.middleware.clone();
        merge_aliases(&mut middleware, &attributes.middleware);

        let mut constraints = self.constraints.clone();
        for (param, constraint) in &attributes.constraints {
            constraints.insert(param.clone(), constraint.clone());
        }

        Self {
            prefix,
            name_prefix,
            middleware,
            domain: attributes.domain.clone().or_else(|| self.domain.clone()),
            constraints,
        }
    }
}

/// Joins two path fragments with exactly one `/` between segments.
///
/// Returns `""` when both are empty so that `join_paths("", "/")` stays the
/// root.
pub(crate) fn join_paths(base: &str, path: &str) -> String {
    let segments: Vec<&str> = base
        .split('/')
        .chain(path.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        String::new()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Stack of group frames. The bottom frame is the top level and is never
/// popped.
#[derive(Debug)]
pub(crate) struct GroupStack {
    frames: Vec<GroupFrame>,
}

impl Default for GroupStack {
    fn default() -> Self {
        Self {
            frames: vec![GroupFrame::default()],
        }
    }
}

impl GroupStack {
    pub(crate) fn current(&self) -> &GroupFrame {
        // The root frame is pushed in `default` and `pop` never removes it.
        &self.frames[self.frames.len() - 1]
    }

    pub(crate) fn push(&mut self, attributes: &GroupAttributes) {
        let frame = self.current().child(attributes);
        self.frames.push(frame);
    }

    pub(crate) fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len() - 1
    }
}
