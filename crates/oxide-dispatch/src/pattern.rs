//! Path pattern compilation and matching.

use crate::error::{Result, RouterError};
use crate::request::PathParams;
use crate::url::percent_decode;

/// A segment in a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A literal string segment.
    Literal(String),
    /// A parameter that must be present (e.g., `{id}`).
    Required(String),
    /// A trailing parameter that may be left out (e.g., `{name?}`).
    Optional(String),
}

impl Segment {
    /// The parameter name, for placeholder segments.
    pub fn param(&self) -> Option<&str> {
        match self {
            Self::Literal(_) => None,
            Self::Required(name) | Self::Optional(name) => Some(name),
        }
    }
}

/// A compiled path (or domain) pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// The normalized template string.
    template: String,
    /// Parsed segments.
    segments: Vec<Segment>,
    /// Binding keys declared inline with `{param:key}`.
    binding_keys: Vec<(String, String)>,
    /// Number of segments before the optional suffix.
    required: usize,
}

impl Pattern {
    /// Compiles a path template.
    ///
    /// Pattern syntax:
    /// - `/users` - Literal path
    /// - `/users/{id}` - Path with parameter
    /// - `/users/{id}/{tab?}` - Trailing optional parameter
    /// - `/posts/{post:slug}` - Parameter bound by the `slug` field
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::PatternSyntax`] for malformed placeholders, duplicate
    /// names and optionals that are not trailing.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_dispatch::Pattern;
    ///
    /// let pattern = Pattern::parse("/posts/{id}/comments/{comment_id?}").unwrap();
    /// assert_eq!(pattern.template(), "/posts/{id}/comments/{comment_id?}");
    /// assert_eq!(pattern.param_names(), vec!["id", "comment_id"]);
    /// ```
    pub fn parse(template: &str) -> Result<Self> {
        let parts: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();
        let mut pattern = Self::compile(template, &parts, true)?;
        pattern.template = format!("/{}", parts.join("/"));
        Ok(pattern)
    }

    /// Compiles a domain template such as `{account}.example.com`.
    ///
    /// Labels are separated by `.` and optional placeholders are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::PatternSyntax`] for an empty or malformed template.
    pub fn parse_domain(template: &str) -> Result<Self> {
        let parts: Vec<&str> = template.split('.').filter(|s| !s.is_empty()).collect();
        if parts.is_empty() {
            return Err(RouterError::pattern(template, "domain pattern is empty"));
        }
        let mut pattern = Self::compile(template, &parts, false)?;
        pattern.template = parts.join(".");
        Ok(pattern)
    }

    fn compile(template: &str, parts: &[&str], allow_optional: bool) -> Result<Self> {
        let mut segments = Vec::with_capacity(parts.len());
        let mut binding_keys = Vec::new();
        let mut required = 0;

        for part in parts {
            let segment = match parse_placeholder(template, part)? {
                None => Segment::Literal((*part).to_string()),
                Some(placeholder) => {
                    if segments.iter().any(|s: &Segment| s.param() == Some(placeholder.name)) {
                        return Err(RouterError::pattern(
                            template,
                            format!("duplicate parameter '{}'", placeholder.name),
                        ));
                    }
                    if let Some(key) = placeholder.key {
                        binding_keys.push((placeholder.name.to_string(), key.to_string()));
                    }
                    if placeholder.optional {
                        if !allow_optional {
                            return Err(RouterError::pattern(
                                template,
                                format!(
                                    "optional parameter '{}' is not allowed here",
                                    placeholder.name
                                ),
                            ));
                        }
                        Segment::Optional(placeholder.name.to_string())
                    } else {
                        Segment::Required(placeholder.name.to_string())
                    }
                }
            };

            if !matches!(segment, Segment::Optional(_)) {
                if let Some(Segment::Optional(name)) = segments.last() {
                    return Err(RouterError::pattern(
                        template,
                        format!("optional parameter '{name}' must be at the end of the pattern"),
                    ));
                }
                required += 1;
            }
            segments.push(segment);
        }

        Ok(Self {
            template: template.to_string(),
            segments,
            binding_keys,
            required,
        })
    }

    /// Matches request path segments, writing captures into `params`.
    ///
    /// Captured values are percent-decoded. Absent optionals are recorded
    /// as [`crate::ParamValue::Absent`].
    pub(crate) fn capture(&self, parts: &[&str], params: &mut PathParams) -> bool {
        if parts.len() < self.required || parts.len() > self.segments.len() {
            return false;
        }

        for (i, segment) in self.segments.iter().enumerate() {
            match (segment, parts.get(i)) {
                (Segment::Literal(text), Some(part)) => {
                    if text != part {
                        return false;
                    }
                }
                (Segment::Required(name) | Segment::Optional(name), Some(part)) => {
                    params.insert(name.clone(), percent_decode(part, false));
                }
                (Segment::Optional(name), None) => params.insert_absent(name.clone()),
                // Unreachable given the length check above.
                (_, None) => return false,
            }
        }

        true
    }

    /// Matches host labels. Literal labels compare case-insensitively.
    pub(crate) fn capture_host(&self, labels: &[&str], params: &mut PathParams) -> bool {
        if labels.len() != self.segments.len() {
            return false;
        }

        for (segment, label) in self.segments.iter().zip(labels) {
            match segment {
                Segment::Literal(text) => {
                    if !text.eq_ignore_ascii_case(label) {
                        return false;
                    }
                }
                Segment::Required(name) | Segment::Optional(name) => {
                    params.insert(name.clone(), *label);
                }
            }
        }

        true
    }

    /// Returns the normalized template string.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the parsed segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the parameter names in declaration order.
    pub fn param_names(&self) -> Vec<&str> {
        self.segments.iter().filter_map(Segment::param).collect()
    }

    /// Returns `true` if the pattern declares `name`.
    pub fn has_param(&self, name: &str) -> bool {
        self.segments.iter().any(|s| s.param() == Some(name))
    }

    /// Binding keys declared with `{param:key}`.
    pub fn binding_keys(&self) -> &[(String, String)] {
        &self.binding_keys
    }

    /// Minimum number of path segments a request needs to match.
    pub fn required_len(&self) -> usize {
        self.required
    }
}

struct Placeholder<'a> {
    name: &'a str,
    key: Option<&'a str>,
    optional: bool,
}

/// Parses `{name}`, `{name?}`, `{name:key}` and `{name:key?}`.
///
/// Returns `None` for a literal segment.
fn parse_placeholder<'a>(template: &str, part: &'a str) -> Result<Option<Placeholder<'a>>> {
    let Some(inner) = part.strip_prefix('{') else {
        if part.contains(['{', '}']) {
            return Err(RouterError::pattern(
                template,
                format!("'{part}': a placeholder must span a whole segment"),
            ));
        }
        return Ok(None);
    };

    let inner = inner.strip_suffix('}').ok_or_else(|| {
        RouterError::pattern(template, format!("'{part}': unclosed placeholder"))
    })?;
    if inner.contains(['{', '}']) {
        return Err(RouterError::pattern(
            template,
            format!("'{part}': a placeholder must span a whole segment"),
        ));
    }

    let (inner, optional) = match inner.strip_suffix('?') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };
    let (name, key) = match inner.split_once(':') {
        Some((name, key)) => (name, Some(key)),
        None => (inner, None),
    };

    if !is_identifier(name) {
        return Err(RouterError::pattern(
            template,
            format!("'{part}': invalid parameter name '{name}'"),
        ));
    }
    if let Some(key) = key {
        if !is_identifier(key) {
            return Err(RouterError::pattern(
                template,
                format!("'{part}': invalid binding key '{key}'"),
            ));
        }
    }

    Ok(Some(Placeholder {
        name,
        key,
        optional,
    }))
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(pattern: &str, path: &str) -> Option<PathParams> {
        let pattern = Pattern::parse(pattern).unwrap();
        let parts: Vec<&str> = path.split('/').skip(1).collect();
        let mut params = PathParams::new();
        pattern.capture(&parts, &mut params).then_some(params)
    }

    #[test]
    fn test_literal_path() {
        assert!(capture("/users", "/users").is_some());
        assert!(capture("/users", "/posts").is_none());
        assert!(capture("/users", "/Users").is_none());
    }

    #[test]
    fn test_single_param() {
        let params = capture("/users/{id}", "/users/123").unwrap();
        assert_eq!(params.get("id"), Some("123"));
    }

    #[test]
    fn test_multiple_params() {
        let params =
            capture("/posts/{post_id}/comments/{comment_id}", "/posts/42/comments/7").unwrap();
        assert_eq!(params.get("post_id"), Some("42"));
        assert_eq!(params.get("comment_id"), Some("7"));
    }

    #[test]
    fn test_required_param_accepts_empty_value() {
        let params = capture("/posts/{id}/edit", "/posts//edit").unwrap();
        assert_eq!(params.get("id"), Some(""));
    }

    #[test]
    fn test_optional_params() {
        let params = capture("/user/{id}/{name?}", "/user/1").unwrap();
        assert_eq!(params.get("id"), Some("1"));
        assert!(params.value("name").unwrap().is_absent());

        let params = capture("/user/{id}/{name?}", "/user/1/john").unwrap();
        assert_eq!(params.get("name"), Some("john"));

        assert!(capture("/user/{id}/{name?}", "/user").is_none());
        assert!(capture("/user/{id}/{name?}", "/user/1/john/extra").is_none());
    }

    #[test]
    fn test_captures_are_percent_decoded() {
        let params = capture("/tags/{tag}", "/tags/rust%20lang").unwrap();
        assert_eq!(params.get("tag"), Some("rust lang"));
    }

    #[test]
    fn test_normalizes_slashes() {
        let pattern = Pattern::parse("admin//users/").unwrap();
        assert_eq!(pattern.template(), "/admin/users");
        assert_eq!(Pattern::parse("/").unwrap().template(), "/");
        assert!(Pattern::parse("/").unwrap().segments().is_empty());
    }

    #[test]
    fn test_trailing_optionals_are_legal() {
        assert!(Pattern::parse("/a/{x}/{y?}").is_ok());
        assert!(Pattern::parse("/a/{x?}/{y?}").is_ok());
    }

    #[test]
    fn test_non_trailing_optional_is_rejected() {
        let err = Pattern::parse("/a/{x?}/b").unwrap_err();
        assert!(matches!(err, RouterError::PatternSyntax { .. }));
        assert!(Pattern::parse("/a/{x?}/{y}").is_err());
    }

    #[test]
    fn test_duplicate_param_is_rejected() {
        assert!(matches!(
            Pattern::parse("/a/{id}/b/{id}"),
            Err(RouterError::PatternSyntax { .. })
        ));
    }

    #[test]
    fn test_param_names_are_case_sensitive() {
        let pattern = Pattern::parse("/a/{id}/{ID}").unwrap();
        assert_eq!(pattern.param_names(), vec!["id", "ID"]);
    }

    #[test]
    fn test_malformed_placeholders() {
        for template in [
            "/a/{id",
            "/a/id}",
            "/a/{}",
            "/a/{?}",
            "/a/x{id}",
            "/a/{id}x",
            "/a/{i-d}",
            "/a/{post:}",
            "/a/{{id}}",
        ] {
            assert!(
                matches!(Pattern::parse(template), Err(RouterError::PatternSyntax { .. })),
                "{template} should not compile"
            );
        }
    }

    #[test]
    fn test_inline_binding_key() {
        let pattern = Pattern::parse("/posts/{post:slug}/{page:number?}").unwrap();
        assert_eq!(pattern.param_names(), vec!["post", "page"]);
        assert_eq!(
            pattern.binding_keys(),
            &[
                ("post".to_string(), "slug".to_string()),
                ("page".to_string(), "number".to_string())
            ]
        );
    }

    #[test]
    fn test_domain_pattern() {
        let pattern = Pattern::parse_domain("{account}.example.com").unwrap();
        let mut params = PathParams::new();
        assert!(pattern.capture_host(&["acme", "Example", "COM"], &mut params));
        assert_eq!(params.get("account"), Some("acme"));

        let mut params = PathParams::new();
        assert!(!pattern.capture_host(&["example", "com"], &mut params));
        assert!(Pattern::parse_domain("{account?}.example.com").is_err());
        assert!(Pattern::parse_domain("").is_err());
    }
}
