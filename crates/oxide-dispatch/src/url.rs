//! Reverse URL generation for named routes.

use crate::error::{Result, RouterError};
use crate::pattern::{Pattern, Segment};
use crate::route::Route;

/// Parameters passed to [`crate::Router::url_for`].
///
/// Keeps the order in which keys were first supplied; extra keys end up in
/// the query string in that order.
///
/// ```
/// use oxide_dispatch::UrlParams;
///
/// let params = UrlParams::from([("id", 1)]).with("tab", "posts");
/// assert_eq!(params.get("id"), Some("1"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParams {
    entries: Vec<(String, String)>,
}

impl UrlParams {
    /// Creates empty parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`. A repeated key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder form of [`UrlParams::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    /// Gets a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates in first-declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: ToString, const N: usize> From<[(K, V); N]> for UrlParams {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for UrlParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Generates the URL for `route`.
///
/// Routes with a domain produce a scheme-relative URL (`//host/path`).
pub(crate) fn build(route: &Route, params: &UrlParams) -> Result<String> {
    let route_name = route.name().unwrap_or_else(|| route.pattern().template());
    let mut consumed: Vec<&str> = Vec::new();
    let mut url = String::new();

    if let Some(domain) = route.domain() {
        url.push_str("//");
        url.push_str(&render(domain, params, &mut consumed, route_name, Separator::Dot)?);
    }
    url.push_str(&render(route.pattern(), params, &mut consumed, route_name, Separator::Slash)?);

    let query: Vec<String> = params
        .iter()
        .filter(|(k, _)| !consumed.contains(k))
        .map(|(k, v)| {
            format!(
                "{}={}",
                percent_encode(k, QUERY_SAFE),
                percent_encode(v, QUERY_SAFE)
            )
        })
        .collect();
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query.join("&"));
    }

    Ok(url)
}

#[derive(Clone, Copy)]
enum Separator {
    Slash,
    Dot,
}

fn render<'p>(
    pattern: &Pattern,
    params: &'p UrlParams,
    consumed: &mut Vec<&'p str>,
    route_name: &str,
    separator: Separator,
) -> Result<String> {
    let missing = |param: &str| RouterError::MissingUrlParameter {
        route: route_name.to_string(),
        param: param.to_string(),
    };
    let encode = |name: &str, value: &str| match separator {
        Separator::Slash => Ok(percent_encode(value, PATH_SAFE)),
        Separator::Dot if is_host_label(value) => Ok(value.to_string()),
        Separator::Dot => Err(RouterError::InvalidHostLabel {
            route: route_name.to_string(),
            param: name.to_string(),
            value: value.to_string(),
        }),
    };

    let mut parts: Vec<String> = Vec::with_capacity(pattern.segments().len());
    // First optional left out; a later optional cannot be placed after a gap.
    let mut gap: Option<&str> = None;

    for segment in pattern.segments() {
        match segment {
            Segment::Literal(text) => parts.push(text.clone()),
            Segment::Required(name) => {
                let (key, value) = lookup(params, name).ok_or_else(|| missing(name.as_str()))?;
                parts.push(encode(name.as_str(), value)?);
                consumed.push(key);
            }
            Segment::Optional(name) => match lookup(params, name) {
                Some((key, value)) => {
                    if let Some(earlier) = gap {
                        return Err(missing(earlier));
                    }
                    parts.push(encode(name.as_str(), value)?);
                    consumed.push(key);
                }
                None => {
                    gap = gap.or(Some(name.as_str()));
                }
            },
        }
    }

    Ok(match separator {
        Separator::Slash => format!("/{}", parts.join("/")),
        Separator::Dot => parts.join("."),
    })
}

fn lookup<'p>(params: &'p UrlParams, name: &str) -> Option<(&'p str, &'p str)> {
    params.iter().find(|(k, _)| *k == name)
}

/// A single DNS label: letters, digits and inner hyphens.
fn is_host_label(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('-')
        && !value.ends_with('-')
        && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// Characters left as-is inside a path segment, besides unreserved ones.
const PATH_SAFE: &[u8] = b"!$&'()*+,;=:@";
/// Characters left as-is inside a query key or value, besides unreserved ones.
const QUERY_SAFE: &[u8] = b"!$'()*,;:@/";

pub(crate) fn percent_encode(s: &str, safe: &[u8]) -> String {
    let mut out = String::with_capacity(s.len());
    for &byte in s.as_bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) || safe.contains(&byte) {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Decodes `%XX` escapes. Malformed escapes are kept verbatim.
pub(crate) fn percent_decode(s: &str, plus_as_space: bool) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let decoded = bytes
                    .get(i + 1..i + 3)
                    .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                if let Some(byte) = decoded {
                    out.push(byte);
                    i += 3;
                    continue;
                }
                out.push(b'%');
            }
            b'+' if plus_as_space => out.push(b' '),
            other => out.push(other),
        }
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_params_keep_first_position() {
        let params = UrlParams::new()
            .with("b", 1)
            .with("a", 2)
            .with("b", 3);
        let pairs: Vec<(&str, &str)> = params.iter().collect();
        assert_eq!(pairs, vec![("b", "3"), ("a", "2")]);
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("john doe", PATH_SAFE), "john%20doe");
        assert_eq!(percent_encode("a/b", PATH_SAFE), "a%2Fb");
        assert_eq!(percent_encode("a&b=c", QUERY_SAFE), "a%26b%3Dc");
        assert_eq!(percent_encode("café", PATH_SAFE), "caf%C3%A9");
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("caf%C3%A9", false), "café");
        assert_eq!(percent_decode("a+b", false), "a+b");
        assert_eq!(percent_decode("a+b", true), "a b");
        assert_eq!(percent_decode("100%", false), "100%");
        assert_eq!(percent_decode("%zz", false), "%zz");
    }

    #[test]
    fn test_host_labels() {
        assert!(is_host_label("acme"));
        assert!(is_host_label("acme-42"));
        assert!(!is_host_label(""));
        assert!(!is_host_label("-acme"));
        assert!(!is_host_label("evil.com"));
        assert!(!is_host_label("a/b"));
        assert!(!is_host_label("x?"));
    }
}
