//! Dynamic route patterns such as `/posts/[id]`.

use pagemeter_core::{Error, Result};
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::collections::HashMap;

/// Name of a `[name]` segment, if the whole segment is a parameter.
fn param_name(segment: &str) -> Option<&str> {
    segment
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .filter(|name| !name.is_empty())
}

/// Returns true if some segment of `route` is wholly a `[name]` parameter.
pub fn is_dynamic_route(route: &str) -> bool {
    route.split('/').skip(1).any(|segment| param_name(segment).is_some())
}

/// Compiled matcher for one route pattern.
#[derive(Debug, Clone)]
pub struct RouteRegex {
    regex: Regex,
    params: Vec<String>,
}

impl RouteRegex {
    /// Compiles `route`. Matching is case-insensitive and tolerates one
    /// trailing slash.
    pub fn new(route: &str) -> Result<Self> {
        let mut params = Vec::new();
        let mut pattern = String::from("(?i)^");

        let body = route.trim_matches('/');
        if body.is_empty() {
            pattern.push('/');
        } else {
            for segment in body.split('/') {
                pattern.push('/');
                match param_name(segment) {
                    Some(name) => {
                        params.push(name.to_string());
                        pattern.push_str("([^/]+?)");
                    }
                    None => pattern.push_str(&regex::escape(segment)),
                }
            }
        }
        pattern.push_str("(?:/)?$");

        let regex = Regex::new(&pattern)
            .map_err(|e| Error::Pattern(format!("route {}: {}", route, e)))?;

        Ok(Self { regex, params })
    }

    /// Parameter names in the order they appear in the route.
    pub fn param_names(&self) -> &[String] {
        &self.params
    }

    /// Decoded parameter values if `path` matches the route.
    ///
    /// A value that is not valid percent-encoded UTF-8 makes the path a
    /// non-match.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let captures = self.regex.captures(path)?;

        self.params
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let raw = captures.get(i + 1)?.as_str();
                let value = percent_decode_str(raw).decode_utf8().ok()?;
                Some((name.clone(), value.into_owned()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_dynamic_route() {
        assert!(is_dynamic_route("/posts/[id]"));
        assert!(is_dynamic_route("/[lang]/about"));
        assert!(!is_dynamic_route("/posts"));
        assert!(!is_dynamic_route("/"));
        assert!(!is_dynamic_route("/posts/item-[id]"));
        assert!(!is_dynamic_route("/posts/[]"));
    }

    #[test]
    fn test_param_names_in_order() {
        let route = RouteRegex::new("/[lang]/posts/[id]").unwrap();
        assert_eq!(route.param_names(), ["lang", "id"]);
    }

    #[test]
    fn test_matches_and_decodes() {
        let route = RouteRegex::new("/posts/[id]").unwrap();

        let params = route.matches("/posts/hello%20world").unwrap();
        assert_eq!(params["id"], "hello world");

        assert!(route.matches("/POSTS/abc/").is_some());
        assert!(route.matches("/posts").is_none());
        assert!(route.matches("/posts/a/b").is_none());
        assert!(route.matches("/other/abc").is_none());
    }

    #[test]
    fn test_invalid_utf8_is_not_a_match() {
        let route = RouteRegex::new("/posts/[id]").unwrap();
        assert!(route.matches("/posts/%FF").is_none());
    }

    #[test]
    fn test_static_segments_are_escaped() {
        let route = RouteRegex::new("/a.b/[id]").unwrap();
        assert!(route.matches("/a.b/1").is_some());
        assert!(route.matches("/axb/1").is_none());
    }

    #[test]
    fn test_index_route() {
        let route = RouteRegex::new("/").unwrap();
        assert!(route.matches("/").is_some());
        assert!(route.matches("/x").is_none());
    }

    #[test]
    fn test_route_matches_itself() {
        // The pattern of a route accepts the route key, yielding the names.
        let route = RouteRegex::new("/posts/[id]").unwrap();
        let params = route.matches("/posts/[id]").unwrap();
        assert_eq!(params["id"], "[id]");
    }
}
