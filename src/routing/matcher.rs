//! Route matching logic.
//!
//! # Responsibilities
//! - Match a path prefix segment by segment
//! - Capture `{name}` segments as route parameters
//! - Filter on request method
//!
//! # Design Decisions
//! - Segment matching is case-sensitive
//! - An empty pattern matches every path (wildcard)
//! - No regex to guarantee O(n) matching

use axum::http::Method;
use serde_json::Value;

use crate::http::request::Params;

/// One segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled path prefix such as `/api/users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(s.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Number of segments the pattern consumes.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Match the leading segments of `path`, returning captured parameters.
    pub fn match_prefix(&self, path: &[String]) -> Option<Params> {
        if path.len() < self.segments.len() {
            return None;
        }
        let mut params = Params::new();
        for (segment, actual) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(expected) if expected == actual => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), Value::String(actual.clone()));
                }
            }
        }
        Some(params)
    }
}

/// Matches the request method. `None` accepts any method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodFilter(Option<Method>);

impl MethodFilter {
    pub fn any() -> Self {
        Self(None)
    }

    pub fn only(method: Method) -> Self {
        Self(Some(method))
    }

    pub fn matches(&self, method: &Method) -> bool {
        match &self.0 {
            None => true,
            // HEAD is served wherever GET is.
            Some(expected) => {
                expected == method || (*expected == Method::GET && *method == Method::HEAD)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> Vec<String> {
        p.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect()
    }

    #[test]
    fn test_literal_prefix() {
        let pattern = PathPattern::parse("/api/users");
        assert_eq!(pattern.len(), 2);
        assert!(pattern.match_prefix(&path("/api/users")).is_some());
        assert!(pattern.match_prefix(&path("/api/users/42/posts")).is_some());
        assert!(pattern.match_prefix(&path("/api")).is_none());
        assert!(pattern.match_prefix(&path("/api/Users")).is_none());
    }

    #[test]
    fn test_param_capture() {
        let pattern = PathPattern::parse("/users/{id}");
        let params = pattern.match_prefix(&path("/users/42/edit")).unwrap();
        assert_eq!(params["id"], "42");
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        let pattern = PathPattern::parse("/");
        assert!(pattern.is_empty());
        assert!(pattern.match_prefix(&path("/anything/at/all")).is_some());
        assert!(pattern.match_prefix(&[]).is_some());
    }

    #[test]
    fn test_method_filter() {
        assert!(MethodFilter::any().matches(&Method::DELETE));
        let get = MethodFilter::only(Method::GET);
        assert!(get.matches(&Method::GET));
        assert!(get.matches(&Method::HEAD));
        assert!(!get.matches(&Method::POST));
    }
}
