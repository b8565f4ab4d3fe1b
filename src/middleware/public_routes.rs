/// Public route allow-list
///
/// Decides, from method and path alone, whether a request may skip the
/// access-token check. Rules are evaluated in order and the first match
/// wins; anything unmatched is protected.
///
/// Path patterns are segment based: `*` matches exactly one non-empty
/// segment, `**` matches whatever remains (including nothing).

use actix_web::http::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
}

#[derive(Debug, Clone)]
struct RouteRule {
    /// `None` matches every method
    method: Option<Method>,
    pattern: String,
    access: Access,
}

#[derive(Debug, Clone)]
pub struct PublicRoutes {
    rules: Vec<RouteRule>,
}

impl PublicRoutes {
    /// An empty list: every route is protected
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn public(mut self, method: Option<Method>, pattern: &str) -> Self {
        self.rules.push(RouteRule {
            method,
            pattern: pattern.to_string(),
            access: Access::Public,
        });
        self
    }

    /// Carve a protected exception out of a broader public rule added later
    pub fn protected(mut self, method: Option<Method>, pattern: &str) -> Self {
        self.rules.push(RouteRule {
            method,
            pattern: pattern.to_string(),
            access: Access::Protected,
        });
        self
    }

    pub fn access(&self, method: &Method, path: &str) -> Access {
        self.rules
            .iter()
            .find(|rule| {
                rule.method.as_ref().map_or(true, |m| m == method) && path_matches(&rule.pattern, path)
            })
            .map_or(Access::Protected, |rule| rule.access)
    }

    pub fn is_public(&self, method: &Method, path: &str) -> bool {
        self.access(method, path) == Access::Public
    }
}

impl Default for PublicRoutes {
    fn default() -> Self {
        Self::new()
            // "my ..." listings sit under public prefixes but need a caller
            .protected(Some(Method::GET), "/photo/my")
            .protected(None, "/exhibition/my")
            .public(Some(Method::GET), "/exhibition/all")
            .public(Some(Method::GET), "/exhibition/*")
            .public(Some(Method::GET), "/photo/*")
            .public(Some(Method::GET), "/login/**")
            .public(Some(Method::POST), "/user")
            .public(Some(Method::POST), "/user/join")
            .public(Some(Method::POST), "/user/exist")
            .public(None, "/auth/login")
            .public(None, "/auth/refresh")
            .public(None, "/auth/exchange")
            .public(None, "/auth/logout")
            .public(None, "/health_check")
    }
}

fn path_matches(pattern: &str, path: &str) -> bool {
    let pattern: Vec<&str> = pattern.trim_start_matches('/').split('/').collect();
    let path: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    segments_match(&pattern, &path)
}

fn segments_match(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"**", _)) => true,
        Some((segment, rest)) => match path.split_first() {
            Some((actual, remaining)) => {
                let matched = if *segment == "*" {
                    !actual.is_empty()
                } else {
                    segment == actual
                };
                matched && segments_match(rest, remaining)
            }
            None => false,
        },
    }
}
