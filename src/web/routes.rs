//! Named routes and their URL patterns.
//!
//! Handlers and templates never hard-code paths; they go through the
//! constants here or [`reverse`].

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

pub const HOME: &str = "/";
pub const NOTES_LIST: &str = "/notes/";
pub const NOTES_ADD: &str = "/add/";
pub const NOTES_DETAIL: &str = "/note/{slug}/";
pub const NOTES_EDIT: &str = "/edit/{slug}/";
pub const NOTES_DELETE: &str = "/delete/{slug}/";
pub const NOTES_SUCCESS: &str = "/done/";
pub const LOGIN: &str = "/auth/login/";
pub const LOGOUT: &str = "/auth/logout/";
pub const SIGNUP: &str = "/auth/signup/";

/// Everything except unreserved characters and `/` gets escaped.
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Route name to URL pattern.
pub const ROUTES: &[(&str, &str)] = &[
    ("notes:home", HOME),
    ("notes:list", NOTES_LIST),
    ("notes:add", NOTES_ADD),
    ("notes:detail", NOTES_DETAIL),
    ("notes:edit", NOTES_EDIT),
    ("notes:delete", NOTES_DELETE),
    ("notes:success", NOTES_SUCCESS),
    ("users:login", LOGIN),
    ("users:logout", LOGOUT),
    ("users:signup", SIGNUP),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("No route named '{0}'")]
    UnknownName(String),

    #[error("Route '{name}' takes {expected} argument(s), got {given}")]
    ArgumentCount {
        name: String,
        expected: usize,
        given: usize,
    },
}

/// Resolve a route name and its positional arguments to a concrete path.
pub fn reverse(name: &str, args: &[&str]) -> Result<String, RouteError> {
    let pattern = ROUTES
        .iter()
        .find(|(route, _)| *route == name)
        .map(|(_, pattern)| *pattern)
        .ok_or_else(|| RouteError::UnknownName(name.to_string()))?;

    let expected = pattern.matches('{').count();
    if expected != args.len() {
        return Err(RouteError::ArgumentCount {
            name: name.to_string(),
            expected,
            given: args.len(),
        });
    }

    let mut url = String::with_capacity(pattern.len());
    let mut rest = pattern;
    for arg in args {
        // patterns are static and balanced
        let (Some(start), Some(end)) = (rest.find('{'), rest.find('}')) else {
            break;
        };
        url.push_str(&rest[..start]);
        url.push_str(&percent_encode(arg));
        rest = &rest[end + 1..];
    }
    url.push_str(rest);
    Ok(url)
}

pub fn detail_url(slug: &str) -> String {
    with_slug(NOTES_DETAIL, slug)
}

pub fn edit_url(slug: &str) -> String {
    with_slug(NOTES_EDIT, slug)
}

pub fn delete_url(slug: &str) -> String {
    with_slug(NOTES_DELETE, slug)
}

/// Login URL carrying the page to return to, e.g. `/auth/login/?next=/add/`.
pub fn login_redirect_url(next: &str) -> String {
    format!("{}?next={}", LOGIN, percent_encode(next))
}

/// Only same-site absolute paths are accepted as post-login targets.
pub fn is_safe_next(next: &str) -> bool {
    next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')
}

fn with_slug(pattern: &str, slug: &str) -> String {
    pattern.replace("{slug}", &percent_encode(slug))
}

fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, PATH_SAFE).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_static_routes() {
        assert_eq!(reverse("notes:home", &[]).unwrap(), "/");
        assert_eq!(reverse("notes:list", &[]).unwrap(), "/notes/");
        assert_eq!(reverse("notes:success", &[]).unwrap(), "/done/");
        assert_eq!(reverse("users:signup", &[]).unwrap(), "/auth/signup/");
    }

    #[test]
    fn test_reverse_slug_routes() {
        assert_eq!(reverse("notes:detail", &["slug"]).unwrap(), "/note/slug/");
        assert_eq!(reverse("notes:edit", &["slug_1"]).unwrap(), "/edit/slug_1/");
        assert_eq!(reverse("notes:delete", &["a-b"]).unwrap(), "/delete/a-b/");
        assert_eq!(edit_url("a-b"), reverse("notes:edit", &["a-b"]).unwrap());
    }

    #[test]
    fn test_reverse_errors() {
        assert_eq!(
            reverse("notes:nope", &[]),
            Err(RouteError::UnknownName("notes:nope".to_string()))
        );
        assert!(matches!(
            reverse("notes:detail", &[]),
            Err(RouteError::ArgumentCount { expected: 1, given: 0, .. })
        ));
        assert!(reverse("notes:list", &["extra"]).is_err());
    }

    #[test]
    fn test_login_redirect_url() {
        assert_eq!(login_redirect_url("/add/"), "/auth/login/?next=/add/");
        assert_eq!(
            login_redirect_url("/notes/?page=2"),
            "/auth/login/?next=/notes/%3Fpage%3D2"
        );
        assert_eq!(
            login_redirect_url("/note/a b~c/"),
            "/auth/login/?next=/note/a%20b~c/"
        );
    }

    #[test]
    fn test_slug_segments_are_escaped() {
        assert_eq!(detail_url("я"), "/note/%D1%8F/");
        assert_eq!(reverse("notes:delete", &["a&b"]).unwrap(), "/delete/a%26b/");
    }

    #[test]
    fn test_is_safe_next() {
        assert!(is_safe_next("/add/"));
        assert!(!is_safe_next("https://evil.example/"));
        assert!(!is_safe_next("//evil.example/"));
        assert!(!is_safe_next(""));
    }
}
