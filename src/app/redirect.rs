//! `redirectTo` handling shared by login and the organization chooser.

use axum::http::Uri;

pub const LOGIN_PATH: &str = "/login";
pub const CHOOSE_ORG_PATH: &str = "/choose-org";
pub const HOME_PATH: &str = "/";

/// Query parameter carrying the originally requested path.
pub const REDIRECT_PARAM: &str = "redirectTo";

/// Path and query of the current request, used as the return destination.
pub fn original_path(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| HOME_PATH.to_string())
}

fn with_redirect(base: &str, redirect_to: &str) -> String {
    if redirect_to.is_empty() {
        return base.to_string();
    }
    format!("{}?{}={}", base, REDIRECT_PARAM, urlencoding::encode(redirect_to))
}

/// `/login?redirectTo=<encoded path>`
pub fn login_url(redirect_to: &str) -> String {
    with_redirect(LOGIN_PATH, redirect_to)
}

/// `/choose-org?redirectTo=<encoded path>`
pub fn choose_org_url(redirect_to: &str) -> String {
    with_redirect(CHOOSE_ORG_PATH, redirect_to)
}

/// Nested `redirectTo` hops followed before giving up.
const MAX_NESTED_REDIRECTS: usize = 3;

/// Normalize a submitted `redirectTo` into a local destination.
///
/// Missing and external (`//host`, `https://…`) targets collapse to the
/// application root. A target pointing at the login page or the chooser is
/// replaced by its own `redirectTo`, so a session that expired on
/// `/choose-org?redirectTo=%2Faccounts` still ends up on `/accounts`.
pub fn safe_redirect_target(raw: Option<&str>) -> String {
    sanitize(raw, MAX_NESTED_REDIRECTS)
}

fn sanitize(raw: Option<&str>, hops_left: usize) -> String {
    let target = match raw.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return HOME_PATH.to_string(),
    };

    if !target.starts_with('/') || target.starts_with("//") || target.starts_with("/\\") {
        return HOME_PATH.to_string();
    }

    let path = target.split(['?', '#']).next().unwrap_or(target);
    let path = path.trim_end_matches('/');
    if path == CHOOSE_ORG_PATH || path == LOGIN_PATH {
        if hops_left == 0 {
            return HOME_PATH.to_string();
        }
        return sanitize(nested_target(target).as_deref(), hops_left - 1);
    }

    target.to_string()
}

/// Decoded `redirectTo` parameter of a target's query string.
fn nested_target(target: &str) -> Option<String> {
    let query = target.split('#').next()?.split_once('?')?.1;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == REDIRECT_PARAM)
        .and_then(|(_, value)| {
            urlencoding::decode(&value.replace('+', " "))
                .ok()
                .map(|decoded| decoded.into_owned())
        })
}
