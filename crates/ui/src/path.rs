use url::Url;

/// Canonical route key for a path, a hash fragment or a full URL.
///
/// A route carried in the hash wins over the pathname (`/#dashboard` is
/// `/dashboard`). Query strings are dropped, the result always starts with
/// `/` and repeated separators collapse. Applying it twice changes nothing.
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    let raw = raw.trim();
    let route = if raw.contains("://") {
        Url::parse(raw).map_or_else(|_| split_route(raw), |url| url_route(&url))
    } else {
        split_route(raw)
    };
    canonical(&route)
}

fn url_route(url: &Url) -> String {
    match url.fragment().map(strip_hash_prefix) {
        Some(fragment) if !fragment.trim().is_empty() => fragment.to_string(),
        _ => url.path().to_string(),
    }
}

fn split_route(raw: &str) -> String {
    match raw.split_once('#') {
        Some((before, after)) => {
            let after = strip_hash_prefix(after);
            if after.trim().is_empty() {
                before.to_string()
            } else {
                after.to_string()
            }
        }
        None => raw.to_string(),
    }
}

fn strip_hash_prefix(fragment: &str) -> &str {
    let fragment = fragment.trim_start_matches('#');
    fragment.strip_prefix('/').unwrap_or(fragment)
}

fn canonical(route: &str) -> String {
    // Anything after a second '#' or a '?' is not part of the route.
    let route = route.split(['#', '?']).next().unwrap_or_default().trim();

    let mut out = String::with_capacity(route.len() + 1);
    out.push('/');
    for ch in route.chars() {
        if ch == '/' && out.ends_with('/') {
            continue;
        }
        out.push(ch);
    }
    out
}
