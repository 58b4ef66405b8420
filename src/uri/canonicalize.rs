use crate::UriError;
use url::Url;

/// Session-id-like query parameters removed during canonicalization
const SESSION_PARAMS: &[&str] = &["jsessionid", "phpsessid", "sid", "sessionid", "cfid", "cftoken"];

/// Tracking query parameters removed during canonicalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// Canonicalizes a raw URI string
///
/// Deterministic and pure: the same input always yields the same output
/// within one crawl configuration.
///
/// # Canonicalization Steps
///
/// 1. Parse the URI; reject if malformed
/// 2. Require an HTTP or HTTPS scheme (the `url` crate lower-cases schemes)
/// 3. Lowercase the host
/// 4. Strip default ports (80 for http, 443 for https)
/// 5. Normalize the path:
///    - Remove dot segments (. and ..)
///    - Collapse duplicate slashes
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 6. Remove the fragment
/// 7. Remove session-id-like and tracking query parameters
/// 8. Sort remaining query parameters alphabetically
/// 9. Remove an empty query string (trailing ?)
///
/// # Returns
///
/// * `Ok(Url)` - Canonical URI
/// * `Err(UriError)` - Failed to parse or canonicalize
///
/// # Examples
///
/// ```
/// use kumo_frontier::uri::canonicalize;
///
/// let uri = canonicalize("HTTP://EXAMPLE.COM:80/page/?b=2&a=1#frag").unwrap();
/// assert_eq!(uri.as_str(), "http://example.com/page?a=1&b=2");
/// ```
pub fn canonicalize(raw: &str) -> Result<Url, UriError> {
    // Step 1: Parse
    let mut url = Url::parse(raw).map_err(|e| UriError::Parse(e.to_string()))?;

    // Step 2: Validate scheme
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UriError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    // Steps 3 & 4: Lowercase host; the url crate already omits default ports
    // for http/https when serializing, so stripping happens at parse time.
    match url.host_str() {
        Some(host) => {
            let lowered = host.to_lowercase();
            if lowered != host {
                url.set_host(Some(&lowered))
                    .map_err(|e| UriError::Malformed(format!("Failed to set host: {}", e)))?;
            }
        }
        None => return Err(UriError::MissingHost),
    }

    // Step 5: Normalize path
    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    // Step 6: Remove fragment
    url.set_fragment(None);

    // Steps 7 & 8: Filter and sort query parameters
    if url.query().is_some() {
        let filtered = filter_and_sort_query_params(&url);

        // Step 9: Set query or remove if empty
        if filtered.is_empty() {
            url.set_query(None);
        } else {
            let query_string = filtered
                .iter()
                .map(|(k, v)| {
                    if v.is_empty() {
                        k.clone()
                    } else {
                        format!("{}={}", k, v)
                    }
                })
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query_string));
        }
    }

    Ok(url)
}

/// Normalizes a URI path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            // Skip empty segments (duplicate slashes) and current-directory markers
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Filters out session/tracking parameters and sorts the remainder by key
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_stripped_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

/// Checks if a query parameter is a session-id or tracking parameter
fn is_stripped_param(key: &str) -> bool {
    let lowered = key.to_lowercase();

    if SESSION_PARAMS.contains(&lowered.as_str()) {
        return true;
    }

    if TRACKING_PARAMS.contains(&lowered.as_str()) {
        return true;
    }

    // Catches any utm parameter
    lowered.starts_with("utm_")
}
