use url::Url;

/// Maps a canonical URI to the queue key under which politeness is enforced
///
/// Implementations must be deterministic: the same canonical URI always maps
/// to the same key, both at submission time and at any later re-derivation.
pub trait QueueAssignment: Send + Sync {
    /// Derives the queue key for a canonical URI
    ///
    /// Returns `None` if the URI carries no usable grouping identity
    /// (canonical HTTP(S) URIs always have one).
    fn queue_key(&self, uri: &Url) -> Option<String>;
}

/// Default assignment policy: the target host, port-qualified when the URI
/// carries a non-default port
#[derive(Debug, Default, Clone, Copy)]
pub struct HostAssignment;

impl QueueAssignment for HostAssignment {
    fn queue_key(&self, uri: &Url) -> Option<String> {
        queue_key(uri)
    }
}

/// Derives the default host-based queue key for a canonical URI
///
/// # Examples
///
/// ```
/// use url::Url;
/// use kumo_frontier::uri::queue_key;
///
/// let uri = Url::parse("https://example.com/path").unwrap();
/// assert_eq!(queue_key(&uri), Some("example.com".to_string()));
///
/// let uri = Url::parse("https://example.com:8443/path").unwrap();
/// assert_eq!(queue_key(&uri), Some("example.com:8443".to_string()));
/// ```
pub fn queue_key(uri: &Url) -> Option<String> {
    let host = uri.host_str()?.to_lowercase();
    match uri.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}
