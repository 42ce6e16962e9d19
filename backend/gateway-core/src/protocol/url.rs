/// Map a user-supplied gateway address onto a WebSocket URL.
///
/// `http://` becomes `ws://`, `https://` becomes `wss://`, a missing scheme
/// gets `ws://`, and trailing slashes are removed.
pub fn normalize_gateway_url(gateway_url: &str) -> String {
    let trimmed = gateway_url.trim();

    let with_scheme = if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
        trimmed.to_string()
    } else {
        format!("ws://{trimmed}")
    };

    with_scheme.trim_end_matches('/').to_string()
}
