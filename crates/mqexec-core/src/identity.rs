//! Client identity for the broker session.

use crate::session::MAX_CLIENT_ID_LEN;

/// Prefix used when the operator does not pick one.
pub const DEFAULT_ID_PREFIX: &str = "mqexec";

/// Build `"<prefix>/<pid hex>-<hostname>"`, truncated to the broker limit.
///
/// Two agents on the same host differ by PID, so their ids do not collide
/// unless truncation cuts the PID off.
#[must_use]
pub fn default_client_id(prefix: &str) -> String {
    client_id_for(prefix, std::process::id(), &hostname())
}

/// Deterministic form of [`default_client_id`].
#[must_use]
pub fn client_id_for(prefix: &str, pid: u32, hostname: &str) -> String {
    let id = format!("{prefix}/{pid:x}-{hostname}");
    truncate_on_char_boundary(id, MAX_CLIENT_ID_LEN)
}

/// Local hostname, or `localhost` when the OS does not report a usable one.
#[must_use]
pub fn hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| {
            tracing::debug!("Could not determine hostname, using localhost");
            "localhost".to_string()
        })
}

fn truncate_on_char_boundary(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}
