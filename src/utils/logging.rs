use serde::Serialize;

/// Log `value` as pretty JSON at debug level; serialization is skipped when debug is off.
pub(crate) fn debug_pretty_json<T>(what: &str, value: &T)
where
    T: Serialize,
{
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    match serde_json::to_string_pretty(value) {
        Ok(pretty) => tracing::debug!(what, "{pretty}"),
        Err(error) => tracing::debug!(what, %error, "<pretty serialize failed>"),
    }
}
