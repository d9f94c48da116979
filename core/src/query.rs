//! Query string helpers.
//!
//! Keys and values are appended verbatim. Percent-encoding is the caller's
//! job.

pub const EMPTY_QUERY_PARAMS: &str = "";

pub const QUERY_PARAM_FIRST_SEP: &str = "?";

pub const QUERY_PARAM_ADDITIONAL_SEP: &str = "&";

/// Append `key=value` to `query`, opening it with `?` if it has no `?` yet
/// and joining with `&` otherwise.
pub fn append_query_param(query: &str, key: &str, value: &str) -> String {
    let sep = query_param_separator(query.contains(QUERY_PARAM_FIRST_SEP));
    format!("{query}{sep}{key}={value}")
}

/// The separator to use before the next parameter.
pub fn query_param_separator(appended: bool) -> &'static str {
    if appended {
        QUERY_PARAM_ADDITIONAL_SEP
    } else {
        QUERY_PARAM_FIRST_SEP
    }
}
