//! Header rewriting applied to admitted requests.
//!
//! Actions run in declaration order and each one observes the writes of
//! the ones before it, so a rename followed by a copy of the renamed
//! header behaves like a pipeline. Typical use is promoting a proxy's
//! `X-Real-IP` into `X-Forwarded-For` and stripping headers the upstream
//! must never receive from the outside.

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};

/// One validated header rewrite step.
///
/// Names are parsed [`HeaderName`]s, so an action list that compiled can
/// never fail at request time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderAction {
    /// Write the source's value to the target, leaving the source in
    /// place. Does nothing when the source is missing or empty.
    Copy { source: HeaderName, target: HeaderName },
    /// Move the source's value to the target. Does nothing when the
    /// source is missing or empty.
    Rename { source: HeaderName, target: HeaderName },
    /// Drop the source unconditionally.
    Delete { source: HeaderName },
}

/// Apply the actions to a request's headers, in order.
pub fn apply_actions(actions: &[HeaderAction], headers: &mut HeaderMap) {
    for action in actions {
        match action {
            HeaderAction::Copy { source, target } => {
                if let Some(value) = non_empty(headers, source) {
                    headers.insert(target.clone(), value);
                }
            }
            HeaderAction::Rename { source, target } => {
                if let Some(value) = non_empty(headers, source) {
                    headers.remove(source);
                    headers.insert(target.clone(), value);
                }
            }
            HeaderAction::Delete { source } => {
                headers.remove(source);
            }
        }
    }
}

fn non_empty(headers: &HeaderMap, name: &HeaderName) -> Option<HeaderValue> {
    headers.get(name).filter(|value| !value.is_empty()).cloned()
}
