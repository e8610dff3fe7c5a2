//! # MQTT Topics
//!
//! Topic-name validation and topic-filter matching.
//!
//! ## Matching Rules
//!
//! | Filter | Matches | Does not match |
//! |--------|---------|----------------|
//! | `a/+/up` | `a/dev1/up` | `a/dev1/x/up` |
//! | `a/#` | `a`, `a/b`, `a/b/c` | `b/a` |
//! | `#` | every topic not starting with `$` | `$SYS/uptime` |

use thiserror::Error;

/// Level separator.
pub const SEPARATOR: char = '/';
/// Single-level wildcard.
pub const SINGLE_LEVEL: &str = "+";
/// Multi-level wildcard.
pub const MULTI_LEVEL: &str = "#";

/// Errors from topic validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopicError {
    /// Topic or filter is empty.
    #[error("Topic is empty")]
    Empty,

    /// A topic name used for publishing contains a wildcard.
    #[error("Topic name {0:?} contains a wildcard")]
    WildcardInName(String),

    /// A wildcard is not alone in its level, or `#` is not last.
    #[error("Topic filter {0:?} has a misplaced wildcard")]
    MisplacedWildcard(String),
}

/// Validate a concrete topic name (publish target).
pub fn validate_name(topic: &str) -> Result<(), TopicError> {
    if topic.is_empty() {
        return Err(TopicError::Empty);
    }
    if topic.contains(['+', '#']) {
        return Err(TopicError::WildcardInName(topic.to_string()));
    }
    Ok(())
}

/// Validate a topic filter (subscription target).
pub fn validate_filter(filter: &str) -> Result<(), TopicError> {
    if filter.is_empty() {
        return Err(TopicError::Empty);
    }

    let levels: Vec<&str> = filter.split(SEPARATOR).collect();
    let last = levels.len() - 1;
    for (i, level) in levels.iter().enumerate() {
        let misplaced = match *level {
            MULTI_LEVEL => i != last,
            SINGLE_LEVEL => false,
            other => other.contains(['+', '#']),
        };
        if misplaced {
            return Err(TopicError::MisplacedWildcard(filter.to_string()));
        }
    }
    Ok(())
}

/// Check whether `topic` is matched by `filter`.
#[must_use]
pub fn matches(filter: &str, topic: &str) -> bool {
    // Wildcards never match the broker's `$` topics at the first level
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut filter_levels = filter.split(SEPARATOR);
    let mut topic_levels = topic.split(SEPARATOR);

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some(MULTI_LEVEL), _) => return true,
            (Some(SINGLE_LEVEL), Some(_)) => continue,
            (Some(f), Some(t)) if f == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Replace the trailing level `from` of `topic` with `to`.
///
/// Returns `None` when the last level is not `from`.
#[must_use]
pub fn swap_suffix(topic: &str, from: &str, to: &str) -> Option<String> {
    let (prefix, last) = match topic.rsplit_once(SEPARATOR) {
        Some((prefix, last)) => (Some(prefix), last),
        None => (None, topic),
    };
    if last != from {
        return None;
    }
    Some(match prefix {
        Some(prefix) => format!("{prefix}{SEPARATOR}{to}"),
        None => to.to_string(),
    })
}
