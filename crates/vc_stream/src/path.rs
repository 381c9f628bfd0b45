use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::error::StreamError;

/// The stack of objects and fields a stream is currently inside.
///
/// Rendered as `Start/Group/Children/Widget/Width` in error messages.
#[derive(Debug)]
pub(crate) struct FieldPath(Vec<String>);

impl Default for FieldPath {
    fn default() -> Self {
        Self(Vec::from([String::from("Start")]))
    }
}

impl FieldPath {
    #[inline]
    pub fn push(&mut self, segment: &str) {
        self.0.push(String::from(segment));
    }

    #[inline]
    pub fn pop(&mut self) {
        self.0.pop();
    }

    /// Fills in the path of a field error raised below the stream.
    pub fn attach(&self, err: StreamError) -> StreamError {
        match err {
            StreamError::MalformedField { path, reason } if path.is_empty() => StreamError::MalformedField {
                path: self.to_string(),
                reason,
            },
            other => other,
        }
    }

    pub fn error(&self, reason: impl fmt::Display) -> StreamError {
        StreamError::MalformedField {
            path: self.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl FieldPath {
    pub fn too_deep(&self, limit: usize) -> StreamError {
        StreamError::DepthExceeded {
            path: self.to_string(),
            limit,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::{String, ToString};

    use super::FieldPath;
    use crate::error::StreamError;

    #[test]
    fn attaches_only_missing_paths() {
        let mut path = FieldPath::default();
        path.push("Widget");
        path.push("Width");
        assert_eq!(path.to_string(), "Start/Widget/Width");

        let err = path.attach(StreamError::malformed("bad"));
        assert!(matches!(err, StreamError::MalformedField { path, .. } if path == "Start/Widget/Width"));

        path.pop();
        let err = path.attach(StreamError::MalformedField {
            path: String::from("Start/Other"),
            reason: String::from("bad"),
        });
        assert!(matches!(err, StreamError::MalformedField { path, .. } if path == "Start/Other"));
    }
}
