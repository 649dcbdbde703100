#![forbid(unsafe_code)]

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

/// Failure reported by a storage provider call. The `Display` text is what the
/// active view shows inline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{op} failed: {message}")]
    Provider { op: &'static str, message: String },
    #[error("bucket {0} does not exist")]
    NoSuchBucket(String),
    #[error("object {0} does not exist")]
    NoSuchKey(String),
    #[error("bucket {0} already exists")]
    BucketExists(String),
    #[error("bucket {0} is not empty")]
    BucketNotEmpty(String),
    #[error("storage runtime unavailable: {0}")]
    Runtime(String),
}

impl GatewayError {
    pub fn provider(op: &'static str, message: impl Into<String>) -> Self {
        Self::Provider { op, message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("cannot prepare scratch file: {0}")]
    Scratch(#[source] io::Error),
    #[error("cannot launch {editor}: {source}")]
    Launch {
        editor: String,
        #[source]
        source: io::Error,
    },
    #[error("{editor} exited with {status}")]
    Exited { editor: String, status: ExitStatus },
    #[error("cannot read scratch file back: {0}")]
    ReadBack(#[source] io::Error),
    #[error("terminal hand-off failed: {0}")]
    Terminal(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_names_the_operation() {
        let err = GatewayError::provider("ListBuckets", "access denied");
        assert_eq!(err.to_string(), "ListBuckets failed: access denied");
    }

    #[test]
    fn launch_error_mentions_editor() {
        let err = EditorError::Launch {
            editor: "nvim".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "cannot launch nvim: not found");
    }
}
