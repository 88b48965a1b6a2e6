// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! Patterns error types

use std::error;
use std::fmt::{Display, Formatter};
use std::result;

/// Result type for operations that could result in an [PatternError]
pub type Result<T> = result::Result<T, PatternError>;

/// Patterns error
///
/// A rejected pizza order is not an error: it is a successful evaluation whose
/// outcome is [`WorkflowResult::Rejected`](crate::pizza::WorkflowResult).
#[derive(Debug)]
pub enum PatternError {
    /// Error associated to Lambda runtime execution.
    LambdaError(Box<dyn std::error::Error + Send + Sync>),
    /// Error returned when serde_json failed to serialize or deserialize data.
    SerdeJson(serde_json::Error),
    /// Error returned when the caller sent a malformed request, e.g. a
    /// workflow input without a flavour or an empty counter key. Never
    /// retried.
    InvalidInput(String),
    /// Error returned when a counter is incremented before it has been
    /// initialized.
    NotFound(String),
    /// Error returned by a counter store when a key is created twice. The
    /// counter service absorbs it on initialization.
    AlreadyExists(String),
    /// Error returned when the backing store cannot serve the request right
    /// now (throttling, network, service fault). Surfaced as-is; retry policy
    /// belongs to the caller.
    StoreUnavailable(String),
    /// Error returned when accessing the AWS services fails for a reason that
    /// retrying won't fix, e.g. a missing table.
    AWS(String),
    /// Error returned on a branch that we know it is possible but to which we
    /// still have no implementation for.
    NotImplemented(String),
    /// Error returned as a consequence of an error in this crate.
    /// This error should not happen in normal usage. It is raised when one of
    /// the internal invariants that we are unable to ask the compiler to check
    /// for us is violated during execution.
    Internal(String),
}

impl PatternError {
    /// Returns true if the error is caused by the caller's request rather
    /// than by the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PatternError::InvalidInput(_) | PatternError::NotFound(_)
        )
    }
}

impl From<serde_json::Error> for PatternError {
    fn from(e: serde_json::Error) -> Self {
        PatternError::SerdeJson(e)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for PatternError {
    fn from(e: Box<dyn std::error::Error + Send + Sync>) -> Self {
        PatternError::LambdaError(e)
    }
}

impl From<&str> for PatternError {
    fn from(e: &str) -> Self {
        PatternError::Internal(e.to_string())
    }
}

impl Display for PatternError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            PatternError::LambdaError(ref desc) => write!(f, "Lambda error: {}", desc),
            PatternError::SerdeJson(ref desc) => write!(f, "serde_json error: {:?}", desc),
            PatternError::InvalidInput(ref desc) => write!(f, "Invalid input: {}", desc),
            PatternError::NotFound(ref desc) => write!(f, "Not found: {}", desc),
            PatternError::AlreadyExists(ref desc) => write!(f, "Already exists: {}", desc),
            PatternError::StoreUnavailable(ref desc) => {
                write!(f, "Store unavailable: {}", desc)
            }
            PatternError::AWS(ref desc) => write!(f, "AWS error: {}", desc),
            PatternError::NotImplemented(ref desc) => {
                write!(f, "This feature is not implemented: {}", desc)
            }
            PatternError::Internal(ref desc) => write!(
                f,
                "Internal error: {}. This was likely caused by a bug in the patterns \
                    code and we would welcome that you file an bug report in our issue tracker",
                desc
            ),
        }
    }
}

impl error::Error for PatternError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            PatternError::SerdeJson(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors() {
        assert!(PatternError::InvalidInput("flavour".to_owned()).is_client_error());
        assert!(PatternError::NotFound("system-aa".to_owned()).is_client_error());
        assert!(!PatternError::StoreUnavailable("throttled".to_owned()).is_client_error());
        assert!(!PatternError::from("bug").is_client_error());
    }

    #[test]
    fn display_names_the_kind() {
        assert_eq!(
            PatternError::NotFound("counter system-aa".to_owned()).to_string(),
            "Not found: counter system-aa"
        );
        assert_eq!(
            PatternError::StoreUnavailable("timeout".to_owned()).to_string(),
            "Store unavailable: timeout"
        );
    }
}
