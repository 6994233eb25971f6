//! Database-layer error types and driver error classification.

use mongodb::error::ErrorKind;

/// `AuthenticationFailed`.
const AUTHENTICATION_FAILED: i32 = 18;
/// `Location51003` on current servers, `DuplicateKey` on older ones.
const DUPLICATE_USER_CODES: &[i32] = &[51003, 11000];
/// `BadValue` and `FailedToParse`; an empty user name lands here.
const INVALID_INPUT_CODES: &[i32] = &[2, 9];

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database server unreachable: {0}")]
    Unreachable(String),

    #[error("administrator authentication rejected: {0}")]
    AuthRejected(String),

    #[error("user \"{username}\" already exists on database \"{database}\"")]
    DuplicateUser { username: String, database: String },

    #[error("server rejected account definition ({code_name}, code {code}): {message}")]
    InvalidAccount {
        code: i32,
        code_name: String,
        message: String,
    },

    #[error("user \"{username}\" not found on database \"{database}\"")]
    UserNotFound { username: String, database: String },

    #[error("user store for database \"{directory}\" cannot hold an account scoped to \"{database}\"")]
    ScopeMismatch { directory: String, database: String },

    #[error("unexpected server response: {0}")]
    MalformedResponse(#[from] mongodb::bson::de::Error),

    #[error("MongoDB error: {0}")]
    Mongo(#[source] mongodb::error::Error),
}

/// Coarse failure categories a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Connection,
    DuplicateUser,
    MalformedInput,
    Other,
}

impl DbError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DbError::Unreachable(_) | DbError::AuthRejected(_) => FailureKind::Connection,
            DbError::DuplicateUser { .. } => FailureKind::DuplicateUser,
            DbError::InvalidAccount { .. } | DbError::ScopeMismatch { .. } => {
                FailureKind::MalformedInput
            }
            DbError::UserNotFound { .. } | DbError::MalformedResponse(_) | DbError::Mongo(_) => {
                FailureKind::Other
            }
        }
    }

    /// Classify a `createUser` failure, attaching the account identity to
    /// duplicate-user errors.
    pub(crate) fn from_create_user(
        err: mongodb::error::Error,
        username: &str,
        database: &str,
    ) -> Self {
        let duplicate = match err.kind.as_ref() {
            ErrorKind::Command(command) => DUPLICATE_USER_CODES.contains(&command.code),
            _ => false,
        };
        if duplicate {
            return DbError::DuplicateUser {
                username: username.to_string(),
                database: database.to_string(),
            };
        }
        err.into()
    }
}

/// Maps a server command failure onto a typed error when the code is one the
/// bootstrap cares about.
fn classify_command(code: i32, code_name: &str, message: &str) -> Option<DbError> {
    if code == AUTHENTICATION_FAILED {
        return Some(DbError::AuthRejected(message.to_string()));
    }
    if INVALID_INPUT_CODES.contains(&code) {
        return Some(DbError::InvalidAccount {
            code,
            code_name: code_name.to_string(),
            message: message.to_string(),
        });
    }
    None
}

impl From<mongodb::error::Error> for DbError {
    fn from(err: mongodb::error::Error) -> Self {
        let classified = match err.kind.as_ref() {
            ErrorKind::ServerSelection { message, .. } => {
                Some(DbError::Unreachable(message.clone()))
            }
            ErrorKind::DnsResolve { message, .. } => Some(DbError::Unreachable(message.clone())),
            ErrorKind::Io(io) => Some(DbError::Unreachable(io.to_string())),
            ErrorKind::Authentication { message, .. } => {
                Some(DbError::AuthRejected(message.clone()))
            }
            ErrorKind::Command(command) => {
                classify_command(command.code, &command.code_name, &command.message)
            }
            _ => None,
        };

        match classified {
            Some(classified) => classified,
            None => DbError::Mongo(err),
        }
    }
}
