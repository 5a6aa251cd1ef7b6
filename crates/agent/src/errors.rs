use thiserror::Error;

use shelfbot_core::errors::{ApplicationError, DomainError};
use shelfbot_db::repositories::RepositoryError;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("please specify {0}")]
    MissingField(&'static str),
    #[error("{entity} with ID '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("a product with the title '{title}' already exists")]
    DuplicateTitle { title: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("error {action}: {source}")]
    Persistence {
        action: &'static str,
        #[source]
        source: RepositoryError,
    },
}

impl CommandError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }
}

/// Maps a repository failure while performing `action`, e.g. "creating product".
pub(crate) fn persistence(action: &'static str) -> impl FnOnce(RepositoryError) -> CommandError {
    move |source| CommandError::Persistence { action, source }
}

impl From<CommandError> for ApplicationError {
    fn from(value: CommandError) -> Self {
        match value {
            CommandError::MissingField(field) => {
                ApplicationError::Domain(DomainError::InvariantViolation(format!(
                    "please specify {field}"
                )))
            }
            CommandError::NotFound { entity, id } => ApplicationError::NotFound { entity, id },
            CommandError::DuplicateTitle { title } => ApplicationError::Conflict(format!(
                "a product with the title '{title}' already exists"
            )),
            CommandError::Domain(error) => ApplicationError::Domain(error),
            CommandError::Persistence { action, source } => {
                ApplicationError::Persistence(format!("{action}: {source}"))
            }
        }
    }
}
