mod workflow;

pub use workflow::PendingChangeWorkflow;

use crate::domain::pending::PendingStatus;
use crate::domain::recall::RecallSource;
use crate::errors::ServerError;
use std::str::FromStr;
use thiserror::Error;

/// Which existing proposal a new proposal for the same recall replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProposalScope {
    /// Any pending proposal, whoever made it (last writer wins).
    #[default]
    AnyProposer,
    /// Only the proposer's own; another user's pending proposal blocks.
    OwnOnly,
}

impl FromStr for ProposalScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "any_proposer" => Ok(ProposalScope::AnyProposer),
            "own" | "own_only" => Ok(ProposalScope::OwnOnly),
            other => Err(format!("unknown proposal scope '{other}' (expected any|own)")),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("pending change {0} not found")]
    NotFound(String),

    #[error("recall {recall_id} ({recall_source}) not found")]
    RecallNotFound {
        recall_id: String,
        recall_source: RecallSource,
    },

    #[error("pending change {id} is {status}, not pending")]
    InvalidState { id: String, status: PendingStatus },

    /// Another user already has a proposal in flight for this recall.
    #[error("recall {recall_key} already has a pending change by {holder}")]
    ProposalHeld { recall_key: String, holder: String },

    #[error("{0}")]
    Forbidden(String),

    #[error("invalid proposal: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] ServerError),
}

impl From<ReviewError> for ServerError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::NotFound(_) | ReviewError::RecallNotFound { .. } => ServerError::NotFound,
            ReviewError::InvalidState { .. } | ReviewError::ProposalHeld { .. } => {
                ServerError::Conflict(err.to_string())
            }
            ReviewError::Forbidden(msg) => ServerError::Forbidden(msg),
            ReviewError::Validation(msg) => ServerError::BadRequest(msg),
            ReviewError::Storage(inner) => inner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_http_kinds() {
        let conflict: ServerError = ReviewError::InvalidState {
            id: "c1".into(),
            status: PendingStatus::Approved,
        }
        .into();
        assert_eq!(conflict.status(), 409);

        let missing: ServerError = ReviewError::NotFound("c1".into()).into();
        assert_eq!(missing.status(), 404);

        let storage: ServerError =
            ReviewError::Storage(ServerError::DbError("disk full".into())).into();
        assert!(matches!(storage, ServerError::DbError(ref m) if m == "disk full"));

        let forbidden: ServerError = ReviewError::Forbidden("not yours".into()).into();
        assert_eq!(forbidden.status(), 403);
    }

    #[test]
    fn scope_parses_config_values() {
        assert_eq!("any".parse::<ProposalScope>().unwrap(), ProposalScope::AnyProposer);
        assert_eq!("OWN".parse::<ProposalScope>().unwrap(), ProposalScope::OwnOnly);
        assert!("mine".parse::<ProposalScope>().is_err());
    }
}
