// src/review/workflow.rs
use super::{ProposalScope, ReviewError};
use crate::auth::token::generate_id;
use crate::db::connection::Database;
use crate::db::pending_changes as store;
use crate::db::recalls::{get_recall, RecallDisplayStores};
use crate::domain::pending::{
    orphaned_images, NewProposal, PendingChange, PendingStatus, Resolution, ResolvedChange,
};
use crate::domain::recall::{recall_key, AuditedDisplay, RecallSource, UserRef};
use crate::errors::ServerError;
use crate::storage::{delete_blobs_best_effort, BlobStore};
use chrono::{DateTime, Utc};
use rusqlite::TransactionBehavior;
use std::collections::HashSet;

/// Moves proposed display edits from proposal to publication.
///
/// Only `pending` records are persisted. Approval publishes the proposed
/// display onto the live recall and deletes the record; rejection and
/// withdrawal delete the record and its proposal-only images. Every
/// terminal transition is archived to `resolved_changes`.
pub struct PendingChangeWorkflow<'a> {
    db: &'a Database,
    blobs: &'a dyn BlobStore,
    displays: &'a RecallDisplayStores,
    scope: ProposalScope,
}

impl<'a> PendingChangeWorkflow<'a> {
    pub fn new(
        db: &'a Database,
        blobs: &'a dyn BlobStore,
        displays: &'a RecallDisplayStores,
        scope: ProposalScope,
    ) -> Self {
        Self {
            db,
            blobs,
            displays,
            scope,
        }
    }

    /// Create the pending change for a recall, or overwrite the one in flight.
    ///
    /// An overwrite replaces display, proposer and timestamp but keeps the
    /// snapshot from the first proposal. Images dropped by the overwrite are
    /// deleted from blob storage on a best-effort basis.
    pub fn create_or_update_proposal(
        &self,
        proposal: NewProposal,
        proposer: &UserRef,
        now: DateTime<Utc>,
    ) -> Result<PendingChange, ReviewError> {
        proposal.validate().map_err(ReviewError::Validation)?;
        let scope = self.scope;

        let (change, orphans, updated) = self.db.with_conn(|conn| {
            // Immediate, so two racing proposals queue on the write lock
            // instead of both reading "no pending change".
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| ServerError::DbError(format!("begin transaction failed: {e}")))?;

            let existing = store::find_pending_for_recall(
                &tx,
                &proposal.recall_id,
                proposal.recall_source,
                None,
            )?;

            let outcome = match existing {
                Some(existing)
                    if scope == ProposalScope::OwnOnly
                        && existing.proposed_by.uid != proposer.uid =>
                {
                    return Err(ReviewError::ProposalHeld {
                        recall_key: recall_key(&existing.recall_id, existing.recall_source),
                        holder: existing.proposed_by.username,
                    });
                }
                Some(mut existing) => {
                    // Images already published on the live recall stay.
                    let live = get_recall(&tx, proposal.recall_source, &proposal.recall_id)?;
                    let published: HashSet<&str> = live
                        .as_ref()
                        .and_then(|r| r.display.as_ref())
                        .map(|d| d.display.image_filenames().collect())
                        .unwrap_or_default();

                    let orphans: Vec<String> =
                        orphaned_images(&existing.proposed_display, &proposal.proposed_display)
                            .into_iter()
                            .filter(|img| !published.contains(img.filename.as_str()))
                            .map(|img| img.storage_path.clone())
                            .collect();

                    store::update_proposal(
                        &tx,
                        &existing.id,
                        proposer,
                        now,
                        &proposal.proposed_display,
                    )?;

                    existing.proposed_by = proposer.clone();
                    existing.proposed_at = now;
                    existing.proposed_display = proposal.proposed_display;
                    (existing, orphans, true)
                }
                None => {
                    let change = PendingChange {
                        id: generate_id(),
                        recall_id: proposal.recall_id,
                        recall_source: proposal.recall_source,
                        proposed_by: proposer.clone(),
                        proposed_at: now,
                        status: PendingStatus::Pending,
                        original_recall: proposal.original_recall,
                        proposed_display: proposal.proposed_display,
                    };
                    store::insert_change(&tx, &change)?;
                    (change, Vec::new(), false)
                }
            };

            tx.commit()
                .map_err(|e| ServerError::DbError(format!("commit proposal failed: {e}")))?;
            Ok::<_, ReviewError>(outcome)
        })?;

        tracing::info!(
            change_id = %change.id,
            recall = %recall_key(&change.recall_id, change.recall_source),
            proposer = %proposer.uid,
            updated,
            "proposal saved"
        );

        if !orphans.is_empty() {
            let paths: Vec<&str> = orphans.iter().map(String::as_str).collect();
            let deleted = delete_blobs_best_effort(self.blobs, &paths);
            tracing::info!(
                change_id = %change.id,
                orphaned = paths.len(),
                deleted,
                "orphaned proposal images cleaned up"
            );
        }

        Ok(change)
    }

    pub fn get(&self, change_id: &str) -> Result<PendingChange, ReviewError> {
        self.db
            .with_conn(|conn| store::get_change(conn, change_id))?
            .ok_or_else(|| ReviewError::NotFound(change_id.to_string()))
    }

    /// Admin queue, newest proposal first.
    pub fn all_pending(&self) -> Result<Vec<PendingChange>, ReviewError> {
        Ok(self.db.with_conn(|conn| store::list_all_pending(conn))?)
    }

    pub fn pending_for_user(&self, uid: &str) -> Result<Vec<PendingChange>, ReviewError> {
        Ok(self
            .db
            .with_conn(|conn| store::list_pending_for_user(conn, uid))?)
    }

    pub fn pending_for_recall(
        &self,
        recall_id: &str,
        source: RecallSource,
    ) -> Result<Vec<PendingChange>, ReviewError> {
        Ok(self
            .db
            .with_conn(|conn| store::list_pending_for_recall(conn, recall_id, source))?)
    }

    /// `<recallId>_<SOURCE>` keys of recalls with an edit in flight.
    pub fn pending_recall_keys(&self) -> Result<HashSet<String>, ReviewError> {
        Ok(self.db.with_conn(|conn| store::pending_recall_keys(conn))?)
    }

    /// Publish the proposed display onto the live recall, then drop the proposal.
    pub fn approve(
        &self,
        change_id: &str,
        approver: &UserRef,
        now: DateTime<Utc>,
    ) -> Result<(), ReviewError> {
        let change = self.load_pending(change_id)?;

        let audited = AuditedDisplay {
            display: change.proposed_display.clone(),
            proposed_by: Some(change.proposed_by.clone()),
            proposed_at: Some(change.proposed_at),
            approved_by: Some(approver.clone()),
            approved_at: Some(now),
        };

        self.displays
            .for_source(change.recall_source)
            .update_recall_display(&change.recall_id, Some(&audited))
            .map_err(|e| match e {
                ServerError::NotFound => ReviewError::RecallNotFound {
                    recall_id: change.recall_id.clone(),
                    recall_source: change.recall_source,
                },
                other => ReviewError::Storage(other),
            })?;

        self.resolve(change, Resolution::Approved, approver, now, None)
    }

    /// Drop the proposal and any images only it referenced. The reason is
    /// kept in the resolved-changes archive.
    pub fn reject(
        &self,
        change_id: &str,
        rejecter: &UserRef,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), ReviewError> {
        let change = self.load_pending(change_id)?;
        self.discard(change, Resolution::Rejected, rejecter, reason, now)
    }

    /// Like `reject`, but only the original proposer may do it.
    pub fn withdraw(
        &self,
        change_id: &str,
        requester: &UserRef,
        now: DateTime<Utc>,
    ) -> Result<(), ReviewError> {
        let change = self.load_pending(change_id)?;
        if change.proposed_by.uid != requester.uid {
            return Err(ReviewError::Forbidden(
                "only the original proposer can withdraw a pending change".into(),
            ));
        }
        self.discard(change, Resolution::Withdrawn, requester, None, now)
    }

    fn load_pending(&self, change_id: &str) -> Result<PendingChange, ReviewError> {
        let change = self.get(change_id)?;
        if change.status != PendingStatus::Pending {
            return Err(ReviewError::InvalidState {
                id: change.id,
                status: change.status,
            });
        }
        Ok(change)
    }

    fn discard(
        &self,
        change: PendingChange,
        resolution: Resolution,
        actor: &UserRef,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), ReviewError> {
        if !change.proposed_display.uploaded_images.is_empty() {
            // Images already published on the live recall stay.
            let live = self
                .db
                .with_conn(|conn| get_recall(conn, change.recall_source, &change.recall_id))?;
            let published: HashSet<&str> = live
                .as_ref()
                .and_then(|r| r.display.as_ref())
                .map(|d| d.display.image_filenames().collect())
                .unwrap_or_default();

            let paths: Vec<&str> = change
                .proposed_display
                .uploaded_images
                .iter()
                .filter(|img| !published.contains(img.filename.as_str()))
                .map(|img| img.storage_path.as_str())
                .collect();

            let deleted = delete_blobs_best_effort(self.blobs, &paths);
            tracing::debug!(change_id = %change.id, deleted, "proposal images removed");
        }

        self.resolve(change, resolution, actor, now, reason.map(str::to_string))
    }

    fn resolve(
        &self,
        mut change: PendingChange,
        resolution: Resolution,
        actor: &UserRef,
        now: DateTime<Utc>,
        reason: Option<String>,
    ) -> Result<(), ReviewError> {
        change.status = match resolution {
            Resolution::Approved => PendingStatus::Approved,
            Resolution::Rejected | Resolution::Withdrawn => PendingStatus::Rejected,
        };
        let resolved = ResolvedChange {
            change,
            resolution,
            resolved_by: actor.clone(),
            resolved_at: now,
            reason,
        };

        self.db
            .with_conn(|conn| {
                let tx = conn
                    .transaction_with_behavior(TransactionBehavior::Immediate)
                    .map_err(|e| ServerError::DbError(format!("begin transaction failed: {e}")))?;
                store::delete_change(&tx, &resolved.change.id)?;
                store::archive_resolved(&tx, &resolved)?;
                tx.commit()
                    .map_err(|e| ServerError::DbError(format!("commit resolution failed: {e}")))?;
                Ok::<_, ServerError>(())
            })
            .map_err(|e| match e {
                // Someone else resolved it between our load and this delete.
                ServerError::NotFound => ReviewError::NotFound(resolved.change.id.clone()),
                other => ReviewError::Storage(other),
            })?;

        tracing::info!(
            change_id = %resolved.change.id,
            recall = %recall_key(&resolved.change.recall_id, resolved.change.recall_source),
            resolution = resolution.as_str(),
            actor = %actor.uid,
            "pending change resolved"
        );
        Ok(())
    }
}
