// src/domain/pending.rs

use crate::domain::recall::{
    RecallDisplay, RecallSnapshot, RecallSource, UploadedImage, UserRef,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingStatus {
    Pending,
    Approved,
    Rejected,
}

impl PendingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingStatus::Pending => "pending",
            PendingStatus::Approved => "approved",
            PendingStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PendingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PendingStatus::Pending),
            "approved" => Ok(PendingStatus::Approved),
            "rejected" => Ok(PendingStatus::Rejected),
            other => Err(format!("unknown pending status '{other}'")),
        }
    }
}

/// One proposed edit to a recall's display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
    pub id: String,
    pub recall_id: String,
    pub recall_source: RecallSource,
    pub proposed_by: UserRef,
    pub proposed_at: DateTime<Utc>,
    pub status: PendingStatus,
    /// Snapshot from the first proposal; later overwrites leave it alone.
    pub original_recall: RecallSnapshot,
    pub proposed_display: RecallDisplay,
}

/// Body of a create/update proposal request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProposal {
    pub recall_id: String,
    pub recall_source: RecallSource,
    pub original_recall: RecallSnapshot,
    pub proposed_display: RecallDisplay,
}

impl NewProposal {
    /// Checks the fields a proposal can't be stored without.
    pub fn validate(&self) -> Result<(), String> {
        if self.recall_id.trim().is_empty() {
            return Err("recall_id is required".into());
        }
        if self.original_recall.source() != self.recall_source {
            return Err(format!(
                "original_recall is a {} recall but recall_source is {}",
                self.original_recall.source(),
                self.recall_source
            ));
        }
        if self.original_recall.id() != self.recall_id {
            return Err(format!(
                "original_recall id '{}' does not match recall_id '{}'",
                self.original_recall.id(),
                self.recall_id
            ));
        }
        for img in &self.proposed_display.uploaded_images {
            if img.filename.trim().is_empty() || img.storage_path.trim().is_empty() {
                return Err("uploaded images need a filename and storage_path".into());
            }
            // Cleanup deletes these paths, so they must stay under this recall.
            let expected = image_storage_path(self.recall_source, &self.recall_id, &img.filename);
            if img.storage_path != expected {
                return Err(format!(
                    "image '{}' must be stored at '{expected}', not '{}'",
                    img.filename, img.storage_path
                ));
            }
        }
        if let Some(idx) = self.proposed_display.primary_image_index {
            if idx >= self.proposed_display.uploaded_images.len() {
                return Err(format!("primary_image_index {idx} is out of range"));
            }
        }
        Ok(())
    }
}

/// Blob path of an uploaded image: `recall-images/<SOURCE>/<recallId>/<filename>`.
pub fn image_storage_path(source: RecallSource, recall_id: &str, filename: &str) -> String {
    format!("recall-images/{source}/{recall_id}/{filename}")
}

/// Terminal outcome recorded in the resolved-changes archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Approved,
    Rejected,
    Withdrawn,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Approved => "approved",
            Resolution::Rejected => "rejected",
            Resolution::Withdrawn => "withdrawn",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedChange {
    pub change: PendingChange,
    pub resolution: Resolution,
    pub resolved_by: UserRef,
    pub resolved_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Uploaded images present in `old` but gone from `new`, compared by filename.
pub fn orphaned_images<'a>(old: &'a RecallDisplay, new: &RecallDisplay) -> Vec<&'a UploadedImage> {
    old.uploaded_images
        .iter()
        .filter(|img| !new.image_filenames().any(|f| f == img.filename))
        .collect()
}
