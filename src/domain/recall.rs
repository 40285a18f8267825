// src/domain/recall.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Which upstream feed a recall came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecallSource {
    #[serde(rename = "USDA")]
    Usda,
    #[serde(rename = "FDA")]
    Fda,
    #[serde(rename = "TEMP_FDA")]
    TempFda,
}

impl RecallSource {
    pub const ALL: [RecallSource; 3] = [RecallSource::Usda, RecallSource::Fda, RecallSource::TempFda];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecallSource::Usda => "USDA",
            RecallSource::Fda => "FDA",
            RecallSource::TempFda => "TEMP_FDA",
        }
    }
}

impl fmt::Display for RecallSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecallSource {
    type Err = String;

    /// Accepts the canonical tag in any case, plus `temp-fda` for URLs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "USDA" => Ok(RecallSource::Usda),
            "FDA" => Ok(RecallSource::Fda),
            "TEMP_FDA" => Ok(RecallSource::TempFda),
            other => Err(format!("unknown recall source '{other}'")),
        }
    }
}

/// Key used to mark recalls with an in-flight edit: `<recallId>_<SOURCE>`.
pub fn recall_key(recall_id: &str, source: RecallSource) -> String {
    format!("{recall_id}_{source}")
}

/// A USDA FSIS recall, normalized from the feed's `field_*` names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsdaRecall {
    pub recall_number: String,
    pub title: String,
    pub recall_date: Option<NaiveDate>,
    pub recall_type: Option<String>,
    pub recall_classification: Option<String>,
    pub recall_reason: Option<String>,
    pub risk_level: Option<String>,
    pub establishment: Option<String>,
    pub states: Option<String>,
    pub product_items: Option<String>,
    pub summary: Option<String>,
    pub active: bool,
    pub language: Option<String>,
    #[serde(default)]
    pub affected_states: Vec<String>,
}

/// An openFDA food enforcement report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FdaRecall {
    pub recall_number: String,
    pub event_id: Option<String>,
    pub status: Option<String>,
    pub classification: Option<String>,
    pub product_description: String,
    pub reason_for_recall: Option<String>,
    pub recalling_firm: Option<String>,
    pub distribution_pattern: Option<String>,
    pub report_date: Option<NaiveDate>,
    pub recall_initiation_date: Option<NaiveDate>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub product_quantity: Option<String>,
    pub voluntary_mandated: Option<String>,
    #[serde(default)]
    pub affected_states: Vec<String>,
}

/// A recall announced by FDA press release before it reaches the enforcement feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempFdaRecall {
    pub id: String,
    pub title: String,
    pub announced_date: Option<NaiveDate>,
    pub company: Option<String>,
    pub product: Option<String>,
    pub reason: Option<String>,
    pub url: Option<String>,
    pub distribution_pattern: Option<String>,
    #[serde(default)]
    pub affected_states: Vec<String>,
}

/// Full source payload, tagged by feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source")]
pub enum RecallSnapshot {
    #[serde(rename = "USDA")]
    Usda(UsdaRecall),
    #[serde(rename = "FDA")]
    Fda(FdaRecall),
    #[serde(rename = "TEMP_FDA")]
    TempFda(TempFdaRecall),
}

impl RecallSnapshot {
    pub fn source(&self) -> RecallSource {
        match self {
            RecallSnapshot::Usda(_) => RecallSource::Usda,
            RecallSnapshot::Fda(_) => RecallSource::Fda,
            RecallSnapshot::TempFda(_) => RecallSource::TempFda,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            RecallSnapshot::Usda(r) => &r.recall_number,
            RecallSnapshot::Fda(r) => &r.recall_number,
            RecallSnapshot::TempFda(r) => &r.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            RecallSnapshot::Usda(r) => &r.title,
            RecallSnapshot::Fda(r) => &r.product_description,
            RecallSnapshot::TempFda(r) => &r.title,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            RecallSnapshot::Usda(r) => r.recall_date,
            RecallSnapshot::Fda(r) => r.report_date.or(r.recall_initiation_date),
            RecallSnapshot::TempFda(r) => r.announced_date,
        }
    }

    pub fn classification(&self) -> Option<&str> {
        match self {
            RecallSnapshot::Usda(r) => r.recall_classification.as_deref(),
            RecallSnapshot::Fda(r) => r.classification.as_deref(),
            RecallSnapshot::TempFda(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            RecallSnapshot::Usda(r) => r.recall_reason.as_deref(),
            RecallSnapshot::Fda(r) => r.reason_for_recall.as_deref(),
            RecallSnapshot::TempFda(r) => r.reason.as_deref(),
        }
    }

    pub fn affected_states(&self) -> &[String] {
        match self {
            RecallSnapshot::Usda(r) => &r.affected_states,
            RecallSnapshot::Fda(r) => &r.affected_states,
            RecallSnapshot::TempFda(r) => &r.affected_states,
        }
    }
}

/// Identity of a user as recorded on proposals and approvals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub uid: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub filename: String,
    pub storage_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Splits one recall into several listing cards, e.g. one per product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSplit {
    pub start_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_image_index: Option<usize>,
}

/// Editorial display metadata layered over a recall.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecallDisplay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_image_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub card_splits: Vec<CardSplit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uploaded_images: Vec<UploadedImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    /// Editor fields this service doesn't interpret; kept verbatim, nulls included.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RecallDisplay {
    pub fn image_filenames(&self) -> impl Iterator<Item = &str> {
        self.uploaded_images.iter().map(|img| img.filename.as_str())
    }
}

/// Display metadata as published on a live recall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditedDisplay {
    #[serde(flatten)]
    pub display: RecallDisplay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_by: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

/// A recall as stored, with any published display override.
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecall {
    pub id: String,
    pub source: RecallSource,
    pub title: String,
    pub recall_date: Option<NaiveDate>,
    pub affected_states: Vec<String>,
    pub snapshot: RecallSnapshot,
    pub display: Option<AuditedDisplay>,
    pub updated_at: DateTime<Utc>,
}

impl StoredRecall {
    /// Title shown on listings: the editorial override if one is published.
    pub fn display_title(&self) -> &str {
        self.display
            .as_ref()
            .and_then(|d| d.display.preview_title.as_deref())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.title)
    }

    pub fn primary_image(&self) -> Option<&UploadedImage> {
        let display = &self.display.as_ref()?.display;
        let idx = display.primary_image_index.unwrap_or(0);
        display.uploaded_images.get(idx)
    }
}
