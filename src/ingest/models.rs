use crate::domain::recall::{FdaRecall, UsdaRecall};
use crate::domain::resolve_affected_states;
use chrono::NaiveDate;
use serde::Deserialize;

// FSIS recall API record. Every field arrives as a string, often empty.
//
// record
//  ├── field_title
//  ├── field_recall_number
//  ├── field_recall_date          (YYYY-MM-DD)
//  ├── field_recall_type / field_recall_classification / field_risk_level
//  ├── field_states               (free text, e.g. "Illinois, Iowa")
//  ├── field_distro_list          (older records put distribution here)
//  ├── field_active_notice        ("True" | "False")
//  └── langcode                   ("English" | "Spanish")

#[derive(Debug, Deserialize)]
pub struct FsisRecord {
    #[serde(default)]
    pub field_title: String,
    #[serde(default)]
    pub field_recall_number: String,
    #[serde(default)]
    pub field_recall_date: String,
    #[serde(default)]
    pub field_recall_type: String,
    #[serde(default)]
    pub field_recall_classification: String,
    #[serde(default)]
    pub field_recall_reason: String,
    #[serde(default)]
    pub field_risk_level: String,
    #[serde(default)]
    pub field_establishment: String,
    #[serde(default)]
    pub field_states: String,
    #[serde(default)]
    pub field_distro_list: String,
    #[serde(default)]
    pub field_product_items: String,
    #[serde(default)]
    pub field_summary: String,
    #[serde(default)]
    pub field_active_notice: String,
    #[serde(default)]
    pub langcode: String,
}

impl FsisRecord {
    /// `None` for records without a recall number; they can't be keyed.
    pub fn into_recall(self) -> Option<UsdaRecall> {
        let recall_number = non_empty(self.field_recall_number)?;

        let states = non_empty(self.field_states);
        let distribution = states
            .clone()
            .or_else(|| non_empty(self.field_distro_list));
        let affected_states = distribution
            .as_deref()
            .map(resolve_affected_states)
            .unwrap_or_default();

        Some(UsdaRecall {
            title: non_empty(self.field_title).unwrap_or_else(|| recall_number.clone()),
            recall_date: parse_date(&self.field_recall_date, "%Y-%m-%d"),
            recall_type: non_empty(self.field_recall_type),
            recall_classification: non_empty(self.field_recall_classification),
            recall_reason: non_empty(self.field_recall_reason),
            risk_level: non_empty(self.field_risk_level),
            establishment: non_empty(self.field_establishment),
            states,
            product_items: non_empty(self.field_product_items),
            summary: non_empty(self.field_summary),
            active: self.field_active_notice.eq_ignore_ascii_case("true"),
            language: non_empty(self.langcode),
            affected_states,
            recall_number,
        })
    }
}

// openFDA enforcement response
//
// response
//  ├── meta
//  │    └── results { skip, limit, total }
//  └── results[]
//       ├── recall_number, event_id, status, classification
//       ├── product_description, reason_for_recall, recalling_firm
//       ├── distribution_pattern
//       ├── report_date, recall_initiation_date   (YYYYMMDD)
//       └── city, state, country, product_quantity, voluntary_mandated

#[derive(Debug, Deserialize)]
pub struct OpenFdaResponse {
    pub meta: Option<OpenFdaMeta>,
    #[serde(default)]
    pub results: Vec<OpenFdaResult>,
}

#[derive(Debug, Deserialize)]
pub struct OpenFdaMeta {
    pub results: Option<OpenFdaPage>,
}

#[derive(Debug, Deserialize)]
pub struct OpenFdaPage {
    pub total: u64,
}

impl OpenFdaResponse {
    pub fn total(&self) -> Option<u64> {
        self.meta.as_ref()?.results.as_ref().map(|p| p.total)
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenFdaResult {
    pub recall_number: Option<String>,
    pub event_id: Option<String>,
    pub status: Option<String>,
    pub classification: Option<String>,
    pub product_description: Option<String>,
    pub reason_for_recall: Option<String>,
    pub recalling_firm: Option<String>,
    pub distribution_pattern: Option<String>,
    pub report_date: Option<String>,
    pub recall_initiation_date: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub product_quantity: Option<String>,
    pub voluntary_mandated: Option<String>,
}

impl OpenFdaResult {
    pub fn into_recall(self) -> Option<FdaRecall> {
        let recall_number = self.recall_number.and_then(non_empty)?;
        let distribution_pattern = self.distribution_pattern.and_then(non_empty);
        let affected_states = distribution_pattern
            .as_deref()
            .map(resolve_affected_states)
            .unwrap_or_default();

        Some(FdaRecall {
            product_description: self
                .product_description
                .and_then(non_empty)
                .unwrap_or_else(|| recall_number.clone()),
            event_id: self.event_id.and_then(non_empty),
            status: self.status.and_then(non_empty),
            classification: self.classification.and_then(non_empty),
            reason_for_recall: self.reason_for_recall.and_then(non_empty),
            recalling_firm: self.recalling_firm.and_then(non_empty),
            report_date: self
                .report_date
                .as_deref()
                .and_then(|d| parse_date(d, "%Y%m%d")),
            recall_initiation_date: self
                .recall_initiation_date
                .as_deref()
                .and_then(|d| parse_date(d, "%Y%m%d")),
            city: self.city.and_then(non_empty),
            state: self.state.and_then(non_empty),
            country: self.country.and_then(non_empty),
            product_quantity: self.product_quantity.and_then(non_empty),
            voluntary_mandated: self.voluntary_mandated.and_then(non_empty),
            distribution_pattern,
            affected_states,
            recall_number,
        })
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_date(s: &str, fmt: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), fmt).ok()
}
