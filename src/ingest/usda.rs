use crate::domain::recall::UsdaRecall;
use crate::ingest::client::FeedClient;
use crate::ingest::models::FsisRecord;
use crate::ingest::IngestError;

/// FSIS serves the whole recall list in one response.
pub fn fetch_usda_recalls(client: &FeedClient, feed_url: &str) -> Result<Vec<UsdaRecall>, IngestError> {
    let url = url::Url::parse(feed_url)
        .map_err(|e| IngestError::UnexpectedShape(format!("bad FSIS url '{feed_url}': {e}")))?;
    let records: Vec<FsisRecord> = client.get_json(&url)?;
    Ok(normalize_fsis(records))
}

/// Drop unkeyable records and collapse duplicates; the Spanish translation of
/// a notice shares its recall number with the English one.
pub fn normalize_fsis(records: Vec<FsisRecord>) -> Vec<UsdaRecall> {
    let mut out: Vec<UsdaRecall> = Vec::with_capacity(records.len());
    for recall in records.into_iter().filter_map(FsisRecord::into_recall) {
        match out.iter_mut().find(|r| r.recall_number == recall.recall_number) {
            Some(existing) => {
                let existing_is_english = existing.language.as_deref() == Some("English");
                if !existing_is_english && recall.language.as_deref() == Some("English") {
                    *existing = recall;
                }
            }
            None => out.push(recall),
        }
    }
    out
}
