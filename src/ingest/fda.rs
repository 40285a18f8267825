use crate::domain::recall::FdaRecall;
use crate::ingest::client::FeedClient;
use crate::ingest::models::{OpenFdaResponse, OpenFdaResult};
use crate::ingest::IngestError;
use chrono::NaiveDate;

pub const PAGE_SIZE: u64 = 100;
// openFDA refuses skip values past this.
const MAX_SKIP: u64 = 25_000;

/// Query URL for one page of enforcement reports in a report-date window.
pub fn page_url(
    base: &str,
    from: NaiveDate,
    to: NaiveDate,
    skip: u64,
) -> Result<url::Url, IngestError> {
    let mut url = url::Url::parse(base)
        .map_err(|e| IngestError::UnexpectedShape(format!("bad openFDA url '{base}': {e}")))?;
    url.query_pairs_mut()
        .append_pair(
            "search",
            &format!(
                "report_date:[{} TO {}]",
                from.format("%Y%m%d"),
                to.format("%Y%m%d")
            ),
        )
        .append_pair("limit", &PAGE_SIZE.to_string())
        .append_pair("skip", &skip.to_string());
    Ok(url)
}

/// Walk the result pages, handing each converted page to `on_page`.
///
/// openFDA answers a window with no matches with a 404, which is an empty
/// result here. Returns the number of raw records seen.
pub fn fetch_paginated<F, P>(mut fetch_page: F, mut on_page: P) -> Result<usize, IngestError>
where
    F: FnMut(u64) -> Result<OpenFdaResponse, IngestError>,
    P: FnMut(Vec<FdaRecall>) -> Result<(), IngestError>,
{
    let mut skip = 0;
    let mut seen = 0;

    loop {
        let page = match fetch_page(skip) {
            Ok(page) => page,
            Err(IngestError::Http { status: 404, .. }) => break,
            Err(e) => return Err(e),
        };

        let total = page.total();
        let count = page.results.len() as u64;
        if count == 0 {
            break;
        }
        seen += page.results.len();
        tracing::info!(skip, count, total, "openFDA page fetched");

        on_page(
            page.results
                .into_iter()
                .filter_map(OpenFdaResult::into_recall)
                .collect(),
        )?;

        skip += count;
        if total.is_some_and(|t| skip >= t) || count < PAGE_SIZE || skip > MAX_SKIP {
            break;
        }
    }

    Ok(seen)
}

pub fn fetch_fda_recalls<P>(
    client: &FeedClient,
    base: &str,
    from: NaiveDate,
    to: NaiveDate,
    on_page: P,
) -> Result<usize, IngestError>
where
    P: FnMut(Vec<FdaRecall>) -> Result<(), IngestError>,
{
    fetch_paginated(
        |skip| {
            let url = page_url(base, from, to, skip)?;
            client.get_json(&url)
        },
        on_page,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::models::{OpenFdaMeta, OpenFdaPage};

    fn page(skip: u64, count: u64, total: u64) -> OpenFdaResponse {
        OpenFdaResponse {
            meta: Some(OpenFdaMeta {
                results: Some(OpenFdaPage { total }),
            }),
            results: (0..count)
                .map(|i| OpenFdaResult {
                    recall_number: Some(format!("F-{}", skip + i)),
                    event_id: None,
                    status: None,
                    classification: None,
                    product_description: Some("Peas".into()),
                    reason_for_recall: None,
                    recalling_firm: None,
                    distribution_pattern: Some("OH".into()),
                    report_date: Some("20240501".into()),
                    recall_initiation_date: None,
                    city: None,
                    state: None,
                    country: None,
                    product_quantity: None,
                    voluntary_mandated: None,
                })
                .collect(),
        }
    }

    #[test]
    fn walks_pages_until_total_reached() {
        let mut skips = Vec::new();
        let mut stored = 0;
        let seen = fetch_paginated(
            |skip| {
                skips.push(skip);
                let remaining = 250 - skip;
                Ok(page(skip, remaining.min(PAGE_SIZE), 250))
            },
            |recalls| {
                stored += recalls.len();
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(skips, vec![0, 100, 200]);
        assert_eq!(seen, 250);
        assert_eq!(stored, 250);
    }

    #[test]
    fn not_found_window_is_empty() {
        let seen = fetch_paginated(
            |_| {
                Err(IngestError::Http {
                    status: 404,
                    body: r#"{"error":{"code":"NOT_FOUND"}}"#.into(),
                })
            },
            |_| Ok(()),
        )
        .unwrap();
        assert_eq!(seen, 0);
    }

    #[test]
    fn page_url_encodes_date_window() {
        let url = page_url(
            "https://api.fda.gov/food/enforcement.json",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            200,
        )
        .unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs[0].1, "report_date:[20240101 TO 20240301]");
        assert_eq!(pairs[2], ("skip".to_string(), "200".to_string()));
    }
}
