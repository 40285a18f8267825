use crate::domain::recall::StoredRecall;
use crate::errors::ServerError;
use crate::responses::xlsx_response;
use crate::responses::ResultResp;
use rust_xlsxwriter::{Format, Workbook};

const HEADERS: [&str; 8] = [
    "Source",
    "Recall ID",
    "Title",
    "Recall Date",
    "Classification",
    "Reason",
    "Affected States",
    "Display Title",
];

/// Build the workbook bytes for a recall listing.
pub fn recalls_workbook(recalls: &[StoredRecall]) -> Result<Vec<u8>, ServerError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *header, &bold)
            .map_err(|e| {
                ServerError::XlsxError(format!("Failed to write header '{}': {}", header, e))
            })?;
    }

    for (i, recall) in recalls.iter().enumerate() {
        let r = (i + 1) as u32;
        let date = recall
            .recall_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let override_title = recall
            .display
            .as_ref()
            .and_then(|d| d.display.preview_title.as_deref())
            .unwrap_or("");
        let states = recall.affected_states.join(", ");

        let cells: [&str; 8] = [
            recall.source.as_str(),
            &recall.id,
            &recall.title,
            &date,
            recall.snapshot.classification().unwrap_or(""),
            recall.snapshot.reason().unwrap_or(""),
            &states,
            override_title,
        ];

        for (col, value) in cells.iter().enumerate() {
            worksheet
                .write_string(r, col as u16, *value)
                .map_err(|e| {
                    ServerError::XlsxError(format!(
                        "Failed to write {} for {}: {}",
                        HEADERS[col], recall.id, e
                    ))
                })?;
        }
    }

    worksheet.autofit();

    workbook
        .save_to_buffer()
        .map_err(|e| ServerError::XlsxError(format!("Failed to save workbook: {}", e)))
}

pub fn export_recalls_xlsx(recalls: &[StoredRecall], label: &str) -> ResultResp {
    let buffer = recalls_workbook(recalls)?;
    xlsx_response(buffer, &format!("recalls_{label}.xlsx"))
}
