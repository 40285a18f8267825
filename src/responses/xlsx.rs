// responses/xlsx.rs
use crate::errors::ServerError;
use crate::responses::ResultResp;
use astra::{Body, ResponseBuilder};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Keep the download name header-safe: letters, digits, `-`, `_` and `.` only.
fn attachment_name(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "-_.".contains(c) { c } else { '_' })
        .collect();
    if cleaned.ends_with(".xlsx") {
        cleaned
    } else {
        format!("{cleaned}.xlsx")
    }
}

/// Workbook bytes as a download. Exports are never cached; listings change with each ingest.
pub fn xlsx_response(buffer: Vec<u8>, filename: &str) -> ResultResp {
    ResponseBuilder::new()
        .status(200)
        .header("Content-Type", XLSX_CONTENT_TYPE)
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", attachment_name(filename)),
        )
        .header("Cache-Control", "no-store")
        .body(Body::from(buffer))
        .map_err(|_| ServerError::InternalError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_names_are_header_safe() {
        assert_eq!(attachment_name("recalls_New_York.xlsx"), "recalls_New_York.xlsx");
        assert_eq!(attachment_name("recalls \"all\""), "recalls__all_.xlsx");
    }
}
