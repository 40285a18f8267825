pub mod errors;
pub mod html;
pub mod json;
pub mod xlsx;

pub use errors::{json_error_response, public_message, ResultResp};

pub use html::{bytes_response, html_response, redirect};
pub use json::json_response;
pub use xlsx::xlsx_response;
