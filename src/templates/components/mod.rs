pub mod card;
pub mod error;
pub mod recall_card;

pub use card::card;
pub use error::html_error_response;
pub use recall_card::recall_card;
