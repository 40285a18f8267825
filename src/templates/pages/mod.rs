pub mod admin;
pub mod home;
pub mod recall;

pub use admin::{admin_page, AdminVm};
pub use home::{home_page, HomeVm};
pub use recall::{recall_page, RecallVm};
