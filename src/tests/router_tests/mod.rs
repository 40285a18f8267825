mod admin_tests;
mod pending_tests;
mod recall_tests;
