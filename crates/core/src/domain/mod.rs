pub mod catalog;
pub mod content;
pub mod restaurant;
pub mod run_info;
