pub mod dashboard;
pub mod history;
pub mod reports;
pub mod uploads;
