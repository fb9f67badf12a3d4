pub mod dashboard;
pub mod issue;
pub mod report;
