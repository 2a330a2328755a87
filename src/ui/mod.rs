pub mod printf;
pub mod report;
pub mod sparkline;
