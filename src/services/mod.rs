pub mod attempts;
pub mod grid;
pub mod report;
