pub mod cyber;
pub mod entity;
pub mod filings;
pub mod fx;
pub mod supplier;
