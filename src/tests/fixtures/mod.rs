pub mod app;
pub mod records;
pub mod rows;
