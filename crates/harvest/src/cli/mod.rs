pub mod app;
pub mod download;
pub mod source;
pub mod urls;
