pub mod activity;
pub mod app;
pub mod source;
