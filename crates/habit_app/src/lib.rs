pub mod app;
pub mod snapshot;
