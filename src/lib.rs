pub mod app;
pub mod cancel;
pub mod domain;
pub mod error;
pub mod gnps;
pub mod manifest;
pub mod output;
pub mod staging;
pub mod table;
pub mod workflow;
