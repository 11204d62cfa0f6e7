#![forbid(unsafe_code)]

pub mod progress_store;
pub mod repository;
pub mod session_store;
pub mod sqlite;
