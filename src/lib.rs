//! Attendance points and excuses for the chapter site.

pub mod config;
pub mod db;
pub mod error;
pub mod graphql;
pub mod models;
pub mod notify;
pub mod util;
