//! Libris application library
//!
//! Book record module and the wiring that serves it over HTTP.

pub mod app;
pub mod modules;

pub use modules::books::{
    models::{Book, BookInput},
    service::{BookError, BookRecordService},
    store::{BookStore, MemoryBookStore, SqliteBookStore},
};
