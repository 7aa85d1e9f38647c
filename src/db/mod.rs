//! Schema-owning persistence over `rusqlite`. `connection` defines the
//! `Store` type and schema/migration; the other modules add `impl Store`
//! blocks grouped by concern, mirroring the teacher crate's one-file-per-
//! table-family layout.

mod adjudication;
mod alerts;
mod connection;
mod listings;
mod scrape_log;
mod tribunals;

pub use alerts::UnreadMatch;
pub use connection::Store;
