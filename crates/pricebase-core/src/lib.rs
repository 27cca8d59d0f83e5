//! # Pricebase Core
//!
//! Runtime-agnostic engine for Pricebase: the catalog data model, the
//! document parser and import walker, the dedup resolver, the storage
//! trait, section hierarchy reconstruction and ancestor-closure search.
//!
//! This crate contains no tokio, sqlx, HTTP or filesystem code. The
//! application crate supplies a [`store::Store`] backed by SQLite; tests use
//! [`store::memory::InMemoryStore`].
//!
//! | Module | Role |
//! |--------|------|
//! | [`document`] | Parses catalog XML into an owned element tree |
//! | [`walker`] | Imports one document through a [`store::Store`] |
//! | [`resolver`] | Lookup-or-create for items and resources; exactly-once links |
//! | [`report`] | Issues and counters collected during an import |
//! | [`hierarchy`] | Flat section rows to a forest |
//! | [`search`] | Substring match plus ancestor closure |
//! | [`catalog`] | Read operations used by the CLI and the server |

pub mod catalog;
pub mod document;
pub mod error;
pub mod hierarchy;
pub mod models;
pub mod report;
pub mod resolver;
pub mod search;
pub mod store;
pub mod walker;
