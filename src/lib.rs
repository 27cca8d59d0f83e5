//! # Pricebase
//!
//! Normalizes construction unit-price catalogs (nested XML reference
//! documents) into a relational SQLite store and serves hierarchical
//! browsing and substring search over the result.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │ Catalog XML │──▶│ Import walker │──▶│  SQLite   │
//! │             │   │ + dedup cache │   │           │
//! └─────────────┘   └──────────────┘   └────┬─────┘
//!                                           │
//!                       ┌───────────────────┤
//!                       ▼                   ▼
//!                  ┌──────────┐       ┌──────────┐
//!                  │   CLI    │       │   HTTP   │
//!                  │ (pbase)  │       │  (JSON)  │
//!                  └──────────┘       └──────────┘
//! ```
//!
//! The engine itself (parser, walker, resolver, hierarchy, search) lives in
//! `pricebase-core`; this crate wires it to SQLite, the CLI and axum.
//!
//! ## Quick Start
//!
//! ```bash
//! pbase init                        # create database
//! pbase import catalog.xml          # import one document
//! pbase search "котлован"           # pruned section tree
//! pbase work 42                     # one work with items and resources
//! pbase serve                       # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//! | [`import`] | `pbase import` |
//! | [`browse`] | Listing commands |
//! | [`search`] | `pbase search` tree output |
//! | [`stats`] | Row counts per table |
//! | [`server`] | JSON HTTP server |

pub mod browse;
pub mod config;
pub mod db;
pub mod import;
pub mod migrate;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod stats;
