//! Fatal and read-path error types.
//!
//! Recoverable per-row problems found during an import are not errors in
//! this sense; they are collected as [`ImportIssue`](crate::report::ImportIssue)s.

use thiserror::Error;

use crate::models::RowId;

/// The input could not be read as a catalog document at all.
#[derive(Debug, Error)]
#[error("malformed catalog document at byte {position}: {message}")]
pub struct ParseError {
    pub position: u64,
    pub message: String,
}

/// Errors that abort an import run.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Unparsable markup. Raised before anything is written.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The store did not answer the connectivity probe.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The document header could not be written, so nothing can hang off it.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Violations of the hierarchy builder's input contract.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("section {id} references parent {parent_id}, which is not in the row set")]
    MissingParent { id: RowId, parent_id: RowId },

    #[error("sections {ids:?} form a parent cycle")]
    Cycle { ids: Vec<RowId> },
}

/// Errors returned by the catalog read API.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: RowId },

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: RowId) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
