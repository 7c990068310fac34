// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error type returned by the clustering engine.

use crate::index::Index;
use thiserror::Error;

/// Opaque marker used only to parametrize [`Index`] for cell identifiers in
/// error messages; the engine itself is generic over the consumer's own cell id type,
/// so this module only needs something `Display`-able for diagnostics.
#[derive(Debug)]
pub struct AnyCell;

/// Errors that can occur while building or querying hierarchical net clusters.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// A cell index was referenced that the consumed layout does not know about.
    #[error("unknown cell index {0}")]
    UnknownCell(usize),

    /// A layer index was referenced that the connectivity model does not know about.
    #[error("unknown layer index {0}")]
    UnknownLayer(usize),

    /// A transform could not be composed or inverted exactly, e.g. a magnification
    /// that does not divide evenly for the coordinate type in use.
    #[error("malformed transform: {0}")]
    MalformedTransform(String),

    /// The cell hierarchy contains a cycle, which would make a bottom-up build loop forever.
    #[error("cell hierarchy contains a cycle through cell index {0}")]
    CellCycle(usize),

    /// The build was cancelled cooperatively through a [`crate::progress::Progress`] implementation.
    #[error("cluster build was cancelled")]
    Cancelled,

    /// A cluster arena or cache could not grow further, e.g. because a configured
    /// bound was hit and the caller asked for hard failure instead of eviction.
    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    /// An internal invariant of the clustering engine was violated. This always
    /// indicates a bug rather than a problem with the input layout.
    #[error("internal contract violated in cell {cell}: {message}")]
    Contract {
        /// The cell in which the violation was detected.
        cell: usize,
        /// A description of the violated invariant.
        message: String,
    },
}

impl ClusterError {
    /// Build a [`ClusterError::Contract`] from a cell index and a message.
    pub(crate) fn contract(cell: Index<AnyCell>, message: impl Into<String>) -> Self {
        ClusterError::Contract { cell: cell.value(), message: message.into() }
    }
}

/// Convenience alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, ClusterError>;
