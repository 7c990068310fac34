// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! SUPPLEMENT: progress/cancellation plumbing. Grounded on the original's
//! `tl::RelativeProgress`/cancellation-flag pattern — `dbHierNetworkProcessor.cc`
//! threads a `tl::RelativeProgress &progress` through the hierarchical-connection
//! builders. §5 specifies cancellation as cooperative, checked only at
//! well-defined progress ticks; this trait is that check-point.

use crate::error::ClusterError;

/// Cooperative progress reporting and cancellation, polled by `build` between
/// cells and inside the box-scanner loops.
pub trait Progress {
    /// Called at a well-defined progress tick. Returning `Err` aborts the build
    /// with [`ClusterError::Cancelled`]; the caller must then call `clear`.
    fn tick(&self) -> Result<(), ClusterError> {
        Ok(())
    }

    /// Called with a human-readable status message. Only invoked when
    /// `HierClustersConfig::report_progress` is set; ticks/cancellation checks
    /// always run regardless.
    fn report(&self, _msg: &str) {}
}

/// A no-op implementation: never cancels, never reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl Progress for NoopProgress {}

/// A simple atomic-flag based progress/cancellation handle, useful for callers
/// that want to cancel a running `build` from another thread without
/// implementing the trait themselves.
#[derive(Debug, Default)]
pub struct CancellationFlag {
    cancelled: std::sync::atomic::AtomicBool,
}

impl CancellationFlag {
    /// Create a flag that is not yet cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next progress tick.
    pub fn cancel(&self) {
        self.cancelled.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Progress for CancellationFlag {
    fn tick(&self) -> Result<(), ClusterError> {
        if self.cancelled.load(std::sync::atomic::Ordering::SeqCst) {
            Err(ClusterError::Cancelled)
        } else {
            Ok(())
        }
    }
}
