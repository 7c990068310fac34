// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Build configuration (§6 "Configuration"): the knobs `hier_builder::build`
//! reads, gathered in one place the way a host application would construct
//! them once and reuse them across builds.

use crate::cluster::builder::AttributeEquivalence;
use crate::geometry::EdgeInteractionMode;
use crate::layout_model::CellIndex;
use fnv::FnvHashMap;
use fnv::FnvHashSet;

/// Build-time configuration for [`crate::cluster::hier_builder::build`].
pub struct HierClustersConfig {
    /// Emit human-readable progress messages via [`crate::progress::Progress::report`]
    /// in addition to cancellation ticks.
    pub report_progress: bool,
    /// Forwarded to the local clustering builder (§4.2 step 2): shapes
    /// carrying distinct nonzero attribute ids never merge.
    pub separate_attributes: bool,
    /// Cells the build treats as opaque: their own local clusters are still
    /// built, but the hierarchical passes never look inside them from a
    /// parent's perspective, matching "breakout cells" in the original's
    /// hierarchical net tracer.
    pub breakout_cells: FnvHashSet<CellIndex>,
    /// Per-cell attribute-equivalence relations (§4.2 step 5), consulted
    /// during that cell's local clustering pass only.
    pub attribute_equivalence: FnvHashMap<CellIndex, Box<dyn AttributeEquivalence>>,
    /// The edge-interaction mode used when shapes are `Edge<C>` (ignored by
    /// the other two shape variants).
    pub edge_connect_mode: EdgeInteractionMode,
    /// Bounding-box-to-area ratio above which a root cluster is considered
    /// for splitting before being handed back to the hierarchy (§4.3 Step C.2).
    /// Not load-bearing for partition correctness: it only affects whether a
    /// single broad net is represented as one cluster or several equivalent
    /// ones (§9 Open Question).
    pub area_ratio_split_threshold: f64,
    /// Upper bound on cached cluster-pair list length for both interaction
    /// caches (§5).
    pub instance_to_instance_cache_size_threshold: usize,
}

impl Default for HierClustersConfig {
    fn default() -> Self {
        HierClustersConfig {
            report_progress: false,
            separate_attributes: false,
            breakout_cells: FnvHashSet::default(),
            attribute_equivalence: FnvHashMap::default(),
            edge_connect_mode: EdgeInteractionMode::CollinearTouching,
            area_ratio_split_threshold: 10.0,
            instance_to_instance_cache_size_threshold: 10_000,
        }
    }
}

impl HierClustersConfig {
    /// Default configuration, matching the original's out-of-the-box behavior.
    pub fn new() -> Self {
        Self::default()
    }
}
