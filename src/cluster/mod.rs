// SPDX-FileCopyrightText: 2022 Thomas Kramer
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The clustering engine proper: per-cell local clusters (C5), promoted and
//! merged across the cell hierarchy (C9) into one `HierClusters` network (C7),
//! plus the caches (C8), recursive iterators (C10) and incoming-connections
//! index (§4.6) built on top of it.

pub mod arena;
pub mod builder;
pub mod cache;
pub mod connected;
pub mod hier_builder;
pub mod incoming;
pub mod iter;
pub mod local;
pub mod tree;

pub use arena::{ClusterArena, ClusterId};
pub use builder::{build_local_clusters, AttributeEquivalence};
pub use cache::{CacheStats, InstancePairKey, InteractionCaches};
pub use connected::{ClusterInstanceRef, ConnectedClusters};
pub use hier_builder::build;
pub use incoming::{IncomingConnection, IncomingIndex};
pub use iter::{collect_cluster_shapes, RecursiveClusterShapeIterator, StructuralClusterIterator};
pub use local::LocalCluster;
pub use tree::{HierClusters, NetShapeSink};
