//! The per-channel ordering graph of an assembled schedule.

// Copyright 2021 Rigetti Computing
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use petgraph::graphmap::GraphMap;
use petgraph::{Directed, Direction};

use crate::units::Picoseconds;

/// A registered instruction, identified by the index of its channel in the registry and its
/// position on that channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduledGraphNode {
    pub channel: usize,
    pub position: usize,
}

impl ScheduledGraphNode {
    pub fn new(channel: usize, position: usize) -> Self {
        Self { channel, position }
    }
}

/// One chain per channel, in time order. Each edge carries the idle gap between the end of
/// its source and the start of its target.
#[derive(Clone, Debug, Default)]
pub struct ScheduleGraph {
    graph: GraphMap<ScheduledGraphNode, Picoseconds, Directed>,
}

impl ScheduleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn add_node(&mut self, node: ScheduledGraphNode) {
        self.graph.add_node(node);
    }

    pub(super) fn add_gap(
        &mut self,
        earlier: ScheduledGraphNode,
        later: ScheduledGraphNode,
        gap: Picoseconds,
    ) {
        self.graph.add_edge(earlier, later, gap);
    }

    /// The gap between `earlier` and `later`, if `later` directly follows `earlier`.
    fn gap(
        &self,
        earlier: ScheduledGraphNode,
        later: ScheduledGraphNode,
    ) -> Option<Picoseconds> {
        self.graph.edge_weight(earlier, later).copied()
    }

    /// The instruction played immediately before `node` on its channel, with the gap between them.
    pub fn predecessor(
        &self,
        node: ScheduledGraphNode,
    ) -> Option<(ScheduledGraphNode, Picoseconds)> {
        self.graph
            .neighbors_directed(node, Direction::Incoming)
            .next()
            .and_then(|previous| self.gap(previous, node).map(|gap| (previous, gap)))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
