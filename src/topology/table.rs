//! Fixed node and edge table of the cognitive loop.
//!
//! The outer ring carries the primary loop in the order the nodes are listed;
//! the inner ring holds the support units that feed into it.

use crate::rendering::Color;
use std::fmt;

/// Identity of one of the twelve processing nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeId {
    Lab001,
    Lab002,
    Lab003,
    Lab004,
    Lab005,
    Lab006,
    Lab007,
    Lab008,
    Lab009,
    Lab010,
    Lab011,
    Lab012,
}

impl NodeId {
    pub const ALL: [NodeId; 12] = [
        NodeId::Lab001,
        NodeId::Lab002,
        NodeId::Lab003,
        NodeId::Lab004,
        NodeId::Lab005,
        NodeId::Lab006,
        NodeId::Lab007,
        NodeId::Lab008,
        NodeId::Lab009,
        NodeId::Lab010,
        NodeId::Lab011,
        NodeId::Lab012,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            NodeId::Lab001 => "LAB_001",
            NodeId::Lab002 => "LAB_002",
            NodeId::Lab003 => "LAB_003",
            NodeId::Lab004 => "LAB_004",
            NodeId::Lab005 => "LAB_005",
            NodeId::Lab006 => "LAB_006",
            NodeId::Lab007 => "LAB_007",
            NodeId::Lab008 => "LAB_008",
            NodeId::Lab009 => "LAB_009",
            NodeId::Lab010 => "LAB_010",
            NodeId::Lab011 => "LAB_011",
            NodeId::Lab012 => "LAB_012",
        }
    }

    pub fn parse(s: &str) -> Option<NodeId> {
        NodeId::ALL.into_iter().find(|id| id.as_str() == s)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ring {
    Outer,
    Inner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeCategory {
    PrimaryLoop,
    SupportLink,
}

impl EdgeCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeCategory::PrimaryLoop => "primary-loop",
            EdgeCategory::SupportLink => "support-link",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSpec {
    pub id: NodeId,
    pub ring: Ring,
    pub index: u8,
    pub name: &'static str,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSpec {
    pub source: NodeId,
    pub target: NodeId,
    pub color: Color,
    pub opacity: f32,
    pub category: EdgeCategory,
}

const fn node(id: NodeId, ring: Ring, index: u8, name: &'static str, color: u32) -> NodeSpec {
    NodeSpec {
        id,
        ring,
        index,
        name,
        color: Color(color),
    }
}

const LOOP_COLOR: u32 = 0x00d4ff;
const LOOP_OPACITY: f32 = 0.6;
const SUPPORT_OPACITY: f32 = 0.3;

const fn primary(source: NodeId, target: NodeId) -> EdgeSpec {
    EdgeSpec {
        source,
        target,
        color: Color(LOOP_COLOR),
        opacity: LOOP_OPACITY,
        category: EdgeCategory::PrimaryLoop,
    }
}

const fn support(source: NodeId, target: NodeId, color: u32) -> EdgeSpec {
    EdgeSpec {
        source,
        target,
        color: Color(color),
        opacity: SUPPORT_OPACITY,
        category: EdgeCategory::SupportLink,
    }
}

pub const NODES: [NodeSpec; 12] = [
    // Primary loop, outer ring
    node(NodeId::Lab001, Ring::Outer, 0, "Emotional Salience", 0xfbbf24),
    node(NodeId::Lab010, Ring::Outer, 1, "Attention", 0x3b82f6),
    node(NodeId::Lab011, Ring::Outer, 2, "Working Memory", 0x8b5cf6),
    node(NodeId::Lab006, Ring::Outer, 3, "Metacognition", 0x06b6d4),
    node(NodeId::Lab009, Ring::Outer, 4, "Reconsolidation", 0x10b981),
    node(NodeId::Lab007, Ring::Outer, 5, "Preloading", 0xf59e0b),
    node(NodeId::Lab012, Ring::Outer, 6, "Future Think", 0xa78bfa),
    node(NodeId::Lab008, Ring::Outer, 7, "Contagion", 0xec4899),
    // Support units, inner ring
    node(NodeId::Lab002, Ring::Inner, 0, "Decay Mod", 0x34d399),
    node(NodeId::Lab003, Ring::Inner, 1, "Sleep Consol", 0x60a5fa),
    node(NodeId::Lab004, Ring::Inner, 2, "Novelty", 0xf97316),
    node(NodeId::Lab005, Ring::Inner, 3, "Spreading", 0xfbbf24),
];

pub const EDGES: [EdgeSpec; 12] = [
    primary(NodeId::Lab001, NodeId::Lab010),
    primary(NodeId::Lab010, NodeId::Lab011),
    primary(NodeId::Lab011, NodeId::Lab006),
    primary(NodeId::Lab006, NodeId::Lab009),
    primary(NodeId::Lab009, NodeId::Lab007),
    primary(NodeId::Lab007, NodeId::Lab012),
    primary(NodeId::Lab012, NodeId::Lab008),
    primary(NodeId::Lab008, NodeId::Lab001),
    support(NodeId::Lab002, NodeId::Lab009, 0x34d399),
    support(NodeId::Lab003, NodeId::Lab009, 0x60a5fa),
    support(NodeId::Lab004, NodeId::Lab010, 0xf97316),
    support(NodeId::Lab005, NodeId::Lab010, 0xfbbf24),
];

/// Read-only view over the node and edge tables.
#[derive(Debug, Clone, Copy)]
pub struct Topology {
    nodes: &'static [NodeSpec],
    edges: &'static [EdgeSpec],
}

impl Topology {
    pub const fn standard() -> Self {
        Self {
            nodes: &NODES,
            edges: &EDGES,
        }
    }

    pub fn nodes(&self) -> &[NodeSpec] {
        self.nodes
    }

    pub fn edges(&self) -> &[EdgeSpec] {
        self.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_node_listed_once() {
        let topo = Topology::standard();
        let ids: HashSet<NodeId> = topo.nodes().iter().map(|n| n.id).collect();
        assert_eq!(ids.len(), 12);
        for id in NodeId::ALL {
            assert!(topo.node(id).is_some(), "{id} missing");
        }
        let outer = topo.nodes().iter().filter(|n| n.ring == Ring::Outer).count();
        assert_eq!(outer, 8);
    }

    #[test]
    fn test_edge_set_is_exact() {
        let expected: Vec<(&str, &str, u32, f32, EdgeCategory)> = vec![
            ("LAB_001", "LAB_010", 0x00d4ff, 0.6, EdgeCategory::PrimaryLoop),
            ("LAB_010", "LAB_011", 0x00d4ff, 0.6, EdgeCategory::PrimaryLoop),
            ("LAB_011", "LAB_006", 0x00d4ff, 0.6, EdgeCategory::PrimaryLoop),
            ("LAB_006", "LAB_009", 0x00d4ff, 0.6, EdgeCategory::PrimaryLoop),
            ("LAB_009", "LAB_007", 0x00d4ff, 0.6, EdgeCategory::PrimaryLoop),
            ("LAB_007", "LAB_012", 0x00d4ff, 0.6, EdgeCategory::PrimaryLoop),
            ("LAB_012", "LAB_008", 0x00d4ff, 0.6, EdgeCategory::PrimaryLoop),
            ("LAB_008", "LAB_001", 0x00d4ff, 0.6, EdgeCategory::PrimaryLoop),
            ("LAB_002", "LAB_009", 0x34d399, 0.3, EdgeCategory::SupportLink),
            ("LAB_003", "LAB_009", 0x60a5fa, 0.3, EdgeCategory::SupportLink),
            ("LAB_004", "LAB_010", 0xf97316, 0.3, EdgeCategory::SupportLink),
            ("LAB_005", "LAB_010", 0xfbbf24, 0.3, EdgeCategory::SupportLink),
        ];
        let topology = Topology::standard();
        let edges = topology.edges();
        assert_eq!(edges.len(), expected.len());
        for (edge, (src, dst, color, opacity, cat)) in edges.iter().zip(expected) {
            assert_eq!(edge.source.as_str(), src);
            assert_eq!(edge.target.as_str(), dst);
            assert_eq!(edge.color, Color(color));
            assert_eq!(edge.opacity, opacity);
            assert_eq!(edge.category, cat);
        }
        let pairs: HashSet<(NodeId, NodeId)> =
            edges.iter().map(|e| (e.source, e.target)).collect();
        assert_eq!(pairs.len(), 12, "duplicate edge");
    }

    #[test]
    fn test_primary_loop_closes() {
        let topology = Topology::standard();
        let loop_edges: Vec<&EdgeSpec> = topology
            .edges()
            .iter()
            .filter(|e| e.category == EdgeCategory::PrimaryLoop)
            .collect();
        assert_eq!(loop_edges.len(), 8);
        let mut current = NodeId::Lab001;
        for _ in 0..8 {
            let next = loop_edges
                .iter()
                .find(|e| e.source == current)
                .map(|e| e.target)
                .unwrap();
            current = next;
        }
        assert_eq!(current, NodeId::Lab001);
    }

    #[test]
    fn test_support_edges_start_on_inner_ring() {
        let topo = Topology::standard();
        for edge in topo.edges().iter().filter(|e| e.category == EdgeCategory::SupportLink) {
            assert_eq!(topo.node(edge.source).unwrap().ring, Ring::Inner);
            assert_eq!(topo.node(edge.target).unwrap().ring, Ring::Outer);
            assert_eq!(edge.color, topo.node(edge.source).unwrap().color);
        }
    }

    #[test]
    fn test_parse_round_trip() {
        assert_eq!(NodeId::parse("LAB_007"), Some(NodeId::Lab007));
        assert_eq!(NodeId::parse("LAB_13"), None);
    }
}
