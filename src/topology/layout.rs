use super::table::{EdgeSpec, NodeId, Ring, Topology};
use glam::Vec3;
use std::collections::BTreeMap;
use std::f32::consts::PI;

pub const OUTER_RADIUS: f32 = 5.0;
pub const INNER_RADIUS: f32 = 2.5;
pub const INNER_ELEVATION: f32 = 1.0;

/// Position of the `index`-th node on `ring`.
///
/// Outer nodes sit every `π/4` on the z = 0 plane. Inner nodes sit one unit
/// above that plane at the half-integer multiples 0.5, 2.5, 4.5 and 6.5 of
/// `π/2`, so 002/004 and 003/005 share a position.
pub fn ring_position(ring: Ring, index: u8) -> Vec3 {
    match ring {
        Ring::Outer => {
            let angle = index as f32 * PI / 4.0;
            Vec3::new(OUTER_RADIUS * angle.cos(), OUTER_RADIUS * angle.sin(), 0.0)
        }
        Ring::Inner => {
            let angle = (2.0 * index as f32 + 0.5) * PI / 2.0;
            Vec3::new(
                INNER_RADIUS * angle.cos(),
                INNER_RADIUS * angle.sin(),
                INNER_ELEVATION,
            )
        }
    }
}

/// Node positions keyed by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    positions: BTreeMap<NodeId, Vec3>,
}

impl Layout {
    pub fn position(&self, id: NodeId) -> Vec3 {
        // Layout is only built by compute_layout, which covers every id.
        self.positions.get(&id).copied().unwrap_or(Vec3::ZERO)
    }

    pub fn endpoints(&self, edge: &EdgeSpec) -> (Vec3, Vec3) {
        (self.position(edge.source), self.position(edge.target))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Vec3)> + '_ {
        self.positions.iter().map(|(id, p)| (*id, *p))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

pub fn compute_layout(topology: &Topology) -> Layout {
    let positions = topology
        .nodes()
        .iter()
        .map(|n| (n.id, ring_position(n.ring, n.index)))
        .collect();
    Layout { positions }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < EPS, "{a:?} != {b:?}");
    }

    #[test]
    fn test_layout_exact_positions() {
        let layout = compute_layout(&Topology::standard());
        let h = 5.0 * std::f32::consts::FRAC_1_SQRT_2;
        let i = 2.5 * std::f32::consts::FRAC_1_SQRT_2;
        let expected = [
            (NodeId::Lab001, Vec3::new(5.0, 0.0, 0.0)),
            (NodeId::Lab010, Vec3::new(h, h, 0.0)),
            (NodeId::Lab011, Vec3::new(0.0, 5.0, 0.0)),
            (NodeId::Lab006, Vec3::new(-h, h, 0.0)),
            (NodeId::Lab009, Vec3::new(-5.0, 0.0, 0.0)),
            (NodeId::Lab007, Vec3::new(-h, -h, 0.0)),
            (NodeId::Lab012, Vec3::new(0.0, -5.0, 0.0)),
            (NodeId::Lab008, Vec3::new(h, -h, 0.0)),
            (NodeId::Lab002, Vec3::new(i, i, 1.0)),
            (NodeId::Lab003, Vec3::new(-i, -i, 1.0)),
            (NodeId::Lab004, Vec3::new(i, i, 1.0)),
            (NodeId::Lab005, Vec3::new(-i, -i, 1.0)),
        ];
        assert_eq!(layout.len(), 12);
        for (id, pos) in expected {
            assert_close(layout.position(id), pos);
        }
    }

    #[test]
    fn test_inner_ring_pairs_coincide() {
        let layout = compute_layout(&Topology::standard());
        assert_close(layout.position(NodeId::Lab002), layout.position(NodeId::Lab004));
        assert_close(layout.position(NodeId::Lab003), layout.position(NodeId::Lab005));
        let i = 2.5 * std::f32::consts::FRAC_1_SQRT_2;
        assert_close(ring_position(Ring::Inner, 0), Vec3::new(i, i, 1.0));
        assert_close(ring_position(Ring::Inner, 1), Vec3::new(-i, -i, 1.0));
        assert!((i - 1.7678).abs() < 1e-4);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let topo = Topology::standard();
        let first = compute_layout(&topo);
        for _ in 0..5 {
            assert_eq!(compute_layout(&topo), first);
        }
    }

    #[test]
    fn test_edge_endpoints_follow_nodes() {
        let topo = Topology::standard();
        let layout = compute_layout(&topo);
        for edge in topo.edges() {
            let (a, b) = layout.endpoints(edge);
            assert_eq!(a, layout.position(edge.source));
            assert_eq!(b, layout.position(edge.target));
            assert!(a.distance(b) > 0.1);
        }
    }
}
