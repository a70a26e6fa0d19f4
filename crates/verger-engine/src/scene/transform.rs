use slotmap::{SlotMap, new_key_type};

use crate::coords::{Mat4, Vec2};

new_key_type! {
    /// Handle to a node stored in a [`TransformTree`].
    pub struct NodeId;
}

/// Parent chains longer than this are assumed to be cycles.
///
/// Past the bound the remaining ancestors are ignored (treated as identity)
/// and a warning is logged.
pub const MAX_PARENT_DEPTH: usize = 256;

const NEVER_RESOLVED: u64 = u64::MAX;

/// Position, rotation and scale relative to an optional parent node.
///
/// Setters only mark the node stale when the value actually changes, so
/// writing the same position every frame costs nothing at resolve time.
#[derive(Debug, Clone)]
pub struct TransformNode {
    position: Vec2,
    rotation: f32,
    scale: Vec2,
    parent: Option<NodeId>,

    local: Mat4,
    world: Mat4,

    needs_resolution: bool,
    was_invalidated: bool,
    resolved_pass: u64,
}

impl TransformNode {
    /// Identity transform with no parent, stale until first resolved.
    pub fn new() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            parent: None,
            local: Mat4::IDENTITY,
            world: Mat4::IDENTITY,
            needs_resolution: true,
            was_invalidated: false,
            resolved_pass: NEVER_RESOLVED,
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.set_position(position);
        self
    }

    pub fn with_rotation(mut self, radians: f32) -> Self {
        self.set_rotation(radians);
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.set_scale(scale);
        self
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    #[inline]
    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// `T(position) * R(rotation) * S(scale)`.
    #[inline]
    pub fn local(&self) -> Mat4 {
        self.local
    }

    /// Last resolved world matrix. Only meaningful once `needs_resolution` is false.
    #[inline]
    pub fn world(&self) -> Mat4 {
        self.world
    }

    #[inline]
    pub fn needs_resolution(&self) -> bool {
        self.needs_resolution
    }

    /// True when the world matrix was recomputed during the current pass.
    #[inline]
    pub fn was_invalidated(&self) -> bool {
        self.was_invalidated
    }

    pub fn set_position(&mut self, position: Vec2) {
        if self.position != position {
            self.position = position;
            self.touch();
        }
    }

    pub fn set_rotation(&mut self, radians: f32) {
        if self.rotation != radians {
            self.rotation = radians;
            self.touch();
        }
    }

    pub fn set_scale(&mut self, scale: Vec2) {
        if self.scale != scale {
            self.scale = scale;
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.local = Mat4::from_translation_rotation_scale(self.position, self.rotation, self.scale);
        self.needs_resolution = true;
    }
}

impl Default for TransformNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Arena of transform nodes linked by non-owning parent keys.
///
/// Resolution is pass based: [`begin_pass`](Self::begin_pass) (or
/// [`resolve_all`](Self::resolve_all)) starts a pass, and every node resolves
/// at most once per pass unless it is made stale again in between.
#[derive(Debug, Default)]
pub struct TransformTree {
    nodes: SlotMap<NodeId, TransformNode>,
    pass: u64,
}

impl TransformTree {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn insert(&mut self, node: TransformNode) -> NodeId {
        self.nodes.insert(node)
    }

    /// Removes a node. Children that pointed at it lose their parent and are
    /// marked stale so they resolve against identity.
    pub fn remove(&mut self, id: NodeId) -> Option<TransformNode> {
        let removed = self.nodes.remove(id)?;

        let mut detached = 0usize;
        for node in self.nodes.values_mut() {
            if node.parent == Some(id) {
                node.parent = None;
                node.needs_resolution = true;
                detached += 1;
            }
        }
        if detached > 0 {
            log::trace!("removed transform {id:?}; detached {detached} children");
        }

        Some(removed)
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&TransformNode> {
        self.nodes.get(id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TransformNode> {
        self.nodes.get_mut(id)
    }

    /// Re-parents `id`. Returns false if `id` is not in the tree.
    ///
    /// Cycles are not rejected here; resolution guards against them.
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if node.parent != parent {
            node.parent = parent;
            node.needs_resolution = true;
        }
        true
    }

    /// World matrix of `id`, identity for unknown keys.
    pub fn world(&self, id: NodeId) -> Mat4 {
        self.nodes.get(id).map_or(Mat4::IDENTITY, TransformNode::world)
    }

    /// Whether `id` changed world matrix in the current pass (false for unknown keys).
    pub fn was_invalidated(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(TransformNode::was_invalidated)
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys()
    }

    /// Starts a new resolution pass.
    pub fn begin_pass(&mut self) {
        self.pass = self.pass.wrapping_add(1);
        if self.pass == NEVER_RESOLVED {
            self.pass = 0;
        }
    }

    /// Starts a pass and resolves every node.
    pub fn resolve_all(&mut self) {
        self.begin_pass();
        let ids: Vec<NodeId> = self.nodes.keys().collect();
        for id in ids {
            self.resolve(id);
        }
    }

    /// Brings `id` (and its ancestors) up to date for the current pass.
    pub fn resolve(&mut self, id: NodeId) {
        self.resolve_at_depth(id, 0);
    }

    fn resolve_at_depth(&mut self, id: NodeId, depth: usize) {
        let pass = self.pass;
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };

        if node.resolved_pass == pass && !node.needs_resolution {
            return;
        }
        if node.resolved_pass != pass {
            node.was_invalidated = false;
            node.resolved_pass = pass;
        }

        // (world, changed this pass) of the parent, None when resolving against identity.
        let parent_state = match node.parent {
            Some(parent_id) if depth >= MAX_PARENT_DEPTH => {
                log::warn!(
                    "transform parent chain deeper than {MAX_PARENT_DEPTH} at {parent_id:?} \
                     (cycle?); resolving against identity"
                );
                None
            }
            Some(parent_id) => {
                self.resolve_at_depth(parent_id, depth + 1);
                self.nodes
                    .get(parent_id)
                    .map(|p| (p.world, p.was_invalidated))
            }
            None => None,
        };

        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };

        if let Some((_, true)) = parent_state {
            node.needs_resolution = true;
        }

        if node.needs_resolution {
            let parent_world = parent_state.map_or(Mat4::IDENTITY, |(world, _)| world);
            node.world = parent_world * node.local;
            node.needs_resolution = false;
            node.was_invalidated = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn node_at(x: f32, y: f32) -> TransformNode {
        TransformNode::new().with_position(Vec2::new(x, y))
    }

    fn chain(tree: &mut TransformTree) -> (NodeId, NodeId, NodeId) {
        let a = tree.insert(node_at(10.0, 0.0).with_rotation(0.5));
        let b = tree.insert(node_at(0.0, 5.0).with_scale(Vec2::new(2.0, 2.0)));
        let c = tree.insert(node_at(1.0, 1.0));
        tree.set_parent(b, Some(a));
        tree.set_parent(c, Some(b));
        (a, b, c)
    }

    // ── cascade ──────────────────────────────────────────────────────────

    #[test]
    fn moving_root_cascades_to_descendants() {
        let mut tree = TransformTree::new();
        let (a, b, c) = chain(&mut tree);
        let unrelated = tree.insert(node_at(-3.0, 0.0));
        tree.resolve_all();

        tree.get_mut(a).unwrap().set_position(Vec2::new(20.0, -4.0));
        tree.resolve_all();

        let expected = tree.get(a).unwrap().local() * tree.get(b).unwrap().local() * tree.get(c).unwrap().local();
        assert_abs_diff_eq!(tree.world(c), expected);
        assert!(tree.was_invalidated(a));
        assert!(tree.was_invalidated(b));
        assert!(tree.was_invalidated(c));
        assert!(!tree.was_invalidated(unrelated));
    }

    #[test]
    fn quiet_pass_reports_nothing_invalidated() {
        let mut tree = TransformTree::new();
        let (a, b, c) = chain(&mut tree);
        tree.resolve_all();
        assert!(tree.was_invalidated(c));

        tree.resolve_all();
        for id in [a, b, c] {
            assert!(!tree.was_invalidated(id));
            assert!(!tree.get(id).unwrap().needs_resolution());
        }
    }

    #[test]
    fn siblings_resolved_before_parent_both_see_cascade() {
        let mut tree = TransformTree::new();
        let parent = tree.insert(node_at(1.0, 1.0));
        let x = tree.insert(node_at(2.0, 0.0));
        let y = tree.insert(node_at(0.0, 2.0));
        tree.set_parent(x, Some(parent));
        tree.set_parent(y, Some(parent));
        tree.resolve_all();

        tree.get_mut(parent).unwrap().set_position(Vec2::new(5.0, 5.0));
        tree.begin_pass();
        tree.resolve(x);
        tree.resolve(y);
        tree.resolve(parent);

        assert!(tree.was_invalidated(parent));
        assert!(tree.was_invalidated(x));
        assert!(tree.was_invalidated(y));
        assert_eq!(tree.world(y).transform_point(Vec2::ZERO), Vec2::new(5.0, 7.0));
    }

    #[test]
    fn same_value_setter_does_not_mark_stale() {
        let mut tree = TransformTree::new();
        let n = tree.insert(node_at(3.0, 4.0));
        tree.resolve_all();

        let node = tree.get_mut(n).unwrap();
        node.set_position(Vec2::new(3.0, 4.0));
        node.set_rotation(0.0);
        assert!(!node.needs_resolution());
    }

    #[test]
    fn fresh_node_resolves_to_local() {
        let mut tree = TransformTree::new();
        let n = tree.insert(node_at(7.0, -1.0));
        assert!(tree.get(n).unwrap().needs_resolution());

        tree.resolve_all();
        assert_eq!(tree.world(n), tree.get(n).unwrap().local());
    }

    // ── detachment ───────────────────────────────────────────────────────

    #[test]
    fn removing_parent_detaches_children() {
        let mut tree = TransformTree::new();
        let (a, b, c) = chain(&mut tree);
        tree.resolve_all();

        assert!(tree.remove(b).is_some());
        assert_eq!(tree.get(c).unwrap().parent(), None);

        tree.resolve_all();
        assert_eq!(tree.world(c), tree.get(c).unwrap().local());
        assert!(tree.was_invalidated(c));
        assert!(!tree.was_invalidated(a));
    }

    #[test]
    fn dangling_parent_resolves_as_identity() {
        let mut tree = TransformTree::new();
        let gone = tree.insert(node_at(100.0, 100.0));
        tree.remove(gone);

        let orphan = tree.insert(node_at(1.0, 2.0));
        assert!(tree.set_parent(orphan, Some(gone)));
        tree.resolve_all();

        assert_eq!(tree.world(orphan).transform_point(Vec2::ZERO), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn unknown_ids_are_inert() {
        let mut tree = TransformTree::new();
        let gone = tree.insert(TransformNode::new());
        tree.remove(gone);

        assert!(!tree.set_parent(gone, None));
        assert_eq!(tree.world(gone), Mat4::IDENTITY);
        assert!(!tree.was_invalidated(gone));
        tree.resolve(gone);
    }

    #[test]
    fn parent_cycle_terminates() {
        let mut tree = TransformTree::new();
        let a = tree.insert(node_at(1.0, 0.0));
        let b = tree.insert(node_at(0.0, 1.0));
        tree.set_parent(a, Some(b));
        tree.set_parent(b, Some(a));

        tree.resolve_all();
        assert!(tree.world(a).is_finite());
        assert!(!tree.get(a).unwrap().needs_resolution());
        assert!(!tree.get(b).unwrap().needs_resolution());
    }
}
