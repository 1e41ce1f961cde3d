use std::collections::{HashMap, HashSet};

use buttress_core::error::StabilityError;
use buttress_core::types::{Piece, PieceId, SupportType};

/// One arena slot: the piece and both directions of its adjacency.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub piece: Piece,
    /// Pieces holding this one up, with the relation's classification.
    pub supporters: Vec<(PieceId, SupportType)>,
    /// Pieces this one holds up.
    pub dependents: Vec<PieceId>,
}

/// Authoritative store of pieces and support relations.
///
/// Pieces live in a dense arena addressed through an id -> slot map; removal
/// is a `swap_remove` plus one slot fix-up. Adjacency is keyed by `PieceId`
/// on both endpoints, so slots can move without touching any edge list.
#[derive(Debug, Clone, Default)]
pub struct SupportGraph {
    nodes: Vec<Node>,
    slots: HashMap<PieceId, usize>,
    grounded: HashSet<PieceId>,
}

impl SupportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: PieceId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.node(id).map(|n| &n.piece)
    }

    /// Mutable access for damage-state edits. Callers must invalidate afterwards.
    pub fn piece_mut(&mut self, id: PieceId) -> Option<&mut Piece> {
        let slot = *self.slots.get(&id)?;
        self.nodes.get_mut(slot).map(|n| &mut n.piece)
    }

    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.nodes.iter().map(|n| &n.piece)
    }

    pub fn ids(&self) -> impl Iterator<Item = PieceId> + '_ {
        self.nodes.iter().map(|n| n.piece.id)
    }

    pub(crate) fn node(&self, id: PieceId) -> Option<&Node> {
        self.slots.get(&id).and_then(|&slot| self.nodes.get(slot))
    }

    fn node_mut(&mut self, id: PieceId) -> Option<&mut Node> {
        let slot = *self.slots.get(&id)?;
        self.nodes.get_mut(slot)
    }

    /// Insert a piece with no relations. Its `grounded` flag seeds the grounded set.
    pub fn add_piece(&mut self, piece: Piece) -> Result<(), StabilityError> {
        if self.slots.contains_key(&piece.id) {
            return Err(StabilityError::DuplicatePiece(piece.id));
        }
        let id = piece.id;
        if piece.grounded {
            self.grounded.insert(id);
        }
        self.slots.insert(id, self.nodes.len());
        self.nodes.push(Node {
            piece,
            supporters: Vec::new(),
            dependents: Vec::new(),
        });
        log::debug!("graph: added {id}");
        Ok(())
    }

    /// Remove a piece and every edge touching it, in both directions.
    /// Returns the removed piece, or None if it was unknown.
    pub fn remove_piece(&mut self, id: PieceId) -> Option<Piece> {
        let slot = self.slots.remove(&id)?;
        let node = self.nodes.swap_remove(slot);
        if let Some(moved) = self.nodes.get(slot) {
            self.slots.insert(moved.piece.id, slot);
        }
        self.grounded.remove(&id);

        for (supporter, _) in &node.supporters {
            if let Some(s) = self.node_mut(*supporter) {
                s.dependents.retain(|d| *d != id);
            }
        }
        for dependent in &node.dependents {
            if let Some(d) = self.node_mut(*dependent) {
                d.supporters.retain(|(s, _)| *s != id);
            }
        }
        log::debug!(
            "graph: removed {id} ({} supporters, {} dependents detached)",
            node.supporters.len(),
            node.dependents.len()
        );
        Some(node.piece)
    }

    /// Record `supporter -> supported`. Returns Ok(false) if the edge already existed.
    pub fn add_support_relation(
        &mut self,
        supporter: PieceId,
        supported: PieceId,
        kind: SupportType,
    ) -> Result<bool, StabilityError> {
        if supporter == supported {
            return Err(StabilityError::SelfSupport(supporter));
        }
        if !self.contains(supporter) {
            return Err(StabilityError::UnknownPiece(supporter));
        }
        let target = self
            .node_mut(supported)
            .ok_or(StabilityError::UnknownPiece(supported))?;
        if target.supporters.iter().any(|(s, _)| *s == supporter) {
            return Ok(false);
        }
        target.supporters.push((supporter, kind));
        if let Some(s) = self.node_mut(supporter) {
            s.dependents.push(supported);
        }
        Ok(true)
    }

    /// Drop `supporter -> supported`. Returns whether an edge was removed.
    pub fn remove_support_relation(&mut self, supporter: PieceId, supported: PieceId) -> bool {
        let removed = match self.node_mut(supported) {
            Some(target) => {
                let before = target.supporters.len();
                target.supporters.retain(|(s, _)| *s != supporter);
                target.supporters.len() != before
            }
            None => false,
        };
        if removed {
            if let Some(s) = self.node_mut(supporter) {
                s.dependents.retain(|d| *d != supported);
            }
        }
        removed
    }

    /// Direct supporters of `id`. Empty for unknown ids.
    pub fn supporters_of(&self, id: PieceId) -> Vec<PieceId> {
        self.node(id)
            .map(|n| n.supporters.iter().map(|(s, _)| *s).collect())
            .unwrap_or_default()
    }

    /// Direct supporters with their relation type. Empty for unknown ids.
    pub fn support_relations(&self, id: PieceId) -> &[(PieceId, SupportType)] {
        self.node(id).map(|n| n.supporters.as_slice()).unwrap_or(&[])
    }

    /// Pieces directly held up by `id`. Empty for unknown ids.
    pub fn supported_by(&self, id: PieceId) -> &[PieceId] {
        self.node(id).map(|n| n.dependents.as_slice()).unwrap_or(&[])
    }

    pub fn support_type(&self, supporter: PieceId, supported: PieceId) -> Option<SupportType> {
        self.node(supported)?
            .supporters
            .iter()
            .find(|(s, _)| *s == supporter)
            .map(|(_, kind)| *kind)
    }

    pub fn is_grounded(&self, id: PieceId) -> bool {
        self.grounded.contains(&id)
    }

    /// Update the grounded flag and set together. Returns false for unknown ids.
    pub fn set_grounded(&mut self, id: PieceId, grounded: bool) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.piece.grounded = grounded;
        if grounded {
            self.grounded.insert(id);
        } else {
            self.grounded.remove(&id);
        }
        true
    }

    /// Height of a piece for bottom-up ordering. Unknown ids sort last.
    pub fn height(&self, id: PieceId) -> f32 {
        self.piece(id).map(|p| p.height()).unwrap_or(f32::INFINITY)
    }

    /// Sort ascending by height, ids breaking ties, so supporters come first.
    pub fn sort_bottom_up(&self, ids: &mut [PieceId]) {
        ids.sort_by(|a, b| self.height(*a).total_cmp(&self.height(*b)).then(a.cmp(b)));
    }

    /// Verify symmetric bookkeeping: every edge has its reverse entry, no edge
    /// names a missing piece, and the grounded set mirrors the piece flags.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.slots.len() != self.nodes.len() {
            return Err(format!(
                "slot map has {} entries for {} nodes",
                self.slots.len(),
                self.nodes.len()
            ));
        }
        for (slot, node) in self.nodes.iter().enumerate() {
            let id = node.piece.id;
            if self.slots.get(&id) != Some(&slot) {
                return Err(format!("{id} is not indexed at slot {slot}"));
            }
            for (supporter, _) in &node.supporters {
                let ok = self
                    .node(*supporter)
                    .is_some_and(|s| s.dependents.contains(&id));
                if !ok {
                    return Err(format!("{supporter} -> {id} has no reverse entry"));
                }
            }
            for dependent in &node.dependents {
                let ok = self
                    .node(*dependent)
                    .is_some_and(|d| d.supporters.iter().any(|(s, _)| *s == id));
                if !ok {
                    return Err(format!("{id} -> {dependent} has no forward entry"));
                }
            }
            if node.piece.grounded != self.grounded.contains(&id) {
                return Err(format!("{id} grounded flag out of sync"));
            }
        }
        if self.grounded.iter().any(|id| !self.contains(*id)) {
            return Err("grounded set names a removed piece".to_string());
        }
        Ok(())
    }
}
