//! Reachability queries over the support graph.
//!
//! Every traversal is a BFS with a visited set keyed by `PieceId`, so it
//! terminates even if a bug introduces a support cycle. Removal is simulated
//! by passing an excluded piece into the traversal; the graph itself is never
//! mutated here.

use std::collections::{HashMap, HashSet, VecDeque};

use buttress_core::types::PieceId;

use crate::graph::SupportGraph;

impl SupportGraph {
    /// Whether a chain of supporters connects `id` to a grounded piece.
    pub fn has_path_to_ground(&self, id: PieceId) -> bool {
        self.has_path_to_ground_excluding(id, &HashSet::new())
    }

    /// Like [`has_path_to_ground`](Self::has_path_to_ground) but never enters
    /// a piece in `excluded`. An excluded start has no path.
    pub fn has_path_to_ground_excluding(&self, id: PieceId, excluded: &HashSet<PieceId>) -> bool {
        if !self.contains(id) || excluded.contains(&id) {
            return false;
        }

        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        queue.push_back(id);
        visited.insert(id);

        while let Some(current) = queue.pop_front() {
            if self.is_grounded(current) {
                return true;
            }
            for (supporter, _) in self.support_relations(current) {
                if excluded.contains(supporter) || !visited.insert(*supporter) {
                    continue;
                }
                queue.push_back(*supporter);
            }
        }
        false
    }

    /// Every piece held up by `id` directly or indirectly, `id` excluded,
    /// in BFS order.
    pub fn transitive_dependents(&self, id: PieceId) -> Vec<PieceId> {
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        visited.insert(id);
        queue.push_back(id);

        while let Some(current) = queue.pop_front() {
            for dependent in self.supported_by(current) {
                if visited.insert(*dependent) {
                    order.push(*dependent);
                    queue.push_back(*dependent);
                }
            }
        }
        order
    }

    /// Pieces that would lose every path to ground if `id` were removed,
    /// ordered bottom-up. The graph is left unchanged.
    ///
    /// Only transitive dependents of `id` can be affected. Each one is tested
    /// with an exclusion-aware BFS; pieces already proven connected are
    /// remembered so later searches can stop when they reach one.
    pub fn find_disconnected_after_removal(&self, id: PieceId) -> Vec<PieceId> {
        if !self.contains(id) {
            return Vec::new();
        }

        let dependents = self.transitive_dependents(id);
        let excluded: HashSet<PieceId> = [id].into_iter().collect();
        let mut connected: HashSet<PieceId> = HashSet::new();
        let mut disconnected = Vec::new();

        for &dependent in &dependents {
            if connected.contains(&dependent) {
                continue;
            }
            match self.ground_path_excluding(dependent, &excluded, &connected) {
                Some(path) => connected.extend(path),
                None => disconnected.push(dependent),
            }
        }

        self.sort_bottom_up(&mut disconnected);
        log::debug!(
            "graph: removing {id} disconnects {} of {} dependents",
            disconnected.len(),
            dependents.len()
        );
        disconnected
    }

    /// BFS toward ground that treats `known_connected` pieces as grounded.
    /// Returns the pieces on the found path (start included).
    fn ground_path_excluding(
        &self,
        start: PieceId,
        excluded: &HashSet<PieceId>,
        known_connected: &HashSet<PieceId>,
    ) -> Option<Vec<PieceId>> {
        let mut queue = VecDeque::new();
        let mut parent: HashMap<PieceId, PieceId> = HashMap::new();
        let mut visited = HashSet::new();
        queue.push_back(start);
        visited.insert(start);

        while let Some(current) = queue.pop_front() {
            if self.is_grounded(current) || known_connected.contains(&current) {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(&prev) = parent.get(&cursor) {
                    path.push(prev);
                    cursor = prev;
                }
                return Some(path);
            }
            for (supporter, _) in self.support_relations(current) {
                if excluded.contains(supporter) || !visited.insert(*supporter) {
                    continue;
                }
                parent.insert(*supporter, current);
                queue.push_back(*supporter);
            }
        }
        None
    }
}
