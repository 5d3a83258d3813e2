//! Incremental re-evaluation driver.
//!
//! The driver owns nothing: it reads the persistent node-to-mesh cache,
//! decides which nodes need new meshes, evaluates them bottom-up, and
//! returns only the fresh results. The caller merges them into the cache
//! after the pass, so readers never observe a partially rebuilt pass.

use std::collections::{HashMap, HashSet};

use crate::categorize::evaluate_node;
use crate::error::{CsgError, Result};
use crate::mesh::CsgMesh;
use crate::tree::{CsgTree, NodeId};

/// Persistent node-to-mesh cache. Written only by the caller between
/// passes, read-only while rendering.
pub type MeshCache = HashMap<NodeId, CsgMesh>;

/// Read access to evaluated meshes.
pub trait MeshLookup {
    fn mesh(&self, id: NodeId) -> Option<&CsgMesh>;
}

impl MeshLookup for MeshCache {
    fn mesh(&self, id: NodeId) -> Option<&CsgMesh> {
        self.get(&id)
    }
}

/// Fresh results of the running pass layered over the persistent cache.
struct LayeredLookup<'a> {
    fresh: &'a HashMap<NodeId, CsgMesh>,
    cache: &'a MeshCache,
}

impl MeshLookup for LayeredLookup<'_> {
    fn mesh(&self, id: NodeId) -> Option<&CsgMesh> {
        self.fresh.get(&id).or_else(|| self.cache.get(&id))
    }
}

/// Re-evaluates the tree after the `changed` nodes moved.
///
/// The recompute set is the changed nodes, every node missing from the
/// cache, and all their ancestors: a branch mesh bakes its children's
/// offsets, so the whole chain above a change has to re-merge. Every other
/// node is skipped entirely, leaving its cached mesh byte-identical.
/// World translations are refreshed top-down and node bounds bottom-up as
/// part of the pass.
///
/// Returns the freshly computed meshes; merge them into the cache once the
/// pass is done. An empty tree is reported as [`CsgError::NoTreeLoaded`].
pub fn process_nodes(
    tree: &mut CsgTree,
    changed: &[NodeId],
    cache: &MeshCache,
) -> Result<HashMap<NodeId, CsgMesh>> {
    let root = tree.root().ok_or(CsgError::NoTreeLoaded)?;
    tree.update_world_translations();

    let order: Vec<NodeId> = tree.descendants(root).collect();
    let mut dirty: HashSet<NodeId> = HashSet::new();
    for &id in &order {
        if changed.contains(&id) || cache.mesh(id).is_none() {
            dirty.insert(id);
            dirty.extend(tree.ancestors(id));
        }
    }

    let mut fresh: HashMap<NodeId, CsgMesh> = HashMap::new();
    // Reversed preorder evaluates children before their parents.
    for &id in order.iter().rev() {
        if !dirty.contains(&id) {
            continue;
        }
        let lookup = LayeredLookup {
            fresh: &fresh,
            cache,
        };
        let mesh = evaluate_node(tree, id, &lookup)?;
        tree.set_node_bounds(id, *mesh.bounds());
        fresh.insert(id, mesh);
    }
    tree.update_bounds();
    Ok(fresh)
}
