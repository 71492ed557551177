//! Mirrors the source node graph as an owned [`Node`] tree.

use tracing::debug;

use super::flatten::submesh_name;
use crate::scene::{SourceNode, SourceScene};
use crate::types::{Node, NodeKind};

/// Build the hierarchy for `scene` under a root named `root_name`.
///
/// When the source root has no children, one identity-transform `MESH` node
/// is synthesised per source mesh instead.
pub fn extract_hierarchy(scene: &SourceScene, root_name: &str) -> Node {
    let mut root = Node::new(root_name, NodeKind::Transform);

    root.children = if scene.root.children.is_empty() {
        scene
            .meshes
            .iter()
            .enumerate()
            .map(|(i, mesh)| Node::new(submesh_name(&mesh.name, i), NodeKind::Mesh))
            .collect()
    } else {
        scene.root.children.iter().map(convert_node).collect()
    };

    log_hierarchy(&root, 0);
    root
}

fn convert_node(source: &SourceNode) -> Node {
    let (scale, rotation, translation) = source.transform.to_scale_rotation_translation();
    let kind = if source.meshes.is_empty() {
        NodeKind::Transform
    } else {
        NodeKind::Mesh
    };

    Node {
        name: source.name.clone(),
        kind,
        translation,
        rotation,
        scale,
        children: source.children.iter().map(convert_node).collect(),
    }
}

fn log_hierarchy(node: &Node, depth: usize) {
    debug!(
        "{:indent$}|-{} ({:?}) translation={:?}",
        "",
        node.name,
        node.kind,
        node.translation.to_array(),
        indent = depth * 2
    );
    for child in &node.children {
        log_hierarchy(child, depth + 1);
    }
}
