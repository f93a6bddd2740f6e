mod gltf_data;

use glam::Mat4;
pub(crate) use gltf_data::GltfData;

use gltf::scene::{Node, Transform};

///
/// glTF matrices are column major, same as glam.
///
pub(crate) fn transform_to_matrix(transform: Transform) -> Mat4 {
  Mat4::from_cols_array_2d(&transform.matrix())
}

///
/// Name a node the way the scene graph and the animation channels will both see it.
///
/// Unnamed nodes get a stable name built from their index.
///
pub(crate) fn node_name(node: &Node) -> String {
  match node.name() {
    Some(name) => name.to_string(),
    None => format!("node{}", node.index()),
  }
}
