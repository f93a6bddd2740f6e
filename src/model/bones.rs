use ahash::AHashMap;
use glam::Mat4;

///
/// Every bone a model's meshes declared, in the order they were first seen.
///
/// A bone's index is handed out once and never changes or gets reused, and neither does its
/// offset matrix. The index is what lands in the vertex bone id attribute and what the
/// pose array is indexed with.
///
#[derive(Debug, Clone, Default)]
pub struct BoneTable {
  bones: Vec<(String, Mat4)>,
  ids: AHashMap<String, usize>,
}

impl BoneTable {
  pub fn new() -> Self {
    Self::default()
  }

  ///
  /// Get the index of a bone, registering it with `offset` if it's new.
  ///
  /// A known bone keeps the offset it was first registered with.
  ///
  pub fn get_or_add_bone(&mut self, name: &str, offset: Mat4) -> usize {
    if let Some(id) = self.ids.get(name) {
      return *id;
    }
    let id = self.bones.len();
    self.bones.push((name.to_string(), offset));
    self.ids.insert(name.to_string(), id);
    id
  }

  pub fn bone_id(&self, name: &str) -> Option<usize> {
    self.ids.get(name).copied()
  }

  pub fn has_bone(&self, name: &str) -> bool {
    self.ids.contains_key(name)
  }

  pub fn bone_name(&self, id: usize) -> Option<&str> {
    self.bones.get(id).map(|(name, _)| name.as_str())
  }

  ///
  /// Mesh space to bone space matrix at bind pose.
  ///
  pub fn offset(&self, id: usize) -> Option<&Mat4> {
    self.bones.get(id).map(|(_, offset)| offset)
  }

  pub fn len(&self) -> usize {
    self.bones.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bones.is_empty()
  }

  ///
  /// `(index, name, offset)` in index order.
  ///
  pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &Mat4)> {
    self
      .bones
      .iter()
      .enumerate()
      .map(|(id, (name, offset))| (id, name.as_str(), offset))
  }
}

// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
// ?                            CODE ENDS HERE, BEGIN UNIT TESTS.                                   ? //
// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
