use glam::Mat4;

use crate::animation::Animation;
use crate::bones::BoneTable;
use crate::config::UniformLayout;
use crate::lookup::NodeBinding;
use crate::scene_graph::{NodeId, SceneGraph};

///
/// Walk the graph at `time` and hand every node's accumulated transform to `visit`.
///
/// Parents are visited before children and siblings in order. The walk keeps its own stack,
/// so deep hierarchies can't blow the call stack.
///
/// How a node's transform is found:
/// * no entry in the lookup: the node is transparent, it takes on its parent's transform.
/// * an entry with a channel: the channel's sampled TRS replaces the node's own transform.
/// * an entry without a channel: the node's rest transform is used.
///
/// glam matrices act on column vectors, so a child's transform is `parent * local`.
///
fn walk_hierarchy<F>(graph: &SceneGraph, animation: &Animation, time: f32, mut visit: F)
where
  F: FnMut(NodeId, Option<&NodeBinding>, &Mat4),
{
  let clip = animation.clip();
  let lookup = animation.lookup();
  let mut stack = vec![(graph.root(), Mat4::IDENTITY)];

  while let Some((id, parent)) = stack.pop() {
    let Some(node) = graph.node(id) else {
      continue;
    };

    let binding = lookup.get(id);
    let combined = match binding {
      None => parent,
      Some(binding) => match binding.channel.and_then(|index| clip.channel(index)) {
        Some(channel) => parent * channel.local_transform(time),
        None => parent * *node.transform(),
      },
    };

    visit(id, binding, &combined);

    stack.extend(node.children().iter().rev().map(|child| (*child, combined)));
  }
}

///
/// Accumulated transform of every node at `time`, indexed by [`NodeId::index`].
///
pub fn compose_node_transforms(
  graph: &SceneGraph,
  animation: &Animation,
  time: f32,
) -> Vec<Mat4> {
  let mut transforms = vec![Mat4::IDENTITY; graph.len()];
  walk_hierarchy(graph, animation, time, |id, _, combined| {
    transforms[id.index()] = *combined;
  });
  transforms
}

///
/// Write the skinning matrix of every bone the walk reaches into `transforms`.
///
/// Each one is `global_inverse * node transform * bone offset`. Bones the walk never
/// reaches keep whatever the caller put there.
///
pub fn resolve_bone_matrices(
  graph: &SceneGraph,
  bones: &BoneTable,
  global_inverse: &Mat4,
  animation: &Animation,
  time: f32,
  transforms: &mut [Mat4],
) {
  walk_hierarchy(graph, animation, time, |_, binding, combined| {
    let Some(bone) = binding.and_then(|binding| binding.bone) else {
      return;
    };
    if let (Some(offset), Some(slot)) = (bones.offset(bone), transforms.get_mut(bone)) {
      *slot = *global_inverse * *combined * *offset;
    }
  });
}

///
/// One sampled frame: a skinning matrix per bone, ready to go into a `mat4 bones[N]` uniform.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
  matrices: Vec<Mat4>,
}

impl Pose {
  pub(crate) fn new(matrices: Vec<Mat4>) -> Self {
    Pose { matrices }
  }

  pub fn matrices(&self) -> &[Mat4] {
    &self.matrices
  }

  pub fn get(&self, bone: usize) -> Option<&Mat4> {
    self.matrices.get(bone)
  }

  pub fn len(&self) -> usize {
    self.matrices.len()
  }

  pub fn is_empty(&self) -> bool {
    self.matrices.is_empty()
  }

  pub fn into_inner(self) -> Vec<Mat4> {
    self.matrices
  }

  ///
  /// Flatten to 16 floats per bone in the requested layout.
  ///
  pub fn to_uniform_data(&self, layout: UniformLayout) -> Vec<f32> {
    self
      .matrices
      .iter()
      .flat_map(|matrix| match layout {
        UniformLayout::ColumnMajor => matrix.to_cols_array(),
        UniformLayout::RowMajor => matrix.transpose().to_cols_array(),
      })
      .collect()
  }
}

// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
// ?                            CODE ENDS HERE, BEGIN UNIT TESTS.                                   ? //
// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
