use log::{debug, warn};

use crate::animation::AnimationClip;
use crate::bones::BoneTable;
use crate::scene_graph::{NodeId, SceneGraph};

///
/// What a clip knows about one node.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeBinding {
  /// Index of the channel animating this node in this clip.
  pub channel: Option<usize>,
  /// Bone index, if the node is a bone of the model.
  pub bone: Option<usize>,
}

///
/// Per clip table from scene node to its channel and bone.
///
/// Built once when the clip is attached, read only from then on.
///
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipLookup {
  bindings: Vec<Option<NodeBinding>>,
}

impl ClipLookup {
  ///
  /// Build the table for `clip` played on `graph`.
  ///
  /// Channel targets are registered first, in channel order, then every node still missing
  /// gets an entry with only its bone. Afterwards every node reachable from the root has
  /// exactly one entry.
  ///
  pub fn build(clip: &AnimationClip, graph: &SceneGraph, bones: &BoneTable) -> Self {
    let names = graph.name_map();
    let mut bindings: Vec<Option<NodeBinding>> = vec![None; graph.len()];

    for (channel_index, channel) in clip.channels().iter().enumerate() {
      let Some(id) = names.get(channel.node_name()).copied() else {
        debug!(
          "skeletal-gltf: Clip [{}] channel [{}] targets unknown node [{}]. Skipping.",
          clip.name(),
          channel_index,
          channel.node_name()
        );
        continue;
      };

      let slot = &mut bindings[id.index()];
      if slot.is_some() {
        warn!(
          "skeletal-gltf: Clip [{}] animates node [{}] more than once. Keeping the first channel.",
          clip.name(),
          channel.node_name()
        );
        continue;
      }

      *slot = Some(NodeBinding {
        channel: Some(channel_index),
        bone: bones.bone_id(channel.node_name()),
      });
    }

    for id in graph.pre_order() {
      let slot = &mut bindings[id.index()];
      if slot.is_none() {
        let bone = graph.node(id).and_then(|node| bones.bone_id(node.name()));
        *slot = Some(NodeBinding {
          channel: None,
          bone,
        });
      }
    }

    ClipLookup { bindings }
  }

  pub fn get(&self, node: NodeId) -> Option<&NodeBinding> {
    self.bindings.get(node.index()).and_then(Option::as_ref)
  }

  ///
  /// Number of registered nodes.
  ///
  pub fn len(&self) -> usize {
    self.bindings.iter().flatten().count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  ///
  /// A lookup with only the given bindings, for exercising nodes without an entry.
  ///
  #[cfg(test)]
  pub(crate) fn from_bindings(bindings: Vec<Option<NodeBinding>>) -> Self {
    ClipLookup { bindings }
  }
}

// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
// ?                            CODE ENDS HERE, BEGIN UNIT TESTS.                                   ? //
// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
