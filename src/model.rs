/// Contains animation clip data and clips bound to a scene graph.
pub mod animation;
/// Bone names, indices and offset matrices.
pub mod bones;
/// Keyframes and the functions sampling them.
pub mod interpolation;
/// Per clip node lookup tables.
pub mod lookup;
/// Hierarchy walking and final bone matrices.
/// # Usage
/// Check [Model::animation_pose](struct.Model.html#method.animation_pose) for the usual entry point.
pub mod pose;
/// The node hierarchy animations are played on.
pub mod scene_graph;

use std::path::Path;
use std::sync::Arc;

use glam::Mat4;
use gltf::scene::Node;
use log::{info, warn};

use crate::config::AnimatorConfig;
use crate::error::ImportError;
use crate::utils::{node_name, transform_to_matrix, GltfData};

pub use animation::{Animation, AnimationClip, Channel};
pub use bones::BoneTable;
pub use pose::Pose;
pub use scene_graph::{NodeId, SceneGraph, SceneNode};

///
/// A skinned model: its node hierarchy, its bones and the animations that can be played on it.
///
#[derive(Debug, Clone)]
pub struct Model {
  name: String,
  scene: SceneGraph,
  bones: BoneTable,
  global_inverse_transform: Mat4,
  clips: Vec<Arc<AnimationClip>>,
  animations: Vec<Animation>,
  config: AnimatorConfig,
}

impl Model {
  ///
  /// Put a model together from already imported parts.
  ///
  /// The clips are only stored. Nothing can be played until
  /// [`Model::load_animations`] (or one of its siblings) binds them.
  ///
  pub fn new<S: Into<String>>(
    name: S,
    scene: SceneGraph,
    bones: BoneTable,
    clips: Vec<AnimationClip>,
  ) -> Self {
    let name = name.into();
    let global_inverse_transform = match scene.node(scene.root()) {
      Some(root) => global_inverse(root.transform(), &name),
      None => Mat4::IDENTITY,
    };

    Model {
      name,
      scene,
      bones,
      global_inverse_transform,
      clips: clips.into_iter().map(Arc::new).collect(),
      animations: vec![],
      config: AnimatorConfig::default(),
    }
  }

  pub fn with_config(mut self, config: AnimatorConfig) -> Self {
    self.config = config;
    self
  }

  pub fn config(&self) -> &AnimatorConfig {
    &self.config
  }

  pub fn set_config(&mut self, config: AnimatorConfig) {
    self.config = config;
  }

  pub(crate) fn load(gltf_scene: gltf::Scene, data: &GltfData) -> Self {
    let roots: Vec<Node> = gltf_scene.nodes().collect();

    let mut bones = BoneTable::new();

    // A lone root node becomes the root of the graph, several get a shared parent.
    let scene = match roots.as_slice() {
      [root] => {
        let mut scene = SceneGraph::new(node_name(root), transform_to_matrix(root.transform()));
        let root_id = scene.root();
        read_skin(root, &mut bones, data);
        for child in root.children() {
          read_node(&child, root_id, &mut scene, &mut bones, data);
        }
        scene
      }
      _ => {
        let root_name = gltf_scene.name().unwrap_or("ROOT");
        let mut scene = SceneGraph::new(root_name, Mat4::IDENTITY);
        let root_id = scene.root();
        for root in &roots {
          read_node(root, root_id, &mut scene, &mut bones, data);
        }
        scene
      }
    };

    Model::new(data.file_name.clone(), scene, bones, vec![])
  }

  pub(crate) fn set_clips(&mut self, clips: Vec<AnimationClip>) {
    self.clips = clips.into_iter().map(Arc::new).collect();
  }

  /// Name of the model, the file name when it was imported.
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn scene(&self) -> &SceneGraph {
    &self.scene
  }

  pub fn bones(&self) -> &BoneTable {
    &self.bones
  }

  ///
  /// Inverse of the root node's transform.
  ///
  pub fn global_inverse_transform(&self) -> &Mat4 {
    &self.global_inverse_transform
  }

  ///
  /// Clips imported with this model, bound or not.
  ///
  pub fn clips(&self) -> &[Arc<AnimationClip>] {
    &self.clips
  }

  pub fn bone_count(&self) -> usize {
    self.bones.len()
  }

  pub fn has_bones(&self) -> bool {
    !self.bones.is_empty()
  }

  pub fn has_bone(&self, name: &str) -> bool {
    self.bones.has_bone(name)
  }

  pub fn bone_id(&self, name: &str) -> Option<usize> {
    self.bones.bone_id(name)
  }

  pub fn bone_name(&self, id: usize) -> Option<&str> {
    self.bones.bone_name(id)
  }

  ///
  /// Bind this model's own clips. Returns how many are playable.
  ///
  pub fn load_animations(&mut self) -> usize {
    let clips = self.clips.clone();
    self.attach_clips(&clips, &self.name.clone())
  }

  ///
  /// Bind the clips of another model to this one.
  ///
  /// `compatible` has to share this model's node names and hierarchy, a common case is a
  /// file holding nothing but animations for a rig loaded elsewhere.
  ///
  pub fn load_animations_from(&mut self, compatible: &Model) -> usize {
    self.attach_clips(&compatible.clips, &compatible.name)
  }

  ///
  /// Import a glTF file and bind its clips to this model.
  ///
  pub fn load_animations_from_path<P: AsRef<Path>>(
    &mut self,
    path: P,
  ) -> Result<usize, ImportError> {
    let compatible = crate::import_path(path.as_ref())?;
    Ok(self.load_animations_from(&compatible))
  }

  fn attach_clips(&mut self, clips: &[Arc<AnimationClip>], source: &str) -> usize {
    if clips.is_empty() {
      return 0;
    }

    if !self.has_bones() {
      warn!(
        "skeletal-gltf: Model [{}] has no bones. Skinning is disabled, animations from [{}] will not be loaded.",
        self.name, source
      );
      return 0;
    }

    self.animations = clips
      .iter()
      .map(|clip| Animation::new(clip.clone(), &self.scene, &self.bones))
      .collect();

    info!(
      "skeletal-gltf: Model [{}] loaded {} animations from [{}].",
      self.name,
      self.animations.len(),
      source
    );

    self.animations.len()
  }

  pub fn has_animations(&self) -> bool {
    !self.animations.is_empty()
  }

  pub fn animation_count(&self) -> usize {
    self.animations.len()
  }

  pub fn has_animation(&self, index: usize) -> bool {
    index < self.animations.len()
  }

  pub fn animation(&self, index: usize) -> Option<&Animation> {
    self.animations.get(index)
  }

  pub fn animation_name(&self, index: usize) -> Option<&str> {
    self.animation(index).map(Animation::name)
  }

  pub fn animation_duration(&self, index: usize) -> Option<f32> {
    self.animation(index).map(Animation::duration)
  }

  pub fn animation_ticks_per_second(&self, index: usize) -> Option<f32> {
    self.animation(index).map(Animation::ticks_per_second)
  }

  ///
  /// Skinning matrices for animation `index` at `time` seconds.
  ///
  /// There is always something to upload: an unknown animation, or a model without bones,
  /// gives identity matrices (a single one when there are no bones at all).
  ///
  pub fn animation_pose(&self, index: usize, time: f32) -> Pose {
    let mut transforms = vec![];
    self.animation_pose_into(index, time, &mut transforms);
    Pose::new(transforms)
  }

  ///
  /// Same as [`Model::animation_pose`] but fills a buffer the caller keeps around.
  ///
  pub fn animation_pose_into(&self, index: usize, time: f32, transforms: &mut Vec<Mat4>) {
    transforms.clear();
    transforms.resize(self.bone_count().max(1), Mat4::IDENTITY);

    if !self.has_bones() {
      return;
    }
    let Some(animation) = self.animations.get(index) else {
      return;
    };

    let time = self.config.sample_time(animation.clip(), time);
    pose::resolve_bone_matrices(
      &self.scene,
      &self.bones,
      &self.global_inverse_transform,
      animation,
      time,
      transforms,
    );
  }

  ///
  /// Animated transform of every node for animation `index` at `time` seconds, indexed
  /// by [`NodeId::index`]. Handy for sticking things to a hand or a head.
  ///
  pub fn node_transforms(&self, index: usize, time: f32) -> Option<Vec<Mat4>> {
    let animation = self.animations.get(index)?;
    let time = self.config.sample_time(animation.clip(), time);
    Some(pose::compose_node_transforms(&self.scene, animation, time))
  }

  ///
  /// Rest transform of a node, either local or accumulated from the root.
  ///
  pub fn node_transform(&self, id: NodeId, recursive: bool) -> Option<Mat4> {
    if recursive {
      self.scene.global_transform(id)
    } else {
      self.scene.node(id).map(|node| *node.transform())
    }
  }

  ///
  /// Number of children hanging off the root.
  ///
  pub fn main_node_count(&self) -> usize {
    self
      .scene
      .node(self.scene.root())
      .map_or(0, |root| root.children().len())
  }
}

///
/// Inverse of the root transform. A root that can't be inverted is treated as identity.
///
/// Only a non-finite inverse counts as singular. Small but valid scales (millimetre rigs)
/// have tiny determinants and still invert fine.
///
fn global_inverse(root_transform: &Mat4, model_name: &str) -> Mat4 {
  let inverse = root_transform.inverse();
  if inverse.is_finite() {
    inverse
  } else {
    warn!(
      "skeletal-gltf: Root transform of model [{}] is singular. Using identity as the global inverse.",
      model_name
    );
    Mat4::IDENTITY
  }
}

///
/// Register every joint of the node's skin, in joint order.
///
fn read_skin(node: &Node, bones: &mut BoneTable, data: &GltfData) {
  let Some(skin) = node.skin() else {
    return;
  };

  let reader = skin.reader(|buffer| data.buffer(buffer));
  let mut inverse_bind_matrices = reader.read_inverse_bind_matrices();

  for joint in skin.joints() {
    // Missing inverse bind matrices mean identity in glTF.
    let offset = match inverse_bind_matrices.as_mut().and_then(|matrices| matrices.next()) {
      Some(matrix) => Mat4::from_cols_array_2d(&matrix),
      None => Mat4::IDENTITY,
    };
    bones.get_or_add_bone(&node_name(&joint), offset);
  }
}

fn read_node(
  node: &Node,
  parent: NodeId,
  scene: &mut SceneGraph,
  bones: &mut BoneTable,
  data: &GltfData,
) {
  let transform = transform_to_matrix(node.transform());

  let id = match scene.add_child(parent, node_name(node), transform) {
    Ok(id) => id,
    Err(e) => {
      warn!("skeletal-gltf: {} in [{}].", e, data.file_name);
      return;
    }
  };

  // Skins are read parent first so bone indices follow the hierarchy.
  read_skin(node, bones, data);

  // Recurse on children.
  for child in node.children() {
    read_node(&child, id, scene, bones, data);
  }
}

// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
// ?                            CODE ENDS HERE, BEGIN UNIT TESTS.                                   ? //
// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
