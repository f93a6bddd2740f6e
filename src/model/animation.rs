// Based on https://whoisryosuke.com/blog/2022/importing-gltf-with-wgpu-and-rust
// You can thank ryosuke for this information.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use glam::{Mat4, Quat, Vec3};
use gltf::animation::{util, Interpolation};
use gltf::Document;
use itertools::Itertools;
use log::{debug, error, warn};

use crate::bones::BoneTable;
use crate::error::AnimationError;
use crate::interpolation::{
  interpolate_quaternion, interpolate_vector, Keyframe, QuatKey, VectorKey,
};
use crate::lookup::ClipLookup;
use crate::scene_graph::SceneGraph;
use crate::utils::{node_name, GltfData};

///
/// glTF keyframe times are in seconds, so one tick is one second.
///
pub const GLTF_TICKS_PER_SECOND: f32 = 1.0;

/// The three key arrays a channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Track {
  Position,
  Rotation,
  Scale,
}

impl fmt::Display for Track {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Track::Position => write!(f, "position"),
      Track::Rotation => write!(f, "rotation"),
      Track::Scale => write!(f, "scale"),
    }
  }
}

///
/// Keyframed TRS data driving one node (bone).
///
/// All three key arrays are non-empty and sorted by time, `Channel::new` makes sure of it.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
  node_name: String,
  positions: Vec<VectorKey>,
  rotations: Vec<QuatKey>,
  scales: Vec<VectorKey>,
}

impl Channel {
  pub fn new<S: Into<String>>(
    node_name: S,
    positions: Vec<VectorKey>,
    rotations: Vec<QuatKey>,
    scales: Vec<VectorKey>,
  ) -> Result<Self, AnimationError> {
    let node_name = node_name.into();
    check_keys(&node_name, Track::Position, &positions)?;
    check_keys(&node_name, Track::Rotation, &rotations)?;
    check_keys(&node_name, Track::Scale, &scales)?;
    Ok(Channel {
      node_name,
      positions,
      rotations,
      scales,
    })
  }

  /// Name of the node this channel drives.
  pub fn node_name(&self) -> &str {
    &self.node_name
  }

  pub fn positions(&self) -> &[VectorKey] {
    &self.positions
  }

  pub fn rotations(&self) -> &[QuatKey] {
    &self.rotations
  }

  pub fn scales(&self) -> &[VectorKey] {
    &self.scales
  }

  ///
  /// Time of the latest key on any track.
  ///
  pub fn end_time(&self) -> f32 {
    let last = |time: Option<f32>| time.unwrap_or(0.0);
    last(self.positions.last().map(|key| key.time))
      .max(last(self.rotations.last().map(|key| key.time)))
      .max(last(self.scales.last().map(|key| key.time)))
  }

  ///
  /// Sample the three tracks and build `translation * rotation * scale`.
  ///
  pub fn local_transform(&self, time: f32) -> Mat4 {
    let translation = interpolate_vector(time, &self.positions);
    let rotation = interpolate_quaternion(time, &self.rotations);
    let scale = interpolate_vector(time, &self.scales);

    Mat4::from_translation(translation) * Mat4::from_quat(rotation) * Mat4::from_scale(scale)
  }
}

fn check_keys<T>(node: &str, track: Track, keys: &[Keyframe<T>]) -> Result<(), AnimationError> {
  if keys.is_empty() {
    return Err(AnimationError::EmptyKeys {
      node: node.to_string(),
      track,
    });
  }
  if keys
    .iter()
    .tuple_windows::<(_, _)>()
    .any(|(current, next)| next.time < current.time)
  {
    return Err(AnimationError::UnsortedKeys {
      node: node.to_string(),
      track,
    });
  }
  Ok(())
}

///
/// A named animation sequence: a duration and tick rate plus one channel per animated node.
///
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
  name: String,
  duration: f32,
  ticks_per_second: f32,
  channels: Vec<Channel>,
}

impl AnimationClip {
  ///
  /// Create an empty clip. A `ticks_per_second` of 0 means "use the configured default".
  ///
  pub fn new<S: Into<String>>(name: S, duration: f32, ticks_per_second: f32) -> Self {
    AnimationClip {
      name: name.into(),
      duration,
      ticks_per_second,
      channels: vec![],
    }
  }

  ///
  /// Append a channel. Channel indices follow insertion order.
  ///
  pub fn push_channel(&mut self, channel: Channel) -> usize {
    self.channels.push(channel);
    self.channels.len() - 1
  }

  pub fn with_channel(mut self, channel: Channel) -> Self {
    self.push_channel(channel);
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Length in ticks.
  pub fn duration(&self) -> f32 {
    self.duration
  }

  pub fn ticks_per_second(&self) -> f32 {
    self.ticks_per_second
  }

  pub fn channels(&self) -> &[Channel] {
    &self.channels
  }

  pub fn channel(&self, index: usize) -> Option<&Channel> {
    self.channels.get(index)
  }
}

///
/// A clip attached to a specific scene graph: the clip data plus its node lookup table.
///
#[derive(Debug, Clone)]
pub struct Animation {
  clip: Arc<AnimationClip>,
  lookup: ClipLookup,
}

impl Animation {
  ///
  /// Bind a clip to a scene graph and bone table. The graph must match the one the clip was
  /// authored against by node names and hierarchy.
  ///
  pub fn new(clip: Arc<AnimationClip>, graph: &SceneGraph, bones: &BoneTable) -> Self {
    let lookup = ClipLookup::build(&clip, graph, bones);
    Animation { clip, lookup }
  }

  pub fn clip(&self) -> &AnimationClip {
    &self.clip
  }

  pub fn lookup(&self) -> &ClipLookup {
    &self.lookup
  }

  pub fn name(&self) -> &str {
    self.clip.name()
  }

  pub fn duration(&self) -> f32 {
    self.clip.duration()
  }

  pub fn ticks_per_second(&self) -> f32 {
    self.clip.ticks_per_second()
  }

  #[cfg(test)]
  pub(crate) fn replace_lookup(&mut self, lookup: ClipLookup) {
    self.lookup = lookup;
  }
}

///
/// TRS tracks collected for one node before they're sealed into a channel.
///
struct RawTracks<'a> {
  node: gltf::Node<'a>,
  positions: Option<Vec<VectorKey>>,
  rotations: Option<Vec<QuatKey>>,
  scales: Option<Vec<VectorKey>>,
}

///
/// Cubic spline samplers store (in tangent, value, out tangent) per key. Only the value is
/// kept, the clip is then played back linearly.
///
fn spline_values<T: Copy>(values: Vec<T>) -> Vec<T> {
  values.chunks_exact(3).map(|triple| triple[1]).collect()
}

fn into_keys<T>(timestamps: &[f32], values: Vec<T>) -> Vec<Keyframe<T>> {
  timestamps
    .iter()
    .zip(values)
    .map(|(time, value)| Keyframe::new(*time, value))
    .collect()
}

fn overwrite_error(track: Track, node: &str) -> String {
  format!(
    "Attempted to overwrite node (bone) [{}]'s {} animation data!",
    node, track
  )
}

///
/// Turn one glTF animation into a clip.
///
/// glTF keeps every property in its own channel, these get merged per target node in
/// the order the nodes first show up. A property a node never animates is filled in with a
/// single key from its rest transform.
///
fn grab_clip(
  animation: &gltf::Animation,
  name: &str,
  data: &GltfData,
) -> Result<AnimationClip, String> {
  let mut slots: AHashMap<usize, usize> = AHashMap::new();
  let mut tracks: Vec<RawTracks> = vec![];

  for (channel_index, channel) in animation.channels().enumerate() {
    let target = channel.target();
    let node = target.node();
    let reader = channel.reader(|buffer| data.buffer(buffer));

    let timestamps: Vec<f32> = match reader.read_inputs() {
      Some(inputs) => inputs.collect(),
      None => {
        return Err(format!(
          "No animation data detected in animation channel [{}].",
          channel_index
        ))
      }
    };

    let interpolation = channel.sampler().interpolation();
    let cubic = interpolation == Interpolation::CubicSpline;
    if interpolation == Interpolation::Step {
      debug!(
        "skeletal-gltf: Channel [{}] of clip [{}] uses STEP keys. It will be played back linearly.",
        channel_index, name
      );
    }

    let outputs = match reader.read_outputs() {
      Some(outputs) => outputs,
      None => {
        return Err(format!(
          "Unknown keyframe in animation channel [{}]. This model is probably corrupted.",
          channel_index
        ))
      }
    };

    if let util::ReadOutputs::MorphTargetWeights(_) = outputs {
      warn!(
        "skeletal-gltf: Morph target weights are not supported. Skipping channel [{}] of clip [{}].",
        channel_index, name
      );
      continue;
    }

    let slot = *slots.entry(node.index()).or_insert_with(|| {
      tracks.push(RawTracks {
        node: node.clone(),
        positions: None,
        rotations: None,
        scales: None,
      });
      tracks.len() - 1
    });
    let raw = &mut tracks[slot];
    let target_name = node_name(&node);

    let mismatch = |track: Track, values: usize| {
      format!(
        "Mismatched node (bone) [{}] {} length in channel [{}]. [{}] keys compared to [{}] timestamps.",
        target_name,
        track,
        channel_index,
        values,
        timestamps.len()
      )
    };

    match outputs {
      util::ReadOutputs::Translations(translations) => {
        let mut values: Vec<Vec3> = translations.map(Vec3::from_array).collect();
        if cubic {
          values = spline_values(values);
        }
        if values.len() != timestamps.len() {
          return Err(mismatch(Track::Position, values.len()));
        }
        if raw.positions.is_some() {
          return Err(overwrite_error(Track::Position, &target_name));
        }
        raw.positions = Some(into_keys(&timestamps, values));
      }
      util::ReadOutputs::Rotations(rotations) => {
        // Normalized integer rotations get converted here too.
        let mut values: Vec<Quat> = rotations.into_f32().map(Quat::from_array).collect();
        if cubic {
          values = spline_values(values);
        }
        if values.len() != timestamps.len() {
          return Err(mismatch(Track::Rotation, values.len()));
        }
        if raw.rotations.is_some() {
          return Err(overwrite_error(Track::Rotation, &target_name));
        }
        raw.rotations = Some(into_keys(&timestamps, values));
      }
      util::ReadOutputs::Scales(scales) => {
        let mut values: Vec<Vec3> = scales.map(Vec3::from_array).collect();
        if cubic {
          values = spline_values(values);
        }
        if values.len() != timestamps.len() {
          return Err(mismatch(Track::Scale, values.len()));
        }
        if raw.scales.is_some() {
          return Err(overwrite_error(Track::Scale, &target_name));
        }
        raw.scales = Some(into_keys(&timestamps, values));
      }
      util::ReadOutputs::MorphTargetWeights(_) => {}
    }
  }

  let mut channels = Vec::with_capacity(tracks.len());
  for raw in tracks {
    let (translation, rotation, scale) = raw.node.transform().decomposed();

    let channel = Channel::new(
      node_name(&raw.node),
      raw
        .positions
        .unwrap_or_else(|| vec![Keyframe::new(0.0, Vec3::from_array(translation))]),
      raw
        .rotations
        .unwrap_or_else(|| vec![Keyframe::new(0.0, Quat::from_array(rotation))]),
      raw
        .scales
        .unwrap_or_else(|| vec![Keyframe::new(0.0, Vec3::from_array(scale))]),
    )
    .map_err(|e| e.to_string())?;

    channels.push(channel);
  }

  let duration = channels.iter().map(Channel::end_time).fold(0.0, f32::max);

  let mut clip = AnimationClip::new(name, duration, GLTF_TICKS_PER_SECOND);
  for channel in channels {
    clip.push_channel(channel);
  }
  Ok(clip)
}

///
/// Read every animation in the document.
///
/// A clip that fails to parse is dropped on its own. Animation is cosmetic, a broken clip
/// shouldn't take the model down with it.
///
pub(crate) fn grab_animations(document: &Document, data: &GltfData) -> Vec<AnimationClip> {
  let mut clips = vec![];

  for (animation_index, animation) in document.animations().enumerate() {
    let name = match animation.name() {
      Some(name) => name.to_string(),
      None => format!("animation{}", animation_index),
    };

    match grab_clip(&animation, &name, data) {
      Ok(clip) => {
        debug!(
          "skeletal-gltf: Clip [{}] in [{}]: {} channels, {} ticks.",
          name,
          data.file_name,
          clip.channels().len(),
          clip.duration()
        );
        clips.push(clip);
      }
      Err(e) => error!(
        "skeletal-gltf: {} Model [{}] clip [{}] will not be animated.",
        e, data.file_name, name
      ),
    }
  }

  clips
}

// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
// ?                            CODE ENDS HERE, BEGIN UNIT TESTS.                                   ? //
// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
