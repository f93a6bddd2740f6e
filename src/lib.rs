//! This crate turns skeletal animation data into the bone matrices a skinning vertex shader
//! wants, and can import that data from [glTF 2.0](https://www.khronos.org/gltf) files.
//!
//! It's based on the [gltf](https://github.com/gltf-rs/gltf) crate for loading and on
//! [glam](https://github.com/bitshifter/glam-rs) for the math.
//!
//! # Installation
//!
//! ```toml
//! [dependencies]
//! skeletal-gltf = "0.1.0"
//! ```
//!
//! # Example
//!
//! ```no_run
//! let model = skeletal_gltf::load("models/walker.glb").expect("Failed to load glTF");
//! // Bone matrices for the first animation, 1.5 seconds in.
//! let pose = model.animation_pose(0, 1.5);
//! println!("Bones: #{}", pose.len());
//! ```

/// Settings for sampling animations.
pub mod config;
/// Error types.
pub mod error;
mod model;
mod utils;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use gltf::Gltf;
use log::info;
use model::animation::grab_animations;
use utils::GltfData;

pub use config::{AnimatorConfig, NegativeTimePolicy, UniformLayout};
pub use error::{AnimationError, ImportError};
pub use model::*;

/// Load a model with its animations from a path to a glTF 2.0.
///
/// Note: You can use this function with either a `Gltf` (standard `glTF`) or `Glb` (binary glTF).
///
/// The animations are bound right away, so if the model has bones it's ready to play.
///
/// # Example
///
/// ```no_run
/// let model = skeletal_gltf::load("models/walker.glb").expect("Failed to load glTF");
/// println!("Bones: #{}", model.bone_count());
/// println!("Animations: #{}", model.animation_count());
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<Model, ImportError> {
  let mut model = import_path(path.as_ref())?;
  model.load_animations();
  Ok(model)
}

/// Load a model with its animations from glTF or GLB bytes held in memory.
///
/// External buffers are resolved against the current directory, embedded and data URI
/// buffers just work.
pub fn load_slice(bytes: &[u8]) -> Result<Model, ImportError> {
  let gltf_data = Gltf::from_slice(bytes)?;
  let mut model = import(gltf_data, GltfData::new("", "memory"))?;
  model.load_animations();
  Ok(model)
}

///
/// Import a file without binding its animations.
///
pub(crate) fn import_path(path: &Path) -> Result<Model, ImportError> {
  // Try to get the file name. If this fails, the path probably doesn't exist.
  let file_name = file_name_from_path(path)?;

  // The buffer we're going to read the model into.
  let model_reader = read_path_to_buf_read(path)?;

  // Now we need to get the "Document" from the GLTF lib.
  let gltf_data = Gltf::from_reader(model_reader)?;

  import(gltf_data, GltfData::new(path, file_name))
}

fn import(mut gltf_data: Gltf, mut data: GltfData) -> Result<Model, ImportError> {
  // We always want the buffer data.
  data.load_buffers(&mut gltf_data)?;

  let scene = match gltf_data
    .default_scene()
    .or_else(|| gltf_data.scenes().next())
  {
    Some(scene) => scene,
    None => return Err(ImportError::NoScenes(data.file_name.clone())),
  };

  let mut model = Model::load(scene, &data);
  model.set_clips(grab_animations(&gltf_data.document, &data));

  info!(
    "skeletal-gltf: Imported [{}]. {} nodes, {} bones, {} clips.",
    data.file_name,
    model.scene().len(),
    model.bone_count(),
    model.clips().len()
  );

  // Now remove temp data.
  data.buffers.clear();

  Ok(model)
}

///
/// Automatically parse a file path into a BufReader<File>.
///
fn read_path_to_buf_read(path: &Path) -> Result<BufReader<File>, ImportError> {
  match File::open(path) {
    Ok(file) => Ok(BufReader::new(file)),
    Err(source) => Err(ImportError::Io {
      path: path.to_path_buf(),
      source,
    }),
  }
}

///
/// Get a file name from the path provided.
///
fn file_name_from_path(path: &Path) -> Result<&str, ImportError> {
  if !path.exists() {
    return Err(ImportError::InvalidPath(format!(
      "File name from file path. Path {:?} does not exist.",
      path
    )));
  }

  match path.file_name() {
    Some(os_str) => match os_str.to_str() {
      Some(final_str) => Ok(final_str),
      None => Err(ImportError::InvalidPath(
        "File name from file path. Failed to convert OsStr to str.".to_string(),
      )),
    },
    None => Err(ImportError::InvalidPath(
      "File name from file path. Failed to parse OS Path str.".to_string(),
    )),
  }
}

// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
// ?                            CODE ENDS HERE, BEGIN UNIT TESTS.                                   ? //
// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //

#[cfg(test)]
mod tests {
  use crate::*;
  use base64::engine::general_purpose::STANDARD;
  use base64::Engine;
  use glam::{Mat4, Quat, Vec3};
  use std::f32::consts::FRAC_PI_2;

  fn push_floats(buffer: &mut Vec<u8>, floats: &[f32]) {
    for float in floats {
      buffer.extend_from_slice(&float.to_le_bytes());
    }
  }

  ///
  /// A tiny skinned rig:
  ///
  /// Armature -> hip (bone, slides along x) -> leg (bone, turns around z)
  ///          -> body (mesh + skin)
  ///
  /// Everything lives in one data URI buffer.
  ///
  fn walking_rig() -> String {
    let mut buffer = vec![];
    // 0: positions, 3 x vec3.
    push_floats(&mut buffer, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    // 36: inverse bind matrices, hip is identity, leg is moved down by one.
    push_floats(&mut buffer, &Mat4::IDENTITY.to_cols_array());
    push_floats(&mut buffer, &Mat4::from_translation(Vec3::NEG_Y).to_cols_array());
    // 164: key times.
    push_floats(&mut buffer, &[0.0, 1.0]);
    // 172: hip translations.
    push_floats(&mut buffer, &[0.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
    // 196: leg rotations.
    push_floats(&mut buffer, &Quat::IDENTITY.to_array());
    push_floats(&mut buffer, &Quat::from_rotation_z(FRAC_PI_2).to_array());
    assert_eq!(buffer.len(), 228);

    let uri = format!("data:application/octet-stream;base64,{}", STANDARD.encode(&buffer));

    format!(
      r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [ {{ "nodes": [0] }} ],
  "nodes": [
    {{ "name": "Armature", "children": [1, 3] }},
    {{ "name": "hip", "children": [2], "translation": [0.0, 1.0, 0.0] }},
    {{ "name": "leg", "translation": [0.0, 1.0, 0.0] }},
    {{ "name": "body", "mesh": 0, "skin": 0 }}
  ],
  "meshes": [ {{ "primitives": [ {{ "attributes": {{ "POSITION": 0 }} }} ] }} ],
  "skins": [ {{ "joints": [1, 2], "inverseBindMatrices": 1 }} ],
  "animations": [
    {{
      "name": "walk",
      "channels": [
        {{ "sampler": 0, "target": {{ "node": 1, "path": "translation" }} }},
        {{ "sampler": 1, "target": {{ "node": 2, "path": "rotation" }} }}
      ],
      "samplers": [
        {{ "input": 2, "output": 3, "interpolation": "LINEAR" }},
        {{ "input": 2, "output": 4, "interpolation": "LINEAR" }}
      ]
    }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5126, "count": 2, "type": "MAT4" }},
    {{ "bufferView": 2, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [1.0] }},
    {{ "bufferView": 3, "componentType": 5126, "count": 2, "type": "VEC3" }},
    {{ "bufferView": 4, "componentType": 5126, "count": 2, "type": "VEC4" }}
  ],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 128 }},
    {{ "buffer": 0, "byteOffset": 164, "byteLength": 8 }},
    {{ "buffer": 0, "byteOffset": 172, "byteLength": 24 }},
    {{ "buffer": 0, "byteOffset": 196, "byteLength": 32 }}
  ],
  "buffers": [ {{ "byteLength": 228, "uri": "{}" }} ]
}}"#,
      uri
    )
  }

  #[test]
  fn test_the_walking_rig() {
    drop(env_logger::try_init());

    let rig = match load_slice(walking_rig().as_bytes()) {
      Ok(model) => {
        println!("walking rig loaded!");
        model
      }
      Err(e) => panic!("walking rig: failed to load. {}", e),
    };

    assert_eq!(rig.scene().len(), 4);
    assert_eq!(rig.scene().node(rig.scene().root()).map(SceneNode::name), Some("Armature"));

    assert_eq!(rig.bone_count(), 2);
    assert_eq!(rig.bone_id("hip"), Some(0));
    assert_eq!(rig.bone_id("leg"), Some(1));
    assert_eq!(
      rig.bones().offset(1),
      Some(&Mat4::from_translation(Vec3::NEG_Y))
    );

    assert_eq!(rig.animation_count(), 1);
    assert_eq!(rig.animation_name(0), Some("walk"));
    assert_eq!(rig.animation_duration(0), Some(1.0));

    let clip = rig.animation(0).map(Animation::clip).unwrap();
    assert_eq!(clip.channels().len(), 2);
    let hip = &clip.channels()[0];
    assert_eq!(hip.node_name(), "hip");
    assert_eq!(hip.positions().len(), 2);
    // Rotation and scale weren't animated, they come from the rest pose.
    assert_eq!(hip.rotations().len(), 1);
    assert_eq!(hip.scales()[0].value, Vec3::ONE);
    let leg = &clip.channels()[1];
    assert_eq!(leg.positions()[0].value, Vec3::new(0.0, 1.0, 0.0));
  }

  #[test]
  fn test_the_walking_rig_pose() {
    drop(env_logger::try_init());

    let rig = match load_slice(walking_rig().as_bytes()) {
      Ok(model) => model,
      Err(e) => panic!("walking rig: failed to load. {}", e),
    };

    let pose = rig.animation_pose(0, 0.5);
    assert_eq!(pose.len(), 2);

    // The hip's channel replaces its rest translation.
    let hip = pose.matrices()[0];
    assert!(hip.abs_diff_eq(Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)), 1e-5));

    let leg_local = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0))
      * Mat4::from_quat(Quat::from_rotation_z(FRAC_PI_2 / 2.0));
    let leg_expected = hip * leg_local * Mat4::from_translation(Vec3::NEG_Y);
    assert!(pose.matrices()[1].abs_diff_eq(leg_expected, 1e-5));
  }

  #[test]
  fn test_animations_from_another_model() {
    drop(env_logger::try_init());

    let rig = match load_slice(walking_rig().as_bytes()) {
      Ok(model) => model,
      Err(e) => panic!("walking rig: failed to load. {}", e),
    };

    let mut copy = Model::new("copy", rig.scene().clone(), rig.bones().clone(), vec![]);
    assert_eq!(copy.load_animations_from(&rig), 1);
    assert_eq!(copy.animation_pose(0, 0.25), rig.animation_pose(0, 0.25));
  }

  ///
  /// Two scene roots, one unnamed node and a handful of clips, only one of them sound:
  ///
  /// ground (skin: [arm]), node1 (unnamed) -> arm
  ///
  /// * "wave": cubic spline translation and STEP rotation on arm, morph weights on node1.
  /// * "broken": three translations against two timestamps.
  /// * "doubled": arm's translation animated twice.
  ///
  fn stage(scene_name: Option<&str>) -> String {
    let mut buffer = vec![];
    // 0: key times.
    push_floats(&mut buffer, &[0.0, 1.0]);
    // 8: spline translations, (in tangent, value, out tangent) per key.
    push_floats(&mut buffer, &[9.0, 9.0, 9.0, 0.0, 0.0, 0.0, 9.0, 9.0, 9.0]);
    push_floats(&mut buffer, &[9.0, 9.0, 9.0, 0.0, 2.0, 0.0, 9.0, 9.0, 9.0]);
    // 80: morph weights.
    push_floats(&mut buffer, &[0.0, 1.0]);
    // 88: three plain translations.
    push_floats(&mut buffer, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
    // 124: rotations.
    push_floats(&mut buffer, &Quat::IDENTITY.to_array());
    push_floats(&mut buffer, &Quat::from_rotation_z(FRAC_PI_2).to_array());
    assert_eq!(buffer.len(), 156);

    let uri = format!("data:application/octet-stream;base64,{}", STANDARD.encode(&buffer));
    let scene_name = match scene_name {
      Some(name) => format!(r#""name": "{}", "#, name),
      None => String::new(),
    };

    format!(
      r#"{{
  "asset": {{ "version": "2.0" }},
  "scenes": [ {{ {}"nodes": [0, 1] }} ],
  "nodes": [
    {{ "name": "ground", "translation": [0.0, 0.0, 1.0], "skin": 0 }},
    {{ "children": [2] }},
    {{ "name": "arm" }}
  ],
  "skins": [ {{ "joints": [2] }} ],
  "animations": [
    {{
      "name": "wave",
      "channels": [
        {{ "sampler": 0, "target": {{ "node": 2, "path": "translation" }} }},
        {{ "sampler": 1, "target": {{ "node": 1, "path": "weights" }} }},
        {{ "sampler": 2, "target": {{ "node": 2, "path": "rotation" }} }}
      ],
      "samplers": [
        {{ "input": 0, "output": 1, "interpolation": "CUBICSPLINE" }},
        {{ "input": 0, "output": 2, "interpolation": "LINEAR" }},
        {{ "input": 0, "output": 5, "interpolation": "STEP" }}
      ]
    }},
    {{
      "name": "broken",
      "channels": [
        {{ "sampler": 0, "target": {{ "node": 2, "path": "translation" }} }}
      ],
      "samplers": [
        {{ "input": 0, "output": 3, "interpolation": "LINEAR" }}
      ]
    }},
    {{
      "name": "doubled",
      "channels": [
        {{ "sampler": 0, "target": {{ "node": 2, "path": "translation" }} }},
        {{ "sampler": 0, "target": {{ "node": 2, "path": "translation" }} }}
      ],
      "samplers": [
        {{ "input": 0, "output": 4, "interpolation": "LINEAR" }}
      ]
    }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [1.0] }},
    {{ "bufferView": 1, "componentType": 5126, "count": 6, "type": "VEC3" }},
    {{ "bufferView": 2, "componentType": 5126, "count": 2, "type": "SCALAR" }},
    {{ "bufferView": 3, "componentType": 5126, "count": 3, "type": "VEC3" }},
    {{ "bufferView": 3, "componentType": 5126, "count": 2, "type": "VEC3" }},
    {{ "bufferView": 4, "componentType": 5126, "count": 2, "type": "VEC4" }}
  ],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 8 }},
    {{ "buffer": 0, "byteOffset": 8, "byteLength": 72 }},
    {{ "buffer": 0, "byteOffset": 80, "byteLength": 8 }},
    {{ "buffer": 0, "byteOffset": 88, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 124, "byteLength": 32 }}
  ],
  "buffers": [ {{ "byteLength": 156, "uri": "{}" }} ]
}}"#,
      scene_name, uri
    )
  }

  #[test]
  fn test_the_stage_hierarchy() {
    drop(env_logger::try_init());

    let stage = match load_slice(stage(None).as_bytes()) {
      Ok(model) => model,
      Err(e) => panic!("stage: failed to load. {}", e),
    };

    let scene = stage.scene();
    assert_eq!(scene.len(), 4);
    let root = scene.node(scene.root()).unwrap();
    assert_eq!(root.name(), "ROOT");
    assert_eq!(*root.transform(), Mat4::IDENTITY);
    assert_eq!(stage.main_node_count(), 2);

    let names: Vec<&str> = scene
      .pre_order()
      .filter_map(|id| scene.node(id).map(SceneNode::name))
      .collect();
    assert_eq!(names, ["ROOT", "ground", "node1", "arm"]);

    let arm = scene.find("arm").unwrap();
    assert_eq!(scene.node(arm).and_then(SceneNode::parent), scene.find("node1"));
    assert_eq!(stage.bone_id("arm"), Some(0));

    let named = match load_slice(self::stage(Some("stage")).as_bytes()) {
      Ok(model) => model,
      Err(e) => panic!("named stage: failed to load. {}", e),
    };
    assert_eq!(named.scene().node(named.scene().root()).map(SceneNode::name), Some("stage"));
  }

  #[test]
  fn test_the_stage_clips() {
    drop(env_logger::try_init());

    let stage = match load_slice(stage(None).as_bytes()) {
      Ok(model) => model,
      Err(e) => panic!("stage: failed to load. {}", e),
    };

    // "broken" and "doubled" are dropped, "wave" survives on its own.
    assert_eq!(stage.clips().len(), 1);
    assert_eq!(stage.animation_count(), 1);
    assert_eq!(stage.animation_name(0), Some("wave"));
    assert_eq!(stage.animation_duration(0), Some(1.0));

    // The morph weights on node1 are skipped, arm's tracks are merged into one channel.
    let clip = stage.animation(0).map(Animation::clip).unwrap();
    assert_eq!(clip.channels().len(), 1);
    let arm = &clip.channels()[0];
    assert_eq!(arm.node_name(), "arm");

    // Only the middle of each spline triple is kept.
    let positions: Vec<Vec3> = arm.positions().iter().map(|key| key.value).collect();
    assert_eq!(positions, [Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0)]);
    assert_eq!(arm.rotations().len(), 2);
    assert_eq!(arm.scales().len(), 1);

    let pose = stage.animation_pose(0, 0.5);
    assert_eq!(pose.len(), 1);
    let translation = pose.matrices()[0].w_axis;
    assert!(translation.abs_diff_eq(glam::Vec4::new(0.0, 1.0, 0.0, 1.0), 1e-5));
  }

  #[test]
  fn check_invalid_path() {
    drop(env_logger::try_init());

    assert!(matches!(
      load("tests/invalid.glb"),
      Err(ImportError::InvalidPath(_))
    ));
  }

  #[test]
  fn check_document_without_scenes() {
    drop(env_logger::try_init());

    let empty = r#"{ "asset": { "version": "2.0" } }"#;
    assert!(matches!(
      load_slice(empty.as_bytes()),
      Err(ImportError::NoScenes(_))
    ));
  }
}
