use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::animation::Track;
use crate::scene_graph::NodeId;

/// Errors raised while importing a glTF file into a [`crate::Model`].
#[derive(Error, Debug)]
pub enum ImportError {
  /// The file could not be opened or read.
  #[error("I/O error on {path:?}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The path doesn't point at a readable file name.
  #[error("Invalid path: {0}")]
  InvalidPath(String),

  /// The gltf crate rejected the document or its buffers.
  #[error("glTF error: {0}")]
  Gltf(#[from] gltf::Error),

  /// The document has nothing to build a scene graph from.
  #[error("Model contains no scenes. {0}")]
  NoScenes(String),
}

/// Errors raised while assembling scene graphs and animation clips by hand.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimationError {
  /// A channel was given an empty key array.
  #[error("Channel for node [{node}] has no {track} keys")]
  EmptyKeys { node: String, track: Track },

  /// A channel was given keys whose times go backwards.
  #[error("Channel for node [{node}] has {track} keys out of time order")]
  UnsortedKeys { node: String, track: Track },

  /// A child was attached to a node that doesn't exist.
  #[error("Unknown parent node {0:?}")]
  UnknownParent(NodeId),
}
