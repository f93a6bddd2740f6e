use std::path::{Path, PathBuf};

use gltf::Gltf;

/// Helps to simplify the signature of import related functions.
pub(crate) struct GltfData {
  pub buffers: Vec<gltf::buffer::Data>,
  pub base_dir: PathBuf,
  pub file_name: String,
}

impl GltfData {
  pub fn new<P>(path: P, file_name: &str) -> Self
  where
    P: AsRef<Path>,
  {
    let mut base_dir = PathBuf::from(path.as_ref());
    base_dir.pop();
    GltfData {
      buffers: vec![],
      base_dir,
      file_name: file_name.to_string(),
    }
  }

  ///
  /// Pull in every buffer the document references. External URIs resolve against the
  /// directory the document came from.
  ///
  pub fn load_buffers(&mut self, gltf_data: &mut Gltf) -> Result<(), gltf::Error> {
    // The blob is only needed once, so rip it out instead of cloning it.
    let blob = gltf_data.blob.take();
    self.buffers = gltf::import_buffers(&gltf_data.document, Some(self.base_dir.as_path()), blob)?;
    Ok(())
  }

  ///
  /// Raw bytes behind a glTF buffer, for the accessor readers.
  ///
  pub fn buffer(&self, buffer: gltf::Buffer<'_>) -> Option<&[u8]> {
    self.buffers.get(buffer.index()).map(|data| data.0.as_slice())
  }
}
