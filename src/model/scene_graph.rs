use ahash::AHashMap;
use glam::Mat4;

use crate::error::AnimationError;

///
/// Handle to a node inside a [`SceneGraph`].
///
/// Handles are handed out in insertion order and are never reused, the root is always 0.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
  ///
  /// Position of the node inside the graph's arena.
  ///
  pub fn index(self) -> usize {
    self.0
  }
}

/// A single node of an imported hierarchy.
#[derive(Debug, Clone)]
pub struct SceneNode {
  name: String,
  transform: Mat4,
  parent: Option<NodeId>,
  children: Vec<NodeId>,
}

impl SceneNode {
  /// Node name. Not guaranteed to be unique.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Local (rest pose) transform relative to the parent.
  pub fn transform(&self) -> &Mat4 {
    &self.transform
  }

  pub fn parent(&self) -> Option<NodeId> {
    self.parent
  }

  /// Children in the order they were attached.
  pub fn children(&self) -> &[NodeId] {
    &self.children
  }
}

///
/// Rooted node hierarchy stored as an arena.
///
/// Nothing in here is ever mutated by the animation code, it only reads transforms and
/// walks children.
///
#[derive(Debug, Clone)]
pub struct SceneGraph {
  nodes: Vec<SceneNode>,
}

impl SceneGraph {
  ///
  /// Create a graph holding nothing but its root.
  ///
  pub fn new<S: Into<String>>(root_name: S, root_transform: Mat4) -> Self {
    SceneGraph {
      nodes: vec![SceneNode {
        name: root_name.into(),
        transform: root_transform,
        parent: None,
        children: vec![],
      }],
    }
  }

  ///
  /// Attach a new node as the last child of `parent`.
  ///
  pub fn add_child<S: Into<String>>(
    &mut self,
    parent: NodeId,
    name: S,
    transform: Mat4,
  ) -> Result<NodeId, AnimationError> {
    let id = NodeId(self.nodes.len());

    match self.nodes.get_mut(parent.0) {
      Some(parent_node) => parent_node.children.push(id),
      None => return Err(AnimationError::UnknownParent(parent)),
    }

    self.nodes.push(SceneNode {
      name: name.into(),
      transform,
      parent: Some(parent),
      children: vec![],
    });

    Ok(id)
  }

  pub fn root(&self) -> NodeId {
    NodeId(0)
  }

  pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
    self.nodes.get(id.0)
  }

  ///
  /// Number of nodes, root included.
  ///
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  ///
  /// A graph always has its root, so this is only here to keep clippy happy.
  ///
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  ///
  /// Every node in arena order.
  ///
  pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
    self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
  }

  ///
  /// Depth first walk from the root, parents before children, siblings in order.
  ///
  pub fn pre_order(&self) -> PreOrder<'_> {
    PreOrder {
      graph: self,
      stack: vec![self.root()],
    }
  }

  ///
  /// Find a node by name. With duplicate names the last one in pre-order wins.
  ///
  pub fn find(&self, name: &str) -> Option<NodeId> {
    self
      .pre_order()
      .filter(|id| self.nodes[id.0].name == name)
      .last()
  }

  ///
  /// Name to node table for every node reachable from the root.
  ///
  /// Same collision rule as [`SceneGraph::find`]: the last node visited with a name owns it.
  ///
  pub fn name_map(&self) -> AHashMap<&str, NodeId> {
    let mut map = AHashMap::with_capacity(self.nodes.len());
    for id in self.pre_order() {
      map.insert(self.nodes[id.0].name.as_str(), id);
    }
    map
  }

  ///
  /// Rest pose transform of a node accumulated from the root down.
  ///
  pub fn global_transform(&self, id: NodeId) -> Option<Mat4> {
    let mut node = self.node(id)?;
    let mut transform = node.transform;
    while let Some(parent) = node.parent {
      node = self.node(parent)?;
      transform = node.transform * transform;
    }
    Some(transform)
  }
}

///
/// Iterator behind [`SceneGraph::pre_order`].
///
pub struct PreOrder<'g> {
  graph: &'g SceneGraph,
  stack: Vec<NodeId>,
}

impl Iterator for PreOrder<'_> {
  type Item = NodeId;

  fn next(&mut self) -> Option<NodeId> {
    let id = self.stack.pop()?;
    if let Some(node) = self.graph.node(id) {
      // Reversed so the first child comes off the stack first.
      self.stack.extend(node.children.iter().rev());
    }
    Some(id)
  }
}

// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
// ?                            CODE ENDS HERE, BEGIN UNIT TESTS.                                   ? //
// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
