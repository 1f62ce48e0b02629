use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use foldhash::{HashMap, HashMapExt};
use serde::{Deserialize, Serialize};

/// Opaque identifier of a node in a [`SceneGraph`].
///
/// The scene graph decides what the number means; pools only pass it back to the same graph.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NodeHandle(u64);

impl NodeHandle {
    /// Wraps a raw node identifier issued by a scene graph.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw node identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Names the template a scene pool instantiates new nodes from.
///
/// In configuration files this is written as a plain string.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateHandle(String);

impl TemplateHandle {
    /// Creates a handle for the template with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The engine operations that scene pools depend on.
///
/// Implement this over whatever scene graph or entity store hosts the pooled objects. The pools
/// treat every call as an opaque side effect and never inspect the graph beyond the handles
/// returned here.
///
/// This trait is automatically mocked by mockall in test builds, generating `MockSceneGraph`.
#[cfg_attr(test, mockall::automock)]
pub trait SceneGraph: Debug + 'static {
    /// Creates a root container node that outlives scene changes. All scene pools of a registry
    /// parent their nodes under one such root.
    fn create_root(&mut self, name: &str) -> NodeHandle;

    /// Creates a copy of `template` as a child of `parent` and returns the new node.
    fn instantiate(&mut self, template: &TemplateHandle, parent: NodeHandle) -> NodeHandle;

    /// Shows or hides a node. Inactive nodes stay in the graph, parented and ready for reuse.
    fn set_active(&mut self, node: NodeHandle, active: bool);

    /// Removes a node from the graph entirely.
    fn destroy(&mut self, node: NodeHandle);
}

/// A scene graph shared between every scene pool of a registry.
pub type SharedSceneGraph = Rc<RefCell<dyn SceneGraph>>;

#[derive(Debug)]
struct HeadlessNode {
    name: String,
    parent: Option<NodeHandle>,
    active: bool,
}

/// A [`SceneGraph`] that keeps nodes in memory without rendering anything.
///
/// Useful for servers and tools that run pooled scene objects without an engine attached, and
/// for observing what a registry does to the graph.
///
/// # Example
///
/// ```rust
/// use recycle_pool::{HeadlessSceneGraph, SceneGraph, TemplateHandle};
///
/// let mut scene = HeadlessSceneGraph::new();
///
/// let root = scene.create_root("pools");
/// let node = scene.instantiate(&TemplateHandle::new("crate"), root);
///
/// assert_eq!(scene.parent_of(node), Some(root));
/// assert_eq!(scene.is_active(node), Some(true));
///
/// scene.set_active(node, false);
/// assert_eq!(scene.is_active(node), Some(false));
///
/// scene.destroy(node);
/// assert!(!scene.contains(node));
/// ```
#[derive(Debug, Default)]
pub struct HeadlessSceneGraph {
    nodes: HashMap<NodeHandle, HeadlessNode>,
    next_node: u64,
}

impl HeadlessSceneGraph {
    /// Creates an empty scene graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_node: 0,
        }
    }

    /// Number of nodes currently in the graph, including root nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the node exists in the graph.
    #[must_use]
    pub fn contains(&self, node: NodeHandle) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Whether the node is active, or `None` if the node does not exist.
    #[must_use]
    pub fn is_active(&self, node: NodeHandle) -> Option<bool> {
        self.nodes.get(&node).map(|n| n.active)
    }

    /// The parent of the node, or `None` for root nodes and nodes that do not exist.
    #[must_use]
    pub fn parent_of(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    /// The name of the node (the template name for instantiated nodes).
    #[must_use]
    pub fn name_of(&self, node: NodeHandle) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.name.as_str())
    }

    /// Number of direct children of the node.
    #[must_use]
    pub fn child_count(&self, node: NodeHandle) -> usize {
        self.nodes
            .values()
            .filter(|n| n.parent == Some(node))
            .count()
    }

    fn add_node(&mut self, name: &str, parent: Option<NodeHandle>) -> NodeHandle {
        let handle = NodeHandle::new(self.next_node);
        self.next_node = self
            .next_node
            .checked_add(1)
            .expect("node id overflow would require more nodes than memory can hold");

        self.nodes.insert(
            handle,
            HeadlessNode {
                name: name.to_string(),
                parent,
                active: true,
            },
        );

        handle
    }
}

impl SceneGraph for HeadlessSceneGraph {
    fn create_root(&mut self, name: &str) -> NodeHandle {
        self.add_node(name, None)
    }

    fn instantiate(&mut self, template: &TemplateHandle, parent: NodeHandle) -> NodeHandle {
        self.add_node(template.name(), Some(parent))
    }

    fn set_active(&mut self, node: NodeHandle, active: bool) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.active = active;
        }
    }

    fn destroy(&mut self, node: NodeHandle) {
        // Children go down with their parent.
        let mut doomed = vec![node];

        while let Some(current) = doomed.pop() {
            if self.nodes.remove(&current).is_some() {
                doomed.extend(
                    self.nodes
                        .iter()
                        .filter(|(_, n)| n.parent == Some(current))
                        .map(|(handle, _)| *handle),
                );
            }
        }
    }
}
