//! Publishers: named collections of node templates, and the factory that
//! builds nodes from them for the "New Node" menu.

use crate::error::{GraphError, Result};
use crate::node::{FlowNode, FlowNodeConfig};
use crate::nodes::NODE_MENU_GROUP;
use crate::subsystem::GraphAction;
use indexmap::IndexMap;
use nf_core::{ContextMenuConfig, ContextMenuItemConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    /// Templates keyed by node type. A `/` in the key nests the entry in a
    /// sub menu.
    pub nodes: IndexMap<String, FlowNodeConfig>,
}

impl PublisherConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone)]
pub struct Publisher {
    name: String,
    description: String,
    version: String,
    nodes: IndexMap<String, FlowNodeConfig>,
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new(PublisherConfig::default())
    }
}

impl Publisher {
    pub fn new(config: PublisherConfig) -> Self {
        Self {
            name: config.name.unwrap_or_else(|| "Unknown".into()),
            description: config.description.unwrap_or_else(|| "No description".into()),
            version: config.version.unwrap_or_else(|| "v0.1.0".into()),
            nodes: config.nodes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn nodes(&self) -> &IndexMap<String, FlowNodeConfig> {
        &self.nodes
    }

    pub fn register(&mut self, node_type: impl Into<String>, config: FlowNodeConfig) {
        self.nodes.insert(node_type.into(), config);
    }

    pub fn unregister(&mut self, node_type: &str) -> bool {
        self.nodes.shift_remove(node_type).is_some()
    }

    pub fn create(&self, node_type: &str) -> Result<FlowNode> {
        let Some(config) = self.nodes.get(node_type) else {
            log::error!("no builder registered for node {node_type:?} in {}", self.name);
            return Err(GraphError::UnknownNodeType {
                publisher: self.name.clone(),
                node_type: node_type.to_string(),
            });
        };
        FlowNode::new(config.clone())
    }

    /// Menu of every template, nesting on `/` unless a `[` comes first.
    /// `publisher_id` is the key the factory knows this publisher by.
    pub fn context_menu(&self, publisher_id: &str) -> ContextMenuConfig<GraphAction> {
        let keys: Vec<(&str, &str)> = self.nodes.keys().map(|k| (k.as_str(), k.as_str())).collect();
        build_menu(publisher_id, &self.name, &keys)
    }
}

/// `entries` pairs the part of the key still to place with the full key.
fn build_menu(publisher_id: &str, name: &str, entries: &[(&str, &str)]) -> ContextMenuConfig<GraphAction> {
    let mut menu = ContextMenuConfig::named(name);
    let mut nested: IndexMap<&str, Vec<(&str, &str)>> = IndexMap::new();

    for &(rest, full) in entries {
        let slash = rest.find('/');
        let bracket = rest.find('[');
        match slash {
            Some(slash) if bracket.is_none_or(|b| b > slash) => {
                nested
                    .entry(&rest[..slash])
                    .or_default()
                    .push((&rest[slash + 1..], full));
            }
            _ => {
                menu = menu.item(ContextMenuItemConfig::new(
                    rest,
                    GraphAction::NewNode {
                        publisher: publisher_id.to_string(),
                        node_type: full.to_string(),
                    },
                ));
            }
        }
    }

    for (sub_name, sub_entries) in &nested {
        menu = menu.sub_menu(build_menu(publisher_id, sub_name, sub_entries));
    }
    menu
}

// ─── Factory ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeFactoryConfig {
    pub publishers: IndexMap<String, PublisherConfig>,
}

type NodeCreatedCallback = Box<dyn FnMut(&str, &str, &FlowNode)>;

#[derive(Default)]
pub struct NodeFactory {
    publishers: IndexMap<String, Publisher>,
    listeners: Vec<NodeCreatedCallback>,
}

impl std::fmt::Debug for NodeFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeFactory")
            .field("publishers", &self.publishers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl NodeFactory {
    pub fn new(config: NodeFactoryConfig) -> Self {
        let mut factory = Self::default();
        for (id, publisher) in config.publishers {
            factory.add_publisher(id, Publisher::new(publisher));
        }
        factory
    }

    pub fn add_publisher(&mut self, id: impl Into<String>, publisher: Publisher) {
        let id = id.into();
        log::debug!("publisher {id:?} registered with {} nodes", publisher.nodes.len());
        self.publishers.insert(id, publisher);
    }

    pub fn publisher(&self, id: &str) -> Option<&Publisher> {
        self.publishers.get(id)
    }

    pub fn publisher_mut(&mut self, id: &str) -> Option<&mut Publisher> {
        self.publishers.get_mut(id)
    }

    pub fn add_node_created_listener(&mut self, callback: impl FnMut(&str, &str, &FlowNode) + 'static) {
        self.listeners.push(Box::new(callback));
    }

    pub fn create(&mut self, publisher: &str, node_type: &str) -> Result<FlowNode> {
        let Some(found) = self.publishers.get(publisher) else {
            log::error!("no publisher registered with identifier {publisher:?}");
            return Err(GraphError::UnknownPublisher(publisher.to_string()));
        };
        let node = found.create(node_type)?;
        for callback in &mut self.listeners {
            callback(publisher, node_type, &node);
        }
        Ok(node)
    }

    /// The "New Node" sub menu listing every publisher.
    pub fn open_menu(&self) -> ContextMenuConfig<GraphAction> {
        let mut menu = ContextMenuConfig::named("New Node").grouped(NODE_MENU_GROUP);
        for (id, publisher) in &self.publishers {
            menu = menu.sub_menu(publisher.context_menu(id));
        }
        menu
    }
}
