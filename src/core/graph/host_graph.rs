use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::config::BoundaryConfig;
use crate::error::{BlocksmithError, Result};
use super::super::signature::{SignatureParser, NONE_TYPE};
use super::snapshot::{GraphSnapshot, HostId, HostKind, RoutineFlavor};

/// Namespace whose classes print without a module prefix
const BUILTINS_MODULE: &str = "builtins";

/// Arena index of a node; stable for the lifetime of a [`HostGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Module {
        name: String,
    },
    Class {
        module: String,
        qualname: String,
        bases: Vec<NodeId>,
    },
    Routine {
        name: String,
        flavor: RoutineFlavor,
    },
    Descriptor {
        property: bool,
        getter: Option<NodeId>,
        setter: Option<NodeId>,
    },
    Value {
        type_id: NodeId,
    },
    Opaque,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub host_id: HostId,
    pub kind: NodeKind,
    pub doc: Option<String>,
    /// Sorted by bound name
    pub members: Vec<(String, NodeId)>,
    pub view: NodeView,
}

/// Class of a plain data value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataType {
    pub id: NodeId,
    pub module: String,
    pub name: String,
}

/// Capability-describing view of a node, computed once when the graph loads.
///
/// Classification reads only these fields, never the raw host data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeView {
    pub is_module: bool,
    pub is_class: bool,
    pub is_routine: bool,
    pub is_builtin: bool,
    pub is_method_descriptor: bool,
    pub is_data_descriptor: bool,
    pub is_property: bool,
    pub has_routine_getter: bool,
    pub has_routine_setter: bool,
    pub is_data: bool,
    pub is_foreign: bool,

    /// `__name__` of modules, classes and routines
    pub identity_name: Option<String>,

    pub data_type: Option<DataType>,

    // Enum fingerprint
    pub has_members_marker: bool,
    pub has_initializer_with_int_arg: bool,
    pub has_name_accessor: bool,
    pub has_value_accessor: bool,

    pub doc: Option<String>,
}

impl NodeView {
    pub fn is_enum(&self) -> bool {
        self.is_class
            && self.has_members_marker
            && self.has_initializer_with_int_arg
            && self.has_name_accessor
            && self.has_value_accessor
    }
}

/// The introspected object graph held as an arena.
///
/// Host identities collapse onto a single [`NodeId`], so two bindings of the
/// same entity always lead to the same node.
#[derive(Debug)]
pub struct HostGraph {
    nodes: Vec<Node>,
    by_host: HashMap<HostId, NodeId>,
    roots: Vec<NodeId>,
    modules_by_name: HashMap<String, NodeId>,
    classes_by_name: HashMap<String, NodeId>,
}

impl HostGraph {
    /// Load a snapshot, validating every identity reference
    pub fn from_snapshot(snapshot: &GraphSnapshot, boundary: &BoundaryConfig) -> Result<Self> {
        let foreign: BTreeSet<&str> = boundary.foreign_namespaces.iter()
            .map(|s| s.as_str())
            .collect();

        let mut by_host = HashMap::new();
        for (index, host) in snapshot.nodes.iter().enumerate() {
            if by_host.insert(host.id, NodeId(index)).is_some() {
                return Err(BlocksmithError::Graph(format!("duplicate host id {}", host.id)));
            }
        }

        let lookup = |host_id: HostId, context: &str| -> Result<NodeId> {
            by_host.get(&host_id).copied().ok_or_else(|| {
                BlocksmithError::Graph(format!("{} refers to unknown host id {}", context, host_id))
            })
        };

        let mut nodes = Vec::with_capacity(snapshot.nodes.len());
        for (index, host) in snapshot.nodes.iter().enumerate() {
            let context = format!("node {}", host.id);
            let kind = match &host.kind {
                HostKind::Module { name } => NodeKind::Module { name: name.clone() },
                HostKind::Class { module, qualname, bases, .. } => NodeKind::Class {
                    module: module.clone(),
                    qualname: qualname.clone(),
                    bases: bases.iter()
                        .map(|b| lookup(*b, &context))
                        .collect::<Result<Vec<_>>>()?,
                },
                HostKind::Routine { name, flavor } => NodeKind::Routine {
                    name: name.clone(),
                    flavor: *flavor,
                },
                HostKind::Descriptor { property, getter, setter } => NodeKind::Descriptor {
                    property: *property,
                    getter: getter.map(|g| lookup(g, &context)).transpose()?,
                    setter: setter.map(|s| lookup(s, &context)).transpose()?,
                },
                HostKind::Value { type_id } => NodeKind::Value {
                    type_id: lookup(*type_id, &context)?,
                },
                HostKind::Opaque => NodeKind::Opaque,
            };

            let members = host.members.iter()
                .map(|(key, member)| Ok((key.clone(), lookup(*member, &context)?)))
                .collect::<Result<Vec<_>>>()?;

            nodes.push(Node {
                id: NodeId(index),
                host_id: host.id,
                kind,
                doc: host.doc.clone(),
                members,
                view: NodeView::default(),
            });
        }

        let roots = snapshot.roots.iter()
            .map(|r| lookup(*r, "roots"))
            .collect::<Result<Vec<_>>>()?;

        for root in &roots {
            if !matches!(nodes[root.0].kind, NodeKind::Module { .. }) {
                return Err(BlocksmithError::Graph(format!(
                    "root {} is not a module", nodes[root.0].host_id
                )));
            }
        }

        let mut graph = Self {
            nodes,
            by_host,
            roots,
            modules_by_name: HashMap::new(),
            classes_by_name: HashMap::new(),
        };

        graph.build_views(snapshot, &foreign);
        graph.build_indexes();

        Ok(graph)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn view(&self, id: NodeId) -> &NodeView {
        &self.nodes[id.0].view
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn by_host_id(&self, host_id: HostId) -> Option<NodeId> {
        self.by_host.get(&host_id).copied()
    }

    pub fn module_by_name(&self, name: &str) -> Option<NodeId> {
        self.modules_by_name.get(name).copied()
    }

    pub fn members(&self, id: NodeId) -> &[(String, NodeId)] {
        &self.nodes[id.0].members
    }

    pub fn member(&self, id: NodeId, key: &str) -> Option<NodeId> {
        let members = &self.nodes[id.0].members;
        members.binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|index| members[index].1)
    }

    pub fn is_foreign(&self, id: NodeId) -> bool {
        self.nodes[id.0].view.is_foreign
    }

    /// Full dotted name of a module
    pub fn module_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Module { name } => Some(name),
            _ => None,
        }
    }

    /// Module that defines a class
    pub fn class_module(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Class { module, .. } => Some(module),
            _ => None,
        }
    }

    /// Full dotted name of a class as the host prints it
    pub fn full_class_name(&self, id: NodeId) -> Option<String> {
        match &self.nodes[id.0].kind {
            NodeKind::Class { module, qualname, .. } => Some(class_name_of(module, qualname)),
            _ => None,
        }
    }

    /// Best dotted name for any node, used in reports
    pub fn display_name(&self, id: NodeId) -> String {
        match &self.nodes[id.0].kind {
            NodeKind::Module { name } => name.clone(),
            NodeKind::Class { module, qualname, .. } => class_name_of(module, qualname),
            NodeKind::Routine { name, .. } => name.clone(),
            _ => String::new(),
        }
    }

    pub fn bases(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id.0].kind {
            NodeKind::Class { bases, .. } => bases,
            _ => &[],
        }
    }

    /// Find the class a dotted type name refers to.
    ///
    /// Tries the class index first, then walks members from the longest
    /// module prefix, the way an attribute lookup from an import would.
    pub fn resolve_class(&self, dotted: &str) -> Option<NodeId> {
        if let Some(id) = self.classes_by_name.get(dotted) {
            return Some(*id);
        }

        let parts: Vec<&str> = dotted.split('.').collect();
        for split in (1..parts.len()).rev() {
            let module_name = parts[..split].join(".");
            let Some(mut current) = self.module_by_name(&module_name) else {
                continue;
            };
            for part in &parts[split..] {
                current = self.member(current, part)?;
            }
            return if self.nodes[current.0].view.is_class { Some(current) } else { None };
        }

        None
    }

    fn build_views(&mut self, snapshot: &GraphSnapshot, foreign: &BTreeSet<&str>) {
        for index in 0..self.nodes.len() {
            let view = self.base_view(NodeId(index), snapshot, foreign);
            self.nodes[index].view = view;
        }

        let parser = SignatureParser::new();
        for index in 0..self.nodes.len() {
            if !self.nodes[index].view.is_class {
                continue;
            }
            let fingerprint = self.enum_fingerprint(NodeId(index), &parser);
            let view = &mut self.nodes[index].view;
            view.has_members_marker = fingerprint.0;
            view.has_initializer_with_int_arg = fingerprint.1;
            view.has_name_accessor = fingerprint.2;
            view.has_value_accessor = fingerprint.3;
        }
    }

    fn base_view(&self, id: NodeId, snapshot: &GraphSnapshot, foreign: &BTreeSet<&str>) -> NodeView {
        let node = &self.nodes[id.0];
        let mut view = NodeView {
            doc: node.doc.clone(),
            ..NodeView::default()
        };

        match &node.kind {
            NodeKind::Module { name } => {
                view.is_module = true;
                view.is_foreign = is_foreign_namespace(name, foreign);
                view.identity_name = Some(name.clone());
            }
            NodeKind::Class { module, qualname, .. } => {
                let marked_foreign = matches!(
                    snapshot.nodes[id.0].kind,
                    HostKind::Class { foreign: true, .. }
                );
                view.is_class = true;
                view.is_foreign = marked_foreign || is_foreign_namespace(module, foreign);
                view.identity_name = Some(short_name(qualname).to_string());
            }
            NodeKind::Routine { name, flavor } => {
                view.is_routine = true;
                view.is_builtin = *flavor == RoutineFlavor::Builtin;
                view.is_method_descriptor = *flavor == RoutineFlavor::MethodDescriptor;
                view.identity_name = Some(name.clone());
            }
            NodeKind::Descriptor { property, getter, setter } => {
                let is_routine = |accessor: &Option<NodeId>| {
                    accessor.map_or(false, |a| matches!(self.nodes[a.0].kind, NodeKind::Routine { .. }))
                };
                view.is_data_descriptor = true;
                view.is_property = *property;
                view.has_routine_getter = is_routine(getter);
                view.has_routine_setter = is_routine(setter);
            }
            NodeKind::Value { type_id } => {
                view.is_data = true;
                if let NodeKind::Class { module, qualname, .. } = &self.nodes[type_id.0].kind {
                    view.data_type = Some(DataType {
                        id: *type_id,
                        module: module.clone(),
                        name: short_name(qualname).to_string(),
                    });
                }
            }
            NodeKind::Opaque => {}
        }

        view
    }

    /// (members marker, int initializer, name accessor, value accessor)
    fn enum_fingerprint(&self, id: NodeId, parser: &SignatureParser) -> (bool, bool, bool, bool) {
        let node = &self.nodes[id.0];
        let has_members_marker = node.doc.as_deref().map_or(false, |doc| {
            doc.starts_with("Members:\n\n") || doc.contains("\n\nMembers:\n\n")
        });

        let full_name = self.full_class_name(id).unwrap_or_default();
        let has_initializer_with_int_arg = self.member(id, "__init__").map_or(false, |init| {
            let init_view = &self.nodes[init.0].view;
            if !init_view.is_routine || !init_view.is_method_descriptor {
                return false;
            }
            let Some(line) = first_line(init_view.doc.as_deref()) else {
                return false;
            };
            parser.parse(line).map_or(false, |sig| {
                sig.function_name == "__init__"
                    && sig.return_type == NONE_TYPE
                    && sig.parameters.len() == 2
                    && sig.parameters[0].name == "self"
                    && sig.parameters[0].type_name == full_name
                    && sig.parameters[1].name == "value"
                    && sig.parameters[1].type_name == "int"
            })
        });

        let has_name_accessor = self.member(id, "name").map_or(false, |name| {
            let name_view = &self.nodes[name.0].view;
            name_view.is_data_descriptor
                && first_line(name_view.doc.as_deref())
                    .and_then(|line| parser.getter_type(line))
                    .map_or(false, |t| t == "str")
        });

        let has_value_accessor = self.member(id, "value")
            .map_or(false, |value| self.nodes[value.0].view.is_data_descriptor);

        (has_members_marker, has_initializer_with_int_arg, has_name_accessor, has_value_accessor)
    }

    fn build_indexes(&mut self) {
        for node in &self.nodes {
            match &node.kind {
                NodeKind::Module { name } => {
                    self.modules_by_name.entry(name.clone()).or_insert(node.id);
                }
                NodeKind::Class { module, qualname, .. } => {
                    self.classes_by_name
                        .entry(class_name_of(module, qualname))
                        .or_insert(node.id);
                }
                _ => {}
            }
        }
    }
}

fn class_name_of(module: &str, qualname: &str) -> String {
    if module == BUILTINS_MODULE {
        qualname.to_string()
    } else {
        format!("{}.{}", module, qualname)
    }
}

fn short_name(qualname: &str) -> &str {
    qualname.rsplit('.').next().unwrap_or(qualname)
}

fn first_line(doc: Option<&str>) -> Option<&str> {
    doc.and_then(|d| d.split('\n').next())
}

fn is_foreign_namespace(dotted: &str, foreign: &BTreeSet<&str>) -> bool {
    let first = dotted.split('.').next().unwrap_or(dotted);
    foreign.contains(first)
}
