use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::WalkConfig;
use crate::error::{BlocksmithError, Result};
use super::classifier::{classify, is_type_alias, starts_with_underscore_digit, CapabilitySet, Member};
use super::graph::{HostGraph, NodeId, NodeKind};
use super::naming::NameMapper;
use super::signature::SignatureParser;

#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub force_show_everything: bool,
    pub sentinel_name: String,
    pub ignored_submodules: Vec<String>,
}

impl From<&WalkConfig> for WalkOptions {
    fn from(config: &WalkConfig) -> Self {
        Self {
            force_show_everything: config.force_show_everything,
            sentinel_name: config.sentinel_name.clone(),
            ignored_submodules: config.ignored_submodules.clone(),
        }
    }
}

/// One attempt to visit a node, including hits on already visited nodes
#[derive(Debug, Clone, Serialize)]
pub struct VisitRecord {
    pub depth: usize,
    pub path: String,
    pub node: NodeId,
    pub parent: Option<NodeId>,
    pub key: String,
    pub capabilities: CapabilitySet,
    pub revisit: bool,
}

/// Everything the walk discovered
#[derive(Debug, Default)]
pub struct Model {
    /// Non-foreign modules in discovery order
    pub modules: Vec<NodeId>,

    /// Non-foreign classes sorted by full class name
    pub classes: Vec<NodeId>,

    /// `public scope.bound name` -> public class name
    pub aliases: BTreeMap<String, String>,

    /// Public ancestor name -> direct descendants, truncated at the first foreign ancestor
    pub subclasses: BTreeMap<String, Vec<String>>,

    /// Foreign modules and classes where traversal stopped
    pub boundaries: Vec<NodeId>,

    pub visits: Vec<VisitRecord>,

    pub visited_count: usize,
}

/// Mutable state of one walk, owned by [`Walker::walk`]
#[derive(Default)]
struct WalkContext {
    visited: HashSet<NodeId>,
    modules: Vec<NodeId>,
    classes: Vec<NodeId>,
    boundaries: Vec<NodeId>,
    aliases: BTreeMap<String, String>,
    pending: Vec<NodeId>,
    visits: Vec<VisitRecord>,
}

/// Depth-first walk from each root module with one identity-visited set
/// shared by every root. Classes only named in routine signatures are queued
/// and drained after the roots, pass after pass, until none is left unvisited.
pub struct Walker<'g> {
    graph: &'g HostGraph,
    names: &'g NameMapper,
    options: WalkOptions,
    parser: SignatureParser,
}

impl<'g> Walker<'g> {
    pub fn new(graph: &'g HostGraph, names: &'g NameMapper, options: WalkOptions) -> Self {
        Self {
            graph,
            names,
            options,
            parser: SignatureParser::new(),
        }
    }

    /// Walk every root module, then close over signature-referenced classes
    pub fn walk(&self, roots: &[NodeId]) -> Result<Model> {
        let mut ctx = WalkContext::default();

        for root in roots {
            let name = self.graph.module_name(*root).unwrap_or_default().to_string();
            info!("🔍 Walking root module {}", name);
            self.visit(&mut ctx, 0, name.clone(), None, &name, *root);
        }

        let mut pass = 0;
        loop {
            let mut batch: Vec<(String, NodeId)> = ctx.pending.drain(..)
                .filter(|id| !ctx.visited.contains(id))
                .map(|id| (self.graph.full_class_name(id).unwrap_or_default(), id))
                .collect();
            batch.sort();
            batch.dedup();

            if batch.is_empty() {
                break;
            }

            pass += 1;
            debug!("Signature closure pass {}: {} classes", pass, batch.len());
            for (name, id) in batch {
                if ctx.visited.contains(&id) {
                    continue;
                }
                self.visit(&mut ctx, 0, name, None, "", id);
            }
        }

        let mut classes = ctx.classes;
        classes.sort_by_key(|id| (self.graph.full_class_name(*id).unwrap_or_default(), *id));
        let subclasses = self.subclass_edges(&classes);

        info!(
            "✅ Walk complete: {} nodes, {} modules, {} classes, {} aliases",
            ctx.visited.len(), ctx.modules.len(), classes.len(), ctx.aliases.len()
        );

        Ok(Model {
            modules: ctx.modules,
            classes,
            aliases: ctx.aliases,
            subclasses,
            boundaries: ctx.boundaries,
            visits: ctx.visits,
            visited_count: ctx.visited.len(),
        })
    }

    fn visit(
        &self,
        ctx: &mut WalkContext,
        depth: usize,
        path: String,
        parent: Option<NodeId>,
        key: &str,
        id: NodeId,
    ) {
        let graph = self.graph;
        let node = graph.node(id);
        let member = Member::new(parent.map(|p| graph.node(p)), key, node);
        let capabilities = classify(&member);

        let path = match &node.kind {
            NodeKind::Module { name } => name.clone(),
            NodeKind::Class { .. } if !is_type_alias(&member) => {
                graph.full_class_name(id).unwrap_or(path)
            }
            _ => path,
        };

        let revisit = ctx.visited.contains(&id);
        ctx.visits.push(VisitRecord {
            depth,
            path: path.clone(),
            node: id,
            parent,
            key: key.to_string(),
            capabilities,
            revisit,
        });
        if revisit {
            return;
        }
        ctx.visited.insert(id);

        if node.view.is_routine {
            self.collect_signature_references(ctx, &path, node.view.identity_name.as_deref(), node.doc.as_deref());
        }

        match &node.kind {
            NodeKind::Module { .. } | NodeKind::Class { .. } if node.view.is_foreign => {
                debug!("Boundary at {}", path);
                ctx.boundaries.push(id);
                return;
            }
            NodeKind::Module { .. } => ctx.modules.push(id),
            NodeKind::Class { .. } => {
                ctx.classes.push(id);
                for base in graph.bases(id) {
                    if graph.is_foreign(*base) {
                        break;
                    }
                    let base_path = graph.full_class_name(*base).unwrap_or_default();
                    self.visit(ctx, depth + 1, base_path, None, "", *base);
                }
            }
            _ => {}
        }

        if parent.map_or(false, |p| graph.view(p).is_enum()) {
            return;
        }

        match &node.kind {
            NodeKind::Value { type_id } => {
                if !graph.is_foreign(*type_id) {
                    let type_path = graph.full_class_name(*type_id).unwrap_or_default();
                    self.visit(ctx, depth + 1, type_path, None, "", *type_id);
                }
            }
            NodeKind::Descriptor { getter, setter, .. } => {
                if let Some(getter) = getter {
                    self.visit(ctx, depth + 1, format!("{}.fget", path), Some(id), "fget", *getter);
                    self.visit_getter_type(ctx, depth + 1, *getter);
                }
                if let Some(setter) = setter {
                    self.visit(ctx, depth + 1, format!("{}.fset", path), Some(id), "fset", *setter);
                }
            }
            NodeKind::Module { .. } | NodeKind::Class { .. } => {
                for (member_key, member_id) in graph.members(id) {
                    if member_key == &self.options.sentinel_name && !self.options.force_show_everything {
                        continue;
                    }
                    if self.ignore_member(id, member_key, *member_id) {
                        continue;
                    }
                    self.record_alias(ctx, id, member_key, *member_id);
                    self.visit(
                        ctx,
                        depth + 1,
                        format!("{}.{}", path, member_key),
                        Some(id),
                        member_key,
                        *member_id,
                    );
                }
            }
            _ => {}
        }
    }

    /// Queue every non-foreign class named by any overload of a documented routine
    fn collect_signature_references(
        &self,
        ctx: &mut WalkContext,
        path: &str,
        name: Option<&str>,
        doc: Option<&str>,
    ) {
        let (Some(name), Some(doc)) = (name, doc) else {
            return;
        };

        for signature in self.parser.parse_all(name, doc) {
            for type_name in signature.referenced_types() {
                match self.graph.resolve_class(type_name) {
                    Some(class_id) if !self.graph.is_foreign(class_id) => {
                        if !ctx.visited.contains(&class_id) {
                            ctx.pending.push(class_id);
                        }
                    }
                    Some(_) => {}
                    None => debug!(
                        "Dropping from closure in {}: {}",
                        path,
                        BlocksmithError::UnresolvedTypeReference(type_name.to_string())
                    ),
                }
            }
        }
    }

    /// Visit the class a property getter is documented to return, when it names one
    fn visit_getter_type(&self, ctx: &mut WalkContext, depth: usize, getter: NodeId) {
        let Some(line) = self.graph.node(getter).doc.as_deref().and_then(|d| d.split('\n').next()) else {
            return;
        };
        let Some(var_type) = self.parser.getter_type(line) else {
            return;
        };
        if !var_type.contains('.') {
            return;
        }
        match self.graph.resolve_class(&var_type) {
            Some(class_id) if !self.graph.is_foreign(class_id) => {
                let class_path = self.graph.full_class_name(class_id).unwrap_or_default();
                self.visit(ctx, depth, class_path, None, "", class_id);
            }
            _ => debug!("Getter type {} is not a library class", var_type),
        }
    }

    fn ignore_member(&self, parent: NodeId, key: &str, member: NodeId) -> bool {
        if let Some(member_name) = self.graph.module_name(member) {
            let Some(parent_name) = self.graph.module_name(parent) else {
                return true;
            };
            return !member_name.starts_with(parent_name)
                || self.options.ignored_submodules.iter().any(|k| k == key);
        }

        if self.options.force_show_everything && key == self.options.sentinel_name {
            return false;
        }

        key.starts_with('_') && key != "__init__" && !starts_with_underscore_digit(key)
    }

    fn record_alias(&self, ctx: &mut WalkContext, scope: NodeId, key: &str, member: NodeId) {
        let graph = self.graph;
        let alias = Member::new(Some(graph.node(scope)), key, graph.node(member));
        if !is_type_alias(&alias) || graph.is_foreign(member) {
            return;
        }
        let Some(target) = graph.full_class_name(member) else {
            return;
        };
        let Some(scope_name) = self.public_name(scope) else {
            return;
        };

        ctx.aliases.insert(format!("{}.{}", scope_name, key), self.names.class_name(&target));
    }

    fn public_name(&self, id: NodeId) -> Option<String> {
        if let Some(module) = self.graph.module_name(id) {
            return Some(self.names.module_name(module));
        }
        self.graph.full_class_name(id).map(|c| self.names.class_name(&c))
    }

    fn subclass_edges(&self, classes: &[NodeId]) -> BTreeMap<String, Vec<String>> {
        let mut edges: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for class_id in classes {
            let chain: Vec<NodeId> = std::iter::once(*class_id)
                .chain(self.graph.bases(*class_id).iter().copied())
                .collect();

            for pair in chain.windows(2) {
                let (descendant, ancestor) = (pair[0], pair[1]);
                if self.graph.is_foreign(ancestor) {
                    break;
                }
                let (Some(ancestor_name), Some(descendant_name)) =
                    (self.public_name(ancestor), self.public_name(descendant))
                else {
                    continue;
                };
                let descendants = edges.entry(ancestor_name).or_default();
                if !descendants.contains(&descendant_name) {
                    descendants.push(descendant_name);
                }
            }
        }

        edges
    }
}
