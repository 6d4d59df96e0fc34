use std::collections::BTreeMap;

use super::snapshot::{GraphSnapshot, HostId, HostKind, HostNode, RoutineFlavor};

pub(crate) struct SnapshotBuilder {
    next_id: HostId,
    nodes: Vec<HostNode>,
    roots: Vec<HostId>,
}

impl SnapshotBuilder {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 1000,
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    fn add(&mut self, kind: HostKind, doc: Option<&str>) -> HostId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.push(HostNode {
            id,
            kind,
            doc: doc.map(|d| d.to_string()),
            members: BTreeMap::new(),
        });
        id
    }

    fn node_mut(&mut self, id: HostId) -> &mut HostNode {
        self.nodes.iter_mut()
            .find(|n| n.id == id)
            .expect("unknown host id in test snapshot")
    }

    pub(crate) fn module(&mut self, name: &str) -> HostId {
        self.add(HostKind::Module { name: name.to_string() }, None)
    }

    pub(crate) fn class(&mut self, module: &str, qualname: &str, bases: &[HostId]) -> HostId {
        self.add(HostKind::Class {
            module: module.to_string(),
            qualname: qualname.to_string(),
            bases: bases.to_vec(),
            foreign: false,
        }, None)
    }

    pub(crate) fn routine(&mut self, name: &str, flavor: RoutineFlavor, doc: Option<&str>) -> HostId {
        self.add(HostKind::Routine { name: name.to_string(), flavor }, doc)
    }

    pub(crate) fn property(&mut self, getter: Option<HostId>, setter: Option<HostId>, doc: Option<&str>) -> HostId {
        self.add(HostKind::Descriptor { property: true, getter, setter }, doc)
    }

    pub(crate) fn value(&mut self, type_id: HostId) -> HostId {
        self.add(HostKind::Value { type_id }, None)
    }

    pub(crate) fn opaque(&mut self) -> HostId {
        self.add(HostKind::Opaque, None)
    }

    /// A class with the full enum fingerprint and one value per name
    pub(crate) fn enum_class(&mut self, module: &str, qualname: &str, values: &[&str]) -> HostId {
        let full_name = format!("{}.{}", module, qualname);
        let enum_id = self.class(module, qualname, &[]);
        self.set_doc(enum_id, &format!("Members:\n\n{}", values.join("\n\n")));

        let init_doc = format!("__init__(self: {}, value: int) -> None\n", full_name);
        let init = self.routine("__init__", RoutineFlavor::MethodDescriptor, Some(&init_doc));
        let name_getter = self.routine("name", RoutineFlavor::MethodDescriptor, Some("name(self: object) -> str\n"));
        let name = self.property(Some(name_getter), None, Some("name(self: object) -> str\n"));
        let value_getter = self.routine("value", RoutineFlavor::MethodDescriptor, Some("(arg0: object) -> int\n"));
        let value = self.property(Some(value_getter), None, None);
        self.bind(enum_id, "__init__", init);
        self.bind(enum_id, "name", name);
        self.bind(enum_id, "value", value);

        for value_name in values {
            let v = self.value(enum_id);
            self.set_doc(v, &format!("{} value", value_name));
            self.bind(enum_id, value_name, v);
        }

        enum_id
    }

    pub(crate) fn bind(&mut self, owner: HostId, key: &str, member: HostId) -> &mut Self {
        self.node_mut(owner).members.insert(key.to_string(), member);
        self
    }

    pub(crate) fn set_doc(&mut self, id: HostId, doc: &str) -> &mut Self {
        self.node_mut(id).doc = Some(doc.to_string());
        self
    }

    pub(crate) fn mark_foreign(&mut self, id: HostId) -> &mut Self {
        if let HostKind::Class { foreign, .. } = &mut self.node_mut(id).kind {
            *foreign = true;
        }
        self
    }

    pub(crate) fn root(&mut self, id: HostId) -> &mut Self {
        self.roots.push(id);
        self
    }

    pub(crate) fn build(&self) -> GraphSnapshot {
        GraphSnapshot {
            roots: self.roots.clone(),
            nodes: self.nodes.clone(),
        }
    }
}
