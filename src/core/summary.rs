use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::Result;
use super::classifier::{classify, is_constructor, Capability, CapabilitySet, Member};
use super::graph::{HostGraph, Node, NodeId, NodeKind};
use super::resolver::TypeResolver;
use super::signature::{Signature, SignatureParser};
use super::walker::Model;

#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    /// SHA256 of the snapshot the model was walked from
    pub content_hash: String,
    pub generated_at: DateTime<Utc>,
    pub modules: Vec<ModuleSummary>,
    pub classes: Vec<ClassSummary>,
    pub aliases: BTreeMap<String, String>,
    pub subclasses: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleSummary {
    pub module_name: String,
    pub full_module_name: String,
    pub functions: Vec<FunctionSummary>,
    pub module_variables: Vec<VariableSummary>,
    pub enums: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassSummary {
    pub class_name: String,
    pub full_class_name: String,
    pub module_name: String,
    pub bases: Vec<String>,
    pub is_enum: bool,
    pub constructors: Vec<FunctionSummary>,
    pub instance_methods: Vec<FunctionSummary>,
    pub static_methods: Vec<FunctionSummary>,
    pub class_variables: Vec<VariableSummary>,
    pub instance_variables: Vec<VariableSummary>,
    pub enum_values: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionSummary {
    pub name: String,
    pub signatures: Vec<Signature>,
    pub tooltip: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariableSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: String,
    pub writable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

pub struct SummaryBuilder<'a> {
    graph: &'a HostGraph,
    model: &'a Model,
    resolver: &'a TypeResolver,
    parser: SignatureParser,
}

impl<'a> SummaryBuilder<'a> {
    pub fn new(graph: &'a HostGraph, model: &'a Model, resolver: &'a TypeResolver) -> Self {
        Self {
            graph,
            model,
            resolver,
            parser: SignatureParser::new(),
        }
    }

    pub fn build(&self, content_hash: String, generated_at: DateTime<Utc>) -> ModelSummary {
        let mut modules: Vec<ModuleSummary> = self.model.modules.iter()
            .map(|id| self.module_summary(*id))
            .collect();
        modules.sort_by(|a, b| a.full_module_name.cmp(&b.full_module_name));

        let classes = self.model.classes.iter()
            .map(|id| self.class_summary(*id))
            .collect();

        ModelSummary {
            content_hash,
            generated_at,
            modules,
            classes,
            aliases: self.resolver.aliases().clone(),
            subclasses: self.resolver.subclasses().clone(),
        }
    }

    fn module_summary(&self, module: NodeId) -> ModuleSummary {
        let full_module_name = self.graph.module_name(module).unwrap_or_default().to_string();
        let node = self.graph.node(module);

        let mut functions = Vec::new();
        let mut module_variables = Vec::new();
        let mut enums = Vec::new();

        for (key, value) in self.members(module) {
            let capabilities = classify(&Member::new(Some(node), key, value));
            if capabilities.contains(Capability::ModuleFunction) {
                functions.push(self.function_summary(key, value));
            }
            if let Some(variable) = self.data_variable(
                key,
                value,
                capabilities,
                (Capability::ModuleVariableGetter, Capability::ModuleVariableSetter),
            ) {
                module_variables.push(variable);
            }
            if capabilities.contains(Capability::EnumType) {
                enums.push(self.class_name(value.id));
            }
        }

        ModuleSummary {
            module_name: self.resolver.names().module_name(&full_module_name),
            full_module_name,
            functions,
            module_variables,
            enums,
        }
    }

    fn class_summary(&self, class: NodeId) -> ClassSummary {
        let node = self.graph.node(class);
        let full_class_name = self.graph.full_class_name(class).unwrap_or_default();

        let mut summary = ClassSummary {
            class_name: self.resolver.canonicalize(&full_class_name),
            full_class_name,
            module_name: self.resolver.names().module_name(self.graph.class_module(class).unwrap_or_default()),
            bases: self.graph.bases(class).iter().map(|b| self.class_name(*b)).collect(),
            is_enum: node.view.is_enum(),
            constructors: Vec::new(),
            instance_methods: Vec::new(),
            static_methods: Vec::new(),
            class_variables: Vec::new(),
            instance_variables: Vec::new(),
            enum_values: Vec::new(),
        };

        for (key, value) in self.members(class) {
            let member = Member::new(Some(node), key, value);
            let capabilities = classify(&member);

            if is_constructor(&member) {
                summary.constructors.push(self.function_summary(key, value));
            } else if capabilities.contains(Capability::InstanceMethod) && !key.starts_with('_') {
                summary.instance_methods.push(self.function_summary(key, value));
            } else if capabilities.contains(Capability::StaticMethod) && !key.starts_with('_') {
                summary.static_methods.push(self.function_summary(key, value));
            }

            if let Some(variable) = self.data_variable(
                key,
                value,
                capabilities,
                (Capability::ClassVariableGetter, Capability::ClassVariableSetter),
            ) {
                summary.class_variables.push(variable);
            }

            if capabilities.contains(Capability::InstanceVariableGetter) {
                if let Some(var_type) = self.property_type(value) {
                    summary.instance_variables.push(VariableSummary {
                        name: key.to_string(),
                        var_type,
                        writable: capabilities.contains(Capability::InstanceVariableSetter),
                        tooltip: value.doc.clone(),
                    });
                }
            }

            if summary.is_enum && value.view.data_type.as_ref().map_or(false, |t| t.id == class) {
                summary.enum_values.push(key.to_string());
            }
        }

        summary
    }

    fn members(&self, owner: NodeId) -> impl Iterator<Item = (&'a str, &'a Node)> + 'a {
        let graph = self.graph;
        graph.members(owner).iter().map(move |(key, id)| (key.as_str(), graph.node(*id)))
    }

    fn class_name(&self, class: NodeId) -> String {
        self.resolver.canonicalize(&self.graph.full_class_name(class).unwrap_or_default())
    }

    fn data_variable(
        &self,
        key: &str,
        value: &Node,
        capabilities: CapabilitySet,
        (read, write): (Capability, Capability),
    ) -> Option<VariableSummary> {
        if !capabilities.contains(read) {
            return None;
        }
        let data_type = value.view.data_type.as_ref()?;
        Some(VariableSummary {
            name: key.to_string(),
            var_type: self.class_name(data_type.id),
            writable: capabilities.contains(write),
            tooltip: None,
        })
    }

    fn property_type(&self, descriptor: &Node) -> Option<String> {
        let NodeKind::Descriptor { getter: Some(getter), .. } = &descriptor.kind else {
            return None;
        };
        let doc = self.graph.node(*getter).doc.as_deref()?;
        self.parser.getter_type(doc).map(|t| self.resolver.canonicalize(&t))
    }

    fn function_summary(&self, key: &str, routine: &Node) -> FunctionSummary {
        let name = routine.view.identity_name.as_deref().unwrap_or(key);
        let entries = routine.doc.as_deref()
            .map(|doc| self.parser.split_overloads(name, doc))
            .unwrap_or_default();

        FunctionSummary {
            name: key.to_string(),
            signatures: entries.iter()
                .filter_map(|entry| self.parser.parse(&entry.signature).ok())
                .collect(),
            tooltip: entries.first().map(|e| e.comment.clone()).unwrap_or_default(),
        }
    }
}

impl ModelSummary {
    /// Pretty JSON with object keys sorted and four-space indentation
    pub fn to_json(&self) -> Result<String> {
        let value = serde_json::to_value(self)?;
        let mut buffer = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
        value.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::config::{BoundaryConfig, NamingConfig, WalkConfig};
    use crate::core::graph::test_support::SnapshotBuilder;
    use crate::core::graph::RoutineFlavor;
    use crate::core::naming::NameMapper;
    use crate::core::walker::{WalkOptions, Walker};

    fn summarize(builder: &SnapshotBuilder) -> ModelSummary {
        let graph = HostGraph::from_snapshot(&builder.build(), &BoundaryConfig::default()).unwrap();
        let mut naming = NamingConfig::default();
        naming.module_renames.insert("wpilib._wpilib".to_string(), "wpilib".to_string());
        let names = NameMapper::new(&naming);
        let model = Walker::new(&graph, &names, WalkOptions::from(&WalkConfig::default()))
            .walk(graph.roots())
            .unwrap();
        let resolver = TypeResolver::new(names, &model);
        let generated_at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        SummaryBuilder::new(&graph, &model, &resolver).build("abc123".to_string(), generated_at)
    }

    fn sample() -> SnapshotBuilder {
        let mut b = SnapshotBuilder::new();
        let module = b.module("wpilib._wpilib");
        let float = b.class("builtins", "float", &[]);
        let speed = b.value(float);
        let base = b.class("wpilib._wpilib", "MotorController", &[]);
        let drive = b.class("wpilib._wpilib", "Drive", &[base]);
        let init = b.routine("__init__", RoutineFlavor::MethodDescriptor, Some("__init__(self: wpilib._wpilib.Drive) -> None\n"));
        let stop = b.routine("stop", RoutineFlavor::MethodDescriptor, Some("stop(self: wpilib._wpilib.Drive) -> None\n\nStop moving.\n"));
        let color = b.enum_class("wpilib._wpilib", "Color", &["kRed", "kBlue"]);
        b.bind(drive, "__init__", init);
        b.bind(drive, "stop", stop);
        b.bind(module, "Drive", drive);
        b.bind(module, "Color", color);
        b.bind(module, "speed", speed);
        b.root(module);
        b
    }

    #[test]
    fn test_summary_contents() {
        let summary = summarize(&sample());

        assert_eq!(summary.modules.len(), 1);
        let module = &summary.modules[0];
        assert_eq!(module.module_name, "wpilib");
        assert_eq!(module.full_module_name, "wpilib._wpilib");
        assert_eq!(module.enums, vec!["wpilib.Color"]);
        assert_eq!(module.module_variables[0].var_type, "float");
        assert!(module.module_variables[0].writable);

        let names: Vec<&str> = summary.classes.iter().map(|c| c.class_name.as_str()).collect();
        assert_eq!(names, vec!["wpilib.Color", "wpilib.Drive", "wpilib.MotorController"]);

        let color = &summary.classes[0];
        assert!(color.is_enum);
        assert_eq!(color.enum_values, vec!["kBlue", "kRed"]);
        assert!(color.constructors.is_empty());

        let drive = &summary.classes[1];
        assert_eq!(drive.bases, vec!["wpilib.MotorController"]);
        assert_eq!(drive.constructors.len(), 1);
        assert_eq!(drive.instance_methods[0].name, "stop");
        assert_eq!(drive.instance_methods[0].tooltip, "Stop moving.");
        assert_eq!(drive.instance_methods[0].signatures[0].parameters[0].type_name, "wpilib._wpilib.Drive");

        assert_eq!(summary.subclasses["wpilib.MotorController"], vec!["wpilib.Drive"]);
    }

    #[test]
    fn test_json_keys_are_sorted() {
        let json = summarize(&sample()).to_json().unwrap();

        assert!(json.starts_with("{\n    \"aliases\": {},\n    \"classes\": ["));
        assert!(json.contains("\"content_hash\": \"abc123\""));
        assert!(json.contains("\"generated_at\": \"2026-01-02T03:04:05Z\""));
        let classes = json.find("\"classes\"").unwrap();
        let modules = json.find("\"modules\"").unwrap();
        assert!(classes < modules);
    }
}
