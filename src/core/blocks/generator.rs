use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::GenerationConfig;
use crate::error::{BlocksmithError, Result};
use super::category::CategoryTree;
use super::descriptor::{
    Block, BlockType, EnumState, ExtraState, Fields, FunctionArg, FunctionState, Inputs,
    Registration, Socket, VariableKind, VariableState, FIELD_CLASS_NAME, FIELD_ENUM_CLASS_NAME,
    FIELD_ENUM_VALUE, FIELD_FUNCTION_NAME, FIELD_MODULE_NAME, FIELD_MODULE_OR_CLASS_NAME,
    FIELD_VARIABLE_NAME, IMPORT_CATEGORY,
};
use crate::core::classifier::{classify, is_constructor, is_function, Capability, Member};
use crate::core::diagnostics::Diagnostics;
use crate::core::graph::{HostGraph, Node, NodeId, NodeKind};
use crate::core::naming::{self_arg_name, simple_name};
use crate::core::resolver::TypeResolver;
use crate::core::signature::{Parameter, ParameterKind, Signature, SignatureParser, NONE_TYPE};
use crate::core::walker::Model;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Module,
    Class,
}

/// Generated content for one public module or class
#[derive(Debug, Clone)]
pub struct Unit {
    pub kind: UnitKind,

    /// Public dotted name of the module or class
    pub key: String,

    pub imports: BTreeSet<String>,
    pub registrations: Vec<Registration>,
    pub blocks: Vec<Block>,
}

impl Unit {
    pub fn new(kind: UnitKind, key: String) -> Self {
        let mut imports = BTreeSet::new();
        imports.insert(IMPORT_CATEGORY.to_string());
        Self {
            kind,
            key,
            imports,
            registrations: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn file_stem(&self) -> String {
        match self.kind {
            UnitKind::Module => format!("module_{}", self.key),
            UnitKind::Class => format!("class_{}", self.key),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.ts", self.file_stem())
    }

    /// Identifier the aggregation files import this unit as
    pub fn ts_module(&self) -> String {
        self.key.replace('.', "_")
    }

    /// Visible category name
    pub fn category_name(&self) -> &str {
        simple_name(&self.key)
    }

    fn register(&mut self, registration: Registration) {
        self.imports.insert(registration.import_line().to_string());
        self.registrations.push(registration);
    }
}

#[derive(Debug)]
pub struct GeneratedBlocks {
    /// Sorted by key
    pub units: Vec<Unit>,
    pub categories: CategoryTree,
    pub diagnostics: Diagnostics,
}

/// Variables of one declared type within a unit
struct VariableGroup {
    var_type: String,
    getters: Vec<String>,
    getter_tooltips: Vec<Option<String>>,
    setters: Vec<String>,
    setter_tooltips: Vec<Option<String>>,
}

/// Where a routine's blocks are attributed
#[derive(Clone, Copy)]
enum Owner<'a> {
    Module { name: &'a str },
    Class { id: NodeId },
}

/// Block type, fields and argument list of one callable signature
struct Call {
    block_type: BlockType,
    fields: Fields,
    parameters: Vec<Parameter>,
    return_type: String,
    import_module: String,
}

pub struct BlockGenerator<'a> {
    graph: &'a HostGraph,
    model: &'a Model,
    resolver: &'a TypeResolver,
    config: &'a GenerationConfig,
    parser: SignatureParser,
}

impl<'a> BlockGenerator<'a> {
    pub fn new(
        graph: &'a HostGraph,
        model: &'a Model,
        resolver: &'a TypeResolver,
        config: &'a GenerationConfig,
    ) -> Self {
        Self {
            graph,
            model,
            resolver,
            config,
            parser: SignatureParser::new(),
        }
    }

    pub fn generate(&self) -> Result<GeneratedBlocks> {
        self.resolver.validate()?;

        let mut diagnostics = Diagnostics::new();
        let mut units: BTreeMap<String, Unit> = BTreeMap::new();

        for module in self.public_modules() {
            let key = self.module_public_name(module);
            if self.is_excluded(&key) {
                debug!("Skipping excluded module {}", key);
                continue;
            }
            let unit = self.module_unit(module, key, &mut diagnostics)?;
            insert_unit(&mut units, unit);
        }

        for class in self.public_classes() {
            if self.graph.view(class).is_enum() {
                continue;
            }
            if self.is_excluded(&self.class_import_module(class)) {
                debug!("Skipping class {} of an excluded module", self.class_public_name(class));
                continue;
            }
            let unit = self.class_unit(class, &mut diagnostics)?;
            insert_unit(&mut units, unit);
        }

        let keys: BTreeSet<String> = units.keys().cloned().collect();
        let categories = CategoryTree::build(&keys);
        let units: Vec<Unit> = units.into_values().collect();

        info!(
            "🧱 Generated {} units with {} blocks ({} warnings)",
            units.len(),
            units.iter().map(|u| u.blocks.len()).sum::<usize>(),
            diagnostics.len()
        );

        Ok(GeneratedBlocks {
            units,
            categories,
            diagnostics,
        })
    }

    /// Discovered modules without a private segment, by full name
    pub fn public_modules(&self) -> Vec<NodeId> {
        let mut modules: Vec<(String, NodeId)> = self.model.modules.iter()
            .filter_map(|id| self.graph.module_name(*id).map(|name| (name.to_string(), *id)))
            .filter(|(name, _)| !name.contains("._"))
            .collect();
        modules.sort();
        modules.into_iter().map(|(_, id)| id).collect()
    }

    /// Public classes plus their non-foreign ancestors, by full name
    pub fn public_classes(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut classes = Vec::new();

        for class in &self.model.classes {
            if self.class_public_name(*class).contains("._") {
                continue;
            }
            let chain = std::iter::once(*class).chain(self.graph.bases(*class).iter().copied());
            for ancestor in chain {
                if self.graph.is_foreign(ancestor) {
                    break;
                }
                if seen.insert(ancestor) {
                    classes.push((self.graph.full_class_name(ancestor).unwrap_or_default(), ancestor));
                }
            }
        }

        classes.sort();
        classes.into_iter().map(|(_, id)| id).collect()
    }

    fn is_excluded(&self, public_module: &str) -> bool {
        self.config.excluded_prefixes.iter().any(|p| public_module.starts_with(p.as_str()))
    }

    fn module_public_name(&self, module: NodeId) -> String {
        self.resolver.names().module_name(self.graph.module_name(module).unwrap_or_default())
    }

    fn class_public_name(&self, class: NodeId) -> String {
        self.resolver.canonicalize(&self.graph.full_class_name(class).unwrap_or_default())
    }

    fn class_import_module(&self, class: NodeId) -> String {
        self.resolver.names().module_name(self.graph.class_module(class).unwrap_or_default())
    }

    fn member_nodes(&self, owner: NodeId) -> Vec<(&'a str, &'a Node)> {
        let graph = self.graph;
        graph.members(owner).iter()
            .map(|(key, id)| (key.as_str(), graph.node(*id)))
            .collect()
    }

    fn module_unit(&self, module: NodeId, key: String, diagnostics: &mut Diagnostics) -> Result<Unit> {
        let mut unit = Unit::new(UnitKind::Module, key.clone());
        let node = self.graph.node(module);
        let members = self.member_nodes(module);

        let groups = self.variable_groups(
            node,
            &members,
            (Capability::ModuleVariableGetter, Capability::ModuleVariableSetter),
            diagnostics,
        );
        for group in groups {
            self.variable_blocks(&mut unit, VariableKind::Module, &key, &key, group, None)?;
        }

        for (name, value) in &members {
            if !is_function(&Member::new(Some(node), name, value)) {
                continue;
            }
            let subject = format!("{}.{}", key, name);
            self.function_blocks(&mut unit, &subject, name, value, Owner::Module { name: &key }, diagnostics)?;
        }

        let mut enums_seen = HashSet::new();
        for (_, value) in &members {
            if value.view.is_enum() && enums_seen.insert(value.id) {
                self.enum_blocks(&mut unit, value.id)?;
            }
        }

        Ok(unit)
    }

    fn class_unit(&self, class: NodeId, diagnostics: &mut Diagnostics) -> Result<Unit> {
        let key = self.class_public_name(class);
        let import_module = self.class_import_module(class);
        let mut unit = Unit::new(UnitKind::Class, key.clone());
        let node = self.graph.node(class);
        let members = self.member_nodes(class);

        let groups = self.variable_groups(
            node,
            &members,
            (Capability::ClassVariableGetter, Capability::ClassVariableSetter),
            diagnostics,
        );
        for group in groups {
            self.variable_blocks(&mut unit, VariableKind::Class, &key, &import_module, group, None)?;
        }

        let groups = self.variable_groups(
            node,
            &members,
            (Capability::InstanceVariableGetter, Capability::InstanceVariableSetter),
            diagnostics,
        );
        let self_info = (self_arg_name(&key), key.clone());
        for group in groups {
            self.variable_blocks(&mut unit, VariableKind::Instance, &key, "", group, Some(&self_info))?;
        }

        for (name, value) in &members {
            if !is_constructor(&Member::new(Some(node), name, value)) {
                continue;
            }
            let subject = format!("{}.{}", key, name);
            self.function_blocks(&mut unit, &subject, name, value, Owner::Class { id: class }, diagnostics)?;
        }

        for (name, value) in &members {
            if !is_function(&Member::new(Some(node), name, value)) {
                continue;
            }
            let subject = format!("{}.{}", key, name);
            self.function_blocks(&mut unit, &subject, name, value, Owner::Class { id: class }, diagnostics)?;
        }

        let mut enums_seen = HashSet::new();
        for (_, value) in &members {
            if value.view.is_enum()
                && self.class_public_name(value.id).starts_with(&key)
                && enums_seen.insert(value.id)
            {
                self.enum_blocks(&mut unit, value.id)?;
            }
        }

        Ok(unit)
    }

    /// Readable members of one variable kind grouped by declared type, in
    /// order of first appearance; names stay sorted
    fn variable_groups(
        &self,
        parent: &Node,
        members: &[(&str, &Node)],
        (read, write): (Capability, Capability),
        diagnostics: &mut Diagnostics,
    ) -> Vec<VariableGroup> {
        let instance = read == Capability::InstanceVariableGetter;
        let mut groups: Vec<VariableGroup> = Vec::new();

        for (name, value) in members {
            let capabilities = classify(&Member::new(Some(parent), name, value));
            if !capabilities.contains(read) {
                continue;
            }

            let var_type = if instance {
                match self.property_type(value) {
                    Some(var_type) => var_type,
                    None => {
                        let subject = format!("{}.{}", self.graph.display_name(parent.id), name);
                        diagnostics.push(
                            subject.clone(),
                            BlocksmithError::Parse(format!("getter of {} has no typed signature", subject)),
                        );
                        continue;
                    }
                }
            } else {
                match value.view.data_type.as_ref().and_then(|t| self.graph.full_class_name(t.id)) {
                    Some(full) => self.resolver.canonicalize(&full),
                    None => continue,
                }
            };

            let index = match groups.iter().position(|g| g.var_type == var_type) {
                Some(index) => index,
                None => {
                    groups.push(VariableGroup {
                        var_type,
                        getters: Vec::new(),
                        getter_tooltips: Vec::new(),
                        setters: Vec::new(),
                        setter_tooltips: Vec::new(),
                    });
                    groups.len() - 1
                }
            };

            let group = &mut groups[index];
            group.getters.push(name.to_string());
            if instance {
                group.getter_tooltips.push(value.doc.clone());
            }
            if capabilities.contains(write) {
                group.setters.push(name.to_string());
                if instance {
                    group.setter_tooltips.push(value.doc.clone());
                }
            }
        }

        groups
    }

    /// Declared type from a property getter's signature
    fn property_type(&self, descriptor: &Node) -> Option<String> {
        let NodeKind::Descriptor { getter: Some(getter), .. } = &descriptor.kind else {
            return None;
        };
        let doc = self.graph.node(*getter).doc.as_deref()?;
        self.parser.getter_type(doc).map(|t| self.resolver.canonicalize(&t))
    }

    fn variable_blocks(
        &self,
        unit: &mut Unit,
        kind: VariableKind,
        owner: &str,
        import_module: &str,
        group: VariableGroup,
        self_info: Option<&(String, String)>,
    ) -> Result<()> {
        unit.register(Registration::VariableGetter {
            kind,
            owner: owner.to_string(),
            var_type: group.var_type.clone(),
            names: group.getters.clone(),
            tooltips: group.getter_tooltips,
        });
        if !group.setters.is_empty() {
            unit.register(Registration::VariableSetter {
                kind,
                owner: owner.to_string(),
                var_type: group.var_type.clone(),
                names: group.setters.clone(),
                tooltips: group.setter_tooltips,
            });
        }

        let state = VariableState {
            var_kind: kind,
            module_or_class_name: owner.to_string(),
            var_type: group.var_type.clone(),
            import_module: import_module.to_string(),
            self_label: self_info.map(|(label, _)| label.clone()),
            self_type: self_info.map(|(_, self_type)| self_type.clone()),
        };

        let self_socket = match self_info {
            Some((_, self_type)) => self.var_name_for_type(self_type)?.map(|v| Block::variable_getter(&v)),
            None => None,
        };
        let value_socket = self.var_name_for_type(&group.var_type)?.map(|v| Block::variable_getter(&v));

        for name in &group.getters {
            let fields = Fields::new()
                .text(FIELD_MODULE_OR_CLASS_NAME, owner)
                .text(FIELD_VARIABLE_NAME, name.as_str());

            let mut inputs = Inputs::default();
            if let Some(socket) = &self_socket {
                inputs.insert("SELF", socket.clone());
            }
            unit.blocks.push(Block::new(
                BlockType::GetVariable,
                ExtraState::Variable(state.clone()),
                fields.clone(),
                inputs,
            ));

            if group.setters.contains(name) {
                let mut inputs = Inputs::default();
                if let Some(socket) = &value_socket {
                    inputs.insert("VALUE", socket.clone());
                }
                if let Some(socket) = &self_socket {
                    inputs.insert("SELF", socket.clone());
                }
                unit.blocks.push(Block::new(
                    BlockType::SetVariable,
                    ExtraState::Variable(state.clone()),
                    fields,
                    inputs,
                ));
            }
        }

        Ok(())
    }

    /// One block per documented signature of a routine
    fn function_blocks(
        &self,
        unit: &mut Unit,
        subject: &str,
        key: &str,
        routine: &Node,
        owner: Owner<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let Some(doc) = routine.doc.as_deref() else {
            diagnostics.push(subject, BlocksmithError::MissingDocumentation(subject.to_string()));
            return Ok(());
        };

        let name = routine.view.identity_name.as_deref().unwrap_or(key);
        let entries = self.parser.split_overloads(name, doc);
        if entries.is_empty() {
            let first_line = doc.split('\n').next().unwrap_or_default();
            diagnostics.push(subject, BlocksmithError::Parse(first_line.to_string()));
            return Ok(());
        }

        for entry in entries {
            let signature = match self.parser.parse(&entry.signature) {
                Ok(signature) => signature,
                Err(e) => {
                    diagnostics.push(subject, e);
                    continue;
                }
            };
            if signature.function_name != key {
                diagnostics.push(subject, BlocksmithError::SignatureNameMismatch {
                    expected: key.to_string(),
                    found: signature.function_name.clone(),
                });
                continue;
            }

            let call = match owner {
                Owner::Module { name } => self.module_call(name, signature),
                Owner::Class { id } => self.class_call(id, signature),
            };
            match self.function_block(call, entry.comment, subject, diagnostics) {
                Ok(block) => unit.blocks.push(block),
                Err(e) if !e.is_fatal() => diagnostics.push(subject, e),
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    fn module_call(&self, module: &str, signature: Signature) -> Call {
        Call {
            block_type: BlockType::ModuleFunction,
            fields: Fields::new()
                .text(FIELD_MODULE_NAME, module)
                .text(FIELD_FUNCTION_NAME, signature.function_name.as_str()),
            parameters: signature.parameters,
            return_type: signature.return_type,
            import_module: module.to_string(),
        }
    }

    /// Constructor, instance method or static method call.
    ///
    /// A leading `self` typed as another class marks an inherited routine: the
    /// block is attributed to the declaring class and the receiver is named
    /// after it.
    fn class_call(&self, class: NodeId, signature: Signature) -> Call {
        let class_name = self.class_public_name(class);
        let full_class_name = self.graph.full_class_name(class).unwrap_or_default();
        let is_init = signature.function_name == "__init__";

        let Signature { function_name, mut parameters, mut return_type } = signature;
        let mut declaring_class = class_name.clone();
        let mut found_self = false;

        if let Some(first) = parameters.first_mut() {
            if first.name == "self" && first.kind == ParameterKind::Regular {
                found_self = true;
                if first.type_name != full_class_name {
                    declaring_class = self.graph.resolve_class(&first.type_name)
                        .and_then(|c| self.graph.full_class_name(c))
                        .map(|full| self.resolver.canonicalize(&full))
                        .unwrap_or_else(|| self.resolver.canonicalize(&first.type_name));
                    first.name = self_arg_name(&declaring_class);
                } else {
                    first.name = self_arg_name(&class_name);
                }
                if is_init {
                    return_type = first.type_name.clone();
                }
            }
        }

        if is_init {
            if !parameters.is_empty() {
                parameters.remove(0);
            }
            Call {
                block_type: BlockType::Constructor,
                fields: Fields::new().text(FIELD_CLASS_NAME, declaring_class),
                parameters,
                return_type,
                import_module: self.class_import_module(class),
            }
        } else if found_self {
            Call {
                block_type: BlockType::InstanceMethod,
                fields: Fields::new()
                    .text(FIELD_CLASS_NAME, declaring_class)
                    .text(FIELD_FUNCTION_NAME, function_name),
                parameters,
                return_type,
                import_module: String::new(),
            }
        } else {
            Call {
                block_type: BlockType::StaticMethod,
                fields: Fields::new()
                    .text(FIELD_CLASS_NAME, declaring_class)
                    .text(FIELD_FUNCTION_NAME, function_name),
                parameters,
                return_type,
                import_module: self.class_import_module(class),
            }
        }
    }

    fn function_block(
        &self,
        call: Call,
        tooltip: String,
        subject: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<Block> {
        let mut inputs = Inputs::default();
        let mut args = Vec::with_capacity(call.parameters.len());

        for (index, parameter) in call.parameters.iter().enumerate() {
            let arg_type = match parameter.kind {
                ParameterKind::Regular => self.resolver.canonicalize(&parameter.type_name),
                ParameterKind::VarPositional => "tuple".to_string(),
                ParameterKind::VarKeyword => "dict".to_string(),
            };
            let socket_name = format!("ARG{}", index);

            if let Some(var_name) = self.var_name_for_type(&arg_type)? {
                inputs.insert(socket_name, Block::variable_getter(&var_name));
            } else if let Some(default) = &parameter.default {
                match literal_socket(&arg_type, default) {
                    Ok(Some(socket)) => inputs.insert(socket_name, socket),
                    Ok(None) => {}
                    Err(e) => diagnostics.push(subject, e),
                }
            }

            args.push(FunctionArg {
                name: parameter.name.clone(),
                arg_type,
                default_value: parameter.default.clone(),
            });
        }

        let return_type = if call.return_type == NONE_TYPE {
            call.return_type
        } else {
            self.resolver.canonicalize(&call.return_type)
        };

        let result_variable = if return_type.is_empty() || return_type == NONE_TYPE {
            None
        } else {
            self.var_name_for_type(&return_type)?
        };

        let block = Block::new(
            call.block_type,
            ExtraState::Function(FunctionState {
                tooltip,
                return_type,
                args,
                import_module: call.import_module,
            }),
            call.fields,
            inputs,
        );

        Ok(match result_variable {
            Some(var_name) => Block::variable_setter(&var_name, block),
            None => block,
        })
    }

    fn enum_blocks(&self, unit: &mut Unit, enum_id: NodeId) -> Result<()> {
        let enum_type = self.class_public_name(enum_id);
        let import_module = self.class_import_module(enum_id);

        let mut values = Vec::new();
        let mut tooltip = String::new();
        for (key, member) in self.graph.members(enum_id) {
            let view = self.graph.view(*member);
            if view.data_type.as_ref().map_or(false, |t| t.id == enum_id) {
                values.push(key.clone());
                if tooltip.is_empty() {
                    tooltip = view.doc.clone().unwrap_or_default();
                }
            }
        }
        values.sort();

        unit.register(Registration::Enum {
            enum_type: enum_type.clone(),
            values: values.clone(),
            tooltip,
        });

        for value in values {
            unit.blocks.push(Block::new(
                BlockType::EnumValue,
                ExtraState::Enum(EnumState {
                    enum_type: enum_type.clone(),
                    import_module: import_module.clone(),
                }),
                Fields::new()
                    .text(FIELD_ENUM_CLASS_NAME, enum_type.as_str())
                    .text(FIELD_ENUM_VALUE, value),
                Inputs::default(),
            ));
        }

        Ok(())
    }

    /// Name of the workspace variable that holds values of a type, if any
    pub fn var_name_for_type(&self, type_name: &str) -> Result<Option<String>> {
        let resolved = self.resolver.resolve_alias(type_name)?;
        Ok(variable_name(&resolved))
    }
}

/// `tuple*`, `dict*` and `list*` shapes and dotted class names produce variables
pub fn variable_name(type_name: &str) -> Option<String> {
    if type_name.starts_with("tuple") {
        return Some("myTuple".to_string());
    }
    if type_name.starts_with("dict") {
        return Some("myDict".to_string());
    }
    if type_name.starts_with("list") {
        return Some("myList".to_string());
    }
    type_name.rfind('.').map(|dot| format!("my{}", &type_name[dot + 1..]))
}

/// Literal block for a textual default of a primitive type
pub fn literal_socket(arg_type: &str, default: &str) -> Result<Option<Socket>> {
    let invalid = |expected: &str| BlocksmithError::InvalidDefaultValue {
        expected: expected.to_string(),
        value: default.to_string(),
    };

    match arg_type {
        "int" => default.trim().parse::<i128>()
            .map(|v| Some(Block::number(v as f64)))
            .map_err(|_| invalid("integer")),
        "float" | "double" => default.trim().parse::<f64>()
            .map(|v| Some(Block::number(v)))
            .map_err(|_| invalid("numeric")),
        "str" if default == "None" => Ok(None),
        "str" => Ok(Some(Block::text(default))),
        "bool" if default == "True" || default == "False" => Ok(Some(Block::boolean(default))),
        "bool" => Err(invalid("boolean")),
        _ => Ok(None),
    }
}

fn insert_unit(units: &mut BTreeMap<String, Unit>, unit: Unit) {
    if units.contains_key(&unit.key) {
        debug!("Unit {} already generated", unit.key);
        return;
    }
    units.insert(unit.key.clone(), unit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoundaryConfig, NamingConfig, WalkConfig};
    use crate::core::blocks::descriptor::FieldValue;
    use crate::core::graph::test_support::SnapshotBuilder;
    use crate::core::graph::RoutineFlavor;
    use crate::core::naming::NameMapper;
    use crate::core::walker::{WalkOptions, Walker};

    fn generate(builder: &SnapshotBuilder, config: GenerationConfig) -> GeneratedBlocks {
        let graph = HostGraph::from_snapshot(&builder.build(), &BoundaryConfig::default()).unwrap();
        let names = NameMapper::new(&NamingConfig::default());
        let model = Walker::new(&graph, &names, WalkOptions::from(&WalkConfig::default()))
            .walk(graph.roots())
            .unwrap();
        let resolver = TypeResolver::new(names.clone(), &model);
        BlockGenerator::new(&graph, &model, &resolver, &config).generate().unwrap()
    }

    fn unit<'u>(generated: &'u GeneratedBlocks, key: &str) -> &'u Unit {
        generated.units.iter().find(|u| u.key == key).unwrap()
    }

    fn function_state(block: &Block) -> &FunctionState {
        match &block.extra_state {
            Some(ExtraState::Function(state)) => state,
            other => panic!("not a function block: {:?}", other),
        }
    }

    fn text_field<'b>(block: &'b Block, name: &str) -> &'b str {
        match block.fields.get(name) {
            Some(FieldValue::Text(text)) => text,
            other => panic!("field {} missing: {:?}", name, other),
        }
    }

    #[test]
    fn test_enum_values_are_sorted() {
        let mut b = SnapshotBuilder::new();
        let module = b.module("wpilib");
        let color = b.enum_class("wpilib", "Color", &["kRed", "kBlue"]);
        b.bind(module, "Color", color);
        b.root(module);

        let generated = generate(&b, GenerationConfig::default());

        // the enum itself gets no unit
        assert_eq!(generated.units.len(), 1);
        let module_unit = unit(&generated, "wpilib");
        let values: Vec<&str> = module_unit.blocks.iter()
            .map(|block| text_field(block, FIELD_ENUM_VALUE))
            .collect();
        assert_eq!(values, vec!["kBlue", "kRed"]);
        assert_eq!(
            module_unit.registrations,
            vec![Registration::Enum {
                enum_type: "wpilib.Color".to_string(),
                values: vec!["kBlue".to_string(), "kRed".to_string()],
                tooltip: "kBlue value".to_string(),
            }]
        );
    }

    #[test]
    fn test_module_function_sockets_and_defaults() {
        let mut b = SnapshotBuilder::new();
        let module = b.module("wpilib");
        let pose = b.class("wpilib", "Pose", &[]);
        b.bind(module, "Pose", pose);
        let drive = b.routine(
            "drive",
            RoutineFlavor::Builtin,
            Some("drive(pose: wpilib.Pose, name: str = 'left', on: bool = True, count: int = many, speed: float = 0.5) -> wpilib.Pose\n\nDrive somewhere.\n"),
        );
        b.bind(module, "drive", drive);
        b.root(module);

        let generated = generate(&b, GenerationConfig::default());
        let module_unit = unit(&generated, "wpilib");
        assert_eq!(module_unit.blocks.len(), 1);

        // A class-typed result is assigned to a variable
        let wrapper = &module_unit.blocks[0];
        assert_eq!(wrapper.block_type, BlockType::VariablesSet);
        assert_eq!(wrapper.fields.get(FIELD_VARIABLE_NAME), Some(&FieldValue::Variable { name: "myPose".to_string() }));
        let Some(Socket::Block(call)) = wrapper.inputs.get("VALUE") else {
            panic!("missing VALUE socket");
        };

        assert_eq!(call.block_type, BlockType::ModuleFunction);
        assert_eq!(text_field(call, FIELD_MODULE_NAME), "wpilib");
        assert_eq!(text_field(call, FIELD_FUNCTION_NAME), "drive");
        let state = function_state(call);
        assert_eq!(state.tooltip, "Drive somewhere.");
        assert_eq!(state.return_type, "wpilib.Pose");
        assert_eq!(state.args.len(), 5);

        assert_eq!(call.inputs.get("ARG0"), Some(&Block::variable_getter("myPose")));
        assert_eq!(call.inputs.get("ARG1"), Some(&Block::text("'left'")));
        assert_eq!(call.inputs.get("ARG2"), Some(&Block::boolean("True")));
        assert_eq!(call.inputs.get("ARG3"), None);
        assert_eq!(call.inputs.get("ARG4"), Some(&Block::number(0.5)));

        let warnings = generated.diagnostics.summaries();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].subject, "wpilib.drive");
        assert!(warnings[0].message.contains("many"));
    }

    #[test]
    fn test_constructors_and_inherited_methods() {
        let mut b = SnapshotBuilder::new();
        let module = b.module("wpilib");
        let base = b.class("wpilib", "MotorController", &[]);
        let drive = b.class("wpilib", "Drive", &[base]);
        let init = b.routine("__init__", RoutineFlavor::MethodDescriptor, Some("__init__(self: wpilib.Drive, channel: int = 0) -> None\n"));
        let stop = b.routine("stop", RoutineFlavor::MethodDescriptor, Some("stop(self: wpilib.MotorController) -> None\n\nStop.\n"));
        let make = b.routine("make", RoutineFlavor::Builtin, Some("make() -> None\n"));
        b.bind(drive, "__init__", init);
        b.bind(drive, "stop", stop);
        b.bind(drive, "make", make);
        b.bind(base, "stop", stop);
        b.bind(module, "Drive", drive);
        b.root(module);

        let generated = generate(&b, GenerationConfig::default());
        let keys: Vec<&str> = generated.units.iter().map(|u| u.key.as_str()).collect();
        assert_eq!(keys, vec!["wpilib", "wpilib.Drive", "wpilib.MotorController"]);

        let drive_unit = unit(&generated, "wpilib.Drive");
        assert_eq!(drive_unit.blocks.len(), 3);

        let constructor = &drive_unit.blocks[0];
        assert_eq!(constructor.block_type, BlockType::VariablesSet);
        let Some(Socket::Block(constructor)) = constructor.inputs.get("VALUE") else {
            panic!("constructor result not assigned");
        };
        assert_eq!(constructor.block_type, BlockType::Constructor);
        assert_eq!(text_field(constructor, FIELD_CLASS_NAME), "wpilib.Drive");
        let state = function_state(constructor);
        assert_eq!(state.return_type, "wpilib.Drive");
        assert_eq!(state.args.len(), 1);
        assert_eq!(state.args[0].name, "channel");
        assert_eq!(constructor.inputs.get("ARG0"), Some(&Block::number(0.0)));

        let make = &drive_unit.blocks[1];
        assert_eq!(make.block_type, BlockType::StaticMethod);
        assert_eq!(function_state(make).import_module, "wpilib");

        let inherited = &drive_unit.blocks[2];
        assert_eq!(inherited.block_type, BlockType::InstanceMethod);
        assert_eq!(text_field(inherited, FIELD_CLASS_NAME), "wpilib.MotorController");
        let state = function_state(inherited);
        assert_eq!(state.args[0].name, "motorController");
        assert_eq!(state.import_module, "");
        assert_eq!(inherited.inputs.get("ARG0"), Some(&Block::variable_getter("myMotorController")));
    }

    #[test]
    fn test_variables_group_by_type() {
        let mut b = SnapshotBuilder::new();
        let module = b.module("wpilib");
        let float = b.class("builtins", "float", &[]);
        let int = b.class("builtins", "int", &[]);
        let drive = b.class("wpilib", "Drive", &[]);
        for (name, class) in [("kPeriod", float), ("speed", float), ("count", int)] {
            let v = b.value(class);
            b.bind(module, name, v);
        }
        let getter = b.routine("heading", RoutineFlavor::MethodDescriptor, Some("(self: wpilib.Drive) -> float\n"));
        let setter = b.routine("heading", RoutineFlavor::MethodDescriptor, None);
        let heading = b.property(Some(getter), Some(setter), Some("Heading in degrees."));
        b.bind(drive, "heading", heading);
        b.bind(module, "Drive", drive);
        b.root(module);

        let generated = generate(&b, GenerationConfig::default());

        let module_unit = unit(&generated, "wpilib");
        let lines: Vec<String> = module_unit.registrations.iter().map(|r| r.render().unwrap()).collect();
        assert_eq!(lines, vec![
            r#"getPythonVariable.initializeModuleVariableGetter("wpilib", "int", ["count"], []);"#,
            r#"setPythonVariable.initializeModuleVariableSetter("wpilib", "int", ["count"], []);"#,
            r#"getPythonVariable.initializeModuleVariableGetter("wpilib", "float", ["kPeriod","speed"], []);"#,
            r#"setPythonVariable.initializeModuleVariableSetter("wpilib", "float", ["speed"], []);"#,
        ]);
        // getter + setter for count and speed, getter only for kPeriod
        assert_eq!(module_unit.blocks.len(), 5);
        assert_eq!(module_unit.imports.len(), 3);

        let drive_unit = unit(&generated, "wpilib.Drive");
        assert_eq!(drive_unit.registrations[0], Registration::VariableGetter {
            kind: VariableKind::Instance,
            owner: "wpilib.Drive".to_string(),
            var_type: "float".to_string(),
            names: vec!["heading".to_string()],
            tooltips: vec![Some("Heading in degrees.".to_string())],
        });
        let setter_block = &drive_unit.blocks[1];
        assert_eq!(setter_block.block_type, BlockType::SetVariable);
        assert_eq!(setter_block.inputs.get("SELF"), Some(&Block::variable_getter("myDrive")));
        assert_eq!(setter_block.inputs.get("VALUE"), None);
    }

    #[test]
    fn test_routine_warnings_do_not_stop_generation() {
        let mut b = SnapshotBuilder::new();
        let module = b.module("wpilib");
        let undocumented = b.routine("undocumented", RoutineFlavor::Builtin, None);
        let prose = b.routine("prose", RoutineFlavor::Builtin, Some("Just words.\n"));
        let renamed = b.routine("renamed", RoutineFlavor::Builtin, Some("original() -> None\n"));
        b.bind(module, "undocumented", undocumented);
        b.bind(module, "prose", prose);
        b.bind(module, "renamed", renamed);
        b.root(module);

        let generated = generate(&b, GenerationConfig::default());

        assert!(unit(&generated, "wpilib").blocks.is_empty());
        let errors: Vec<&BlocksmithError> = generated.diagnostics.iter().map(|d| &d.error).collect();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], BlocksmithError::Parse(_)));
        assert!(matches!(errors[1], BlocksmithError::SignatureNameMismatch { .. }));
        assert!(matches!(errors[2], BlocksmithError::MissingDocumentation(_)));
    }

    #[test]
    fn test_private_and_excluded_units() {
        let mut b = SnapshotBuilder::new();
        let module = b.module("wpilib");
        let private = b.module("wpilib._impl_detail");
        let util = b.module("wpilib.util");
        b.bind(module, "_impl_detail", private);
        b.bind(module, "util", util);
        b.root(module).root(private);

        let config = GenerationConfig {
            excluded_prefixes: vec!["wpilib.util".to_string()],
        };
        let generated = generate(&b, config);
        let keys: Vec<&str> = generated.units.iter().map(|u| u.key.as_str()).collect();
        assert_eq!(keys, vec!["wpilib"]);
        assert_eq!(generated.categories.roots[0].unit.as_deref(), Some("wpilib"));
    }

    #[test]
    fn test_variable_names_for_types() {
        assert_eq!(variable_name("tuple[float, float]").as_deref(), Some("myTuple"));
        assert_eq!(variable_name("dict[str, int]").as_deref(), Some("myDict"));
        assert_eq!(variable_name("list[wpilib.Pose]").as_deref(), Some("myList"));
        assert_eq!(variable_name("wpimath.geometry.Pose2d").as_deref(), Some("myPose2d"));
        assert_eq!(variable_name("float"), None);
    }

    #[test]
    fn test_literal_sockets() {
        assert_eq!(literal_socket("int", "3").unwrap(), Some(Block::number(3.0)));
        assert_eq!(
            literal_socket("int", "18446744073709551615").unwrap(),
            Some(Block::number(18446744073709551615.0))
        );
        assert!(matches!(
            literal_socket("int", "0.5"),
            Err(BlocksmithError::InvalidDefaultValue { .. })
        ));
        assert_eq!(literal_socket("str", "None").unwrap(), None);
        assert_eq!(literal_socket("wpilib.Pose", "Pose()").unwrap(), None);
        assert!(matches!(
            literal_socket("bool", "maybe"),
            Err(BlocksmithError::InvalidDefaultValue { .. })
        ));
    }
}
