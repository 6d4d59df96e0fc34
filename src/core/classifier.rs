use std::fmt;

use serde::{Serialize, Serializer};

use super::graph::{Node, NodeView};
use super::signature::is_overloaded;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    ModuleVariableGetter,
    ModuleVariableSetter,
    ClassVariableGetter,
    ClassVariableSetter,
    InstanceVariableGetter,
    InstanceVariableSetter,
    Constructor,
    InstanceMethod,
    StaticMethod,
    ModuleFunction,
    EnumType,
    TypeAlias,
    Overloaded,
}

impl Capability {
    pub const ALL: [Capability; 13] = [
        Capability::EnumType,
        Capability::ModuleFunction,
        Capability::StaticMethod,
        Capability::Constructor,
        Capability::InstanceMethod,
        Capability::ModuleVariableGetter,
        Capability::ModuleVariableSetter,
        Capability::ClassVariableGetter,
        Capability::ClassVariableSetter,
        Capability::InstanceVariableGetter,
        Capability::InstanceVariableSetter,
        Capability::TypeAlias,
        Capability::Overloaded,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Capability::ModuleVariableGetter => "blockModuleVariableGetter",
            Capability::ModuleVariableSetter => "blockModuleVariableSetter",
            Capability::ClassVariableGetter => "blockClassVariableGetter",
            Capability::ClassVariableSetter => "blockClassVariableSetter",
            Capability::InstanceVariableGetter => "blockInstanceVariableGetter",
            Capability::InstanceVariableSetter => "blockInstanceVariableSetter",
            Capability::Constructor => "blockConstructor",
            Capability::InstanceMethod => "blockInstanceMethod",
            Capability::StaticMethod => "blockStaticMethod",
            Capability::ModuleFunction => "blockModuleFunction",
            Capability::EnumType => "blockEnum",
            Capability::TypeAlias => "isTypeAlias",
            Capability::Overloaded => "isOverloaded",
        }
    }

    fn bit(&self) -> u16 {
        1 << (*self as u16)
    }
}

/// Set of capabilities that apply to one member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CapabilitySet(u16);

impl CapabilitySet {
    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Capabilities in report order
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.iter().copied().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = CapabilitySet::default();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.iter().map(|c| c.tag()).collect();
        write!(f, "{}", tags.join(" "))
    }
}

impl Serialize for CapabilitySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|c| c.tag()))
    }
}

/// A `(parent, name, value)` triple.
///
/// Every rule reads the [`NodeView`] of the parent and the value plus the
/// bound name, never the graph itself.
#[derive(Debug, Clone, Copy)]
pub struct Member<'a> {
    pub parent: Option<&'a Node>,
    pub name: &'a str,
    pub value: &'a Node,
}

impl<'a> Member<'a> {
    pub fn new(parent: Option<&'a Node>, name: &'a str, value: &'a Node) -> Self {
        Self { parent, name, value }
    }

    fn parent_view(&self) -> Option<&'a NodeView> {
        self.parent.map(|p| &p.view)
    }

    fn value_view(&self) -> &'a NodeView {
        &self.value.view
    }

    fn parent_is_module(&self) -> bool {
        self.parent_view().map_or(false, |p| p.is_module)
    }

    fn parent_is_class(&self) -> bool {
        self.parent_view().map_or(false, |p| p.is_class)
    }

    fn parent_is_enum(&self) -> bool {
        self.parent_view().map_or(false, |p| p.is_enum())
    }
}

/// Every capability that applies to a member
pub fn classify(member: &Member) -> CapabilitySet {
    let mut set = CapabilitySet::default();

    if member.value_view().is_enum() {
        set.insert(Capability::EnumType);
    }
    if is_module_function(member) {
        set.insert(Capability::ModuleFunction);
    }
    if is_static_method(member) {
        set.insert(Capability::StaticMethod);
    }
    if is_constructor(member) {
        set.insert(Capability::Constructor);
    }
    if is_instance_method(member) {
        set.insert(Capability::InstanceMethod);
    }
    if is_module_variable_readable(member) {
        set.insert(Capability::ModuleVariableGetter);
    }
    if is_module_variable_writable(member) {
        set.insert(Capability::ModuleVariableSetter);
    }
    if is_class_variable_readable(member) {
        set.insert(Capability::ClassVariableGetter);
    }
    if is_class_variable_writable(member) {
        set.insert(Capability::ClassVariableSetter);
    }
    if is_instance_variable_readable(member) {
        set.insert(Capability::InstanceVariableGetter);
    }
    if is_instance_variable_writable(member) {
        set.insert(Capability::InstanceVariableSetter);
    }
    if is_type_alias(member) {
        set.insert(Capability::TypeAlias);
    }
    if is_overloaded_routine(member.value_view()) {
        set.insert(Capability::Overloaded);
    }

    set
}

/// `_name` is private; `_5V` style names stand in for identifiers that start with a digit
pub fn is_private_name(name: &str) -> bool {
    name.starts_with('_') && !starts_with_underscore_digit(name)
}

pub fn starts_with_underscore_digit(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('_') && chars.next().map_or(false, |c| c.is_ascii_digit())
}

/// `kMaxSpeed` style constant names
pub fn starts_with_k_upper(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('k') && chars.next().map_or(false, |c| c.is_uppercase())
}

/// At least one cased character and no lower-case ones
pub fn is_all_caps(name: &str) -> bool {
    name.chars().any(|c| c.is_uppercase()) && !name.chars().any(|c| c.is_lowercase())
}

fn is_logger(view: &NodeView) -> bool {
    view.data_type.as_ref()
        .map_or(false, |t| t.module == "logging" && t.name == "Logger")
}

fn is_typing_construct(view: &NodeView) -> bool {
    view.data_type.as_ref()
        .map_or(false, |t| t.module == "typing" || t.module == "__future__")
}

fn is_capsule(view: &NodeView) -> bool {
    view.data_type.as_ref().map_or(false, |t| t.name == "PyCapsule")
}

fn is_plain_data(member: &Member) -> bool {
    let value = member.value_view();
    !is_private_name(member.name)
        && value.is_data
        && !is_logger(value)
        && !is_typing_construct(value)
}

fn is_mutable_by_convention(name: &str) -> bool {
    !is_all_caps(name) && !starts_with_k_upper(name)
}

pub fn is_module_variable_readable(member: &Member) -> bool {
    member.parent_is_module() && is_plain_data(member)
}

pub fn is_module_variable_writable(member: &Member) -> bool {
    is_module_variable_readable(member) && is_mutable_by_convention(member.name)
}

pub fn is_class_variable_readable(member: &Member) -> bool {
    let is_own_enum_value = member.parent_is_enum()
        && member.parent.zip(member.value_view().data_type.as_ref())
            .map_or(false, |(parent, t)| t.id == parent.id);

    member.parent_is_class()
        && is_plain_data(member)
        && !is_own_enum_value
        && !is_capsule(member.value_view())
}

pub fn is_class_variable_writable(member: &Member) -> bool {
    is_class_variable_readable(member) && is_mutable_by_convention(member.name)
}

pub fn is_instance_variable_readable(member: &Member) -> bool {
    let value = member.value_view();
    member.parent_is_class()
        && !member.parent_is_enum()
        && !member.name.starts_with('_')
        && !member.name.starts_with("m_")
        && value.is_data_descriptor
        && value.is_property
        && value.has_routine_getter
}

pub fn is_instance_variable_writable(member: &Member) -> bool {
    is_instance_variable_readable(member) && member.value_view().has_routine_setter
}

/// An `__init__` method descriptor, whatever it is bound as
pub fn might_be_constructor(view: &NodeView) -> bool {
    view.is_routine
        && view.is_method_descriptor
        && view.identity_name.as_deref() == Some("__init__")
}

pub fn is_constructor(member: &Member) -> bool {
    might_be_constructor(member.value_view())
        && member.parent_is_class()
        && !member.parent_is_enum()
}

pub fn is_instance_method(member: &Member) -> bool {
    let value = member.value_view();
    member.parent_is_class()
        && value.is_routine
        && value.is_method_descriptor
        && value.identity_name.as_deref() != Some("__init__")
}

pub fn is_static_method(member: &Member) -> bool {
    let value = member.value_view();
    member.parent_is_class() && value.is_routine && value.is_builtin
}

pub fn is_module_function(member: &Member) -> bool {
    let value = member.value_view();
    member.parent_is_module() && value.is_routine && value.is_builtin
}

/// A routine that gets blocks: any public routine member
pub fn is_function(member: &Member) -> bool {
    member.value_view().is_routine && !member.name.starts_with('_')
}

pub fn is_type_alias(member: &Member) -> bool {
    let value = member.value_view();
    value.is_class
        && !member.name.is_empty()
        && (member.parent_is_module() || member.parent_is_class())
        && value.identity_name.as_deref() != Some(member.name)
}

pub fn is_overloaded_routine(view: &NodeView) -> bool {
    match (&view.identity_name, &view.doc) {
        (Some(name), Some(doc)) if view.is_routine => is_overloaded(name, doc),
        _ => false,
    }
}
