use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::Result;

pub const FIELD_MODULE_OR_CLASS_NAME: &str = "MODULE_OR_CLASS";
pub const FIELD_VARIABLE_NAME: &str = "VAR";
pub const FIELD_MODULE_NAME: &str = "MODULE";
pub const FIELD_CLASS_NAME: &str = "CLASS";
pub const FIELD_FUNCTION_NAME: &str = "FUNC";
pub const FIELD_ENUM_CLASS_NAME: &str = "ENUM_TYPE";
pub const FIELD_ENUM_VALUE: &str = "ENUM_VALUE";

/// Field name constants shared with the editor, by exported constant name
pub const SHARED_FIELD_CONSTANTS: [(&str, &str); 7] = [
    ("FIELD_MODULE_OR_CLASS_NAME", FIELD_MODULE_OR_CLASS_NAME),
    ("FIELD_VARIABLE_NAME", FIELD_VARIABLE_NAME),
    ("FIELD_MODULE_NAME", FIELD_MODULE_NAME),
    ("FIELD_CLASS_NAME", FIELD_CLASS_NAME),
    ("FIELD_FUNCTION_NAME", FIELD_FUNCTION_NAME),
    ("FIELD_ENUM_CLASS_NAME", FIELD_ENUM_CLASS_NAME),
    ("FIELD_ENUM_VALUE", FIELD_ENUM_VALUE),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockType {
    #[serde(rename = "mrc_get_python_variable")]
    GetVariable,
    #[serde(rename = "mrc_set_python_variable")]
    SetVariable,
    #[serde(rename = "call_python_module_function")]
    ModuleFunction,
    #[serde(rename = "call_python_constructor")]
    Constructor,
    #[serde(rename = "call_python_instance_method")]
    InstanceMethod,
    #[serde(rename = "call_python_static_method")]
    StaticMethod,
    #[serde(rename = "mrc_get_python_enum_value")]
    EnumValue,
    #[serde(rename = "variables_get")]
    VariablesGet,
    #[serde(rename = "variables_set")]
    VariablesSet,
    #[serde(rename = "math_number")]
    Number,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "logic_boolean")]
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Variable { name: String },
}

/// Ordered name/value pairs, serialized as an object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(&'static str, FieldValue)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: FieldValue) -> Self {
        self.0.push((name, value));
        self
    }

    pub fn text(self, name: &'static str, value: impl Into<String>) -> Self {
        self.with(name, FieldValue::Text(value.into()))
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// What plugs into an input socket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Socket {
    #[serde(rename = "block")]
    Block(Box<Block>),
    #[serde(rename = "shadow")]
    Shadow(Box<Block>),
}

/// Ordered socket name/content pairs, serialized as an object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs(Vec<(String, Socket)>);

impl Inputs {
    pub fn insert(&mut self, name: impl Into<String>, socket: Socket) {
        self.0.push((name.into(), socket));
    }

    pub fn get(&self, name: &str) -> Option<&Socket> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Inputs {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, socket) in &self.0 {
            map.serialize_entry(name, socket)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Module,
    Class,
    Instance,
}

impl VariableKind {
    fn registration_name(&self) -> &'static str {
        match self {
            VariableKind::Module => "Module",
            VariableKind::Class => "Class",
            VariableKind::Instance => "Instance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableState {
    pub var_kind: VariableKind,
    pub module_or_class_name: String,
    pub var_type: String,
    pub import_module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionArg {
    pub name: String,
    #[serde(rename = "type")]
    pub arg_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionState {
    pub tooltip: String,
    pub return_type: String,
    pub args: Vec<FunctionArg>,
    pub import_module: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumState {
    pub enum_type: String,
    pub import_module: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtraState {
    Variable(VariableState),
    Function(FunctionState),
    Enum(EnumState),
}

/// One block descriptor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    /// `"block"` for toolbox entries; socket contents carry no kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,

    #[serde(rename = "type")]
    pub block_type: BlockType,

    #[serde(rename = "extraState", skip_serializing_if = "Option::is_none")]
    pub extra_state: Option<ExtraState>,

    #[serde(skip_serializing_if = "Fields::is_empty")]
    pub fields: Fields,

    #[serde(skip_serializing_if = "Inputs::is_empty")]
    pub inputs: Inputs,
}

impl Block {
    pub fn new(block_type: BlockType, extra_state: ExtraState, fields: Fields, inputs: Inputs) -> Self {
        Self {
            kind: Some("block"),
            block_type,
            extra_state: Some(extra_state),
            fields,
            inputs,
        }
    }

    /// Read of a workspace variable, plugged into a socket
    pub fn variable_getter(var_name: &str) -> Socket {
        Socket::Block(Box::new(Self::socket_block(
            BlockType::VariablesGet,
            Fields::new().with(FIELD_VARIABLE_NAME, FieldValue::Variable { name: var_name.to_string() }),
        )))
    }

    pub fn number(value: f64) -> Socket {
        Socket::Shadow(Box::new(Self::socket_block(
            BlockType::Number,
            Fields::new().with("NUM", FieldValue::Number(value)),
        )))
    }

    /// Text literal with one level of surrounding quotes removed
    pub fn text(value: &str) -> Socket {
        let quoted = value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')));
        let text = if quoted { &value[1..value.len() - 1] } else { value };
        Socket::Shadow(Box::new(Self::socket_block(
            BlockType::Text,
            Fields::new().text("TEXT", text),
        )))
    }

    pub fn boolean(value: &str) -> Socket {
        Socket::Shadow(Box::new(Self::socket_block(
            BlockType::Boolean,
            Fields::new().text("BOOL", value.to_uppercase()),
        )))
    }

    /// Assign the result of `block` to a fresh variable
    pub fn variable_setter(var_name: &str, block: Block) -> Block {
        let mut inputs = Inputs::default();
        inputs.insert("VALUE", Socket::Block(Box::new(block)));
        Self {
            kind: Some("block"),
            block_type: BlockType::VariablesSet,
            extra_state: None,
            fields: Fields::new().with(FIELD_VARIABLE_NAME, FieldValue::Variable { name: var_name.to_string() }),
            inputs,
        }
    }

    fn socket_block(block_type: BlockType, fields: Fields) -> Block {
        Self {
            kind: None,
            block_type,
            extra_state: None,
            fields,
            inputs: Inputs::default(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A call made by a unit's `initialize` function
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    VariableGetter {
        kind: VariableKind,
        owner: String,
        var_type: String,
        names: Vec<String>,
        tooltips: Vec<Option<String>>,
    },
    VariableSetter {
        kind: VariableKind,
        owner: String,
        var_type: String,
        names: Vec<String>,
        tooltips: Vec<Option<String>>,
    },
    Enum {
        enum_type: String,
        values: Vec<String>,
        tooltip: String,
    },
}

pub const IMPORT_GET_VARIABLE: &str = r#"import * as getPythonVariable from "../mrc_get_python_variable";"#;
pub const IMPORT_SET_VARIABLE: &str = r#"import * as setPythonVariable from "../mrc_set_python_variable";"#;
pub const IMPORT_ENUM: &str = r#"import * as pythonEnum from "../mrc_get_python_enum_value";"#;
pub const IMPORT_CATEGORY: &str = r#"import {Category} from "../../toolbox/items";"#;

impl Registration {
    pub fn import_line(&self) -> &'static str {
        match self {
            Registration::VariableGetter { .. } => IMPORT_GET_VARIABLE,
            Registration::VariableSetter { .. } => IMPORT_SET_VARIABLE,
            Registration::Enum { .. } => IMPORT_ENUM,
        }
    }

    pub fn render(&self) -> Result<String> {
        let line = match self {
            Registration::VariableGetter { kind, owner, var_type, names, tooltips } => format!(
                "getPythonVariable.initialize{}VariableGetter({}, {}, {}, {});",
                kind.registration_name(),
                serde_json::to_string(owner)?,
                serde_json::to_string(var_type)?,
                serde_json::to_string(names)?,
                serde_json::to_string(tooltips)?,
            ),
            Registration::VariableSetter { kind, owner, var_type, names, tooltips } => format!(
                "setPythonVariable.initialize{}VariableSetter({}, {}, {}, {});",
                kind.registration_name(),
                serde_json::to_string(owner)?,
                serde_json::to_string(var_type)?,
                serde_json::to_string(names)?,
                serde_json::to_string(tooltips)?,
            ),
            Registration::Enum { enum_type, values, tooltip } => format!(
                "pythonEnum.initializeEnum({}, {}, {});",
                serde_json::to_string(enum_type)?,
                serde_json::to_string(values)?,
                serde_json::to_string(tooltip)?,
            ),
        };
        Ok(line)
    }
}
