//! Block descriptors, toolbox categories and their TypeScript rendering.

mod category;
mod descriptor;
mod generator;
mod render;

pub use category::{CategoryNode, CategoryTree};
pub use descriptor::{
    Block, BlockType, EnumState, ExtraState, FieldValue, Fields, FunctionArg, FunctionState,
    Inputs, Registration, Socket, VariableKind, VariableState,
};
pub use generator::{literal_socket, variable_name, BlockGenerator, GeneratedBlocks, Unit, UnitKind};
pub use render::{BlocksRenderer, RenderedFile};
