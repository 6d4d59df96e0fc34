mod engine;
mod graph;
mod signature;
mod naming;
mod classifier;
mod diagnostics;
mod walker;
mod resolver;
mod report;
mod summary;

// Block generation and TypeScript rendering
mod blocks;

pub use graph::{
    content_hash, DataType, GraphSnapshot, HostGraph, HostId, HostKind, HostNode, Node, NodeId,
    NodeKind, NodeView, RoutineFlavor,
};
pub use signature::{
    is_overloaded, is_primitive, Parameter, ParameterKind, Signature, SignatureDoc,
    SignatureParser, NONE_TYPE, PRIMITIVE_TYPES,
};
pub use naming::{self_arg_name, simple_name, NameMapper};
pub use classifier::{classify, Capability, CapabilitySet, Member};
pub use diagnostics::{Diagnostic, DiagnosticSummary, Diagnostics};
pub use walker::{Model, VisitRecord, WalkOptions, Walker};
pub use resolver::TypeResolver;
pub use report::ExamineReport;
pub use summary::{ClassSummary, FunctionSummary, ModelSummary, ModuleSummary, SummaryBuilder, VariableSummary};
pub use blocks::{
    Block, BlockGenerator, BlockType, BlocksRenderer, CategoryNode, CategoryTree, GeneratedBlocks,
    RenderedFile, Unit, UnitKind,
};

pub use engine::Engine;
