use std::fmt::Write as _;

use super::graph::{HostGraph, Node, NodeKind};
use super::signature::SignatureParser;
use super::walker::{Model, VisitRecord};

/// Builtin value classes reported by name
const VALUE_TAGS: [&str; 7] = ["bool", "int", "float", "str", "list", "dict", "tuple"];

pub struct ExamineReport<'a> {
    graph: &'a HostGraph,
    model: &'a Model,
    parser: SignatureParser,
    show_ids: bool,
}

impl<'a> ExamineReport<'a> {
    pub fn new(graph: &'a HostGraph, model: &'a Model) -> Self {
        Self {
            graph,
            model,
            parser: SignatureParser::new(),
            show_ids: false,
        }
    }

    /// Print host identities next to each path
    pub fn with_ids(mut self, show_ids: bool) -> Self {
        self.show_ids = show_ids;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        for visit in &self.model.visits {
            out.push_str(&self.visit_line(visit));
            out.push('\n');
        }

        let mut modules: Vec<&str> = self.model.modules.iter()
            .filter_map(|id| self.graph.module_name(*id))
            .collect();
        modules.sort_unstable();
        section(&mut out, "Modules", modules.iter().map(|m| m.to_string()));

        let classes = self.model.classes.iter()
            .filter_map(|id| self.graph.full_class_name(*id));
        section(&mut out, "Classes", classes);

        let aliases = self.model.aliases.iter()
            .map(|(alias, target)| format!("{}: {}", alias, target));
        section(&mut out, "Type Aliases", aliases);

        let subclasses = self.model.subclasses.iter()
            .map(|(ancestor, descendants)| format!("{}: {}", ancestor, descendants.join(", ")));
        section(&mut out, "Subclasses", subclasses);

        out
    }

    fn visit_line(&self, visit: &VisitRecord) -> String {
        let node = self.graph.node(visit.node);
        let indent = "  ".repeat(visit.depth);

        let mut details: Vec<String> = visit.capabilities.iter()
            .map(|c| c.tag().to_string())
            .collect();
        details.extend(self.kind_details(node));

        if let Some(doc) = node.doc.as_deref().filter(|d| !d.is_empty()) {
            let doc = self.parser.normalize_addresses(doc).replace('\n', "\\n");
            details.push(format!("__doc__='{}'", doc));
        }

        let mut line = format!("{}> {}: ", indent, visit.path);
        if self.show_ids {
            let _ = write!(line, "{} ", node.host_id);
        }
        line.push_str(&details.join(" "));
        line
    }

    fn kind_details(&self, node: &Node) -> Vec<String> {
        let view = &node.view;
        let mut details = Vec::new();

        match &node.kind {
            NodeKind::Module { name } => {
                details.push("ismodule".to_string());
                details.push(name.clone());
            }
            NodeKind::Class { .. } => {
                details.push("isclass".to_string());
                details.push(self.graph.full_class_name(node.id).unwrap_or_default());
            }
            NodeKind::Routine { name, .. } => {
                if view.is_builtin {
                    details.push("isbuiltin".to_string());
                }
                details.push("isroutine".to_string());
                if view.is_method_descriptor {
                    details.push("ismethoddescriptor".to_string());
                }
                details.push(format!("__name__='{}'", name));
            }
            NodeKind::Descriptor { property, .. } => {
                details.push("isdatadescriptor".to_string());
                let host_type = if *property { "property" } else { "getset_descriptor" };
                details.push(format!("type={}", host_type));
            }
            NodeKind::Value { type_id } => {
                let type_name = self.graph.full_class_name(*type_id).unwrap_or_default();
                if VALUE_TAGS.contains(&type_name.as_str()) {
                    details.push(type_name.clone());
                }
                details.push(format!("type={}", type_name));
            }
            NodeKind::Opaque => details.push("type=object".to_string()),
        }

        details
    }
}

fn section(out: &mut String, title: &str, lines: impl Iterator<Item = String>) {
    let lines: Vec<String> = lines.collect();
    let _ = write!(out, "\n\n{}:\n{}\n", title, lines.join("\n"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoundaryConfig, WalkConfig};
    use crate::core::graph::test_support::SnapshotBuilder;
    use crate::core::graph::RoutineFlavor;
    use crate::core::naming::NameMapper;
    use crate::core::walker::{WalkOptions, Walker};

    fn report(builder: &SnapshotBuilder, show_ids: bool) -> String {
        let graph = HostGraph::from_snapshot(&builder.build(), &BoundaryConfig::default()).unwrap();
        let names = NameMapper::default();
        let model = Walker::new(&graph, &names, WalkOptions::from(&WalkConfig::default()))
            .walk(graph.roots())
            .unwrap();
        ExamineReport::new(&graph, &model).with_ids(show_ids).render()
    }

    #[test]
    fn test_visit_lines() {
        let mut b = SnapshotBuilder::new();
        let module = b.module("wpilib");
        let float = b.class("builtins", "float", &[]);
        let period = b.value(float);
        let drive = b.class("wpilib", "Drive", &[]);
        let arcade = b.routine(
            "arcade",
            RoutineFlavor::MethodDescriptor,
            Some("arcade(self: wpilib.Drive, speed: float) -> None\n\nDrive <object at 0x7f00deadb>.\n"),
        );
        b.bind(drive, "arcade", arcade);
        b.bind(module, "Drive", drive);
        b.bind(module, "kPeriod", period);
        b.root(module);

        let text = report(&b, false);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "> wpilib: ismodule wpilib");
        assert_eq!(lines[1], "  > wpilib.Drive: isclass wpilib.Drive");
        assert_eq!(
            lines[2],
            "    > wpilib.Drive.arcade: blockInstanceMethod isroutine ismethoddescriptor __name__='arcade' \
             __doc__='arcade(self: wpilib.Drive, speed: float) -> None\\n\\nDrive <object at 0x123456789>.\\n'"
        );
        assert_eq!(lines[3], "  > wpilib.kPeriod: blockModuleVariableGetter float type=float");
        assert!(text.contains("\n\nModules:\nwpilib\n"));
        assert!(text.contains("\n\nClasses:\nwpilib.Drive\n"));
        assert!(text.ends_with("\n\nSubclasses:\n\n"));
    }

    #[test]
    fn test_revisits_and_ids() {
        let mut b = SnapshotBuilder::new();
        let module = b.module("wpilib");
        let drive = b.class("wpilib", "Drive", &[]);
        b.bind(module, "Drive", drive);
        b.bind(module, "DifferentialDrive", drive);
        b.root(module);

        let text = report(&b, true);

        assert!(text.starts_with("> wpilib: 1000 ismodule wpilib\n"));
        assert!(text.contains("  > wpilib.DifferentialDrive: 1001 isTypeAlias isclass wpilib.Drive\n"));
        assert!(text.contains("  > wpilib.Drive: 1001 isclass wpilib.Drive\n"));
        assert!(text.contains("\n\nType Aliases:\nwpilib.DifferentialDrive: wpilib.Drive\n"));
    }
}
