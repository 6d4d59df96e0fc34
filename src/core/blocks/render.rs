use std::path::PathBuf;

use serde::Serialize;
use tera::{Context, Tera};

use crate::error::Result;
use crate::core::resolver::TypeResolver;
use super::category::CategoryTree;
use super::descriptor::SHARED_FIELD_CONSTANTS;
use super::generator::{GeneratedBlocks, Unit};

const UNIT_TEMPLATE: &str = "unit.ts";
const INITIALIZE_TEMPLATE: &str = "initialize.ts";
const TOOLBOX_TEMPLATE: &str = "toolbox.ts";
const PYTHON_TEMPLATE: &str = "python.ts";

/// A rendered output file, relative to the blocks output directory
#[derive(Debug, Clone)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub content: String,
}

#[derive(Serialize)]
struct UnitImport {
    ts_module: String,
    file_stem: String,
}

#[derive(Serialize)]
struct Constant<'a> {
    name: &'a str,
    value: String,
}

#[derive(Serialize)]
struct AliasEntry {
    name: String,
    target: String,
}

#[derive(Serialize)]
struct AllowedTypesEntry {
    name: String,
    types: String,
}

/// Renders generated units to TypeScript with the embedded templates
pub struct BlocksRenderer {
    tera: Tera,
}

impl BlocksRenderer {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (UNIT_TEMPLATE, include_str!("templates/unit.ts.tera")),
            (INITIALIZE_TEMPLATE, include_str!("templates/initialize.ts.tera")),
            (TOOLBOX_TEMPLATE, include_str!("templates/toolbox.ts.tera")),
            (PYTHON_TEMPLATE, include_str!("templates/python.ts.tera")),
        ])?;

        Ok(Self { tera })
    }

    /// Every output file: one per unit plus the three shared ones
    pub fn render_all(&self, generated: &GeneratedBlocks, resolver: &TypeResolver) -> Result<Vec<RenderedFile>> {
        let mut files = Vec::with_capacity(generated.units.len() + 3);

        for unit in &generated.units {
            files.push(RenderedFile {
                path: PathBuf::from("blocks/generated").join(unit.file_name()),
                content: self.render_unit(unit)?,
            });
        }

        files.push(RenderedFile {
            path: PathBuf::from("blocks/utils/generated/python.ts"),
            content: self.render_python(resolver)?,
        });
        files.push(RenderedFile {
            path: PathBuf::from("blocks/utils/generated/initialize.ts"),
            content: self.render_initialize(&generated.units)?,
        });
        files.push(RenderedFile {
            path: PathBuf::from("toolbox/generated/toolbox.ts"),
            content: self.render_toolbox(&generated.units, &generated.categories)?,
        });

        Ok(files)
    }

    pub fn render_unit(&self, unit: &Unit) -> Result<String> {
        let initialize_lines = unit.registrations.iter()
            .map(|r| r.render())
            .collect::<Result<Vec<_>>>()?;
        let blocks = unit.blocks.iter()
            .map(|b| b.to_json())
            .collect::<Result<Vec<_>>>()?;

        let mut context = Context::new();
        context.insert("kind", &unit.kind);
        context.insert("key", &unit.key);
        context.insert("imports", &unit.imports);
        context.insert("initialize_lines", &initialize_lines);
        context.insert("category_name", unit.category_name());
        context.insert("blocks", &blocks);

        Ok(self.tera.render(UNIT_TEMPLATE, &context)?)
    }

    pub fn render_initialize(&self, units: &[Unit]) -> Result<String> {
        let mut context = Context::new();
        context.insert("units", &unit_imports(units));
        Ok(self.tera.render(INITIALIZE_TEMPLATE, &context)?)
    }

    pub fn render_toolbox(&self, units: &[Unit], categories: &CategoryTree) -> Result<String> {
        let mut context = Context::new();
        context.insert("units", &unit_imports(units));
        context.insert("toolbox", &categories.render_toolbox());
        Ok(self.tera.render(TOOLBOX_TEMPLATE, &context)?)
    }

    /// Field constants plus the alias and allowed-type lookups
    pub fn render_python(&self, resolver: &TypeResolver) -> Result<String> {
        let constants = SHARED_FIELD_CONSTANTS.iter()
            .map(|(name, value)| -> Result<Constant> {
                Ok(Constant { name: *name, value: serde_json::to_string(value)? })
            })
            .collect::<Result<Vec<_>>>()?;

        let aliases = resolver.aliases().iter()
            .map(|(alias, target)| -> Result<AliasEntry> {
                Ok(AliasEntry {
                    name: serde_json::to_string(alias)?,
                    target: serde_json::to_string(target)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let allowed_types = resolver.allowed_types_table().iter()
            .map(|(name, types)| -> Result<AllowedTypesEntry> {
                Ok(AllowedTypesEntry {
                    name: serde_json::to_string(name)?,
                    types: serde_json::to_string(types)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut context = Context::new();
        context.insert("constants", &constants);
        context.insert("aliases", &aliases);
        context.insert("allowed_types", &allowed_types);
        Ok(self.tera.render(PYTHON_TEMPLATE, &context)?)
    }
}

/// Units sorted by key, as imported by the aggregation files
fn unit_imports(units: &[Unit]) -> Vec<UnitImport> {
    let mut imports: Vec<(&str, UnitImport)> = units.iter()
        .map(|u| (u.key.as_str(), UnitImport {
            ts_module: u.ts_module(),
            file_stem: u.file_stem(),
        }))
        .collect();
    imports.sort_by(|a, b| a.0.cmp(b.0));
    imports.into_iter().map(|(_, i)| i).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::core::blocks::generator::UnitKind;
    use crate::core::blocks::descriptor::{
        Block, BlockType, EnumState, ExtraState, Fields, Inputs, Registration,
        FIELD_ENUM_CLASS_NAME, FIELD_ENUM_VALUE, IMPORT_ENUM,
    };
    use crate::core::naming::NameMapper;

    fn color_unit() -> Unit {
        let mut unit = Unit::new(UnitKind::Module, "wpilib".to_string());
        unit.imports.insert(IMPORT_ENUM.to_string());
        unit.registrations.push(Registration::Enum {
            enum_type: "wpilib.Color".to_string(),
            values: vec!["kBlue".to_string()],
            tooltip: String::new(),
        });
        unit.blocks.push(Block::new(
            BlockType::EnumValue,
            ExtraState::Enum(EnumState {
                enum_type: "wpilib.Color".to_string(),
                import_module: "wpilib".to_string(),
            }),
            Fields::new()
                .text(FIELD_ENUM_CLASS_NAME, "wpilib.Color")
                .text(FIELD_ENUM_VALUE, "kBlue"),
            Inputs::default(),
        ));
        unit
    }

    #[test]
    fn test_render_unit() {
        let renderer = BlocksRenderer::new().unwrap();
        let content = renderer.render_unit(&color_unit()).unwrap();

        assert!(content.starts_with("// This file was generated. Do not edit!\n\n"));
        assert!(content.contains("import {Category} from \"../../toolbox/items\";\n"));
        assert!(content.contains("// Blocks for module wpilib\n"));
        assert!(content.contains(
            "export function initialize() {\n  pythonEnum.initializeEnum(\"wpilib.Color\", [\"kBlue\"], \"\");\n}\n"
        ));
        assert!(content.contains("    name: \"wpilib\",\n"));
        assert!(content.contains("      {\"kind\":\"block\",\"type\":\"mrc_get_python_enum_value\""));
        assert!(!content.contains("&quot;"));
    }

    #[test]
    fn test_render_aggregation_files() {
        let renderer = BlocksRenderer::new().unwrap();
        let units = vec![
            Unit::new(UnitKind::Module, "wpimath.geometry".to_string()),
            Unit::new(UnitKind::Class, "wpilib.Drive".to_string()),
        ];

        let initialize = renderer.render_initialize(&units).unwrap();
        let expected = concat!(
            "// This file was generated. Do not edit!\n\n",
            "import * as wpilib_Drive from '../../generated/class_wpilib.Drive';\n",
            "import * as wpimath_geometry from '../../generated/module_wpimath.geometry';\n",
            "\n",
            "export function initialize() {\n",
            "  wpilib_Drive.initialize();\n",
            "  wpimath_geometry.initialize();\n",
            "}\n",
        );
        assert_eq!(initialize, expected);

        let keys: BTreeSet<String> = units.iter().map(|u| u.key.clone()).collect();
        let toolbox = renderer.render_toolbox(&units, &CategoryTree::build(&keys)).unwrap();
        assert!(toolbox.contains("import * as wpilib_Drive from '../../blocks/generated/class_wpilib.Drive';\n"));
        assert!(toolbox.contains("  return [\n    { kind: \"category\", name: \"wpilib\", contents: [\n"));
        assert!(toolbox.ends_with("  ];\n}\n"));
    }

    #[test]
    fn test_render_python_lookups() {
        let mut aliases = BTreeMap::new();
        aliases.insert("wpilib.Rotation".to_string(), "wpimath.geometry.Rotation2d".to_string());
        let mut subclasses = BTreeMap::new();
        subclasses.insert("wpilib.MotorController".to_string(), vec!["wpilib.Spark".to_string()]);
        let resolver = TypeResolver::from_parts(NameMapper::default(), aliases, subclasses);

        let renderer = BlocksRenderer::new().unwrap();
        let content = renderer.render_python(&resolver).unwrap();

        assert!(content.contains("export const FIELD_MODULE_OR_CLASS_NAME = \"MODULE_OR_CLASS\";\n"));
        assert!(content.contains(
            "  if (type === \"wpilib.Rotation\") {\n    return \"wpimath.geometry.Rotation2d\";\n  }\n"
        ));
        assert!(content.contains(
            "  if (type === \"wpilib.MotorController\") {\n    return [\"wpilib.MotorController\",\"wpilib.Spark\"];\n  }\n"
        ));
        assert!(content.ends_with("  return [\"\"];\n}\n"));
    }
}
