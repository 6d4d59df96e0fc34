use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BlocksmithError, Result};

/// Type names that never refer to a class of the examined library
pub const PRIMITIVE_TYPES: [&str; 4] = ["bool", "int", "float", "str"];

/// Return type text used by routines that produce nothing
pub const NONE_TYPE: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Regular,
    /// `*args`
    VarPositional,
    /// `**kwargs`
    VarKeyword,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
    pub default: Option<String>,
    pub kind: ParameterKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub function_name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: String,
}

/// One documented signature line and the comment that follows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureDoc {
    pub signature: String,
    pub comment: String,
}

impl Parameter {
    pub fn regular(name: &str, type_name: &str, default: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            default: default.map(|d| d.to_string()),
            kind: ParameterKind::Regular,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParameterKind::VarPositional => write!(f, "*{}", self.name),
            ParameterKind::VarKeyword => write!(f, "**{}", self.name),
            ParameterKind::Regular => {
                write!(f, "{}: {}", self.name, self.type_name)?;
                if let Some(default) = &self.default {
                    write!(f, " = {}", default)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameters.iter().map(|p| p.to_string()).collect();
        write!(f, "{}({}) -> {}", self.function_name, params.join(", "), self.return_type)
    }
}

impl Signature {
    /// Parameter and return types that may name a library class
    pub fn referenced_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.parameters.iter()
            .filter(|p| p.kind == ParameterKind::Regular)
            .map(|p| p.type_name.as_str())
            .filter(|t| !is_primitive(t))
            .collect();

        if self.return_type != NONE_TYPE && !is_primitive(&self.return_type) {
            types.push(&self.return_type);
        }

        types
    }
}

pub fn is_primitive(type_name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&type_name)
}

/// Whether a routine's doc opens with the overload announcement for `name`
pub fn is_overloaded(name: &str, doc: &str) -> bool {
    doc.starts_with(&format!("{}(*args, **kwargs)\nOverloaded function.\n\n", name))
}

/// Parses signature lines and splits routine docs into overloads.
///
/// Documented routines open with a line such as
/// `move(self: wpilib.Drive, speed: float, heading: float = 0.0) -> None`.
/// Overloaded routines announce themselves on the first line and list each
/// overload in a numbered section (`\n\n1. `, `\n\n2. `, ...).
pub struct SignatureParser {
    /// `name(params) -> returnType`
    signature_regex: Regex,

    /// `name(self: Type) -> returnType`, the shape of property getters
    getter_regex: Regex,

    /// Object addresses embedded in default value reprs
    address_regex: Regex,
}

impl SignatureParser {
    pub fn new() -> Self {
        Self {
            signature_regex: Regex::new(r"^(\w+)\((.*)\) -> (.+)$")
                .expect("Invalid signature regex"),
            getter_regex: Regex::new(r"^(\w*)\((\w+): (.+)\) -> (.+)$")
                .expect("Invalid getter regex"),
            address_regex: Regex::new(r"object at 0x[0-9a-fA-F]{9}")
                .expect("Invalid address regex"),
        }
    }

    /// Check whether a line matches the signature grammar
    pub fn is_signature(&self, line: &str) -> bool {
        self.signature_regex.is_match(line)
    }

    /// Parse a single signature line
    pub fn parse(&self, line: &str) -> Result<Signature> {
        let caps = self.signature_regex.captures(line)
            .ok_or_else(|| BlocksmithError::Parse(line.to_string()))?;

        let function_name = caps[1].to_string();
        let parameters = parse_parameters(&caps[2])
            .map_err(|reason| BlocksmithError::Parse(format!("{} ({})", line, reason)))?;
        let return_type = caps[3].to_string();

        Ok(Signature {
            function_name,
            parameters,
            return_type,
        })
    }

    /// Split a routine doc into its signature lines and their comments.
    ///
    /// A doc that is not an overload announcement contributes its first line
    /// when that line is a signature. An overloaded doc contributes the first
    /// line of every numbered section, scanning `1.`, `2.`, ... until an index
    /// is missing.
    pub fn split_overloads(&self, name: &str, doc: &str) -> Vec<SignatureDoc> {
        let doc = self.strip_addresses(doc);

        if !is_overloaded(name, &doc) {
            let (line, rest) = match doc.find('\n') {
                Some(eol) => (&doc[..eol], &doc[eol + 1..]),
                None => (doc.as_str(), ""),
            };
            if self.is_signature(line) {
                return vec![SignatureDoc {
                    signature: line.to_string(),
                    comment: rest.trim().to_string(),
                }];
            }
            return vec![];
        }

        let mut signature_starts = Vec::new();
        let mut comment_ends = Vec::new();
        let mut expected_number = 1;
        let mut index = 0;

        loop {
            let marker = format!("\n\n{}. ", expected_number);
            match doc[index..].find(&marker) {
                Some(offset) => {
                    let found = index + offset;
                    if expected_number > 1 {
                        comment_ends.push(found);
                    }
                    index = found + marker.len();
                    signature_starts.push(index);
                    expected_number += 1;
                }
                None => {
                    comment_ends.push(doc.len());
                    break;
                }
            }
        }

        signature_starts.iter()
            .zip(comment_ends)
            .map(|(&start, end)| {
                let eol = doc[start..end].find('\n').map(|p| start + p).unwrap_or(end);
                let comment = if eol < end { &doc[eol + 1..end] } else { "" };
                SignatureDoc {
                    signature: doc[start..eol].to_string(),
                    comment: comment.trim().to_string(),
                }
            })
            .collect()
    }

    /// Parse every signature of a routine doc, skipping the unparseable ones
    pub fn parse_all(&self, name: &str, doc: &str) -> Vec<Signature> {
        self.split_overloads(name, doc)
            .iter()
            .filter_map(|entry| self.parse(&entry.signature).ok())
            .collect()
    }

    /// Declared type of a property from its getter doc
    pub fn getter_type(&self, getter_doc: &str) -> Option<String> {
        let first_line = getter_doc.split('\n').next()?;
        self.getter_regex.captures(first_line)
            .map(|caps| caps[4].to_string())
    }

    /// Replace object addresses with a fixed one so reports are stable
    pub fn normalize_addresses(&self, doc: &str) -> String {
        self.address_regex.replace_all(doc, "object at 0x123456789").into_owned()
    }

    fn strip_addresses(&self, doc: &str) -> String {
        if !self.address_regex.is_match(doc) {
            return doc.to_string();
        }
        // Drop the address together with the space before "object"
        let mut result = String::with_capacity(doc.len());
        let mut last = 0;
        for m in self.address_regex.find_iter(doc) {
            let start = if doc[..m.start()].ends_with(' ') { m.start() - 1 } else { m.start() };
            result.push_str(&doc[last..start]);
            last = m.end();
        }
        result.push_str(&doc[last..]);
        result
    }
}

impl Default for SignatureParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_parameters(args: &str) -> std::result::Result<Vec<Parameter>, String> {
    let mut parameters = Vec::new();
    let mut i = 0;

    while i < args.len() {
        let start = i;

        if args[start..].starts_with('*') {
            let (kind, name_start, type_name) = if args[start..].starts_with("**") {
                (ParameterKind::VarKeyword, start + 2, "dict")
            } else {
                (ParameterKind::VarPositional, start + 1, "tuple")
            };
            i = find_end_of_token(args, name_start, &[b',']);
            let name = &args[name_start..i];
            if !is_identifier(name) {
                return Err(format!("bad variadic parameter '{}'", name));
            }
            parameters.push(Parameter {
                name: name.to_string(),
                type_name: type_name.to_string(),
                default: None,
                kind,
            });
        } else {
            let colon = args[start..].find(": ")
                .map(|offset| start + offset)
                .ok_or_else(|| format!("parameter without annotation at '{}'", &args[start..]))?;
            let name = &args[start..colon];
            if !is_identifier(name) {
                return Err(format!("bad parameter name '{}'", name));
            }

            let type_start = colon + 2;
            i = find_end_of_token(args, type_start, &[b',', b' ']);
            let type_name = &args[type_start..i];
            if type_name.is_empty() {
                return Err(format!("parameter '{}' has an empty type", name));
            }

            let mut default = None;
            if args[i..].starts_with(" = ") {
                let default_start = i + 3;
                i = find_end_of_token(args, default_start, &[b',']);
                default = Some(args[default_start..i].to_string());
            }

            parameters.push(Parameter {
                name: name.to_string(),
                type_name: type_name.to_string(),
                default,
                kind: ParameterKind::Regular,
            });
        }

        if args[i..].starts_with(", ") {
            i += 2;
            if i == args.len() {
                return Err("trailing separator".to_string());
            }
        } else if i < args.len() {
            return Err(format!("unexpected text '{}'", &args[i..]));
        }
    }

    Ok(parameters)
}

/// Index of the first delimiter outside any `()` or `[]` nesting
fn find_end_of_token(text: &str, start: usize, delimiters: &[u8]) -> usize {
    let bytes = text.as_bytes();
    let mut closers: Vec<u8> = Vec::new();
    let mut i = start;

    while i < bytes.len() {
        let ch = bytes[i];
        match ch {
            b'(' => closers.push(b')'),
            b'[' => closers.push(b']'),
            _ => {
                if let Some(&closer) = closers.last() {
                    if ch == closer {
                        closers.pop();
                    }
                } else if delimiters.contains(&ch) {
                    break;
                }
            }
        }
        i += 1;
    }

    i
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_default() {
        let parser = SignatureParser::new();
        let sig = parser.parse("move(speed: float, heading: float = 0.0) -> None").unwrap();

        assert_eq!(sig.function_name, "move");
        assert_eq!(sig.parameters, vec![
            Parameter::regular("speed", "float", None),
            Parameter::regular("heading", "float", Some("0.0")),
        ]);
        assert_eq!(sig.return_type, "None");
    }

    #[test]
    fn test_bracketed_types_are_single_tokens() {
        let parser = SignatureParser::new();
        let sig = parser.parse(
            "fromPoints(points: list[tuple[float, float]], callback: Callable[[int, str], None] = None) -> wpimath.geometry.Pose2d"
        ).unwrap();

        assert_eq!(sig.parameters.len(), 2);
        assert_eq!(sig.parameters[0].type_name, "list[tuple[float, float]]");
        assert_eq!(sig.parameters[1].type_name, "Callable[[int, str], None]");
        assert_eq!(sig.parameters[1].default.as_deref(), Some("None"));
        assert_eq!(sig.return_type, "wpimath.geometry.Pose2d");
    }

    #[test]
    fn test_default_with_nested_commas() {
        let parser = SignatureParser::new();
        let sig = parser.parse(
            "setColor(self: wpilib.LED, color: wpilib.Color = Color(0.0, 1.0, 0.5), blink: bool = False) -> None"
        ).unwrap();

        assert_eq!(sig.parameters[1].default.as_deref(), Some("Color(0.0, 1.0, 0.5)"));
        assert_eq!(sig.parameters[2].default.as_deref(), Some("False"));
    }

    #[test]
    fn test_variadic_parameters() {
        let parser = SignatureParser::new();
        let sig = parser.parse("log(fmt: str, *args, **kwargs) -> None").unwrap();

        assert_eq!(sig.parameters.len(), 3);
        assert_eq!(sig.parameters[1].name, "args");
        assert_eq!(sig.parameters[1].type_name, "tuple");
        assert_eq!(sig.parameters[1].kind, ParameterKind::VarPositional);
        assert_eq!(sig.parameters[2].kind, ParameterKind::VarKeyword);
    }

    #[test]
    fn test_no_parameters() {
        let parser = SignatureParser::new();
        let sig = parser.parse("getTime() -> float").unwrap();
        assert!(sig.parameters.is_empty());
        assert_eq!(sig.return_type, "float");
    }

    #[test]
    fn test_rejects_non_signatures() {
        let parser = SignatureParser::new();
        assert!(parser.parse("Does something useful.").is_err());
        assert!(parser.parse("move(speed) -> None").is_err());
        assert!(parser.parse("move(speed: float, ) -> None").is_err());
        assert!(matches!(parser.parse("nope"), Err(BlocksmithError::Parse(_))));
    }

    #[test]
    fn test_formatted_signatures_parse_back() {
        let parser = SignatureParser::new();
        let original = Signature {
            function_name: "f".to_string(),
            parameters: vec![
                Parameter::regular("a", "wpilib.Motor", None),
                Parameter::regular("b", "str", Some("\"x\"")),
                Parameter {
                    name: "rest".to_string(),
                    type_name: "tuple".to_string(),
                    default: None,
                    kind: ParameterKind::VarPositional,
                },
            ],
            return_type: "dict[str, list[int]]".to_string(),
        };

        let line = original.to_string();
        assert_eq!(line, "f(a: wpilib.Motor, b: str = \"x\", *rest) -> dict[str, list[int]]");
        assert_eq!(parser.parse(&line).unwrap(), original);
    }

    #[test]
    fn test_split_single_signature_doc() {
        let parser = SignatureParser::new();
        let docs = parser.split_overloads(
            "arcade",
            "arcade(self: wpilib.Drive, x: float) -> None\n\nArcade drive.\n",
        );

        assert_eq!(docs, vec![SignatureDoc {
            signature: "arcade(self: wpilib.Drive, x: float) -> None".to_string(),
            comment: "Arcade drive.".to_string(),
        }]);
    }

    #[test]
    fn test_split_doc_without_signature() {
        let parser = SignatureParser::new();
        assert!(parser.split_overloads("arcade", "Arcade drive.\nMore text.").is_empty());
        assert!(parser.split_overloads("arcade", "").is_empty());
    }

    #[test]
    fn test_split_overloaded_doc_in_section_order() {
        let parser = SignatureParser::new();
        let doc = "set(*args, **kwargs)\nOverloaded function.\n\n\
            1. set(self: wpilib.Relay, on: bool) -> None\n\nTurns it on.\n\n\
            2. set(self: wpilib.Relay, value: int) -> None\n\nSets a level.\n\n\
            3. set(self: wpilib.Relay) -> None\n";

        let docs = parser.split_overloads("set", doc);
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].signature, "set(self: wpilib.Relay, on: bool) -> None");
        assert_eq!(docs[0].comment, "Turns it on.");
        assert_eq!(docs[1].signature, "set(self: wpilib.Relay, value: int) -> None");
        assert_eq!(docs[1].comment, "Sets a level.");
        assert_eq!(docs[2].signature, "set(self: wpilib.Relay) -> None");
        assert_eq!(docs[2].comment, "");
    }

    #[test]
    fn test_split_stops_at_first_missing_index() {
        let parser = SignatureParser::new();
        let doc = "f(*args, **kwargs)\nOverloaded function.\n\n\
            1. f(a: int) -> None\n\n\
            3. f(a: str) -> None\n";

        let docs = parser.split_overloads("f", doc);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].signature, "f(a: int) -> None");
        assert!(docs[0].comment.contains("3. f(a: str) -> None"));
    }

    #[test]
    fn test_addresses_are_stripped_from_defaults() {
        let parser = SignatureParser::new();
        let docs = parser.split_overloads(
            "attach",
            "attach(target: wpilib.Sendable = <wpilib.Sendable object at 0x7f1234abc>) -> None\n",
        );

        assert_eq!(docs.len(), 1);
        let sig = parser.parse(&docs[0].signature).unwrap();
        assert_eq!(sig.parameters[0].default.as_deref(), Some("<wpilib.Sendable>"));
    }

    #[test]
    fn test_getter_type() {
        let parser = SignatureParser::new();
        assert_eq!(
            parser.getter_type("(self: wpilib.Drive) -> wpimath.geometry.Pose2d\n"),
            Some("wpimath.geometry.Pose2d".to_string())
        );
        assert_eq!(parser.getter_type("no signature"), None);
    }

    #[test]
    fn test_referenced_types_skip_primitives() {
        let parser = SignatureParser::new();
        let sig = parser.parse(
            "drive(self: wpilib.Drive, speed: float, pose: wpimath.Pose2d, *args) -> bool"
        ).unwrap();
        assert_eq!(sig.referenced_types(), vec!["wpilib.Drive", "wpimath.Pose2d"]);
    }
}
