//! Definition Loading
//!
//! Reads schema definition documents (JSON or TOML), merges them, and
//! resolves every field type into the closed [`TypeDescriptor`] model.
//!
//! ## Example definition (JSON)
//! ```text
//! {
//!   "enums": [{ "name": "Department", "values": ["HR", "IT"] }],
//!   "schemas": [{
//!     "name": "Employee",
//!     "description": "An employee record.",
//!     "fields": [
//!       { "name": "name", "type": "string", "description": "Full name." },
//!       { "name": "department", "type": "Department" },
//!       { "name": "salary", "type": "float", "max_digit": 6, "max_precision": 2 }
//!     ],
//!     "example": { "name": "Ada", "department": "IT" }
//!   }]
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{GrammarError, Result};

use super::expr;
use super::{
    EnumType, Field, Member, NumericConstraints, OpaqueClass, Schema, SchemaSet, TypeDescriptor,
};

// =============================================================================
// Definition documents
// =============================================================================

/// One definition document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionFile {
    #[serde(default)]
    pub schemas: Vec<SchemaDef>,
    #[serde(default)]
    pub enums: Vec<EnumType>,
    #[serde(default)]
    pub classes: Vec<ClassDef>,
    /// Compiled roots, in order (defaults to every schema)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roots: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    /// Type expression, e.g. `list<SkillSet>`
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub constraints: NumericConstraints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    #[serde(default)]
    pub members: Vec<MemberDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Copy)]
enum DeclKind {
    Schema,
    Enum,
    Class,
}

impl DefinitionFile {
    /// Parse a document; the format follows the file extension (`.toml`, else JSON)
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let is_toml = path.extension().map(|ext| ext == "toml").unwrap_or(false);
        if is_toml {
            Ok(toml::from_str(&content)?)
        } else {
            Ok(serde_json::from_str(&content)?)
        }
    }

    /// Append another document's declarations and roots
    pub fn merge(&mut self, other: DefinitionFile) {
        self.schemas.extend(other.schemas);
        self.enums.extend(other.enums);
        self.classes.extend(other.classes);
        self.roots.extend(other.roots);
    }

    /// Resolve every type expression into a [`SchemaSet`]
    pub fn resolve(self) -> Result<SchemaSet> {
        let mut kinds: HashMap<&str, DeclKind> = HashMap::new();
        let declared = self
            .schemas
            .iter()
            .map(|s| (s.name.as_str(), DeclKind::Schema))
            .chain(self.enums.iter().map(|e| (e.name.as_str(), DeclKind::Enum)))
            .chain(self.classes.iter().map(|c| (c.name.as_str(), DeclKind::Class)));
        for (name, kind) in declared {
            if kinds.insert(name, kind).is_some() {
                return Err(GrammarError::DuplicateDefinition {
                    kind: "name",
                    name: name.to_string(),
                });
            }
        }

        let enums: HashMap<&str, &EnumType> =
            self.enums.iter().map(|e| (e.name.as_str(), e)).collect();
        let lookup = |name: &str| -> Option<TypeDescriptor> {
            match kinds.get(name)? {
                DeclKind::Schema => Some(TypeDescriptor::record(name)),
                DeclKind::Class => Some(TypeDescriptor::opaque(name)),
                DeclKind::Enum => enums.get(name).map(|e| TypeDescriptor::Enum((*e).clone())),
            }
        };

        let mut set = SchemaSet::new();
        for enum_def in &self.enums {
            set.add_enum(enum_def.clone())?;
        }
        for class_def in &self.classes {
            let mut class = OpaqueClass::new(&class_def.name);
            for member in &class_def.members {
                class.members.push(Member {
                    name: member.name.clone(),
                    ty: expr::parse_type(&member.ty, &lookup)?,
                });
            }
            set.add_class(class)?;
        }
        for schema_def in &self.schemas {
            let mut schema = Schema::new(&schema_def.name);
            schema.description = schema_def.description.clone();
            schema.example = schema_def.example.clone();
            for field_def in &schema_def.fields {
                schema.fields.push(Field {
                    name: field_def.name.clone(),
                    ty: expr::parse_type(&field_def.ty, &lookup)?,
                    required: field_def.required,
                    description: field_def.description.clone(),
                    constraints: field_def.constraints,
                    pattern: field_def.pattern.clone(),
                    example: field_def.example.clone(),
                });
            }
            set.add_schema(schema)?;
        }
        set.set_roots(self.roots);

        debug!(
            schemas = self.schemas.len(),
            enums = self.enums.len(),
            classes = self.classes.len(),
            "Resolved definitions"
        );
        Ok(set)
    }
}

// =============================================================================
// Filesystem loading
// =============================================================================

fn is_definition_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "json" || ext == "toml")
        .unwrap_or(false)
}

/// Expand inputs into definition files. Directories are walked recursively
/// and their files sorted so the merged order is stable.
pub fn collect_definition_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_definition_file(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}

/// Load, merge and resolve every definition reachable from `inputs`
pub fn load_definitions(inputs: &[PathBuf]) -> Result<SchemaSet> {
    let mut merged = DefinitionFile::default();
    for path in collect_definition_paths(inputs)? {
        debug!(path = %path.display(), "Loading definitions");
        merged.merge(DefinitionFile::from_path(&path)?);
    }
    merged.resolve()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPLOYEE: &str = r#"{
        "enums": [{ "name": "Department", "values": ["Human Resources", "Sales"] }],
        "classes": [{ "name": "SkillSet", "members": [
            { "name": "primary_skill", "type": "str" },
            { "name": "secondary_skills", "type": "List[str]" }
        ]}],
        "schemas": [{
            "name": "Employee",
            "fields": [
                {
                    "name": "name", "type": "string", "description": "Name of the employee.",
                    "pattern": "[A-Z][a-z]+"
                },
                { "name": "department", "type": "Department" },
                { "name": "skills", "type": "SkillSet" },
                {
                    "name": "salary", "type": "float", "required": false,
                    "max_digit": 6, "min_precision": 1
                }
            ]
        }]
    }"#;

    #[test]
    fn test_resolve_json_document() {
        let file: DefinitionFile = serde_json::from_str(EMPLOYEE).unwrap();
        let set = file.resolve().unwrap();
        let employee = set.schema("Employee").unwrap();

        assert_eq!(employee.fields.len(), 4);
        assert_eq!(employee.fields[0].pattern.as_deref(), Some("[A-Z][a-z]+"));
        assert!(matches!(&employee.fields[1].ty, TypeDescriptor::Enum(e) if e.values.len() == 2));
        assert_eq!(employee.fields[2].ty, TypeDescriptor::opaque("SkillSet"));
        assert!(!employee.fields[3].required);
        assert_eq!(employee.fields[3].constraints.max_digit, Some(6));
        assert_eq!(employee.fields[3].constraints.min_precision, Some(1));
        assert_eq!(set.class("SkillSet").unwrap().members.len(), 2);
    }

    #[test]
    fn test_resolve_toml_document() {
        let source = r#"
            roots = ["Ping"]

            [[schemas]]
            name = "Ping"
            [[schemas.fields]]
            name = "count"
            type = "int"
            min_digit = 2

            [[schemas]]
            name = "Unused"
        "#;
        let file: DefinitionFile = toml::from_str(source).unwrap();
        let set = file.resolve().unwrap();
        let roots = set.roots().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].fields[0].constraints.min_digit, Some(2));
    }

    #[test]
    fn test_unknown_type_fails_resolution() {
        let source =
            r#"{ "schemas": [{ "name": "A", "fields": [{ "name": "x", "type": "Mystery" }] }] }"#;
        let file: DefinitionFile = serde_json::from_str(source).unwrap();
        assert!(matches!(file.resolve(), Err(GrammarError::UnsupportedType { .. })));
    }

    #[test]
    fn test_enum_without_values_fails_resolution() {
        let source = r#"{
            "schemas": [{ "name": "A", "fields": [{ "name": "kind", "type": "Kind" }] }],
            "enums": [{ "name": "Kind", "values": [] }]
        }"#;
        let file: DefinitionFile = serde_json::from_str(source).unwrap();
        assert!(matches!(file.resolve(), Err(GrammarError::EmptyEnum { .. })));
    }

    #[test]
    fn test_duplicate_declarations_fail() {
        let source = r#"{
            "schemas": [{ "name": "A" }],
            "enums": [{ "name": "A", "values": ["x"] }]
        }"#;
        let file: DefinitionFile = serde_json::from_str(source).unwrap();
        assert!(matches!(file.resolve(), Err(GrammarError::DuplicateDefinition { .. })));
    }

    #[test]
    fn test_load_directory_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), r#"{ "schemas": [{ "name": "Second" }] }"#).unwrap();
        fs::write(dir.path().join("a.json"), r#"{ "schemas": [{ "name": "First" }] }"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let set = load_definitions(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = set.schemas().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }
}
