//! Documentation Generation
//!
//! Human-readable descriptions of the root schemas, rendered either as
//! indented text (the layout LLM prompts embed next to the grammar) or as
//! Markdown. Independent of grammar compilation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::grammar::names::canonicalize;
use crate::schema::{Field, Schema, SchemaSet, TypeDescriptor};

const SCHEMA_FALLBACK: &str = "No specific description available.";
const FIELD_FALLBACK: &str = "No description available.";
const TEXT_INDENT: &str = "    ";
const MARKDOWN_INDENT: &str = "  ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocFormat {
    #[default]
    Text,
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocOptions {
    /// Heading label for each schema in text output
    pub model_prefix: String,
    /// Label of the field list in text output
    pub fields_prefix: String,
    pub format: DocFormat,
}

impl Default for DocOptions {
    fn default() -> Self {
        Self {
            model_prefix: "Output Model".to_string(),
            fields_prefix: "Output Fields".to_string(),
            format: DocFormat::Text,
        }
    }
}

/// Document every root schema of `set`
pub fn generate_documentation(set: &SchemaSet, options: &DocOptions) -> Result<String> {
    let roots = set.roots()?;
    let mut writer = DocWriter {
        set,
        options,
        output: String::new(),
        path: Vec::new(),
    };
    for schema in &roots {
        match options.format {
            DocFormat::Text => writer.text_schema(schema)?,
            DocFormat::Markdown => writer.markdown_schema(schema)?,
        }
    }
    debug!(schemas = roots.len(), format = ?options.format, "Generated documentation");
    Ok(writer.output)
}

/// Indent every line of `text` by `level` text indentation units
fn indent_block(text: &str, level: usize) -> String {
    let indent = TEXT_INDENT.repeat(level);
    format!("{}{}", indent, text.replace('\n', &format!("\n{}", indent)))
}

/// Strings quoted, everything else as JSON
fn example_text(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        other => other.to_string(),
    }
}

/// The schema a field's details expand into, through lists and optionals
fn nested_record(ty: &TypeDescriptor) -> Option<&str> {
    match ty {
        TypeDescriptor::Record(name) => Some(name),
        TypeDescriptor::Array(element) => nested_record(element),
        TypeDescriptor::Union { variants, .. } if variants.len() == 1 => {
            nested_record(&variants[0])
        }
        _ => None,
    }
}

struct DocWriter<'a> {
    set: &'a SchemaSet,
    options: &'a DocOptions,
    output: String,
    /// Schemas currently being expanded, for the cycle guard
    path: Vec<&'a str>,
}

impl<'a> DocWriter<'a> {
    /// Nested schema to expand under `field`, unless already on the path
    fn details_of(&self, field: &Field) -> Result<Option<&'a Schema>> {
        let set = self.set;
        match nested_record(&field.ty) {
            Some(name) if !self.path.iter().any(|seen| *seen == name) => {
                Ok(Some(set.schema(name)?))
            }
            _ => Ok(None),
        }
    }

    // =========================================================================
    // Text
    // =========================================================================

    fn text_schema(&mut self, schema: &'a Schema) -> Result<()> {
        let name = canonicalize(&schema.name);
        let description = schema.description.as_deref().unwrap_or(SCHEMA_FALLBACK);

        self.output.push_str(&format!("{}: {}\n", self.options.model_prefix, name));
        self.output.push_str("  Description:\n");
        self.output.push_str(&format!("{}\n\n", indent_block(description, 2)));
        self.output.push_str(&format!("  {}:\n", self.options.fields_prefix));

        self.path.push(&schema.name);
        for field in &schema.fields {
            self.text_field(schema, field, 1)?;
        }
        self.path.pop();
        self.output.push('\n');

        if let Some(example) = &schema.example {
            let json = serde_json::to_string(example)?;
            self.output.push_str(&format!("  Expected Example Output for {}:\n", name));
            self.output.push_str(&format!("{}\n", indent_block(&json, 2)));
        }
        Ok(())
    }

    fn text_field(&mut self, owner: &'a Schema, field: &'a Field, depth: usize) -> Result<()> {
        let indent = TEXT_INDENT.repeat(depth);
        let description = field.description.as_deref().unwrap_or(FIELD_FALLBACK);

        self.output.push_str(&format!("{}{} ({}):\n", indent, field.name, field.ty));
        self.output.push_str(&format!("{}  Description: {}\n", indent, description));
        if let Some(example) = owner.example_for(field) {
            self.output.push_str(&format!("{}  Example: {}\n", indent, example_text(example)));
        }

        if let Some(nested) = self.details_of(field)? {
            self.output.push_str(&format!("{}  Details:\n", indent));
            self.path.push(&nested.name);
            for child in &nested.fields {
                self.text_field(nested, child, depth + 2)?;
            }
            self.path.pop();
        }
        Ok(())
    }

    // =========================================================================
    // Markdown
    // =========================================================================

    fn markdown_schema(&mut self, schema: &'a Schema) -> Result<()> {
        let description = schema.description.as_deref().unwrap_or(SCHEMA_FALLBACK);
        self.output.push_str(&format!("### {}\n", canonicalize(&schema.name)));
        self.output.push_str(&format!("{}\n\n", description));
        self.output.push_str("#### Fields\n");

        self.path.push(&schema.name);
        for field in &schema.fields {
            self.markdown_field(field, 1)?;
        }
        self.path.pop();
        self.output.push('\n');
        Ok(())
    }

    fn markdown_field(&mut self, field: &'a Field, depth: usize) -> Result<()> {
        let indent = MARKDOWN_INDENT.repeat(depth);
        let description = field.description.as_deref().unwrap_or(FIELD_FALLBACK);
        self.output.push_str(&format!(
            "{}- **{}** (`{}`): {}\n",
            indent, field.name, field.ty, description
        ));

        if let Some(nested) = self.details_of(field)? {
            self.output.push_str(&format!("{}  - Details:\n", indent));
            self.path.push(&nested.name);
            for child in &nested.fields {
                self.markdown_field(child, depth + 2)?;
            }
            self.path.pop();
        }
        Ok(())
    }
}
