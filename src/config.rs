//! Configuration management for grammar generation
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (gbnf.toml)
//! - Environment variables (GBNF__*)
//!
//! ## Example config file (gbnf.toml):
//! ```toml
//! [output]
//! grammar_path = "./generated_grammar.gbnf"
//! documentation_path = "./generated_grammar_documentation.md"
//!
//! [dispatch]
//! tag_key = "function"
//! content_key = "params"
//!
//! [documentation]
//! model_prefix = "Function"
//! fields_prefix = "Parameters"
//! format = "text"
//!
//! [compiler]
//! max_depth = 64
//! optional_fields = "omit_key"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::docs::DocOptions;
use crate::grammar::{CompileOptions, OptionalFieldStyle, TaggedDispatch, DEFAULT_MAX_DEPTH};

/// Main configuration for grammar generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrammarConfig {
    /// Where the artifacts are written
    #[serde(default)]
    pub output: OutputConfig,

    /// Tagged-dispatch keys
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Documentation rendering
    #[serde(default)]
    pub documentation: DocOptions,

    /// Compiler behavior
    #[serde(default)]
    pub compiler: CompilerConfig,
}

/// Artifact destinations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_grammar_path")]
    pub grammar_path: PathBuf,

    #[serde(default = "default_documentation_path")]
    pub documentation_path: PathBuf,
}

/// Discriminator and content keys; tagged mode needs both
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Maximum nesting of schema/class expansions
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default)]
    pub optional_fields: OptionalFieldStyle,
}

// Default value functions
fn default_grammar_path() -> PathBuf {
    PathBuf::from("./generated_grammar.gbnf")
}

fn default_documentation_path() -> PathBuf {
    PathBuf::from("./generated_grammar_documentation.md")
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            grammar_path: default_grammar_path(),
            documentation_path: default_documentation_path(),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            optional_fields: OptionalFieldStyle::default(),
        }
    }
}

impl DispatchConfig {
    /// The tagged-dispatch envelope, when both keys are set
    pub fn tagged(&self) -> Option<TaggedDispatch> {
        match (&self.tag_key, &self.content_key) {
            (Some(tag), Some(content)) => Some(TaggedDispatch::new(tag.clone(), content.clone())),
            (None, None) => None,
            _ => {
                warn!("Only one of tag_key/content_key is set; using plain root alternation");
                None
            }
        }
    }
}

impl GrammarConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering a specific file over the default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["gbnf.toml", ".gbnf.toml", "config/gbnf.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "schema-gbnf") {
            let xdg_config = config_dir.config_dir().join("gbnf.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        // Load from environment variables (GBNF__*)
        builder = builder.add_source(
            Environment::with_prefix("GBNF")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            dispatch: self.dispatch.tagged(),
            optional_fields: self.compiler.optional_fields,
            max_depth: self.compiler.max_depth,
        }
    }

    pub fn doc_options(&self) -> DocOptions {
        self.documentation.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::DocFormat;

    #[test]
    fn test_default_config() {
        let config = GrammarConfig::default();
        assert_eq!(config.output.grammar_path, PathBuf::from("./generated_grammar.gbnf"));
        assert_eq!(config.documentation.model_prefix, "Output Model");
        assert_eq!(config.compile_options(), CompileOptions::default());
    }

    #[test]
    fn test_serialize_config() {
        let config = GrammarConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[compiler]"));
        assert!(toml_str.contains("optional_fields = \"omit_key\""));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: GrammarConfig = toml::from_str(
            r#"
            [dispatch]
            tag_key = "function"
            content_key = "params"

            [documentation]
            format = "markdown"
            "#,
        )
        .unwrap();

        assert_eq!(config.documentation.format, DocFormat::Markdown);
        assert_eq!(config.documentation.fields_prefix, "Output Fields");
        assert_eq!(config.compiler.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(
            config.compile_options().dispatch,
            Some(TaggedDispatch::new("function", "params"))
        );
    }

    #[test]
    fn test_half_dispatch_is_plain() {
        let dispatch = DispatchConfig {
            tag_key: Some("kind".into()),
            content_key: None,
        };
        assert!(dispatch.tagged().is_none());
    }

    #[test]
    fn test_save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gbnf.toml");

        let mut config = GrammarConfig::default();
        config.compiler.optional_fields = OptionalFieldStyle::NullableValue;
        config.compiler.max_depth = 8;
        config.save(&path).unwrap();

        let loaded = GrammarConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.compiler.optional_fields, OptionalFieldStyle::NullableValue);
        assert_eq!(loaded.compiler.max_depth, 8);
    }
}
