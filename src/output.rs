//! Artifact generation and sinks
//!
//! [`generate`] produces the grammar and documentation text as independent
//! strings. [`save`] writes them; each write is attempted on its own and a
//! failure is logged and reported, never propagated.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::config::GrammarConfig;
use crate::docs::generate_documentation;
use crate::error::{Result, SinkWriteError};
use crate::grammar::GrammarCompiler;
use crate::schema::SchemaSet;

/// Grammar and documentation text of one compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub grammar: String,
    pub documentation: String,
}

/// Outcome of writing each artifact
#[derive(Debug)]
pub struct SaveReport {
    pub grammar: std::result::Result<PathBuf, SinkWriteError>,
    pub documentation: std::result::Result<PathBuf, SinkWriteError>,
}

impl SaveReport {
    pub fn is_complete(&self) -> bool {
        self.grammar.is_ok() && self.documentation.is_ok()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SinkWriteError> {
        [&self.grammar, &self.documentation]
            .into_iter()
            .filter_map(|r| r.as_ref().err())
    }
}

/// Compile the grammar and render the documentation for `set`
pub fn generate(set: &SchemaSet, config: &GrammarConfig) -> Result<Artifacts> {
    let grammar = GrammarCompiler::new(config.compile_options()).compile(set)?;
    let documentation = generate_documentation(set, &config.doc_options())?;
    Ok(Artifacts {
        grammar: grammar.text(),
        documentation,
    })
}

fn write_artifact(
    artifact: &'static str,
    path: &Path,
    content: &str,
) -> std::result::Result<PathBuf, SinkWriteError> {
    let sink_error = |source| SinkWriteError {
        artifact,
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(sink_error)?;
    }
    fs::write(path, content).map_err(sink_error)?;
    Ok(path.to_path_buf())
}

fn logged(
    result: std::result::Result<PathBuf, SinkWriteError>,
) -> std::result::Result<PathBuf, SinkWriteError> {
    match &result {
        Ok(path) => info!(path = %path.display(), "Wrote artifact"),
        Err(e) => error!(error = %e, "Failed to write artifact"),
    }
    result
}

/// Write both artifacts; one failing does not stop the other
pub fn save(artifacts: &Artifacts, grammar_path: &Path, documentation_path: &Path) -> SaveReport {
    let grammar = logged(write_artifact("grammar", grammar_path, &artifacts.grammar));
    let documentation = logged(write_artifact(
        "documentation",
        documentation_path,
        &artifacts.documentation,
    ));
    SaveReport {
        grammar,
        documentation,
    }
}

/// [`save`] to the configured output paths
pub fn save_configured(artifacts: &Artifacts, config: &GrammarConfig) -> SaveReport {
    save(
        artifacts,
        &config.output.grammar_path,
        &config.output.documentation_path,
    )
}
