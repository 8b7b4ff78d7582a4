//! Schema Grammar CLI
//!
//! Compiles schema definition files into a GBNF grammar plus documentation.
//!
//! Usage:
//!   schema-gbnf compile -i schemas/ --tag function --content params
//!   schema-gbnf print -i person.json --docs
//!   schema-gbnf check -i schemas/ --against generated_grammar.gbnf
//!   schema-gbnf config --init gbnf.toml

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use schema_gbnf::{generate, load_definitions, save_configured, GrammarConfig, SchemaSet};
use similar::{ChangeTag, TextDiff};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-gbnf")]
#[command(about = "Compile record schemas into GBNF grammars and documentation")]
struct Cli {
    /// Config file to load (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by every compiling command
#[derive(Args)]
struct Inputs {
    /// Definition files or directories (.json / .toml)
    #[arg(short, long = "input", required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// Root schemas to compile, in order (default: the files' roots, else all)
    #[arg(short, long = "root")]
    roots: Vec<String>,

    /// Discriminator key for tagged dispatch
    #[arg(long, requires = "content")]
    tag: Option<String>,

    /// Content key for tagged dispatch
    #[arg(long, requires = "tag")]
    content: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and write the grammar and documentation
    Compile {
        #[command(flatten)]
        inputs: Inputs,

        /// Grammar output path
        #[arg(long)]
        grammar: Option<PathBuf>,

        /// Documentation output path
        #[arg(long)]
        docs: Option<PathBuf>,
    },

    /// Print the grammar (or documentation) to stdout
    Print {
        #[command(flatten)]
        inputs: Inputs,

        /// Print documentation instead of the grammar
        #[arg(long)]
        docs: bool,
    },

    /// Recompile and compare against a stored grammar
    Check {
        #[command(flatten)]
        inputs: Inputs,

        /// Stored grammar file
        #[arg(long)]
        against: PathBuf,
    },

    /// Show the effective configuration, or write the defaults
    Config {
        /// Write default configuration to this path
        #[arg(long)]
        init: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = GrammarConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Compile {
            inputs,
            grammar,
            docs,
        } => {
            let set = prepare(&inputs, &mut config)?;
            if let Some(path) = grammar {
                config.output.grammar_path = path;
            }
            if let Some(path) = docs {
                config.output.documentation_path = path;
            }

            let artifacts = generate(&set, &config)?;
            let report = save_configured(&artifacts, &config);
            for failure in report.failures() {
                eprintln!("⚠️  {}", failure);
            }
            if let Ok(path) = &report.grammar {
                println!("✅ Grammar written to {}", path.display());
            }
            if let Ok(path) = &report.documentation {
                println!("✅ Documentation written to {}", path.display());
            }
            Ok(if report.is_complete() { 0 } else { 1 })
        }

        Commands::Print { inputs, docs } => {
            let set = prepare(&inputs, &mut config)?;
            let artifacts = generate(&set, &config)?;
            if docs {
                print!("{}", artifacts.documentation);
            } else {
                println!("{}", artifacts.grammar);
            }
            Ok(0)
        }

        Commands::Check { inputs, against } => {
            let set = prepare(&inputs, &mut config)?;
            let artifacts = generate(&set, &config)?;
            let stored = fs::read_to_string(&against)
                .with_context(|| format!("Failed to read {}", against.display()))?;
            Ok(report_drift(stored.trim_end(), &artifacts.grammar))
        }

        Commands::Config { init } => {
            if let Some(path) = init {
                GrammarConfig::default()
                    .save(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("✅ Default configuration written to {}", path.display());
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
            Ok(0)
        }
    }
}

/// Load definitions and apply command-line overrides
fn prepare(inputs: &Inputs, config: &mut GrammarConfig) -> anyhow::Result<SchemaSet> {
    let mut set = load_definitions(&inputs.inputs).context("Failed to load schema definitions")?;
    if set.is_empty() {
        bail!("No schemas found in the given inputs");
    }
    if !inputs.roots.is_empty() {
        set.set_roots(inputs.roots.iter().cloned());
    }
    if let (Some(tag), Some(content)) = (&inputs.tag, &inputs.content) {
        config.dispatch.tag_key = Some(tag.clone());
        config.dispatch.content_key = Some(content.clone());
    }
    Ok(set)
}

/// Print a line diff; exit code 1 when the grammars differ
fn report_drift(stored: &str, current: &str) -> i32 {
    if stored == current {
        eprintln!("✅ No drift detected - grammar is in sync");
        return 0;
    }

    let diff = TextDiff::from_lines(stored, current);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => continue,
        };
        print!("{}{}", sign, change);
        if change.missing_newline() {
            println!();
        }
    }
    eprintln!("\n⚠️  Grammar drift detected - regenerate the grammar");
    1
}
