use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use agentidl_core::codegen::kebab_case;
use agentidl_core::config::{self, Config, CONFIG_FILE};
use agentidl_core::scenario::{Scenario, ScenarioRunner, ScriptedHandler};
use agentidl_core::validator::{self, Severity};
use agentidl_core::{model, parser, DocumentKind, Flavor, InterfaceModel, ValidationReport};

mod junit;

const EXIT_OK: i32 = 0;
const EXIT_FINDINGS: i32 = 1;
const EXIT_ERROR: i32 = 2;

/// AgentIDL: compile and check intent-annotated interface definitions
///
/// Generate clients, handlers and ontologies; validate definitions and
/// delegation/execution documents; run scenario tests.
#[derive(Parser)]
#[command(name = "agentidl", version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./agentidl.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print only failures
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum FlavorArg {
    Ts,
    Js,
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Delegation,
    Execution,
}

impl From<KindArg> for DocumentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Delegation => DocumentKind::DelegationContext,
            KindArg::Execution => DocumentKind::ExecutionRecord,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate client/handler modules, JSON-LD and Turtle
    Compile {
        /// Path to the IDL file
        file: PathBuf,
        /// Output directory
        #[arg(long, default_value = "generated")]
        out: PathBuf,
        /// Emission flavor (defaults to the configured flavor)
        #[arg(long, value_enum)]
        flavor: Option<FlavorArg>,
    },

    /// Print the interface model as JSON
    Model {
        /// Path to the IDL file
        file: PathBuf,
    },

    /// Check a definition against conformance rules
    Validate {
        /// Path to the IDL file
        file: PathBuf,
        /// Rule document (JSON or TOML)
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a delegation context or execution record
    Check {
        /// Path to the JSON document
        file: PathBuf,
        /// Document kind
        #[arg(long, value_enum)]
        kind: KindArg,
        /// Rule document (JSON or TOML)
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run scenario files or directories of them
    Test {
        /// Scenario files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Write a JUnit XML report
        #[arg(long)]
        junit: Option<PathBuf>,
    },

    /// Compute the model hash (SHA-256) of a definition
    Hash {
        /// Path to the IDL file
        file: PathBuf,
    },

    /// Show version information
    Version,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            EXIT_ERROR
        }
    };
    process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("AGENTIDL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> Result<i32> {
    let quiet = cli.quiet;
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Compile { file, out, flavor } => cmd_compile(&file, &out, flavor, &config, quiet),
        Commands::Model { file } => {
            let model = read_model(&file)?;
            println!("{}", serde_json::to_string_pretty(&model)?);
            Ok(EXIT_OK)
        }
        Commands::Validate { file, rules, json } => {
            cmd_validate(&file, rules.as_deref(), json, &config, quiet)
        }
        Commands::Check {
            file,
            kind,
            rules,
            json,
        } => cmd_check(&file, kind.into(), rules.as_deref(), json, &config, quiet),
        Commands::Test { paths, junit } => cmd_test(&paths, junit.as_deref(), &config, quiet).await,
        Commands::Hash { file } => {
            let model = read_model(&file)?;
            println!("{}", agentidl_core::model_hash(&model));
            Ok(EXIT_OK)
        }
        Commands::Version => {
            println!(
                "agentidl {} (agentidl-core {})",
                env!("CARGO_PKG_VERSION"),
                agentidl_core::VERSION
            );
            Ok(EXIT_OK)
        }
    }
}

// ── Helpers ───────────────────────────────────────────────

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return Ok(config::load_config(path)?);
    }
    let default = Path::new(CONFIG_FILE);
    if default.is_file() {
        Ok(config::load_config(default)?)
    } else {
        tracing::debug!("no {} in working directory; using defaults", CONFIG_FILE);
        Ok(Config::default())
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_model(path: &Path) -> Result<InterfaceModel> {
    let source = read_text(path)?;
    model::build_from_source(&source).with_context(|| format!("compiling {}", path.display()))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    tracing::debug!(path = %path.display(), bytes = contents.len(), "writing artifact");
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

fn print_report(label: &str, report: &ValidationReport, json: bool, quiet: bool) -> Result<()> {
    if json {
        let body = json!({
            "file": label,
            "valid": report.is_valid(),
            "findings": report.findings,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    for finding in &report.findings {
        match finding.severity {
            Severity::Error => println!("  {} {}", "✗".red(), finding),
            Severity::Warning if !quiet => println!("  {} {}", "!".yellow(), finding),
            Severity::Warning => {}
        }
    }
    if report.is_valid() {
        if !quiet {
            println!("{} {} is valid", "✓".green(), label);
        }
    } else {
        println!(
            "{} {}: {} error(s), {} warning(s)",
            "✗".red(),
            label,
            report.errors().len(),
            report.warnings().len()
        );
    }
    Ok(())
}

// ── Commands ──────────────────────────────────────────────

fn cmd_compile(file: &Path, out: &Path, flavor: Option<FlavorArg>, config: &Config, quiet: bool) -> Result<i32> {
    let flavors = match flavor {
        Some(FlavorArg::Ts) => vec![Flavor::TypeScript],
        Some(FlavorArg::Js) => vec![Flavor::JavaScript],
        Some(FlavorArg::All) => vec![Flavor::TypeScript, Flavor::JavaScript],
        None => vec![config.codegen.flavor.unwrap_or_default()],
    };
    let source = read_text(file)?;
    let artifacts = agentidl_core::compile(&source, &flavors, config.prefix_table())
        .with_context(|| format!("compiling {}", file.display()))?;

    fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    let mut written = Vec::new();
    for modules in &artifacts.modules {
        for module in [&modules.client, &modules.handlers] {
            let path = out.join(&module.file_name);
            write_file(&path, &module.source)?;
            written.push(path);
        }
    }
    let stem = kebab_case(&artifacts.model.name);
    let graph_path = out.join(format!("{}.jsonld", stem));
    write_file(&graph_path, &format!("{}\n", serde_json::to_string_pretty(&artifacts.graph)?))?;
    written.push(graph_path);
    let turtle_path = out.join(format!("{}.ttl", stem));
    write_file(&turtle_path, &artifacts.turtle)?;
    written.push(turtle_path);

    if !quiet {
        println!(
            "{} compiled {} ({} operations)",
            "✓".green(),
            artifacts.model.name,
            artifacts.model.operations.len()
        );
        for path in &written {
            println!("  wrote {}", path.display());
        }
    }
    Ok(EXIT_OK)
}

fn cmd_validate(file: &Path, rules: Option<&Path>, json: bool, config: &Config, quiet: bool) -> Result<i32> {
    let source = read_text(file)?;
    let definitions = parser::parse(&source).with_context(|| format!("parsing {}", file.display()))?;
    let rules = config.definition_rules(rules)?;
    let report = validator::validate_definition(&definitions, &rules)
        .with_context(|| format!("validating {}", file.display()))?;
    print_report(&file.display().to_string(), &report, json, quiet)?;
    Ok(if report.is_valid() { EXIT_OK } else { EXIT_FINDINGS })
}

fn cmd_check(
    file: &Path,
    kind: DocumentKind,
    rules: Option<&Path>,
    json: bool,
    config: &Config,
    quiet: bool,
) -> Result<i32> {
    let text = read_text(file)?;
    let rules = config.document_rules(kind, rules)?;
    let report = validator::validate_document_str(&text, &rules)
        .with_context(|| format!("checking {}", file.display()))?;
    print_report(&file.display().to_string(), &report, json, quiet)?;
    Ok(if report.is_valid() { EXIT_OK } else { EXIT_FINDINGS })
}

// ── Scenarios ─────────────────────────────────────────────

/// Scenario files under `paths`, directories searched recursively, sorted
fn collect_scenario_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("reading {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        entries.sort();
        for path in entries {
            if path.is_dir() {
                walk(&path, found)?;
            } else if path.extension().is_some_and(|ext| ext == "json") {
                found.push(path);
            }
        }
        Ok(())
    }

    let mut found = Vec::new();
    for path in paths {
        if path.is_dir() {
            walk(path, &mut found)?;
        } else if path.is_file() {
            found.push(path.clone());
        } else {
            bail!("no such file or directory: {}", path.display());
        }
    }
    Ok(found)
}

/// Scenarios in one file (a single object or an array), with file-relative
/// delegation references inlined
fn load_scenarios(path: &Path) -> Result<Vec<Scenario>> {
    let text = read_text(path)?;
    let value: Value = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let mut scenarios: Vec<Scenario> = match value {
        Value::Array(items) => serde_json::from_value(Value::Array(items)),
        other => serde_json::from_value(other).map(|s| vec![s]),
    }
    .with_context(|| format!("reading scenario {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for scenario in &mut scenarios {
        if let Some(Value::String(reference)) = &scenario.delegation {
            let doc_path = base.join(reference);
            let doc = read_text(&doc_path)?;
            scenario.delegation = Some(
                serde_json::from_str(&doc).with_context(|| format!("parsing {}", doc_path.display()))?,
            );
        }
    }
    Ok(scenarios)
}

async fn cmd_test(paths: &[PathBuf], junit_path: Option<&Path>, config: &Config, quiet: bool) -> Result<i32> {
    let files = collect_scenario_files(paths)?;
    if files.is_empty() {
        bail!("no scenario files found");
    }
    tracing::debug!(files = files.len(), "running scenario files");
    let runner = ScenarioRunner::new(
        config.document_rules(DocumentKind::DelegationContext, None)?,
        config.document_rules(DocumentKind::ExecutionRecord, None)?,
    );

    let mut cases = Vec::new();
    for file in &files {
        let suite = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let loaded = load_scenarios(file).and_then(|scenarios| {
            let base = file.parent().unwrap_or_else(|| Path::new("."));
            scenarios
                .into_iter()
                .map(|scenario| -> Result<(Scenario, InterfaceModel)> {
                    let model = read_model(&base.join(&scenario.definition))?;
                    Ok((scenario, model))
                })
                .collect::<Result<Vec<_>>>()
        });

        let scenarios = match loaded {
            Ok(scenarios) => scenarios,
            Err(e) => {
                println!("{} {}: {:#}", "ERROR".red().bold(), file.display(), e);
                cases.push(junit::Case {
                    suite,
                    result: junit::CaseResult::Broken {
                        name: file.display().to_string(),
                        message: format!("{:#}", e),
                    },
                });
                continue;
            }
        };

        for (scenario, model) in scenarios {
            let outcome = runner
                .run(&scenario, &model, |agent| {
                    ScriptedHandler::install_all(&scenario.handlers, agent)
                })
                .await;
            if outcome.passed {
                if !quiet {
                    println!("{} {}", "PASS".green().bold(), outcome.name);
                }
            } else {
                println!(
                    "{} {} (expected '{}', got '{}')",
                    "FAIL".red().bold(),
                    outcome.name,
                    outcome.expected_status,
                    outcome.actual_status
                );
                if let Some(error) = &outcome.error {
                    println!("  {}", error);
                }
            }
            if !quiet || !outcome.passed {
                for finding in &outcome.findings {
                    println!("  {}", finding);
                }
            }
            cases.push(junit::Case {
                suite: suite.clone(),
                result: junit::CaseResult::Ran(outcome),
            });
        }
    }

    let passed = cases
        .iter()
        .filter(|c| matches!(&c.result, junit::CaseResult::Ran(o) if o.passed))
        .count();
    let failed = cases.len() - passed;
    let summary = format!("{} passed, {} failed", passed, failed);
    if failed == 0 {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.red());
    }

    if let Some(path) = junit_path {
        write_file(path, &junit::render(&cases))?;
    }
    Ok(if failed == 0 { EXIT_OK } else { EXIT_FINDINGS })
}
