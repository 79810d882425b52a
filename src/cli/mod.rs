//! WG-014: CLI subcommands — init, validate, graph, projects, show, completions.

use crate::core::{graph, parser, types};
use crate::error::{GraphError, GraphResult};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "wsgraph",
    version,
    about = "Infer a project and task graph from the build descriptors in a workspace"
)]
pub struct Cli {
    /// Workspace root
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Ignore and do not update the inference cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter wsgraph.yaml into the workspace root
    Init,

    /// Validate wsgraph.yaml without running inference
    Validate,

    /// Build the graph and print it
    Graph {
        /// Print the full graph as JSON
        #[arg(long)]
        json: bool,
    },

    /// List inferred projects
    Projects,

    /// Show one project's merged definition as JSON
    Show {
        /// Project name
        name: String,
    },

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Dispatch a parsed command line.
pub fn dispatch(cli: Cli) -> GraphResult<()> {
    let use_cache = !cli.no_cache;
    match cli.command {
        Commands::Init => cmd_init(&cli.root),
        Commands::Validate => cmd_validate(&cli.root),
        Commands::Graph { json } => cmd_graph(&cli.root, use_cache, json),
        Commands::Projects => cmd_projects(&cli.root, use_cache),
        Commands::Show { name } => cmd_show(&cli.root, use_cache, &name),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "wsgraph", &mut std::io::stdout());
            Ok(())
        }
    }
}

const TEMPLATE: &str = r#"version: "1.0"

# Named input sets referenced by inferred targets.
named_inputs:
  default: ["{projectRoot}/**/*"]
  production: ["default"]

workspace_layout:
  apps_dir: apps
  libs_dir: libs

# Registration order is merge precedence: earlier plugins win.
plugins:
  - plugin: project-json
  - plugin: package-json
  - plugin: gradle

cache:
  enabled: true
  dir: .wsgraph/cache

exclude: []
"#;

fn cmd_init(root: &Path) -> GraphResult<()> {
    let config_path = root.join(parser::CONFIG_FILE);
    if config_path.exists() {
        return Err(GraphError::io(
            format!("creating {}", config_path.display()),
            std::io::ErrorKind::AlreadyExists.into(),
        ));
    }
    std::fs::write(&config_path, TEMPLATE)
        .map_err(|e| GraphError::io(format!("writing {}", config_path.display()), e))?;
    println!("Initialized wsgraph workspace at {}", root.display());
    println!("  Created: {}", config_path.display());
    Ok(())
}

fn cmd_validate(root: &Path) -> GraphResult<()> {
    let config_path = root.join(parser::CONFIG_FILE);
    let config = parser::parse_config_file(&config_path)?;
    let errors = parser::validate_config(&config);
    if errors.is_empty() {
        println!(
            "OK: {} ({} plugins, {} named inputs)",
            config_path.display(),
            config.plugins.len(),
            config.named_inputs.len()
        );
        return Ok(());
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err(GraphError::ConfigInvalid(
        errors.into_iter().map(|e| e.message).collect(),
    ))
}

fn load_graph(root: &Path, use_cache: bool) -> GraphResult<types::ProjectGraph> {
    let config = parser::load_workspace_config(root)?;
    let graph = graph::build_graph(root, &config, use_cache)?;
    for warning in graph.warnings() {
        eprintln!("  WARN: {}", warning);
    }
    Ok(graph)
}

fn cmd_graph(root: &Path, use_cache: bool, json: bool) -> GraphResult<()> {
    let graph = load_graph(root, use_cache)?;
    if json {
        let out = serde_json::to_string_pretty(&graph)
            .map_err(|e| GraphError::Serialize(e.to_string()))?;
        println!("{}", out);
    } else {
        print!("{}", render_summary(&graph));
    }
    Ok(())
}

fn cmd_projects(root: &Path, use_cache: bool) -> GraphResult<()> {
    let graph = load_graph(root, use_cache)?;
    print!("{}", render_project_list(&graph));
    Ok(())
}

fn cmd_show(root: &Path, use_cache: bool, name: &str) -> GraphResult<()> {
    let graph = load_graph(root, use_cache)?;
    let out = render_project(&graph, name)?;
    println!("{}", out);
    Ok(())
}

/// Human-readable graph summary.
pub fn render_summary(graph: &types::ProjectGraph) -> String {
    let mut out = String::new();
    let s = &graph.stats;
    let _ = writeln!(
        out,
        "Graph: {} projects, {} project edges, {} target edges",
        graph.projects.len(),
        graph.project_edges.len(),
        graph.target_edges.len()
    );
    let _ = writeln!(
        out,
        "Inference: {} files ({} cached, {} computed, {} failed)",
        s.files_matched, s.cache_hits, s.computed, s.failed
    );
    for (root, project) in &graph.projects {
        let _ = writeln!(out);
        let _ = writeln!(out, "{} ({})", project.name, root);
        for (name, target) in &project.targets {
            let what = target
                .command
                .as_deref()
                .or(target.executor.as_deref())
                .unwrap_or("-");
            let _ = writeln!(out, "  {}: {}", name, what);
        }
    }
    for edge in &graph.target_edges {
        if edge.from.project == edge.to.project {
            continue;
        }
        let _ = writeln!(out, "  {} -> {}", edge.from, edge.to);
    }
    out
}

/// One line per project: name, root, type.
pub fn render_project_list(graph: &types::ProjectGraph) -> String {
    let mut out = String::new();
    for (root, project) in &graph.projects {
        let kind = project
            .project_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "{:<30} {:<40} {}", project.name, root, kind);
    }
    out
}

/// A single project as pretty JSON, with its root.
pub fn render_project(graph: &types::ProjectGraph, name: &str) -> GraphResult<String> {
    let (root, project) = graph
        .project_by_name(name)
        .ok_or_else(|| GraphError::ProjectNotFound(name.to_string()))?;
    let value = serde_json::json!({ "root": root, "project": project });
    serde_json::to_string_pretty(&value).map_err(|e| GraphError::Serialize(e.to_string()))
}
