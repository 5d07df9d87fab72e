//! cascade CLI - command-line interface over cascade-core
//!
//! Usage:
//!   cascade stacks [root]
//!   cascade globals [root] --stack /stacks/web --format json
//!   cascade check [root]

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cascade_core::{list_stacks, load_stack_globals, syntax, StackEntry};

/// cascade - hierarchical globals for infrastructure stacks
#[derive(Parser)]
#[command(name = "cascade")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the stacks of a project
    Stacks {
        /// Project root directory
        #[arg(default_value = ".")]
        root: PathBuf,
    },

    /// Evaluate and print the globals of each stack
    Globals {
        /// Project root directory
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Only this stack (logical path, e.g. /stacks/web)
        #[arg(short, long)]
        stack: Option<String>,

        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Parse every configuration file and report problems
    Check {
        /// Project root directory
        #[arg(default_value = ".")]
        root: PathBuf,
    },
}

/// Run the CLI with the given arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Stacks { root } => cmd_stacks(&root),
        Commands::Globals {
            root,
            stack,
            format,
        } => cmd_globals(&root, stack.as_deref(), &format),
        Commands::Check { root } => cmd_check(&root),
    }
}

/// Turn a user-supplied root into the absolute path the core requires
fn absolute_root(root: &Path) -> Result<PathBuf, String> {
    std::fs::canonicalize(root)
        .map_err(|e| format!("cannot resolve project root {}: {}", root.display(), e))
}

fn load_stacks(root: &Path) -> Result<Vec<StackEntry>, String> {
    let stacks =
        list_stacks(root).map_err(|e| format!("discovering stacks in {}: {}", root.display(), e))?;
    if stacks.is_empty() {
        return Err(format!("no stacks found under {}", root.display()));
    }
    Ok(stacks)
}

fn cmd_stacks(root: &Path) -> ExitCode {
    let root = match absolute_root(root) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let stacks = match load_stacks(&root) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    for entry in stacks {
        if entry.meta.description.is_empty() {
            println!("{}", entry.meta.path);
        } else {
            println!("{}\t{}", entry.meta.path, entry.meta.description);
        }
    }
    ExitCode::SUCCESS
}

fn cmd_globals(root: &Path, only_stack: Option<&str>, format: &str) -> ExitCode {
    let root = match absolute_root(root) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let stacks = match load_stacks(&root) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let selected: Vec<&StackEntry> = match only_stack {
        Some(path) => {
            let Some(entry) = stacks.iter().find(|e| e.meta.path == path) else {
                eprintln!("{}: stack {} not found", "Error".red(), path);
                return ExitCode::from(2);
            };
            vec![entry]
        }
        None => stacks.iter().collect(),
    };

    let mut failed = false;
    for entry in selected {
        match load_stack_globals(&root, &entry.meta) {
            Ok(globals) => {
                let rendered = match format {
                    "json" => globals.to_json(),
                    _ => globals.to_yaml(),
                };
                match rendered {
                    Ok(content) => {
                        println!("{} {}", "stack".bold(), entry.meta.path);
                        print!("{}", content);
                        if !content.ends_with('\n') {
                            println!();
                        }
                    }
                    Err(e) => {
                        eprintln!("{}: {}", "Error".red(), e);
                        failed = true;
                    }
                }
            }
            Err(e) => {
                eprintln!("{} {}\n{}", "✗".red(), entry.meta.path, e);
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn cmd_check(root: &Path) -> ExitCode {
    let root = match absolute_root(root) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let mut all_valid = true;
    let walker = walkdir::WalkDir::new(&root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            e.file_name()
                .to_str()
                .map(|s| !s.starts_with('.'))
                .unwrap_or(true)
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                all_valid = false;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !syntax::is_config_file(name) {
            continue;
        }

        let path = entry.path();
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), path.display(), e);
                all_valid = false;
                continue;
            }
        };

        match syntax::parse_file(path.display().to_string(), &content) {
            Ok(_) => println!("{} {}", "✓".green(), path.display()),
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                all_valid = false;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
