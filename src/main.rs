use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use decl_patcher::config::{
    apply_manifest, check_manifest, discover_manifests, load_from_path, PatchResult, RunError,
};
use decl_patcher::{check, plan, ErrorKind, Item, PatchError, SyntaxTree};
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "decl-patcher")]
#[command(about = "Replace and verify named declarations in Python files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace a function in a file
    Apply {
        /// Python file to patch
        #[arg(short, long, env = "FILE_PATH")]
        file: PathBuf,

        /// Name of the function to replace
        #[arg(long, env = "FUNCTION_NAME")]
        name: String,

        /// Replacement source, or the path of a file containing it
        #[arg(short, long, env = "NEW_FUNCTION")]
        replacement: String,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Check that a function is defined anywhere in a file
    Verify {
        /// Python file to check
        #[arg(short, long, env = "FILE_PATH")]
        file: PathBuf,

        /// Name of the function to look for
        #[arg(long, env = "FUNCTION_NAME")]
        name: String,
    },

    /// List the declarations the patcher can address in a file
    List {
        /// Python file to inspect
        #[arg(short, long, env = "FILE_PATH")]
        file: PathBuf,
    },

    /// Apply every patch in a manifest (or directory of manifests)
    Run {
        /// Manifest file or directory (defaults to <workspace>/patches)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Workspace root for workspace-relative manifests (defaults to cwd)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Dry run - report pending patches without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Emit a JSON report instead of status lines
        #[arg(long)]
        json: bool,
    },

    /// Report which manifest patches are applied, pending, or failing
    Status {
        /// Manifest file or directory (defaults to <workspace>/patches)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Workspace root for workspace-relative manifests (defaults to cwd)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Emit a JSON report instead of status lines
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            file,
            name,
            replacement,
            dry_run,
            diff,
        } => cmd_apply(&file, &name, &replacement, dry_run, diff),

        Commands::Verify { file, name } => cmd_verify(&file, &name),

        Commands::List { file } => cmd_list(&file),

        Commands::Run {
            manifest,
            workspace,
            dry_run,
            diff,
            json,
        } => cmd_run(manifest, workspace, dry_run, diff, json),

        Commands::Status {
            manifest,
            workspace,
            json,
        } => cmd_run(manifest, workspace, true, false, json),
    }
}

/// Print a failure and exit with the status for its kind.
fn fail(message: &str, kind: ErrorKind) -> ! {
    eprintln!("{} {}", "✗".red(), message);
    std::process::exit(kind.exit_code());
}

fn print_patch_hints(error: &PatchError) {
    match error {
        PatchError::NotFound { .. } => {
            eprintln!("  {}", "NOT FOUND: no function with that name".red());
            eprintln!("  Searched: module level and directly inside each class body");
            eprintln!("  Possible causes:");
            eprintln!("    - Function was renamed or removed");
            eprintln!("    - Function is nested deeper than one class level");
        }
        PatchError::InvalidSource { .. }
        | PatchError::InvalidReplacement { .. }
        | PatchError::InvalidResult { .. } => {
            eprintln!("  {}", "INVALID SYNTAX: file left unchanged".red());
        }
        _ => {}
    }
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn cmd_apply(
    file: &Path,
    name: &str,
    replacement: &str,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let plan = match plan(file, name, replacement) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            print_patch_hints(&e);
            std::process::exit(e.kind().exit_code());
        }
    };

    let location = format!("{}, line {}", plan.location, plan.line);

    if plan.is_noop() {
        println!(
            "{} {}: already up to date in {} ({})",
            "⊙".yellow(),
            name,
            file.display(),
            location.dimmed()
        );
        println!("Update completed successfully");
        return Ok(());
    }

    if show_diff || dry_run {
        display_diff(file, &plan.original, &plan.patched);
    }

    if dry_run {
        println!(
            "{} {}: would replace in {} ({})",
            "✓".green(),
            name,
            file.display(),
            location.dimmed()
        );
        return Ok(());
    }

    if let Err(e) = plan.edit.apply() {
        let e = PatchError::from(e);
        fail(&e.to_string(), e.kind());
    }

    println!(
        "{} {}: replaced in {} ({})",
        "✓".green(),
        name,
        file.display(),
        location.dimmed()
    );
    println!("Update completed successfully");
    Ok(())
}

fn cmd_verify(file: &Path, name: &str) -> Result<()> {
    match check(file, name) {
        Ok(found) => {
            println!(
                "{} {}: found in {} at line {}",
                "✓".green(),
                name,
                file.display(),
                found.line
            );
            println!("Update successful");
            Ok(())
        }
        Err(e) => fail(&e.to_string(), e.kind()),
    }
}

fn cmd_list(file: &Path) -> Result<()> {
    let source = match fs::read_to_string(file) {
        Ok(source) => source,
        Err(e) => fail(
            &format!("failed to read {}: {}", file.display(), e),
            ErrorKind::Io,
        ),
    };
    let tree = match SyntaxTree::parse(source) {
        Ok(tree) => tree,
        Err(e) => fail(
            &format!("invalid syntax in {}: {}", file.display(), e),
            ErrorKind::Parse,
        ),
    };

    println!("{}", file.display().to_string().bold());
    for item in tree.items() {
        match item {
            Item::Function(func) => {
                println!("{:>5}  def {}", func.line, func.name);
            }
            Item::Class(class) => {
                println!("{:>5}  class {}", class.line, class.name.bold());
                for member in &class.members {
                    if let Item::Function(func) = member {
                        println!("{:>5}    def {}", func.line, func.name);
                    }
                }
            }
            Item::Other(_) => {}
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct ReportEntry {
    manifest: PathBuf,
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<PatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ErrorKind>,
}

fn cmd_run(
    manifest: Option<PathBuf>,
    workspace: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
    json: bool,
) -> Result<()> {
    let workspace = match workspace.map_or_else(env::current_dir, Ok) {
        Ok(path) => path,
        Err(e) => fail(
            &format!("failed to determine working directory: {}", e),
            ErrorKind::Io,
        ),
    };
    let manifest_arg = manifest.unwrap_or_else(|| workspace.join("patches"));
    let manifests = match discover_manifests(&manifest_arg) {
        Ok(manifests) => manifests,
        Err(e) => fail(&e.to_string(), ErrorKind::Io),
    };

    let mut report = Vec::new();
    let mut first_failure: Option<ErrorKind> = None;
    let (mut applied, mut already, mut pending, mut failed) = (0, 0, 0, 0);

    for manifest_path in manifests {
        let config = match load_from_path(&manifest_path) {
            Ok(config) => config,
            Err(e) => fail(&e.to_string(), ErrorKind::Io),
        };

        if !json {
            println!("Loading patches from {}...", manifest_path.display());
            if dry_run {
                println!("{}", "  [DRY RUN - nothing will be written]".cyan());
            }
        }

        // Only read target files when a diff was requested
        let before: Vec<Option<String>> = config
            .patches
            .iter()
            .map(|p| {
                let path = target_path(config.meta.workspace_relative, &workspace, &p.file);
                show_diff
                    .then(|| fs::read_to_string(path).ok())
                    .flatten()
            })
            .collect();

        let results = if dry_run {
            check_manifest(&config, &workspace)
        } else {
            apply_manifest(&config, &workspace)
        };

        for ((id, result), before) in results.into_iter().zip(before) {
            match &result {
                Ok(PatchResult::Applied { file, location }) => {
                    applied += 1;
                    if !json {
                        println!(
                            "{} {}: Applied to {} ({})",
                            "✓".green(),
                            id,
                            file.display(),
                            location.dimmed()
                        );
                        if let (Some(before), Ok(after)) = (&before, fs::read_to_string(file)) {
                            if before != &after {
                                display_diff(file, before, &after);
                            }
                        }
                    }
                }
                Ok(PatchResult::AlreadyApplied { file }) => {
                    already += 1;
                    if !json {
                        println!(
                            "{} {}: Already applied to {}",
                            "⊙".yellow(),
                            id,
                            file.display()
                        );
                    }
                }
                Ok(PatchResult::Pending { file, location }) => {
                    pending += 1;
                    if !json {
                        println!(
                            "{} {}: Would apply to {} ({})",
                            "⊘".cyan(),
                            id,
                            file.display(),
                            location.dimmed()
                        );
                    }
                }
                Err(e) => {
                    failed += 1;
                    first_failure.get_or_insert(e.kind());
                    if !json {
                        eprintln!("{} {}: {}", "✗".red(), id, e);
                        if let RunError::Patch(patch_error) = e {
                            print_patch_hints(patch_error);
                        }
                    }
                }
            }

            let (result, error, kind) = match result {
                Ok(result) => (Some(result), None, None),
                Err(e) => (None, Some(e.to_string()), Some(e.kind())),
            };
            report.push(ReportEntry {
                manifest: manifest_path.clone(),
                id,
                result,
                error,
                kind,
            });
        }

        if !json {
            println!();
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", "Summary:".bold());
        println!("  {} applied", format!("{}", applied).green());
        println!("  {} already applied", format!("{}", already).yellow());
        if dry_run {
            println!("  {} pending", format!("{}", pending).cyan());
        }
        println!("  {} failed", format!("{}", failed).red());
    }

    if let Some(kind) = first_failure {
        std::process::exit(kind.exit_code());
    }

    Ok(())
}

fn target_path(workspace_relative: bool, workspace: &Path, file: &str) -> PathBuf {
    if workspace_relative {
        workspace.join(file)
    } else {
        PathBuf::from(file)
    }
}
