//! Command-line interface for playlint.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{self, LintConfig};
use crate::lint::{normalize_path, LintFile, Runner};
use crate::report;
use crate::rules::default_rules;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Directories never treated as holding playbooks when a directory is linted.
const SKIPPED_DIRS: &[&str] = &["roles", "group_vars", "host_vars", "files", "templates"];

/// Lint Ansible playbooks and the roles and task files they reach.
#[derive(Parser)]
#[command(name = "playlint")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lint playbooks
    #[command(visible_alias = "check")]
    Lint(LintArgs),
    /// List the available rules
    Rules(ListArgs),
    /// List the available tags and the rules carrying them
    Tags(ListArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Arguments for the lint command.
#[derive(Parser)]
pub struct LintArgs {
    /// Playbooks to lint; directories are searched for playbooks
    #[arg(required = true)]
    pub playbooks: Vec<PathBuf>,

    /// Only run rules carrying these tags or ids
    #[arg(short, long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Skip rules carrying these tags or ids
    #[arg(short = 'x', long = "skip-list", value_delimiter = ',')]
    pub skip_list: Vec<String>,

    /// Path to configuration file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Show suppressed matches in output
    #[arg(long)]
    pub show_suppressed: bool,

    /// Lint files in parallel
    #[arg(long)]
    pub parallel: bool,
}

/// Arguments for the listing commands.
#[derive(Parser)]
pub struct ListArgs {
    /// Path to configuration file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Initialise logging; `RUST_LOG` still takes effect.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// Load the explicit configuration file or the one found in the working
/// directory, falling back to defaults.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<LintConfig> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => config::discover(Path::new(".")),
    };

    let config = match path {
        Some(path) => {
            log::info!("using configuration {}", path.display());
            LintConfig::parse_file(&path)
                .map_err(|e| anyhow::anyhow!("error parsing {}: {}", path.display(), e))?
        }
        None => LintConfig::default(),
    };

    config::validate(&config)?;
    Ok(config)
}

/// Expand the command-line paths into entry playbooks.
fn collect_playbooks(paths: &[PathBuf]) -> anyhow::Result<Vec<LintFile>> {
    let mut playbooks = Vec::new();

    for path in paths {
        if !path.is_dir() {
            playbooks.push(LintFile::playbook(normalize_path(path)));
            continue;
        }

        for entry in WalkDir::new(path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                if e.depth() > 0 && e.file_type().is_dir() {
                    return !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_ref());
                }
                true
            })
        {
            let entry = entry?;
            if entry.file_type().is_file() {
                let ext = entry.path().extension().and_then(|e| e.to_str()).unwrap_or("");
                if ext == "yml" || ext == "yaml" {
                    playbooks.push(LintFile::playbook(normalize_path(entry.path())));
                }
            }
        }
    }

    Ok(playbooks)
}

/// Run the lint command.
pub fn run_lint(args: &LintArgs) -> anyhow::Result<i32> {
    let mut config = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    config.extend_from_args(&args.tags, &args.skip_list);

    let playbooks = collect_playbooks(&args.playbooks)?;
    if playbooks.is_empty() {
        eprintln!("Warning: no playbooks to lint");
        return Ok(EXIT_SUCCESS);
    }

    let rules = default_rules(config.max_line_length);
    rules.validate()?;

    let runner = Runner::new(rules)
        .tags(config.tags.iter().cloned())
        .skip_tags(config.skip_list.iter().cloned())
        .exclude_paths(&config.exclude_paths)?
        .parallel(config.parallel || args.parallel);
    let result = runner.run(&playbooks);

    let entries: Vec<String> = playbooks.iter().map(LintFile::display_path).collect();
    match args.format {
        OutputFormat::Json => report::write_json(&entries, &result, args.show_suppressed)?,
        OutputFormat::Pretty => report::write_pretty(&entries, &result, args.show_suppressed),
    }

    if result.is_clean() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the rules listing command.
pub fn run_rules(args: &ListArgs) -> anyhow::Result<i32> {
    let config = load_config(args.config.as_deref())?;
    println!("{}", default_rules(config.max_line_length));
    Ok(EXIT_SUCCESS)
}

/// Run the tags listing command.
pub fn run_tags(args: &ListArgs) -> anyhow::Result<i32> {
    let config = load_config(args.config.as_deref())?;
    println!("{}", default_rules(config.max_line_length).list_tags());
    Ok(EXIT_SUCCESS)
}
