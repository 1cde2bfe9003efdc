//! Worktree Colors - deterministic status bar colors per git worktree
//!
//! Every worktree of a repository gets its own pastel status bar color, derived
//! from the worktree's identity and written into the workspace's editor settings,
//! so several windows on sibling worktrees are easy to tell apart.

mod color;
mod config;
mod git;
mod orchestrator;
mod settings;
mod watcher;

use clap::Parser;
use color_eyre::eyre::{Context, Result};
use crossterm::style::{Color, Stylize};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, ConfigLayer, ConfigPaths};
use orchestrator::{ApplyOutcome, Orchestrator};
use settings::WorkspaceSettings;
use watcher::{WatchedInputs, Watcher, WatcherEvent};

/// Worktree Colors - Color the editor status bar per git worktree
#[derive(Parser, Debug)]
#[command(name = "wtc")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the workspace folder (defaults to current directory)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Print the resolved worktree identity
    #[arg(long)]
    identity: bool,

    /// Print the theme without writing the settings
    #[arg(long)]
    show: bool,

    /// Remove the managed status bar colors
    #[arg(long)]
    clear: bool,

    /// Preview the colors of every worktree of the repository
    #[arg(long)]
    list: bool,

    /// Keep re-applying the colors when config, settings or worktree change
    #[arg(short, long)]
    watch: bool,

    /// Poll interval in seconds for --watch
    #[arg(long, default_value_t = watcher::DEFAULT_POLL_INTERVAL_SECS)]
    interval: u64,

    /// Print the effective configuration
    #[arg(long)]
    show_config: bool,

    /// Enable or disable colors for this workspace (true/false)
    #[arg(long, value_name = "BOOL")]
    set_enabled: Option<bool>,

    /// Set the saturation (0-100) for this workspace
    #[arg(long, value_name = "PERCENT")]
    set_saturation: Option<i32>,

    /// Set the lightness (0-100) for this workspace
    #[arg(long, value_name = "PERCENT")]
    set_lightness: Option<i32>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::install()?;

    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let workspace_root = match args.path.clone() {
        Some(path) => path,
        None => std::env::current_dir().with_context(|| "Failed to get current directory")?,
    };

    let config_paths = ConfigPaths::for_workspace(&workspace_root);
    let orchestrator = Orchestrator::new(
        &workspace_root,
        config_paths.clone(),
        WorkspaceSettings::for_workspace(&workspace_root),
    );

    // Config edits land before any action
    if args.set_enabled.is_some() || args.set_saturation.is_some() || args.set_lightness.is_some()
    {
        update_config(&config_paths, args)?;
    }

    if args.identity {
        return show_identity(&workspace_root);
    }

    if args.show_config {
        return show_config(&config_paths);
    }

    if args.show {
        return show_theme(&orchestrator);
    }

    if args.list {
        return list_worktrees(&workspace_root, &config_paths);
    }

    if args.clear {
        report(&orchestrator, orchestrator.clear()?);
        return Ok(());
    }

    if args.watch {
        return watch(&orchestrator, Duration::from_secs(args.interval.max(1)));
    }

    report(&orchestrator, orchestrator.apply()?);
    Ok(())
}

/// Print the outcome of an apply or clear round
fn report(orchestrator: &Orchestrator<WorkspaceSettings>, outcome: ApplyOutcome) {
    match outcome {
        ApplyOutcome::Applied { identity, theme } => {
            println!(
                "{} Applied {} / {} for {}",
                swatch_hex(&theme.background),
                theme.background,
                theme.foreground,
                identity
            );
        }
        ApplyOutcome::Cleared => {
            println!(
                "Cleared status bar colors in {}",
                orchestrator.workspace_root().display()
            );
        }
        ApplyOutcome::Unchanged => println!("Status bar colors already up to date"),
        ApplyOutcome::Skipped => println!("Another update is in progress"),
    }
}

/// A small block of terminal color
fn swatch(rgb: (u8, u8, u8)) -> String {
    let (r, g, b) = rgb;
    "    ".on(Color::Rgb { r, g, b }).to_string()
}

fn swatch_hex(hex: &str) -> String {
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
            .unwrap_or(0)
    };
    swatch((channel(1..3), channel(3..5), channel(5..7)))
}

/// Print the worktree identity of the workspace
fn show_identity(workspace_root: &Path) -> Result<()> {
    let identity = git::WorktreeIdentity::resolve(workspace_root);
    println!("{}", identity);
    if !identity.is_git_backed() {
        eprintln!("(not inside a git worktree, using the folder path)");
    }
    Ok(())
}

/// Print the derived theme without writing it
fn show_theme(orchestrator: &Orchestrator<WorkspaceSettings>) -> Result<()> {
    let preview = orchestrator.preview()?;
    let config = &preview.config;

    println!("Identity:   {}", preview.identity);
    println!(
        "Color:      {}",
        color::format_hsl(preview.hue, config.saturation, config.lightness)
    );
    println!(
        "Background: {} {}",
        swatch(color::hsl_to_rgb(
            preview.hue,
            config.saturation,
            config.lightness
        )),
        preview.theme.background
    );
    println!("Foreground: {}", preview.theme.foreground);
    if !config.enabled {
        println!("(colors are disabled for this workspace)");
    }
    Ok(())
}

/// Show the effective configuration and where it came from
fn show_config(paths: &ConfigPaths) -> Result<()> {
    let config = Config::load(paths)?;

    println!("Worktree Colors Configuration");
    println!("=============================");
    println!();
    println!("Enabled: {}", config.enabled);
    println!("Saturation: {}%", config.saturation);
    println!("Lightness: {}%", config.lightness);
    println!();
    println!("Sources (later wins):");
    for path in paths.layers() {
        let marker = if path.exists() { "+" } else { "-" };
        println!("  {} {}", marker, path.display());
    }

    Ok(())
}

/// Preview the color of every worktree of the enclosing repository
fn list_worktrees(workspace_root: &Path, paths: &ConfigPaths) -> Result<()> {
    let repo = git::Repository::discover(workspace_root)?;
    let worktrees = git::WorktreeManager::new(&repo).list()?;
    let config = Config::load(paths)?;
    let current = git::WorktreeIdentity::resolve(workspace_root);

    for wt in &worktrees {
        let identity = wt
            .identity
            .clone()
            .unwrap_or_else(|| git::WorktreeIdentity::resolve(&wt.path));
        let theme = color::build_theme(identity.as_str(), config.style());
        let marker = if identity == current { "*" } else { " " };

        let mut flags = Vec::new();
        if wt.is_main {
            flags.push("main");
        }
        if wt.is_locked {
            flags.push("locked");
        }
        if wt.is_prunable {
            flags.push("prunable");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };

        println!(
            "{} {} {} {:<24} {}{}",
            marker,
            swatch_hex(&theme.background),
            theme.background,
            wt.label(),
            git::canonicalize_or_original(&wt.path).display(),
            flags
        );
    }

    Ok(())
}

/// Persist config changes into the workspace layer
fn update_config(paths: &ConfigPaths, args: &Args) -> Result<()> {
    let mut layer = ConfigLayer::load(&paths.workspace)?;

    if let Some(enabled) = args.set_enabled {
        layer.enabled = Some(enabled);
        println!("Set enabled: {}", enabled);
    }

    if let Some(saturation) = args.set_saturation {
        layer.saturation = Some(saturation);
        println!("Set saturation: {}%", saturation);
    }

    if let Some(lightness) = args.set_lightness {
        layer.lightness = Some(lightness);
        println!("Set lightness: {}%", lightness);
    }

    layer.save(&paths.workspace)?;
    println!("Configuration saved to {}", paths.workspace.display());

    Ok(())
}

/// Apply now, then again whenever a watched input changes
fn watch(orchestrator: &Orchestrator<WorkspaceSettings>, interval: Duration) -> Result<()> {
    report(orchestrator, orchestrator.apply()?);

    let inputs = WatchedInputs {
        workspace_root: orchestrator.workspace_root().to_path_buf(),
        config: orchestrator.config_paths().clone(),
        settings_file: WorkspaceSettings::for_workspace(orchestrator.workspace_root())
            .path()
            .to_path_buf(),
    };

    let (event_tx, event_rx) = mpsc::channel();
    let _handle = Watcher::new(inputs, interval).spawn(event_tx);

    println!(
        "Watching {} every {}s (Ctrl+C to stop)",
        orchestrator.workspace_root().display(),
        interval.as_secs()
    );

    for event in event_rx {
        let WatcherEvent::InputsChanged { reasons, at } = event;
        debug!("Re-applying at {} after {:?}", at.to_rfc3339(), reasons);

        match orchestrator.apply() {
            Ok(ApplyOutcome::Unchanged) => {}
            Ok(outcome) => report(orchestrator, outcome),
            Err(e) => warn!("Failed to apply worktree colors: {:#}", e),
        }
    }

    Ok(())
}
