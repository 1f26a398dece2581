//! Hookrun - run and manage hook-based plugin executables.
//!
//! Discovers plugin binaries in the well-known plugin directories and
//! exposes them through list/run/assets/context subcommands.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hookrun::plugin::{
    install_plugin, uninstall_plugin, HookRouter, PluginRegistry, SharedContext,
};

/// Hook-based plugin runner
#[derive(Parser)]
#[command(name = "hookrun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Extra plugin directory, scanned after the defaults
    /// (its plugins win on context merges)
    #[arg(long, global = true)]
    plugin_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List discovered plugins
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Install a plugin binary into the user plugin directory
    Install {
        /// Path to the plugin binary (filename must start with "hookrun-")
        path: PathBuf,
    },

    /// Remove an installed plugin binary
    Uninstall {
        /// Plugin name (with or without the "hookrun-" prefix)
        name: String,
    },

    /// Run a plugin command directly
    Run {
        /// Plugin name as declared in its manifest
        name: String,

        /// Arguments passed through to the plugin
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print asset directories offered by plugins
    Assets,

    /// Run the context hook across all plugins and print the merged context
    Context,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Install/uninstall are administrative: no discovery pass needed, and
    // their errors propagate by design.
    let command = match cli.command {
        Commands::Install { path } => {
            let dest = install_plugin(&path)?;
            println!("Installed {}", dest.display());
            return Ok(());
        }
        Commands::Uninstall { name } => {
            uninstall_plugin(&name)?;
            println!("Uninstalled {name}");
            return Ok(());
        }
        command => command,
    };

    let mut registry = PluginRegistry::new();
    let mut dirs = PluginRegistry::default_plugin_dirs();
    if let Some(extra) = cli.plugin_dir {
        dirs.push(extra);
    }
    registry.discover(&dirs);

    let router = HookRouter::new(&registry).with_project_root(std::env::current_dir()?);

    match command {
        Commands::List { format } => {
            let manifests = router.list_plugins();
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&manifests)?);
            } else if manifests.is_empty() {
                println!("No plugins found.");
            } else {
                for manifest in manifests {
                    println!(
                        "{} {} [{}]",
                        manifest.name,
                        manifest.version,
                        manifest.capabilities.join(", ")
                    );
                }
            }
        }
        Commands::Run { name, args } => {
            let mut ctx = SharedContext::new();
            router.run_context_hook(&mut ctx);
            let response = router.run_command(&name, &args, &ctx)?;
            if !response.data.is_null() {
                println!("{}", serde_json::to_string_pretty(&response.data)?);
            }
        }
        Commands::Assets => {
            for path in router.collect_assets() {
                println!("{}", path.display());
            }
        }
        Commands::Context => {
            let mut ctx = SharedContext::new();
            router.run_context_hook(&mut ctx);
            println!("{}", serde_json::to_string_pretty(&ctx.data)?);
        }
        Commands::Install { .. } | Commands::Uninstall { .. } => unreachable!(),
    }

    Ok(())
}

/// Initialize tracing. Warnings about skipped plugins land on stderr so they
/// never corrupt JSON output on stdout.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("hookrun=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hookrun=warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
