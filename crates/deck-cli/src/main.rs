//! # deck CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Uses clap derive macros for argument parsing.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use deck_cli::locale::{run_locale, LocaleArgs};
use deck_cli::open_deck;
use deck_cli::render::{cmd_render, RenderArgs};
use deck_cli::sections::{
    cmd_add, cmd_delete, cmd_duplicate, cmd_generate, cmd_init, cmd_list, cmd_reorder,
    cmd_set_field, cmd_show, AddArgs, GenerateArgs, ReorderArgs, SetFieldArgs, ShowArgs,
};
use deck_cli::transfer::{cmd_export, cmd_import, ExportArgs, ImportArgs};

/// deck — operate a component-based slide deck from the shell.
#[derive(Parser, Debug)]
#[command(name = "deck", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding the deck's JSON files.
    #[arg(long, env = "DECK_DATA_DIR", default_value = "./data", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Seed the default sections into an empty deck.
    Init,

    /// List sections in order.
    List,

    /// Show one section with its resolved field values.
    Show(ShowArgs),

    /// Add a section from a draft JSON file.
    Add(AddArgs),

    /// Admit raw content-generator output as a new section.
    Generate(GenerateArgs),

    /// Set one editable field of a section.
    SetField(SetFieldArgs),

    /// Reorder the deck by listing every section id.
    Reorder(ReorderArgs),

    /// Delete a user-created section.
    Delete {
        /// Section identifier.
        id: String,
    },

    /// Copy a section directly after itself.
    Duplicate {
        /// Section identifier.
        id: String,
    },

    /// Render the deck (or one section) to HTML.
    Render(RenderArgs),

    /// Export the deck as a JSON or YAML document.
    Export(ExportArgs),

    /// Replace the deck with an exported document.
    Import(ImportArgs),

    /// Per-locale field overrides.
    Locale(LocaleArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level; RUST_LOG wins when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(data_dir = %cli.data_dir.display(), "opening deck");
    let deck = open_deck(&cli.data_dir);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let result = match &cli.command {
        Commands::Init => cmd_init(&deck, &mut out),
        Commands::List => cmd_list(&deck, &mut out),
        Commands::Show(args) => cmd_show(&deck, args, &mut out),
        Commands::Add(args) => cmd_add(&deck, args, &mut out),
        Commands::Generate(args) => cmd_generate(&deck, args, &mut out),
        Commands::SetField(args) => cmd_set_field(&deck, args, &mut out),
        Commands::Reorder(args) => cmd_reorder(&deck, args, &mut out),
        Commands::Delete { id } => cmd_delete(&deck, id, &mut out),
        Commands::Duplicate { id } => cmd_duplicate(&deck, id, &mut out),
        Commands::Render(args) => cmd_render(&deck, args, &mut out),
        Commands::Export(args) => cmd_export(&deck, args, &mut out),
        Commands::Import(args) => cmd_import(&deck, args, &mut out),
        Commands::Locale(args) => run_locale(&deck, args, &mut out),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
