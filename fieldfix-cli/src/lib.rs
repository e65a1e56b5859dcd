//! Command-line surface for fieldfix.
//!
//! The binary is a thin wrapper over [`execute`]; tests drive [`run_with_args`] in-process.

pub mod config;
pub mod edits;
pub mod repl;

use camino::Utf8PathBuf;
use chrono::Local;
use clap::{Parser, Subcommand};
use config::{Backend, CliOverrides, ConfigMerger, MergedConfig};
use fieldfix_core::adapters::{FsWritePort, open_store};
use fieldfix_core::ports::BlobStore;
use fieldfix_core::{
    CorrectionSession, SaveOutcome, SystemClock, ToolError, run_admin, run_enumerators,
    run_export,
};
use fieldfix_render::{
    render_admin_md, render_enumerators, render_missing, render_progress, render_worklist_md,
};
use std::ffi::OsString;
use std::io;
use tracing::{debug, error, info};

#[derive(Debug, Parser)]
#[command(
    name = "fieldfix",
    version,
    about = "Review and correct flagged farmer-survey values, recording every fix in a shared ledger."
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, clap::Args)]
struct GlobalArgs {
    /// Config file (default: ./fieldfix.toml when present).
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// Storage backend, overriding [remote].backend.
    #[arg(long, value_enum, global = true)]
    backend: Option<Backend>,

    /// Root directory for the directory backend, overriding [remote].dir.
    #[arg(long, global = true)]
    dir: Option<Utf8PathBuf>,

    /// GitHub access token.
    #[arg(long, env = "FIELDFIX_GITHUB_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List enumerators that have flagged records.
    Enumerators(EnumeratorsArgs),
    /// Show the outstanding worklist for one enumerator.
    Pending(PendingArgs),
    /// Apply a file of edits and save them to the ledger.
    Save(SaveArgs),
    /// Start an interactive correction session on stdin.
    Session(SessionArgs),
    /// Show ledger metrics and the most recent corrections.
    Admin(AdminArgs),
    /// Download the full ledger as all_corrections_YYYYMMDD.csv.
    Export(ExportArgs),
}

#[derive(Debug, Parser)]
struct EnumeratorsArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct PendingArgs {
    /// Enumerator username.
    #[arg(long)]
    enumerator: String,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct SaveArgs {
    /// Enumerator username.
    #[arg(long)]
    enumerator: String,

    /// TOML file of [[edit]] entries.
    #[arg(long)]
    edits: Utf8PathBuf,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    /// Enumerator username.
    #[arg(long)]
    enumerator: String,
}

#[derive(Debug, Parser)]
struct AdminArgs {
    /// Number of recent corrections to preview (default from config, else 10).
    #[arg(long)]
    preview: Option<usize>,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct ExportArgs {
    /// Directory to write the export into.
    #[arg(long, default_value = ".")]
    out_dir: Utf8PathBuf,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Run a parsed command line. Errors are logged and printed to stderr; returns the exit code.
pub fn execute(cli: Cli) -> u8 {
    match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            error!("{:?}", e);
            eprintln!("error: {}", e);
            e.exit_code()
        }
    }
}

/// Parse `args` (program name first) and run them like the binary would.
pub fn run_with_args<I, T>(args: I) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => execute(cli),
        Err(e) => {
            let code = u8::try_from(e.exit_code()).unwrap_or(2);
            if let Err(print) = e.print() {
                debug!("could not print usage: {}", print);
            }
            code
        }
    }
}

pub fn run(cli: Cli) -> Result<(), ToolError> {
    let merged = load_merged(&cli.global)?;
    match cli.cmd {
        Command::Enumerators(args) => cmd_enumerators(&merged, args),
        Command::Pending(args) => cmd_pending(&merged, args),
        Command::Save(args) => cmd_save(&merged, args),
        Command::Session(args) => cmd_session(&merged, args),
        Command::Admin(args) => cmd_admin(&merged, args),
        Command::Export(args) => cmd_export(&merged, args),
    }
}

fn load_merged(global: &GlobalArgs) -> Result<MergedConfig, ToolError> {
    let base = Utf8PathBuf::from(".");
    let file_config = config::load_or_default(global.config.as_deref(), &base)
        .map_err(|e| ToolError::Configuration(format!("{:#}", e)))?;
    let overrides = CliOverrides {
        backend: global.backend,
        dir: global.dir.clone(),
        token: global.token.clone(),
    };
    let merged = ConfigMerger::new(file_config).merge(&overrides, &base);
    debug!(
        "merged config: store={:?}, tables={:?}",
        merged.store.kind(),
        merged.tables
    );
    Ok(merged)
}

fn open(merged: &MergedConfig) -> Result<Box<dyn BlobStore>, ToolError> {
    Ok(open_store(&merged.store)?)
}

fn print_json<T: serde::Serialize>(v: &T) -> Result<(), ToolError> {
    let s = serde_json::to_string_pretty(v).map_err(anyhow::Error::from)?;
    println!("{}", s);
    Ok(())
}

fn cmd_enumerators(merged: &MergedConfig, args: EnumeratorsArgs) -> Result<(), ToolError> {
    let store = open(merged)?;
    let names = run_enumerators(store.as_ref(), &merged.tables)?;
    match args.format {
        OutputFormat::Text => print!("{}", render_enumerators(&names)),
        OutputFormat::Json => print_json(&names)?,
    }
    Ok(())
}

fn cmd_pending(merged: &MergedConfig, args: PendingArgs) -> Result<(), ToolError> {
    let store = open(merged)?;
    let mut session = CorrectionSession::start(
        store.as_ref(),
        &SystemClock,
        merged.session_settings(&args.enumerator),
    )?;
    let outstanding = session.outstanding()?;
    match args.format {
        OutputFormat::Text => print!("{}", render_worklist_md(&outstanding, session.state())),
        OutputFormat::Json => print_json(&outstanding)?,
    }
    Ok(())
}

fn cmd_save(merged: &MergedConfig, args: SaveArgs) -> Result<(), ToolError> {
    let events = edits::load_edits(&args.edits)?;
    let store = open(merged)?;
    let mut session = CorrectionSession::start(
        store.as_ref(),
        &SystemClock,
        merged.session_settings(&args.enumerator),
    )?;
    for (key, edit) in events {
        session.record_edit(&key, edit)?;
    }

    match session.save() {
        Ok(SaveOutcome::NothingToSave) => {
            println!("No outstanding errors for {}; nothing to save.", args.enumerator);
            Ok(())
        }
        Ok(SaveOutcome::Saved {
            records,
            rows_total,
        }) => {
            println!(
                "Saved {} corrections ({} rows in ledger).",
                records, rows_total
            );
            Ok(())
        }
        Err(ToolError::Incomplete(c)) => {
            eprint!("{}{}", render_progress(&c), render_missing(&c));
            Err(ToolError::Incomplete(c))
        }
        Err(e) => Err(e),
    }
}

fn cmd_session(merged: &MergedConfig, args: SessionArgs) -> Result<(), ToolError> {
    let store = open(merged)?;
    let mut session = CorrectionSession::start(
        store.as_ref(),
        &SystemClock,
        merged.session_settings(&args.enumerator),
    )?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    repl::run_session(&mut session, stdin.lock(), &mut stdout)
}

fn cmd_admin(merged: &MergedConfig, args: AdminArgs) -> Result<(), ToolError> {
    let store = open(merged)?;
    let outcome = run_admin(store.as_ref(), &merged.admin_settings(args.preview))?;
    match (args.format, outcome.summary) {
        (OutputFormat::Text, Some(summary)) => print!("{}", render_admin_md(&summary)),
        (OutputFormat::Text, None) => println!("No corrections collected yet."),
        (OutputFormat::Json, summary) => print_json(&summary)?,
    }
    Ok(())
}

fn cmd_export(merged: &MergedConfig, args: ExportArgs) -> Result<(), ToolError> {
    let store = open(merged)?;
    let today = Local::now().date_naive();
    let outcome = run_export(
        store.as_ref(),
        &merged.export_settings(args.out_dir),
        &FsWritePort,
        today,
    )?;
    match outcome {
        Some(export) => {
            info!("wrote export to {}", export.path);
            println!("Exported {} corrections to {}", export.rows, export.path);
        }
        None => println!("No corrections collected yet; nothing to export."),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldfix_types::tables;
    use fs_err as fs;

    #[test]
    fn usage_errors_exit_2() {
        assert_eq!(run_with_args(["fieldfix", "frobnicate"]), 2);
    }

    #[test]
    fn incomplete_save_runs_in_process_with_exit_2() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        fs::write(
            root.join(tables::CONSTRAINTS),
            "unique_id,variable,username,value,constraint\n101,plot_size,enum_01,600,max 500\n",
        )
        .expect("constraints");
        fs::write(
            root.join(tables::LOGIC),
            "unique_id,variable,username,value,Troster Value\n",
        )
        .expect("logic");
        let edits = root.join("edits.toml");
        fs::write(
            &edits,
            "[[edit]]\nkind = \"constraint\"\nunique_id = 101\nvariable = \"plot_size\"\nvalue = 450\n",
        )
        .expect("edits");

        let code = run_with_args([
            "fieldfix",
            "--backend",
            "directory",
            "--dir",
            root.as_str(),
            "save",
            "--enumerator",
            "enum_01",
            "--edits",
            edits.as_str(),
        ]);
        assert_eq!(code, 2);
        assert!(!root.join(tables::CORRECTIONS).exists());
    }
}
