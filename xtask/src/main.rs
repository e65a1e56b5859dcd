use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use fieldfix_ledger::Table;
use fieldfix_types::{LEDGER_COLUMNS, tables};
use fs_err as fs;

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Workspace helper tasks")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the corrections ledger header.
    PrintColumns,
    /// Write sample source tables into a directory store for local trials.
    SeedStore {
        #[arg(long, default_value = "fieldfix-data")]
        dir: Utf8PathBuf,

        /// Overwrite tables that already exist.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

const CONTEXT: [&str; 9] = [
    "unique_id",
    "variable",
    "username",
    "supervisor",
    "woreda",
    "kebele",
    "farmer_name",
    "phone_no",
    "subdate",
];

const SAMPLE_CONSTRAINTS: &[[&str; 11]] = &[
    ["101", "plot_size", "enum_01", "sup_a", "Adami Tulu", "Bochessa", "Almaz", "0911000000", "2025-03-01", "600", "max 500"],
    ["101", "household_size", "enum_01", "sup_a", "Adami Tulu", "Bochessa", "Almaz", "0911000000", "2025-03-01", "0", "min 1 and max 30"],
    ["303", "plot_size", "enum_02", "sup_b", "Dugda", "Meki", "Chaltu", "0933000000", "2025-03-02", "900", "max 800"],
];

const SAMPLE_LOGIC: &[[&str; 11]] = &[
    ["202", "crop_area", "enum_01", "sup_a", "Adami Tulu", "Bochessa", "Bekele", "0922000000", "2025-03-01", "40", "25"],
    ["404", "livestock", "enum_02", "sup_b", "Dugda", "Meki", "Dawit", "0944000000", "2025-03-02", "12", "3"],
];

fn sample_table(last: &str, rows: &[[&str; 11]]) -> Table {
    let mut table = Table::new(CONTEXT.iter().copied().chain(["value", last]));
    for row in rows {
        table.push_row(row.iter().map(|c| c.to_string()).collect());
    }
    table
}

fn seed(dir: &Utf8Path, force: bool) -> anyhow::Result<Vec<Utf8PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("create {dir}"))?;
    let mut written = Vec::new();
    for (name, table) in [
        (tables::CONSTRAINTS, sample_table("constraint", SAMPLE_CONSTRAINTS)),
        (tables::LOGIC, sample_table("Troster Value", SAMPLE_LOGIC)),
    ] {
        let path = dir.join(name);
        if path.exists() && !force {
            anyhow::bail!("{path} already exists (use --force to overwrite)");
        }
        fs::write(&path, table.to_csv()).with_context(|| format!("write {path}"))?;
        written.push(path);
    }
    Ok(written)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::PrintColumns => {
            println!("{}", LEDGER_COLUMNS.join(","));
        }
        Command::SeedStore { dir, force } => {
            for path in seed(&dir, force)? {
                println!("wrote {path}");
            }
            println!("try: fieldfix --dir {dir} pending --enumerator enum_01");
        }
    }
    Ok(())
}
