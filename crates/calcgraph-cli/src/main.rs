//! calcgraph CLI - evaluate models of linked formula cells

mod model;

use anyhow::{bail, Context, Result};
use calcgraph::{CalculationEngine, CalculationOptions, CellKind, CellValue};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "calcgraph")]
#[command(
    author,
    version,
    about = "Evaluate calculation models of linked formula cells"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recalculate a model and print cell values
    Eval {
        /// Model file (CSV with columns address,kind,content)
        model: PathBuf,

        /// Print JSON instead of CSV
        #[arg(long)]
        json: bool,

        /// Only print these cells (default: every cell)
        #[arg(short, long = "cell", value_name = "ADDR")]
        cells: Vec<String>,

        /// Write an input before recalculating (repeatable)
        #[arg(short, long = "set", value_name = "ADDR=VALUE", value_parser = parse_set)]
        set: Vec<(String, CellValue)>,
    },

    /// Print the calculation order of a model
    Order {
        /// Model file
        model: PathBuf,
    },

    /// Show what a cell reads and what reads it
    Deps {
        /// Model file
        model: PathBuf,

        /// Cell address (e.g. "Sheet1!B2")
        address: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Eval {
            model,
            json,
            cells,
            set,
        } => eval(&model, json, &cells, &set),
        Commands::Order { model } => show_order(&model),
        Commands::Deps { model, address } => show_deps(&model, &address),
    }
}

fn parse_set(text: &str) -> std::result::Result<(String, CellValue), String> {
    model::parse_assignment(text).map_err(|e| e.to_string())
}

fn load(path: &Path) -> Result<CalculationEngine> {
    // Errors are reported per cell after recalculation instead
    let options = CalculationOptions {
        log_formula_errors: false,
        ..Default::default()
    };
    model::load_model(path, options)
}

#[derive(Serialize)]
struct CellOutput {
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<CellKind>,
    value: CellValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn eval(path: &Path, json: bool, cells: &[String], set: &[(String, CellValue)]) -> Result<()> {
    let mut engine = load(path)?;

    for (address, value) in set {
        engine
            .write(address, *value)
            .with_context(|| format!("Failed to set '{}'", address))?;
    }

    let recalc = engine.recalculate_all();

    let addresses: Vec<String> = if cells.is_empty() {
        engine.addresses().map(|a| a.to_string()).collect()
    } else {
        cells.to_vec()
    };

    let mut output = Vec::with_capacity(addresses.len());
    for address in addresses {
        let value = engine.read(&address);
        output.push(CellOutput {
            kind: engine.kind(&address),
            value,
            error: engine.error(&address).map(|e| e.to_string()),
            address,
        });
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &output).context("Failed to write JSON")?;
        writeln!(out).context("Failed to write to stdout")?;
    } else {
        let mut writer = csv::Writer::from_writer(&mut out);
        writer
            .write_record(["address", "value"])
            .context("Failed to write to stdout")?;
        for cell in &output {
            writer
                .write_record([cell.address.as_str(), cell.value.to_string().as_str()])
                .context("Failed to write to stdout")?;
        }
        writer.flush().context("Failed to write to stdout")?;
    }

    for (address, error) in recalc.errors() {
        eprintln!("error: {}: {}", address, error);
    }
    if recalc.stats.circular_references > 0 {
        eprintln!(
            "warning: {} circular reference(s) ignored",
            recalc.stats.circular_references
        );
    }
    eprintln!(
        "Calculated {} formulas ({} errors)",
        recalc.stats.cells_calculated, recalc.stats.errors
    );

    Ok(())
}

fn show_order(path: &Path) -> Result<()> {
    let mut engine = load(path)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for address in engine.calculation_order() {
        writeln!(out, "{}", address).context("Failed to write to stdout")?;
    }

    Ok(())
}

fn show_deps(path: &Path, address: &str) -> Result<()> {
    let engine = load(path)?;

    let kind = match engine.kind(address) {
        Some(kind) => kind,
        None => bail!("Cell '{}' is not defined in '{}'", address, path.display()),
    };

    println!("Cell: {} ({})", address, kind);
    if let Some(formula) = engine.formula_text(address) {
        println!("Formula: {}", formula);
    }

    println!("Dependencies:");
    for dep in engine.dependencies(address) {
        let marker = if engine.contains(dep.as_str()) {
            ""
        } else {
            " (undefined)"
        };
        println!("  {}{}", dep, marker);
    }

    println!("Dependents:");
    for dep in engine.dependents(address) {
        println!("  {}", dep);
    }

    Ok(())
}
