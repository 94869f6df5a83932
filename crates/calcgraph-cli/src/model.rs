//! Model files
//!
//! A model is a CSV file with the header `address,kind,content`, one cell per
//! row. `kind` is `constant`, `input` or `formula`; `content` is a value
//! (number, `TRUE`/`FALSE`, or blank) or, for formulas, the formula text.
//! Lines starting with `#` are ignored.

use anyhow::{bail, Context, Result};
use calcgraph::{CalculationEngine, CalculationOptions, CellContent, CellKind, CellValue};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ModelRow {
    address: String,
    kind: CellKind,
    #[serde(default)]
    content: String,
}

/// Load a model file into a new engine
pub fn load_model<P: AsRef<Path>>(path: P, options: CalculationOptions) -> Result<CalculationEngine> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open model '{}'", path.display()))?;
    read_model(file, options).with_context(|| format!("Failed to load model '{}'", path.display()))
}

/// Read a model from CSV text
pub fn read_model<R: Read>(reader: R, options: CalculationOptions) -> Result<CalculationEngine> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut engine = CalculationEngine::with_options(options);
    for result in csv_reader.deserialize::<ModelRow>() {
        let row = result.context("Invalid model row")?;
        let content = match row.kind {
            CellKind::Constant => CellContent::Constant(parse_value(&row.content)?),
            CellKind::Input => CellContent::Input(parse_value(&row.content)?),
            CellKind::Formula => CellContent::Formula(row.content),
        };
        engine
            .define(&row.address, content)
            .with_context(|| format!("Invalid cell '{}'", row.address))?;
    }

    Ok(engine)
}

/// Parse a literal cell value: a number, `TRUE`/`FALSE`, or blank for empty
pub fn parse_value(text: &str) -> Result<CellValue> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(CellValue::Empty);
    }

    match text.to_ascii_uppercase().as_str() {
        "TRUE" => return Ok(CellValue::Boolean(true)),
        "FALSE" => return Ok(CellValue::Boolean(false)),
        _ => {}
    }

    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(CellValue::Number(n)),
        _ => bail!("Invalid value '{}': expected a number, TRUE, FALSE or blank", text),
    }
}

/// Parse an `ADDRESS=VALUE` assignment
pub fn parse_assignment(text: &str) -> Result<(String, CellValue)> {
    let (address, value) = text
        .rsplit_once('=')
        .with_context(|| format!("Invalid assignment '{}': expected ADDRESS=VALUE", text))?;
    let address = address.trim();
    if address.is_empty() {
        bail!("Invalid assignment '{}': missing address", text);
    }
    Ok((address.to_string(), parse_value(value)?))
}
