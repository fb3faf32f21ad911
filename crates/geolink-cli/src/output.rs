//! Output formatting for CLI results

use serde_json::Value;
use std::io::Write;

use crate::error::CliResult;

/// Pretty-print `value` as JSON to `out`
pub fn write_json(out: &mut impl Write, value: &Value) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Pretty-print `value` as JSON to stdout
pub fn display(value: &Value) -> CliResult<()> {
    write_json(&mut std::io::stdout().lock(), value)
}
