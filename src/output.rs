use std::io::Write;

use anyhow::Result;
use console::Style;
use serde_json::Value;

/// Write a value as pretty JSON
pub fn write_json(out: &mut dyn Write, value: &Value) -> Result<()> {
    writeln!(
        out,
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    )?;
    Ok(())
}

/// Write a value as JSON or use the provided human formatter
pub fn print_value<F>(
    out: &mut dyn Write,
    value: &Value,
    json_mode: bool,
    human_formatter: F,
) -> Result<()>
where
    F: FnOnce(&mut dyn Write, &Value) -> Result<()>,
{
    if json_mode {
        write_json(out, value)
    } else {
        human_formatter(out, value)
    }
}

/// Write a JSON object as an aligned key-value table
pub fn print_kv_table(out: &mut dyn Write, value: &Value, keys: &[&str]) -> Result<()> {
    let max_key_len = keys.iter().map(|k| k.len()).max().unwrap_or(0);
    for key in keys {
        let display = format_value(lookup(value, key));
        writeln!(out, "{:width$}  {}", key, display, width = max_key_len)?;
    }
    Ok(())
}

/// Write a JSON array as a simple table with the given column names.
/// Dotted names (`properties.provisioningState`) reach into nested objects.
pub fn print_table(out: &mut dyn Write, items: &Value, columns: &[&str]) -> Result<()> {
    let Some(arr) = items.as_array() else {
        return Ok(());
    };
    if arr.is_empty() {
        return Ok(());
    }

    // Calculate column widths (minimum = header length)
    let headers: Vec<String> = columns.iter().map(|c| column_title(c)).collect();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for item in arr {
        for (i, col) in columns.iter().enumerate() {
            let val = format_value(lookup(item, col));
            widths[i] = widths[i].max(val.len());
        }
    }

    let header_style = Style::new().bold();
    let header: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    writeln!(out, "{}", header_style.apply_to(header.join("  ")))?;

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", sep.join("  "))?;

    for item in arr {
        let row: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let val = format_value(lookup(item, col));
                format!("{:width$}", val, width = widths[i])
            })
            .collect();
        writeln!(out, "{}", row.join("  ").trim_end())?;
    }
    Ok(())
}

fn column_title(column: &str) -> String {
    column.rsplit('.').next().unwrap_or(column).to_uppercase()
}

fn lookup<'a>(value: &'a Value, dotted: &str) -> &'a Value {
    dotted
        .split('.')
        .try_fold(value, |v, key| v.get(key))
        .unwrap_or(&Value::Null)
}

/// Format a JSON value for human-readable display
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
