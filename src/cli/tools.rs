use console::style;

use crate::errors::WardenError;
use crate::scanners::catalog::{ToolSpec, TOOL_CATALOG};
use crate::utils::{SystemPath, ToolLocator};

pub struct ToolRow {
    pub name: &'static str,
    pub binary: &'static str,
    pub targets: String,
    pub installed: bool,
}

pub fn tool_rows(locator: &dyn ToolLocator) -> Vec<ToolRow> {
    TOOL_CATALOG
        .iter()
        .map(|spec: &ToolSpec| ToolRow {
            name: spec.name,
            binary: spec.binary,
            targets: spec
                .targets
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            installed: locator.is_installed(spec.binary),
        })
        .collect()
}

pub fn handle_tools() -> Result<(), WardenError> {
    let rows = tool_rows(&SystemPath);
    println!(
        "{:<12} {:<12} {:<10} {}",
        style("TOOL").bold(),
        style("BINARY").bold(),
        style("STATUS").bold(),
        style("TARGETS").bold()
    );
    for row in &rows {
        let status = if row.installed {
            style("installed").green()
        } else {
            style("missing").red()
        };
        println!("{:<12} {:<12} {:<10} {}", row.name, row.binary, status, row.targets);
    }

    let missing = rows.iter().filter(|r| !r.installed).count();
    if missing > 0 {
        println!();
        println!(
            "{} scanner(s) not on PATH; use --allow-missing-tools to write stub results instead",
            missing
        );
    }
    Ok(())
}
