//! Terminal rendering of command results

use attr_explorer::{CommandOutput, ExplorerError};
use colored::*;

/// Print the result field, then the status line
pub fn print_output(output: &CommandOutput) {
    for line in output.result.lines() {
        println!("{}", colorize_line(line));
    }
    if let Some(status) = &output.status {
        println!("{}", status.bright_cyan());
    }
}

pub fn print_error(err: &ExplorerError) {
    eprintln!("{} {}", "Error:".red(), err);
}

fn colorize_line(line: &str) -> ColoredString {
    if line.ends_with(": No data") || line.ends_with("-> no data") {
        line.dimmed()
    } else if line.contains("ERROR:") || line.contains(": Not supported") || line.contains(" failed") {
        line.yellow()
    } else {
        line.normal()
    }
}
