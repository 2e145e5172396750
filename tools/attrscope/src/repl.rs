//! Interactive REPL
//!
//! Each line is `<field> <text>`, plus `inject`, `log`, `help` and `quit`.

use anyhow::{Context, Result};
use attr_explorer::{Command, Explorer, ExplorerState, WriteSpec, FIELDS};
use attr_link::{AttributeReport, SimulatedDevice};
use colored::*;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Editor, Helper};

use crate::output;

const REPL_COMMANDS: [&str; 4] = ["inject", "log", "help", "quit"];

// ============================================================================
// Tab Completion Helper
// ============================================================================

/// REPL helper providing Tab completion for fields and their keywords
struct AttrscopeHelper;

impl Helper for AttrscopeHelper {}

impl Hinter for AttrscopeHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for AttrscopeHelper {}

impl Validator for AttrscopeHelper {}

impl Completer for AttrscopeHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        // 1. Field completion (no space yet)
        let Some((field, rest)) = line.split_once(' ') else {
            return Ok(complete_from(line, 0, FIELDS.iter().chain(REPL_COMMANDS.iter())));
        };

        // 2. Keyword completion for the field's single argument
        if rest.contains(' ') {
            return Ok((pos, vec![]));
        }
        let keywords: &[&str] = match field.to_ascii_lowercase().as_str() {
            "snapshot" => &["snapshot:", "compare", "export", "import:", "clear"],
            "raw" => &["on", "off"],
            "history" | "reports" => &["clear"],
            "log" => &["trace", "debug", "info", "warn", "error"],
            _ => &[],
        };
        Ok(complete_from(rest, line.len() - rest.len(), keywords.iter()))
    }
}

fn complete_from<'a>(
    prefix: &str,
    start: usize,
    candidates: impl Iterator<Item = &'a &'a str>,
) -> (usize, Vec<Pair>) {
    let prefix = prefix.to_ascii_lowercase();
    let matches = candidates
        .filter(|c| c.starts_with(&prefix))
        .map(|c| Pair {
            display: (*c).to_string(),
            replacement: (*c).to_string(),
        })
        .collect();
    (start, matches)
}

// ============================================================================
// Loop
// ============================================================================

/// Interactive REPL loop
pub async fn run(explorer: &Explorer<SimulatedDevice>, device: &SimulatedDevice) -> Result<()> {
    let config = rustyline::Config::builder()
        .completion_type(rustyline::CompletionType::List)
        .build();
    let mut rl = Editor::with_config(config).context("Failed to initialize readline")?;
    rl.set_helper(Some(AttrscopeHelper));

    let mut state = explorer.new_state();

    println!("{}", "attrscope - attribute explorer".bright_cyan().bold());
    println!(
        "Target {} (vendor 0x{:04X}). Type '{}' for commands, {} for completion\n",
        explorer.config().namespace.bright_green(),
        explorer.config().vendor_qualifier,
        "help".bright_yellow(),
        "Tab".bright_cyan()
    );

    loop {
        let prompt = format!("attrscope[ep{}]> ", state.endpoint);
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                // Add to history (ignore errors)
                let _ = rl.add_history_entry(line);

                match execute_repl_command(explorer, device, &mut state, line).await {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(e) => eprintln!("{} {:#}", "Error:".red(), e),
                }
            },
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C - ignore and continue
                println!("^C");
                continue;
            },
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{} {}", "Readline error:".red(), e);
                break;
            },
        }
    }

    println!("Bye!");
    Ok(())
}

/// Execute a single REPL line
/// Returns Ok(true) to continue, Ok(false) to quit
async fn execute_repl_command(
    explorer: &Explorer<SimulatedDevice>,
    device: &SimulatedDevice,
    state: &mut ExplorerState,
    input: &str,
) -> Result<bool> {
    let (word, rest) = input.split_once(char::is_whitespace).unwrap_or((input, ""));
    let rest = rest.trim();

    match word.to_ascii_lowercase().as_str() {
        "quit" | "exit" | "q" => return Ok(false),
        "help" | "?" => print_help(),
        "inject" => inject(explorer, device, state, rest)?,
        "log" => {
            if rest.is_empty() {
                println!("Log level: {}", common::logging::get_log_level());
            } else {
                common::logging::set_log_level(rest).map_err(anyhow::Error::msg)?;
            }
        },
        field if FIELDS.contains(&field) => match Command::parse(field, rest) {
            Ok(command) => match crate::execute_cancellable(explorer, state, command).await {
                Ok(out) => output::print_output(&out),
                Err(e) => output::print_error(&e),
            },
            Err(e) => output::print_error(&e),
        },
        unknown => println!(
            "Unknown command '{}'. Type '{}' for available commands.",
            unknown.red(),
            "help".bright_yellow()
        ),
    }

    Ok(true)
}

/// Push a simulated unsolicited report: `inject ATTR:VALUE[,ATTR:VALUE..]`
fn inject(
    explorer: &Explorer<SimulatedDevice>,
    device: &SimulatedDevice,
    state: &ExplorerState,
    text: &str,
) -> Result<()> {
    let attributes = text
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| WriteSpec::parse(t).map(|spec| (spec.id, spec.typed.value)))
        .collect::<attr_explorer::Result<Vec<_>>>()?;
    if attributes.is_empty() {
        println!("Usage: inject ATTR:VALUE[,ATTR:VALUE..]");
        return Ok(());
    }

    let count = attributes.len();
    let delivered = device.emit_report(AttributeReport {
        endpoint: state.endpoint,
        namespace: explorer.config().namespace.clone(),
        attributes,
    });
    println!(
        "Injected {} attribute(s) on ep{} ({} listener(s))",
        count, state.endpoint, delivered
    );
    Ok(())
}

/// Print help message
fn print_help() {
    println!("{}", "=== Fields ===".bright_cyan());
    println!();
    println!("  {}                 Read one attribute", "read ATTR".bright_yellow());
    println!(
        "  {}   Write, then read back",
        "write ATTR[:TYPE]:VALUE".bright_yellow()
    );
    println!("  {}        Read a list (max 64)", "batch ID,ID,ID".bright_yellow());
    println!("  {}        Read a range (max 128)", "scan START-END".bright_yellow());
    println!("  {}         Write a list (max 32)", "bulk SPEC;SPEC".bright_yellow());
    println!(
        "  {}  Capture a range",
        "snapshot snapshot:S-E".bright_yellow()
    );
    println!(
        "  {}  Diff, export, import:<json> or drop the snapshot",
        "snapshot compare|export|clear".bright_yellow()
    );
    println!("  {}                Select endpoint", "endpoint N".bright_yellow());
    println!("  {}              Raw hex display", "raw on|off".bright_yellow());
    println!("  {}                  List clusters", "clusters".bright_yellow());
    println!("  {}         Write history", "history [clear]".bright_yellow());
    println!("  {}         Report log", "reports [clear]".bright_yellow());
    println!();
    println!("{}", "=== Session ===".bright_cyan());
    println!();
    println!(
        "  {}  Simulate an unsolicited report",
        "inject ATTR:VALUE[,..]".bright_yellow()
    );
    println!("  {}             Show or set the log filter", "log [LEVEL]".bright_yellow());
    println!("  {}                      Exit", "quit".bright_yellow());
    println!();
    println!("{}", "=== Types ===".bright_cyan());
    println!();
    println!("  uint8 uint16 uint32 int8 int16 int32 buffer string");
    println!("  Without TYPE: 1 byte -> uint8, 2 -> uint16, 4 -> uint32, else buffer");
    println!();
    println!("{}", "=== Examples ===".bright_cyan());
    println!();
    println!("  scan 0515-0517");
    println!("  write 0524:uint16:0014");
    println!("  bulk 0515:0b;0516:0200");
    println!("  snapshot snapshot:0000-0010");
    println!("  inject 0524:0015");
}
