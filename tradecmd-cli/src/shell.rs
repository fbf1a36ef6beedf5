//! Interactive shell and one-shot execution
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run_shell(), run_lines() - orchestration
//! - Level 2: read loop interleaving input with console output
//! - Level 3: print_pending(), is_exit()

use std::io::Write;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use tradecmd_core::ConsoleOutput;

use crate::app::App;

const PROMPT: &str = "> ";

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Read command lines from `input` until `exit`, `quit` or end of input.
/// Console output, including lines written by background routes, is
/// printed to `out` as it arrives.
pub async fn run_shell<R, W>(app: &App, mut output: ConsoleOutput, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    print_pending(&mut output, out)?;
    prompt(out)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else {
                    break;
                };
                if is_exit(&line) {
                    break;
                }

                app.execute(&line).await;
                print_pending(&mut output, out)?;
                prompt(out)?;
            }
            Some(text) = output.recv() => {
                writeln!(out, "{text}")?;
                out.flush()?;
            }
        }
    }

    print_pending(&mut output, out)?;
    Ok(())
}

/// Dispatch each line once, in order. Returns whether every line succeeded.
pub async fn run_lines<W: Write>(app: &App, output: &mut ConsoleOutput, lines: &[String], out: &mut W) -> Result<bool> {
    let mut all_succeeded = true;

    for line in lines {
        let result = app.execute(line).await;
        print_pending(output, out)?;

        if !result.is_success() {
            tracing::debug!(line = %line, ?result, "command did not succeed");
            all_succeeded = false;
        }
    }

    Ok(all_succeeded)
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

fn print_pending<W: Write>(output: &mut ConsoleOutput, out: &mut W) -> Result<()> {
    for line in output.drain() {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

fn prompt<W: Write>(out: &mut W) -> Result<()> {
    write!(out, "{PROMPT}")?;
    out.flush()?;
    Ok(())
}

fn is_exit(line: &str) -> bool {
    let word = line.trim();
    word.eq_ignore_ascii_case("exit") || word.eq_ignore_ascii_case("quit")
}

// ============================================================================
// TESTS
// ============================================================================
