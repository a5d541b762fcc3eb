// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for mimaforge.

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use serde_json::json;

use mimaforge::cli::{resolve_instruction_set, Cli, OutputFormat};
use mimaforge::report::{format_parse_error, format_runtime_fault};
use mimaforge::run::{compile, run_to_completion, RunOutcome};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let use_color = !cli.no_color;

    let instruction_set = match resolve_instruction_set(&cli) {
        Ok(set) => set,
        Err(message) => {
            eprintln!("ERROR: {message}");
            return ExitCode::FAILURE;
        }
    };

    let source = match fs::read_to_string(&cli.input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("ERROR: can't read {}: {err}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };
    let source_lines: Vec<String> = source.lines().map(str::to_string).collect();
    let file_name = cli.input.to_string_lossy();

    let compiled = match compile(&source, instruction_set) {
        Ok(compiled) => compiled,
        Err(error) => {
            match cli.format {
                OutputFormat::Text => {
                    for parse_error in &error.errors {
                        eprintln!(
                            "{}",
                            format_parse_error(
                                parse_error,
                                Some(&file_name),
                                Some(&source_lines),
                                use_color,
                            )
                        );
                    }
                }
                OutputFormat::Json => {
                    let errors: Vec<_> = error
                        .errors
                        .iter()
                        .map(|e| {
                            json!({
                                "message": e.message,
                                "line": e.line,
                                "col": e.col,
                            })
                        })
                        .collect();
                    println!("{}", json!({ "ok": false, "parseErrors": errors }));
                }
            }
            return ExitCode::FAILURE;
        }
    };

    if !cli.quiet && !cli.no_warn && cli.format == OutputFormat::Text {
        for warning in &compiled.warnings {
            eprintln!("WARNING: {warning}");
        }
    }

    let outcome = run_to_completion(&compiled.program);
    match cli.format {
        OutputFormat::Text => report_text(&cli, &outcome, &file_name, &source_lines, use_color),
        OutputFormat::Json => report_json(&compiled.warnings, &outcome),
    }
}

fn report_text(
    cli: &Cli,
    outcome: &RunOutcome,
    file_name: &str,
    source_lines: &[String],
    use_color: bool,
) -> ExitCode {
    if let Some(fault) = &outcome.fault {
        eprintln!(
            "{}",
            format_runtime_fault(fault, Some(file_name), Some(source_lines), use_color)
        );
        return ExitCode::FAILURE;
    }
    println!("accumulator: {}", outcome.accumulator);
    if !cli.quiet {
        println!("stack pointer: {}", outcome.stack_pointer);
        if let Some(limit) = cli.dump_memory {
            let mut addresses: Vec<i64> = outcome.memory.keys().copied().collect();
            addresses.sort_unstable();
            for address in addresses.into_iter().take(limit) {
                if let Some(word) = outcome.memory.get(&address) {
                    println!("{address:>6}: {:>9} {}", word.value(), word.binary_representation());
                }
            }
        }
    }
    ExitCode::SUCCESS
}

fn report_json(warnings: &[String], outcome: &RunOutcome) -> ExitCode {
    let mut addresses: Vec<i64> = outcome.memory.keys().copied().collect();
    addresses.sort_unstable();
    let memory: Vec<_> = addresses
        .iter()
        .filter_map(|address| {
            outcome.memory.get(address).map(|word| {
                json!({
                    "address": address,
                    "value": word.value(),
                })
            })
        })
        .collect();
    let report = json!({
        "ok": outcome.fault.is_none(),
        "fault": outcome.fault.as_ref().map(|f| json!({
            "message": f.message,
            "line": f.line,
        })),
        "warnings": warnings,
        "accumulator": outcome.accumulator.value(),
        "stackPointer": outcome.stack_pointer.value(),
        "memory": memory,
    });
    println!("{report}");
    if outcome.fault.is_none() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
