// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::interpret::InstructionSet;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const LONG_ABOUT: &str = "Toolchain for the Mima/MimaX teaching machine.

Parses a source file, runs the static code checks and interprets the
program against a simulated machine. The instruction set is selected by
the file extension (.mima for the base set with 24-bit words and 20-bit
constants, .mimax for the extended set with CALL/RET and stack-pointer
instructions) and can be overridden with --instruction-set.";

#[derive(Parser, Debug)]
#[command(
    name = "mimaforge",
    version = VERSION,
    about = "Parser and interpreter for the Mima/MimaX teaching machine",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    /// Source file (.mima or .mimax)
    pub input: PathBuf,
    #[arg(
        long = "format",
        value_enum,
        default_value = "text",
        long_help = "Select output format. text is default; json emits a machine-readable run report."
    )]
    pub format: OutputFormat,
    #[arg(
        long = "instruction-set",
        value_enum,
        long_help = "Override the instruction set selected by the file extension."
    )]
    pub instruction_set: Option<SetChoice>,
    #[arg(
        short = 'q',
        long = "quiet",
        action = ArgAction::SetTrue,
        long_help = "Suppress warnings and the memory dump for successful runs. Errors are still reported."
    )]
    pub quiet: bool,
    #[arg(
        short = 'w',
        long = "no-warn",
        action = ArgAction::SetTrue,
        long_help = "Suppress code-check warnings."
    )]
    pub no_warn: bool,
    #[arg(
        long = "dump-memory",
        value_name = "CELLS",
        long_help = "Print up to CELLS touched memory cells after the run, lowest address first."
    )]
    pub dump_memory: Option<usize>,
    #[arg(
        long = "no-color",
        action = ArgAction::SetTrue,
        long_help = "Disable ANSI colors in diagnostics."
    )]
    pub no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SetChoice {
    Mima,
    Mimax,
}

impl From<SetChoice> for InstructionSet {
    fn from(choice: SetChoice) -> Self {
        match choice {
            SetChoice::Mima => InstructionSet::Mima,
            SetChoice::Mimax => InstructionSet::MimaX,
        }
    }
}

/// Pick the instruction set for the given CLI invocation, from the
/// override flag or the input file extension.
pub fn resolve_instruction_set(cli: &Cli) -> Result<InstructionSet, String> {
    if let Some(choice) = cli.instruction_set {
        return Ok(choice.into());
    }
    let extension = cli
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    InstructionSet::from_extension(extension).ok_or_else(|| {
        format!(
            "unknown file extension \"{extension}\"; expected .mima or .mimax \
             (or pass --instruction-set)"
        )
    })
}
