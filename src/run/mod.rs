// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Compile pipeline and program runner.
//!
//! - [`checker`] - Static code checks (warnings)
//! - [`compile`] - Parse + strict error policy + checks
//! - [`MimaRunner`] - Worker-thread execution with debugger control

pub mod checker;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::core::word::MachineWord;
use crate::interpret::debug::{DebugController, DebugGate};
use crate::interpret::interpreter::Interpreter;
use crate::interpret::value::{RuntimeFault, Value};
use crate::interpret::InstructionSet;
use crate::parse::{parse, ParseError, ProgramNode};

/// A compiled program: the token tree plus the instruction set it runs
/// against.
#[derive(Debug, Clone)]
pub struct Program {
    pub token: Arc<ProgramNode>,
    pub instruction_set: InstructionSet,
}

/// Compile failure: the collected parse errors.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub errors: Vec<ParseError>,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "invalid tokens:")?;
        for error in &self.errors {
            writeln!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// A successful compile with its check findings.
#[derive(Debug)]
pub struct Compiled {
    pub program: Program,
    pub warnings: Vec<String>,
}

/// Parse `source` and run the static checks. Any parse error fails the
/// compile; the warnings never do.
pub fn compile(source: &str, instruction_set: InstructionSet) -> Result<Compiled, CompileError> {
    let (token, errors) = parse(source);
    if !errors.is_empty() {
        return Err(CompileError { errors });
    }
    let warnings = checker::check(&token);
    Ok(Compiled {
        program: Program {
            token,
            instruction_set,
        },
        warnings,
    })
}

/// Host-supplied sink for runtime faults.
pub trait ExceptionHandler: Send {
    fn notify_exception(&mut self, fault: &RuntimeFault);
}

/// Snapshot of a finished run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Value delivered by HALT, or the last statement value.
    pub final_value: Option<Value>,
    /// First runtime fault, if the run failed.
    pub fault: Option<RuntimeFault>,
    pub accumulator: MachineWord,
    pub stack_pointer: MachineWord,
    /// Memory cells touched during the run.
    pub memory: HashMap<i64, MachineWord>,
}

impl RunOutcome {
    fn from_interpreter(interpreter: Interpreter) -> Self {
        Self {
            final_value: interpreter.final_value().cloned(),
            fault: interpreter.fault().cloned(),
            accumulator: interpreter.mima().accumulator(),
            stack_pointer: interpreter.mima().stack_pointer(),
            memory: interpreter.mima().memory().mapping().clone(),
        }
    }
}

/// Run `program` to completion on the calling thread, without debugger
/// interaction.
pub fn run_to_completion(program: &Program) -> RunOutcome {
    let mut interpreter = Interpreter::new(
        program.token.clone(),
        program.instruction_set,
        DebugGate::detached(),
    );
    interpreter.evaluate_top_level();
    RunOutcome::from_interpreter(interpreter)
}

/// Runs a program on a dedicated worker thread, controlled through the
/// debug channel. The machine state is owned by the worker during the
/// run and handed back in the [`RunOutcome`] at [`MimaRunner::join`].
pub struct MimaRunner {
    controller: DebugController,
    handle: JoinHandle<RunOutcome>,
}

impl MimaRunner {
    /// Start `program` in debug mode: the worker pauses before the
    /// first statement and one [`MimaRunner::step`] executes exactly one
    /// statement.
    pub fn start_debug(program: &Program) -> Self {
        Self::start_with_gate(program, DebugGate::paused(), None)
    }

    /// Start `program` free-running.
    pub fn start(program: &Program) -> Self {
        Self::start_with_gate(program, DebugGate::running(), None)
    }

    /// Start free-running with a fault sink.
    pub fn start_with_handler(program: &Program, handler: Box<dyn ExceptionHandler>) -> Self {
        Self::start_with_gate(program, DebugGate::running(), Some(handler))
    }

    fn start_with_gate(
        program: &Program,
        (controller, gate): (DebugController, DebugGate),
        mut handler: Option<Box<dyn ExceptionHandler>>,
    ) -> Self {
        let token = program.token.clone();
        let instruction_set = program.instruction_set;
        let handle = std::thread::spawn(move || {
            let mut interpreter = Interpreter::new(token, instruction_set, gate);
            interpreter.evaluate_top_level();
            if let (Some(handler), Some(fault)) = (handler.as_mut(), interpreter.fault()) {
                handler.notify_exception(fault);
            }
            RunOutcome::from_interpreter(interpreter)
        });
        Self { controller, handle }
    }

    /// Execute one statement, then pause again.
    pub fn step(&self) {
        self.controller.step();
    }

    /// Continue free-running execution.
    pub fn resume(&self) {
        self.controller.resume();
    }

    /// Pause at the next statement boundary.
    pub fn pause(&self) {
        self.controller.pause();
    }

    /// Terminate the run; releases a paused worker.
    pub fn stop(&self) {
        self.controller.stop();
    }

    /// Whether the worker is still evaluating (or waiting for commands).
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// The debug controller, e.g. for wiring into a UI.
    pub fn controller(&self) -> &DebugController {
        &self.controller
    }

    /// Wait for the worker and return the finished machine state.
    pub fn join(self) -> RunOutcome {
        match self.handle.join() {
            Ok(outcome) => outcome,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(source: &str) -> Program {
        compile(source, InstructionSet::MimaX)
            .expect("program compiles")
            .program
    }

    #[test]
    fn compile_collects_parse_errors() {
        let error = compile("LDC(5;", InstructionSet::Mima).unwrap_err();
        assert!(!error.errors.is_empty());
    }

    #[test]
    fn compile_surfaces_checker_warnings() {
        let compiled = compile("LDC(1); 3; HALT();", InstructionSet::MimaX).unwrap();
        assert_eq!(compiled.warnings.len(), 1);
    }

    #[test]
    fn synchronous_run_produces_a_snapshot() {
        let outcome = run_to_completion(&compiled("§define v; LDC(8); STV(v); HALT();"));
        assert!(outcome.fault.is_none());
        assert_eq!(outcome.accumulator.value(), 8);
        assert_eq!(outcome.memory.get(&-1).map(|w| w.value()), Some(8));
    }

    #[test]
    fn free_running_worker_completes_on_its_own() {
        let runner = MimaRunner::start(&compiled("LDC(4); ADC(1); HALT();"));
        let outcome = runner.join();
        assert!(outcome.fault.is_none());
        assert_eq!(outcome.accumulator.value(), 5);
    }

    #[test]
    fn stop_terminates_a_paused_run() {
        let runner = MimaRunner::start_debug(&compiled("LDC(1); LDC(2); HALT();"));
        runner.stop();
        let outcome = runner.join();
        assert!(outcome.fault.is_none());
        // nothing ran
        assert_eq!(outcome.accumulator.value(), 0);
    }

    #[test]
    fn stepping_executes_one_statement_per_step() {
        let program = compiled("LDC(1); LDC(2); LDC(3); HALT();");
        let runner = MimaRunner::start_debug(&program);
        for _ in 0..4 {
            runner.step();
        }
        let outcome = runner.join();
        assert!(outcome.fault.is_none());
        assert_eq!(outcome.accumulator.value(), 3);
    }

    #[test]
    fn resume_finishes_a_stepped_run() {
        let program = compiled("LDC(1); LDC(2); LDC(3); HALT();");
        let runner = MimaRunner::start_debug(&program);
        runner.step();
        runner.resume();
        let outcome = runner.join();
        assert!(outcome.fault.is_none());
        assert_eq!(outcome.accumulator.value(), 3);
    }
}
