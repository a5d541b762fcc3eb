// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The evaluator: a continuation-passing tree walk over the program
//! token tree, driven as an explicit step machine.
//!
//! Instead of native recursion, the evaluator keeps a current [`Step`]
//! and an explicit stack of continuation [`Frame`]s and runs both in one
//! trampoline loop. Nesting depth, argument-list length and definition
//! chains therefore consume heap, never native stack. Jumps reuse the
//! same mechanism: a jump starts a fresh scope run whose completion
//! value flows to the pending continuation, which is what makes
//! fall-through after CALL, and RET into the caller's scope, behave like
//! nested evaluation.

use std::sync::Arc;

use crate::core::alu::Alu;
use crate::core::machine::Mima;
use crate::core::word::MachineWord;
use crate::interpret::debug::{Boundary, DebugGate};
use crate::interpret::env::{EnvArena, EnvRef};
use crate::interpret::instruction::{ExecContext, InstructionSet, Outcome};
use crate::interpret::value::{RuntimeFault, Value};
use crate::parse::token::{ProgramNode, Token};

/// What the machine works on next.
enum Step {
    /// Evaluate one token in a scope.
    Eval { token: Token, env: EnvRef },
    /// Run a scope starting at statement `at`; `last` is the value of
    /// the previously completed statement of this run.
    RunScope { env: EnvRef, at: usize, last: Value },
    /// Process the definition item at `pos`.
    DefineNext {
        env: EnvRef,
        items: Arc<Vec<Token>>,
        pos: usize,
    },
    /// Deliver a value to the top continuation frame.
    Resume { value: Value },
}

/// A pending continuation.
enum Frame {
    /// Continue a scope at statement `next` once the current statement's
    /// value arrives.
    Scope { env: EnvRef, next: usize },
    /// Bind the arriving value as a variable or constant, then continue
    /// the definition list.
    DefineBind {
        env: EnvRef,
        name: String,
        constant: bool,
        line: u32,
        items: Arc<Vec<Token>>,
        pos: usize,
    },
    /// Collect the arriving argument value; evaluate the next argument
    /// or invoke the function.
    CallArgs {
        env: EnvRef,
        name: String,
        args: Vec<Token>,
        next: usize,
        values: Vec<Value>,
        line: u32,
    },
}

/// Interprets a parsed program against a fresh machine.
pub struct Interpreter {
    arena: EnvArena,
    mima: Mima,
    alu: Alu,
    const_word_length: u32,
    program: Arc<ProgramNode>,
    gate: DebugGate,
    running: bool,
    statements_started: u64,
    current_token: Option<Token>,
    current_scope: EnvRef,
    final_value: Option<Value>,
    fault: Option<RuntimeFault>,
}

impl Interpreter {
    /// Create an interpreter for `program` with the instructions of
    /// `instruction_set` installed in the root environment.
    pub fn new(
        program: Arc<ProgramNode>,
        instruction_set: InstructionSet,
        gate: DebugGate,
    ) -> Self {
        let mut arena = EnvArena::new(program.clone());
        for instruction in instruction_set.instructions() {
            arena
                .define_function(EnvRef::root(), instruction.name(), *instruction)
                .expect("instruction set tables hold unique names");
        }
        Self {
            arena,
            mima: Mima::new(
                instruction_set.word_length(),
                instruction_set.const_word_length(),
            ),
            alu: Alu::new(instruction_set.word_length()),
            const_word_length: instruction_set.const_word_length(),
            program,
            gate,
            running: false,
            statements_started: 0,
            current_token: None,
            current_scope: EnvRef::root(),
            final_value: None,
            fault: None,
        }
    }

    /// Evaluate the whole program. Returns when the program halts, runs
    /// off its end, faults, or is stopped through the debug controller.
    pub fn evaluate_top_level(&mut self) {
        self.running = true;
        // initial rendezvous; a paused gate blocks until the first command
        if self.gate.boundary() == Boundary::Stop {
            self.running = false;
            return;
        }
        let runtime_env = self.arena.extend(EnvRef::root(), self.program.clone());
        if let Err(fault) = self.define_jumps(runtime_env) {
            self.fail(fault);
            return;
        }
        self.current_scope = runtime_env;
        let mut frames: Vec<Frame> = Vec::new();
        let mut step = Step::RunScope {
            env: runtime_env,
            at: 0,
            last: Value::Void,
        };
        while self.running {
            match self.advance(step, &mut frames) {
                Ok(next) => step = next,
                Err(fault) => {
                    self.fail(fault);
                    break;
                }
            }
        }
    }

    /*
     * One transition of the step machine.
     */
    fn advance(&mut self, step: Step, frames: &mut Vec<Frame>) -> Result<Step, RuntimeFault> {
        match step {
            Step::RunScope { env, at, last } => self.run_scope(env, at, last, frames),
            Step::Eval { token, env } => self.eval(token, env, frames),
            Step::DefineNext { env, items, pos } => self.define_next(env, items, pos, frames),
            Step::Resume { value } => self.resume(value, frames),
        }
    }

    fn run_scope(
        &mut self,
        env: EnvRef,
        at: usize,
        last: Value,
        frames: &mut Vec<Frame>,
    ) -> Result<Step, RuntimeFault> {
        let node = self.arena.program(env).clone();
        if at >= node.len() {
            self.arena.set_expression_index(env, 0);
            return Ok(Step::Resume { value: last });
        }
        // statement boundary for the debugger; the very first statement
        // of a run is covered by the initial rendezvous
        if self.statements_started > 0 && self.gate.boundary() == Boundary::Stop {
            self.running = false;
            return Ok(Step::Resume { value: Value::Void });
        }
        self.statements_started += 1;
        let token = node.tokens[at].clone();
        self.current_token = Some(token.clone());
        self.current_scope = env;
        self.arena.set_expression_index(env, at);
        frames.push(Frame::Scope { env, next: at + 1 });
        Ok(Step::Eval { token, env })
    }

    fn eval(
        &mut self,
        token: Token,
        env: EnvRef,
        frames: &mut Vec<Frame>,
    ) -> Result<Step, RuntimeFault> {
        match token {
            Token::Program(node) => {
                let child = self.arena.extend(env, node);
                self.define_jumps(child)?;
                Ok(Step::RunScope {
                    env: child,
                    at: 0,
                    last: Value::Void,
                })
            }
            Token::Number { text, line } => Ok(Step::Resume {
                value: self.evaluate_number(&text, line)?,
            }),
            Token::Binary { text, line } => Ok(Step::Resume {
                value: self.evaluate_binary(&text, line)?,
            }),
            Token::Identification { name, line } => Ok(Step::Resume {
                value: self.evaluate_identification(&name, env, line)?,
            }),
            Token::Definition { items, line: _ } => Ok(Step::DefineNext {
                env,
                items: Arc::new(items),
                pos: 0,
            }),
            Token::Call { callee, args, line } => {
                let name = match *callee {
                    Token::Identification { name, .. } => name,
                    other => {
                        return Err(RuntimeFault::with_line(
                            format!("not a function reference: {other}"),
                            line,
                        ))
                    }
                };
                match args.first().cloned() {
                    None => self.invoke(env, &name, Vec::new(), line),
                    Some(first) => {
                        frames.push(Frame::CallArgs {
                            env,
                            name,
                            args,
                            next: 1,
                            values: Vec::new(),
                            line,
                        });
                        Ok(Step::Eval { token: first, env })
                    }
                }
            }
            Token::JumpPoint { body, .. } => Ok(Step::Eval { token: *body, env }),
            Token::Empty => Ok(Step::Resume { value: Value::Void }),
            Token::Variable { line, .. } | Token::Constant { line, .. } => Err(
                RuntimeFault::with_line("definition item outside a definition", line),
            ),
            Token::Error { message, line, .. } => Err(RuntimeFault::with_line(
                format!("can't execute statement with parse error: {message}"),
                line,
            )),
        }
    }

    fn define_next(
        &mut self,
        env: EnvRef,
        items: Arc<Vec<Token>>,
        pos: usize,
        frames: &mut Vec<Frame>,
    ) -> Result<Step, RuntimeFault> {
        let Some(item) = items.get(pos).cloned() else {
            return Ok(Step::Resume { value: Value::Void });
        };
        match item {
            Token::Variable {
                name,
                value: None,
                line,
            } => {
                let address = self.arena.reserve_address(env);
                let word = MachineWord::new(address, self.const_word_length);
                self.arena
                    .define_variable(env, &name, word)
                    .map_err(|f| at_line(f, line))?;
                Ok(Step::DefineNext {
                    env,
                    items,
                    pos: pos + 1,
                })
            }
            Token::Variable {
                name,
                value: Some(value),
                line,
            } => {
                frames.push(Frame::DefineBind {
                    env,
                    name,
                    constant: false,
                    line,
                    items,
                    pos,
                });
                Ok(Step::Eval { token: *value, env })
            }
            Token::Constant { name, value, line } => {
                frames.push(Frame::DefineBind {
                    env,
                    name,
                    constant: true,
                    line,
                    items,
                    pos,
                });
                Ok(Step::Eval { token: *value, env })
            }
            other => Err(RuntimeFault::new(format!(
                "unexpected definition item: {other}"
            ))),
        }
    }

    fn resume(&mut self, value: Value, frames: &mut Vec<Frame>) -> Result<Step, RuntimeFault> {
        match frames.pop() {
            None => {
                // the top-level scope ran off its end
                self.running = false;
                if self.final_value.is_none() {
                    self.final_value = Some(value);
                }
                Ok(Step::Resume { value: Value::Void })
            }
            Some(Frame::Scope { env, next }) => Ok(Step::RunScope {
                env,
                at: next,
                last: value,
            }),
            Some(Frame::DefineBind {
                env,
                name,
                constant,
                line,
                items,
                pos,
            }) => {
                let word = match value {
                    Value::Number(w) | Value::Constant(w) | Value::MemoryReference(w) => w,
                    Value::Void | Value::JumpReference(_) => {
                        return Err(RuntimeFault::with_line("not a definition body", line))
                    }
                };
                if constant {
                    self.arena
                        .define_constant(env, &name, word)
                        .map_err(|f| at_line(f, line))?;
                } else {
                    if word.value() < 0 {
                        return Err(RuntimeFault::with_line(
                            "can't have negative memory references",
                            line,
                        ));
                    }
                    self.arena
                        .define_variable(env, &name, word)
                        .map_err(|f| at_line(f, line))?;
                }
                Ok(Step::DefineNext {
                    env,
                    items,
                    pos: pos + 1,
                })
            }
            Some(Frame::CallArgs {
                env,
                name,
                args,
                next,
                mut values,
                line,
            }) => {
                values.push(value);
                match args.get(next).cloned() {
                    Some(token) => {
                        frames.push(Frame::CallArgs {
                            env,
                            name,
                            args,
                            next: next + 1,
                            values,
                            line,
                        });
                        Ok(Step::Eval { token, env })
                    }
                    None => self.invoke(env, &name, values, line),
                }
            }
        }
    }

    /*
     * Resolve and execute an instruction with realized argument values.
     */
    fn invoke(
        &mut self,
        env: EnvRef,
        name: &str,
        values: Vec<Value>,
        line: u32,
    ) -> Result<Step, RuntimeFault> {
        let function = self
            .arena
            .get_function(env, name)
            .map_err(|f| at_line(f, line))?;
        let mut ctx = ExecContext {
            mima: &mut self.mima,
            arena: &mut self.arena,
            alu: self.alu,
        };
        match function
            .execute(&values, env, &mut ctx)
            .map_err(|f| at_line(f, line))?
        {
            Outcome::Value(value) => Ok(Step::Resume { value }),
            Outcome::Jump { env, index } => {
                self.arena.set_expression_index(env, index);
                Ok(Step::RunScope {
                    env,
                    at: index,
                    last: Value::Void,
                })
            }
            Outcome::Halt(value) => {
                self.running = false;
                self.final_value = Some(value.clone());
                Ok(Step::Resume { value })
            }
        }
    }

    fn define_jumps(&mut self, env: EnvRef) -> Result<(), RuntimeFault> {
        let jumps = self.arena.program(env).jumps().to_vec();
        for (name, index) in jumps {
            self.arena.define_jump(env, &name, index)?;
        }
        Ok(())
    }

    fn evaluate_number(&self, text: &str, line: u32) -> Result<Value, RuntimeFault> {
        let value: i64 = text
            .parse()
            .map_err(|_| RuntimeFault::with_line(format!("invalid number: {text}"), line))?;
        if !MachineWord::fits(value, self.const_word_length) {
            return Err(RuntimeFault::with_line(
                format!("value out of range: {text}"),
                line,
            ));
        }
        Ok(Value::Number(MachineWord::new(
            value,
            self.const_word_length,
        )))
    }

    fn evaluate_binary(&self, text: &str, line: u32) -> Result<Value, RuntimeFault> {
        MachineWord::from_binary_str(text, self.const_word_length)
            .map(Value::Number)
            .ok_or_else(|| {
                RuntimeFault::with_line(format!("invalid binary value: 0b{text}"), line)
            })
    }

    /*
     * Classification precedence: variable, then constant, then jump.
     */
    fn evaluate_identification(
        &self,
        name: &str,
        env: EnvRef,
        line: u32,
    ) -> Result<Value, RuntimeFault> {
        if self.arena.lookup_variable(env, name).is_some() {
            Ok(Value::MemoryReference(self.arena.get_variable(env, name)?))
        } else if self.arena.lookup_constant(env, name).is_some() {
            Ok(Value::Constant(self.arena.get_constant(env, name)?))
        } else if self.arena.lookup_jump(env, name).is_some() {
            Ok(Value::JumpReference(name.to_string()))
        } else {
            Err(RuntimeFault::with_line(
                format!("undefined identification: {name}"),
                line,
            ))
        }
    }

    fn fail(&mut self, fault: RuntimeFault) {
        if self.fault.is_none() {
            self.fault = Some(fault);
        }
        self.running = false;
    }

    /// Whether the interpreter is currently evaluating.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop evaluation; observed at the next statement boundary.
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// The statement token currently being evaluated.
    pub fn current_token(&self) -> Option<&Token> {
        self.current_token.as_ref()
    }

    /// The scope currently being evaluated.
    pub fn current_scope(&self) -> EnvRef {
        self.current_scope
    }

    /// The machine state.
    pub fn mima(&self) -> &Mima {
        &self.mima
    }

    /// The environment arena.
    pub fn arena(&self) -> &EnvArena {
        &self.arena
    }

    /// The first fault of the run, if any.
    pub fn fault(&self) -> Option<&RuntimeFault> {
        self.fault.as_ref()
    }

    /// The value delivered by HALT, or the last statement value when the
    /// program ran off its end.
    pub fn final_value(&self) -> Option<&Value> {
        self.final_value.as_ref()
    }
}

fn at_line(fault: RuntimeFault, line: u32) -> RuntimeFault {
    if fault.line.is_some() {
        fault
    } else {
        RuntimeFault::with_line(fault.message, line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpret::debug::DebugGate;
    use crate::parse::parse;

    fn run_mimax(source: &str) -> Interpreter {
        run_with(source, InstructionSet::MimaX)
    }

    fn run_with(source: &str, set: InstructionSet) -> Interpreter {
        let (program, errors) = parse(source);
        assert!(errors.is_empty(), "parse errors: {errors:?}");
        let mut interpreter = Interpreter::new(program, set, DebugGate::detached());
        interpreter.evaluate_top_level();
        interpreter
    }

    #[test]
    fn evaluates_a_straight_line_program() {
        let interpreter = run_mimax("LDC(5); STV(0); LDC(2); ADD(0); HALT();");
        assert!(interpreter.fault().is_none());
        assert!(!interpreter.is_running());
        assert_eq!(interpreter.mima().accumulator().value(), 7);
    }

    #[test]
    fn auto_reserved_addresses_are_unique_and_decreasing() {
        let interpreter = run_mimax("§define a; §define b; §define c; HALT();");
        let env = interpreter.current_scope();
        let arena = interpreter.arena();
        assert_eq!(arena.get_variable(env, "a").unwrap().value(), -1);
        assert_eq!(arena.get_variable(env, "b").unwrap().value(), -2);
        assert_eq!(arena.get_variable(env, "c").unwrap().value(), -3);
    }

    #[test]
    fn variables_resolve_to_memory_references() {
        let interpreter = run_mimax("§define v; LDC(9); STV(v); LDC(0); LDV(v); HALT();");
        assert!(interpreter.fault().is_none());
        assert_eq!(interpreter.mima().accumulator().value(), 9);
    }

    #[test]
    fn constants_are_plain_values() {
        let interpreter = run_mimax("§define const k: 6; LDC(k); HALT();");
        assert!(interpreter.fault().is_none());
        assert_eq!(interpreter.mima().accumulator().value(), 6);
    }

    #[test]
    fn jump_by_label_and_by_raw_index_agree() {
        // the label sits at statement index 3
        let by_label = run_mimax("LDC(1); JMP(Skip); LDC(2); Skip: HALT();");
        let by_index = run_mimax("LDC(1); JMP(3); LDC(2); Skip: HALT();");
        assert!(by_label.fault().is_none());
        assert!(by_index.fault().is_none());
        assert_eq!(by_label.mima().accumulator().value(), 1);
        assert_eq!(by_index.mima().accumulator().value(), 1);
    }

    #[test]
    fn conditional_jump_follows_the_sign_bit() {
        let interpreter = run_mimax(
            "LDC(0); NOT(); JMN(Neg); LDC(7); HALT(); Neg: LDC(3); HALT();",
        );
        assert!(interpreter.fault().is_none());
        assert_eq!(interpreter.mima().accumulator().value(), 3);
    }

    #[test]
    fn nested_scopes_shadow_and_fall_through() {
        let interpreter = run_mimax(
            "§define v: 1; LDC(4); STV(v); { §define v: 2; LDV(v); }; HALT();",
        );
        assert!(interpreter.fault().is_none());
        // the inner scope reads its own v (address 2), untouched: 0
        assert_eq!(interpreter.mima().accumulator().value(), 0);
    }

    #[test]
    fn call_and_ret_resume_after_the_call_site() {
        let interpreter = run_mimax(
            "CALL(Sub); ADC(1); HALT(); Sub: LDC(10); RET();",
        );
        assert!(interpreter.fault().is_none());
        assert_eq!(interpreter.mima().accumulator().value(), 11);
    }

    #[test]
    fn undefined_identification_faults() {
        let interpreter = run_mimax("LDV(nothere); HALT();");
        let fault = interpreter.fault().expect("fault expected");
        assert!(fault.message.contains("nothere"));
        assert!(!interpreter.is_running());
    }

    #[test]
    fn wrong_argument_count_faults() {
        let interpreter = run_mimax("HALT(1);");
        assert!(interpreter.fault().is_some());
    }

    #[test]
    fn redefinition_faults_but_shadowing_does_not() {
        let duplicated = run_mimax("§define a; §define a; HALT();");
        assert!(duplicated.fault().is_some());
        let shadowed = run_mimax("§define a; { §define a; }; HALT();");
        assert!(shadowed.fault().is_none());
    }

    #[test]
    fn base_set_rejects_extended_instructions() {
        let interpreter = run_with("ADC(1); HALT();", InstructionSet::Mima);
        assert!(interpreter.fault().is_some());
    }

    #[test]
    fn running_off_the_end_completes_without_fault() {
        let interpreter = run_mimax("LDC(5);");
        assert!(interpreter.fault().is_none());
        assert!(!interpreter.is_running());
        assert_eq!(interpreter.mima().accumulator().value(), 5);
    }

    #[test]
    fn parse_error_placeholders_fault_at_runtime() {
        let (program, errors) = parse("LDC(1); @; HALT();");
        assert!(!errors.is_empty());
        let mut interpreter =
            Interpreter::new(program, InstructionSet::MimaX, DebugGate::detached());
        interpreter.evaluate_top_level();
        assert!(interpreter.fault().is_some());
    }

    #[test]
    fn deep_definition_chain_runs_in_constant_native_stack() {
        let mut source = String::new();
        for i in 0..10_000 {
            source.push_str(&format!("§define v{i};\n"));
        }
        source.push_str("LDC(1); HALT();");
        let interpreter = run_mimax(&source);
        assert!(interpreter.fault().is_none());
        assert_eq!(interpreter.mima().accumulator().value(), 1);
        let env = interpreter.current_scope();
        assert_eq!(
            interpreter.arena().get_variable(env, "v9999").unwrap().value(),
            -10_000
        );
    }

    #[test]
    fn wide_argument_lists_fault_on_arity_not_on_stack() {
        let args = (0..5_000).map(|_| "0").collect::<Vec<_>>().join(", ");
        let interpreter = run_mimax(&format!("LDC({args}); HALT();"));
        let fault = interpreter.fault().expect("arity fault expected");
        assert!(fault.message.contains("number of arguments"));
    }
}
