// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The instruction catalog and the Mima/MimaX instruction sets.
//!
//! Every instruction validates its argument count and argument classes
//! before touching the machine; a wrong argument is a fatal fault.
//! Control instructions (HALT, jumps, CALL/RET) do not mutate the
//! machine directly but report an [`Outcome`] the evaluator acts on.

use crate::core::alu::Alu;
use crate::core::machine::Mima;
use crate::core::word::MachineWord;
use crate::interpret::env::{EnvArena, EnvRef};
use crate::interpret::value::{RuntimeFault, Value};

/// The two supported instruction sets with their word widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionSet {
    /// Base set: 24-bit words, 20-bit argument constants.
    Mima,
    /// Extended set: 24-bit words and constants, adds CALL/RET/ADC and
    /// the stack-pointer instructions.
    MimaX,
}

impl InstructionSet {
    /// Number of bits in a memory word.
    pub fn word_length(&self) -> u32 {
        24
    }

    /// Number of bits in an argument word.
    pub fn const_word_length(&self) -> u32 {
        match self {
            InstructionSet::Mima => 20,
            InstructionSet::MimaX => 24,
        }
    }

    /// The source file extension selecting this set.
    pub fn file_extension(&self) -> &'static str {
        match self {
            InstructionSet::Mima => "mima",
            InstructionSet::MimaX => "mimax",
        }
    }

    /// Select an instruction set from a file extension.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "mima" => Some(InstructionSet::Mima),
            "mimax" => Some(InstructionSet::MimaX),
            _ => None,
        }
    }

    /// The instructions this set installs into the root environment.
    pub fn instructions(&self) -> &'static [Instruction] {
        match self {
            InstructionSet::Mima => BASE_INSTRUCTIONS,
            InstructionSet::MimaX => EXTENDED_INSTRUCTIONS,
        }
    }
}

const BASE_INSTRUCTIONS: &[Instruction] = &[
    Instruction::Ldc,
    Instruction::Ldv,
    Instruction::Stv,
    Instruction::Ldiv,
    Instruction::Stiv,
    Instruction::Rar,
    Instruction::Not,
    Instruction::Add,
    Instruction::And,
    Instruction::Or,
    Instruction::Xor,
    Instruction::Eql,
    Instruction::Halt,
    Instruction::Jmp,
    Instruction::Jmn,
    Instruction::Jind,
];

const EXTENDED_INSTRUCTIONS: &[Instruction] = &[
    Instruction::Ldc,
    Instruction::Ldv,
    Instruction::Stv,
    Instruction::Ldiv,
    Instruction::Stiv,
    Instruction::Rar,
    Instruction::Not,
    Instruction::Add,
    Instruction::And,
    Instruction::Or,
    Instruction::Xor,
    Instruction::Eql,
    Instruction::Halt,
    Instruction::Jmp,
    Instruction::Jmn,
    Instruction::Jind,
    Instruction::Adc,
    Instruction::Ldsp,
    Instruction::Stsp,
    Instruction::Sp,
    Instruction::Stvr,
    Instruction::Ldvr,
    Instruction::Call,
    Instruction::Ret,
];

/// What an instruction asks the evaluator to do next.
#[derive(Debug)]
pub enum Outcome {
    /// Hand this value to the pending continuation.
    Value(Value),
    /// Continue evaluation at a statement of some scope.
    Jump { env: EnvRef, index: usize },
    /// Stop the run and deliver the final value.
    Halt(Value),
}

/// Machine and scope state an instruction executes against.
pub struct ExecContext<'a> {
    pub mima: &'a mut Mima,
    pub arena: &'a mut EnvArena,
    pub alu: Alu,
}

/// A machine instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    Ldc,
    Ldv,
    Stv,
    Ldiv,
    Stiv,
    Rar,
    Not,
    Add,
    And,
    Or,
    Xor,
    Eql,
    Halt,
    Jmp,
    Jmn,
    Jind,
    Adc,
    Ldsp,
    Stsp,
    Sp,
    Stvr,
    Ldvr,
    Call,
    Ret,
}

impl Instruction {
    /// The instruction keyword.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Ldc => "LDC",
            Instruction::Ldv => "LDV",
            Instruction::Stv => "STV",
            Instruction::Ldiv => "LDIV",
            Instruction::Stiv => "STIV",
            Instruction::Rar => "RAR",
            Instruction::Not => "NOT",
            Instruction::Add => "ADD",
            Instruction::And => "AND",
            Instruction::Or => "OR",
            Instruction::Xor => "XOR",
            Instruction::Eql => "EQL",
            Instruction::Halt => "HALT",
            Instruction::Jmp => "JMP",
            Instruction::Jmn => "JMN",
            Instruction::Jind => "JIND",
            Instruction::Adc => "ADC",
            Instruction::Ldsp => "LDSP",
            Instruction::Stsp => "STSP",
            Instruction::Sp => "SP",
            Instruction::Stvr => "STVR",
            Instruction::Ldvr => "LDVR",
            Instruction::Call => "CALL",
            Instruction::Ret => "RET",
        }
    }

    /// Number of arguments the instruction takes.
    pub fn arity(&self) -> usize {
        match self {
            Instruction::Rar
            | Instruction::Not
            | Instruction::Halt
            | Instruction::Ldsp
            | Instruction::Stsp
            | Instruction::Sp
            | Instruction::Ret => 0,
            Instruction::Stvr | Instruction::Ldvr => 2,
            _ => 1,
        }
    }

    /// Execute against the machine. `env` is the scope the call site is
    /// evaluated in; CALL records it for RET.
    pub fn execute(
        &self,
        args: &[Value],
        env: EnvRef,
        ctx: &mut ExecContext<'_>,
    ) -> Result<Outcome, RuntimeFault> {
        check_arg_number(args, self.arity())?;
        match self {
            Instruction::Ldc => {
                let value = reference_word(args, 0)?;
                if ctx.mima.word_length() != ctx.mima.const_word_length() && value.value() < 0 {
                    return Err(RuntimeFault::new("can't pass negative values"));
                }
                ctx.mima.set_accumulator(value);
                Ok(Outcome::Value(Value::Void))
            }
            Instruction::Ldv => {
                let address = memory_address(args, 0)?;
                let value = ctx.mima.load_value(address);
                ctx.mima.set_accumulator(value);
                Ok(Outcome::Value(Value::Void))
            }
            Instruction::Stv => {
                let address = memory_address(args, 0)?;
                let accumulator = ctx.mima.accumulator();
                ctx.mima.store_value(address, accumulator);
                Ok(Outcome::Value(Value::Void))
            }
            Instruction::Ldiv => {
                let address = memory_address(args, 0)?;
                let indirect = ctx.mima.load_value(address).value();
                let value = ctx.mima.load_value(indirect);
                ctx.mima.set_accumulator(value);
                Ok(Outcome::Value(Value::Void))
            }
            Instruction::Stiv => {
                let address = memory_address(args, 0)?;
                let indirect = ctx.mima.load_value(address).value();
                let accumulator = ctx.mima.accumulator();
                ctx.mima.store_value(indirect, accumulator);
                Ok(Outcome::Value(Value::Void))
            }
            Instruction::Rar => {
                let rotated = ctx.alu.rar(ctx.mima.accumulator());
                ctx.mima.set_accumulator(rotated);
                Ok(Outcome::Value(Value::Void))
            }
            Instruction::Not => {
                let inverted = ctx.mima.accumulator().invert();
                ctx.mima.set_accumulator(inverted);
                Ok(Outcome::Value(Value::Void))
            }
            Instruction::Add => self.apply_alu(args, ctx, |alu, a, b| alu.add(a, b)),
            Instruction::And => self.apply_alu(args, ctx, |alu, a, b| alu.and(a, b)),
            Instruction::Or => self.apply_alu(args, ctx, |alu, a, b| alu.or(a, b)),
            Instruction::Xor => self.apply_alu(args, ctx, |alu, a, b| alu.xor(a, b)),
            Instruction::Eql => {
                self.apply_alu(args, ctx, |alu, a, b| alu.negative_if_equals(a, b))
            }
            Instruction::Halt => {
                Ok(Outcome::Halt(Value::Number(ctx.mima.accumulator())))
            }
            Instruction::Jmp => {
                let (env, index) = jump_target(jump_value(args, 0)?, env, ctx.arena)?;
                Ok(Outcome::Jump { env, index })
            }
            Instruction::Jmn => {
                // the target is resolved even when the branch is not taken
                let (env, index) = jump_target(jump_value(args, 0)?, env, ctx.arena)?;
                if ctx.mima.accumulator().msb() {
                    Ok(Outcome::Jump { env, index })
                } else {
                    Ok(Outcome::Value(Value::Number(MachineWord::new(
                        0,
                        ctx.mima.const_word_length(),
                    ))))
                }
            }
            Instruction::Jind => {
                let address = memory_address(args, 0)?;
                let target = ctx.mima.load_value(address);
                let (env, index) = jump_target(&Value::Number(target), env, ctx.arena)?;
                Ok(Outcome::Jump { env, index })
            }
            Instruction::Adc => {
                let value = reference_word(args, 0)?;
                let sum = ctx.alu.add(ctx.mima.accumulator(), value);
                ctx.mima.set_accumulator(sum);
                Ok(Outcome::Value(Value::Void))
            }
            Instruction::Ldsp => {
                let pointer = ctx.mima.stack_pointer();
                ctx.mima.set_accumulator(pointer);
                Ok(Outcome::Value(Value::Void))
            }
            Instruction::Stsp => {
                let address = ctx.mima.accumulator().value();
                let touched = ctx.mima.load_value(address);
                ctx.mima.store_value(address, touched);
                ctx.mima.set_stack_pointer(address);
                Ok(Outcome::Value(Value::Void))
            }
            Instruction::Sp => Ok(Outcome::Value(Value::Number(ctx.mima.stack_pointer()))),
            Instruction::Stvr => {
                let address = offset_address(args)?;
                let accumulator = ctx.mima.accumulator();
                ctx.mima.store_value(address, accumulator);
                Ok(Outcome::Value(Value::Void))
            }
            Instruction::Ldvr => {
                let address = offset_address(args)?;
                let value = ctx.mima.load_value(address);
                ctx.mima.set_accumulator(value);
                Ok(Outcome::Value(Value::Void))
            }
            Instruction::Call => {
                let Value::JumpReference(name) = jump_value(args, 0)? else {
                    return Err(RuntimeFault::new("CALL needs a named jump reference"));
                };
                let return_index = ctx.arena.expression_index(env) + 1;
                let (target_env, index) = ctx.arena.get_jump(env, name)?;
                ctx.mima.push_routine(return_index, env);
                Ok(Outcome::Jump {
                    env: target_env,
                    index,
                })
            }
            Instruction::Ret => match ctx.mima.return_routine() {
                Some((index, env)) => Ok(Outcome::Jump { env, index }),
                None => Err(RuntimeFault::new("nowhere to return to")),
            },
        }
    }

    /*
     * Accumulator <- op(accumulator, memory[address]).
     */
    fn apply_alu(
        &self,
        args: &[Value],
        ctx: &mut ExecContext<'_>,
        op: impl Fn(&Alu, MachineWord, MachineWord) -> MachineWord,
    ) -> Result<Outcome, RuntimeFault> {
        let address = memory_address(args, 0)?;
        let operand = ctx.mima.load_value(address);
        let accumulator = ctx.mima.accumulator().cast(ctx.mima.word_length());
        let result = op(&ctx.alu, accumulator, operand);
        ctx.mima.set_accumulator(result);
        Ok(Outcome::Value(Value::Void))
    }
}

fn check_arg_number(args: &[Value], expected: usize) -> Result<(), RuntimeFault> {
    if args.len() != expected {
        return Err(RuntimeFault::new("invalid number of arguments"));
    }
    Ok(())
}

/*
 * A plain value argument: literal or constant, never a reference.
 */
fn reference_word(args: &[Value], index: usize) -> Result<MachineWord, RuntimeFault> {
    match &args[index] {
        Value::Constant(w) | Value::Number(w) => Ok(*w),
        _ => Err(RuntimeFault::new("can't pass a reference")),
    }
}

/*
 * A memory address argument: a resolved memory reference, or a
 * non-negative literal/constant.
 */
fn memory_address(args: &[Value], index: usize) -> Result<i64, RuntimeFault> {
    match &args[index] {
        Value::MemoryReference(w) => Ok(w.value()),
        Value::Constant(w) | Value::Number(w) => {
            if w.value() < 0 {
                Err(RuntimeFault::new("illegal memory address"))
            } else {
                Ok(w.value())
            }
        }
        _ => Err(RuntimeFault::new("must pass a memory address")),
    }
}

/*
 * A jump argument: named reference, or a literal/constant raw statement
 * index.
 */
fn jump_value(args: &[Value], index: usize) -> Result<&Value, RuntimeFault> {
    match &args[index] {
        value @ (Value::JumpReference(_) | Value::Constant(_) | Value::Number(_)) => Ok(value),
        _ => Err(RuntimeFault::new("must pass a jump reference")),
    }
}

/*
 * Resolve a jump argument to (scope, statement index). Named references
 * resolve through the environment chain. A numeric target is the
 * 0-based statement index of the innermost enclosing scope whose
 * statement list contains it.
 */
fn jump_target(
    value: &Value,
    env: EnvRef,
    arena: &EnvArena,
) -> Result<(EnvRef, usize), RuntimeFault> {
    match value {
        Value::JumpReference(name) => arena.get_jump(env, name),
        Value::Constant(w) | Value::Number(w) => {
            let target = w.value();
            if target < 0 {
                return Err(RuntimeFault::new(format!(
                    "jump target out of range: {target}"
                )));
            }
            let mut scope = Some(env);
            while let Some(current) = scope {
                if (target as usize) < arena.program(current).len() {
                    return Ok((current, target as usize));
                }
                scope = arena.parent(current);
            }
            Err(RuntimeFault::new(format!(
                "no statement with index {target} in scope"
            )))
        }
        _ => Err(RuntimeFault::new("must pass a jump reference")),
    }
}

/*
 * Base-plus-offset address of the stack-relative instructions.
 */
fn offset_address(args: &[Value]) -> Result<i64, RuntimeFault> {
    let base = reference_word(args, 0)?;
    let offset = reference_word(args, 1)?;
    let address = base.value() + offset.value();
    if address < 0 {
        return Err(RuntimeFault::new("illegal memory address"));
    }
    Ok(address)
}
