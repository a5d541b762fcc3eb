// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! End-to-end program runs through the compile pipeline and runner.

use mimaforge::interpret::InstructionSet;
use mimaforge::run::{compile, run_to_completion, MimaRunner, Program, RunOutcome};

fn program(source: &str, set: InstructionSet) -> Program {
    compile(source, set).expect("program compiles").program
}

fn run(source: &str, set: InstructionSet) -> RunOutcome {
    run_to_completion(&program(source, set))
}

fn run_mimax(source: &str) -> RunOutcome {
    run(source, InstructionSet::MimaX)
}

#[test]
fn round_trip_loop_program_terminates() {
    // a store/load loop that drives the accumulator negative so the
    // conditional jump fires and HALT delivers the last loaded value
    let outcome = run_mimax(
        "§define val;
         LDC(5); STV(val);
         LDC(0); NOT();
         STV(val);
         Loop: LDV(val);
         JMN(Stop);
         JMP(Loop);
         Stop: HALT();",
    );
    assert!(outcome.fault.is_none());
    assert_eq!(outcome.accumulator.value(), -1);
    assert!(outcome.final_value.is_some());
}

#[test]
fn counting_loop_reaches_its_bound() {
    // count memory cell 0 from 10 down to 0 via an all-ones decrement
    let outcome = run_mimax(
        "§define counter;
         LDC(10); STV(counter);
         Loop: LDC(0); NOT(); ADD(counter); STV(counter);
         LDV(counter);
         JMN(Done);
         JMP(Loop);
         Done: HALT();",
    );
    assert!(outcome.fault.is_none());
    assert_eq!(outcome.memory.get(&-1).map(|w| w.value()), Some(-1));
}

#[test]
fn eql_yields_all_ones_only_on_equality() {
    let equal = run_mimax("LDC(9); STV(0); LDC(9); EQL(0); HALT();");
    assert!(equal.fault.is_none());
    assert_eq!(equal.accumulator.value(), -1);

    let different = run_mimax("LDC(9); STV(0); LDC(8); EQL(0); HALT();");
    assert!(different.fault.is_none());
    assert_eq!(different.accumulator.value(), 0);
}

#[test]
fn rar_wraps_the_lsb_into_the_msb() {
    let outcome = run_mimax("LDC(0b101); RAR(); HALT();");
    assert!(outcome.fault.is_none());
    // 0b101 rotated right: lsb 1 moves to bit 23
    assert_eq!(outcome.accumulator.raw_bits(), (1 << 23) | 0b10);
}

#[test]
fn jumping_by_duplicate_labels_lands_on_the_same_statement() {
    let via_first = run_mimax("JMP(A); LDC(1); A: B: LDC(7); HALT();");
    let via_second = run_mimax("JMP(B); LDC(1); A: B: LDC(7); HALT();");
    assert!(via_first.fault.is_none());
    assert!(via_second.fault.is_none());
    assert_eq!(via_first.accumulator.value(), 7);
    assert_eq!(via_second.accumulator.value(), 7);
}

#[test]
fn jump_by_label_and_raw_index_agree() {
    let by_label = run_mimax("LDC(1); JMP(End); LDC(2); End: HALT();");
    let by_index = run_mimax("LDC(1); JMP(3); LDC(2); End: HALT();");
    assert_eq!(by_label.accumulator.value(), by_index.accumulator.value());
}

#[test]
fn jind_jumps_through_memory() {
    // memory cell 0 holds the target statement index
    let outcome = run_mimax("LDC(4); STV(0); JIND(0); LDC(1); HALT();");
    assert!(outcome.fault.is_none());
    // statement 4 is HALT, so LDC(1) is skipped and the accumulator
    // still holds the stored 4
    assert_eq!(outcome.accumulator.value(), 4);
}

#[test]
fn call_and_ret_nest() {
    let outcome = run_mimax(
        "CALL(Outer);
         HALT();
         Outer: CALL(Inner);
         ADC(1);
         RET();
         Inner: LDC(40);
         ADC(1);
         RET();",
    );
    assert!(outcome.fault.is_none());
    assert_eq!(outcome.accumulator.value(), 42);
}

#[test]
fn ret_without_call_faults() {
    let outcome = run_mimax("RET();");
    let fault = outcome.fault.expect("fault expected");
    assert!(fault.message.contains("return"));
}

#[test]
fn stack_pointer_instructions_cooperate() {
    let outcome = run_mimax(
        "LDC(100); STSP();
         LDC(7); STVR(SP(), 1);
         LDVR(100, 1);
         HALT();",
    );
    assert!(outcome.fault.is_none());
    assert_eq!(outcome.stack_pointer.value(), 100);
    assert_eq!(outcome.memory.get(&101).map(|w| w.value()), Some(7));
    assert_eq!(outcome.accumulator.value(), 7);
}

#[test]
fn base_set_rejects_negative_constants() {
    let outcome = run("LDC(-1); HALT();", InstructionSet::Mima);
    let fault = outcome.fault.expect("fault expected");
    assert!(fault.message.contains("negative"));
}

#[test]
fn extended_set_accepts_negative_constants() {
    let outcome = run_mimax("LDC(-1); HALT();");
    assert!(outcome.fault.is_none());
    assert_eq!(outcome.accumulator.value(), -1);
}

#[test]
fn binary_literals_load_their_bit_pattern() {
    let outcome = run_mimax("LDC(0b1010); HALT();");
    assert!(outcome.fault.is_none());
    assert_eq!(outcome.accumulator.value(), 10);
}

#[test]
fn scoped_programs_fall_through_and_keep_globals() {
    let outcome = run_mimax(
        "§define v: 0;
         LDC(3); STV(v);
         { LDC(1); ADD(v); STV(v); };
         LDV(v);
         HALT();",
    );
    assert!(outcome.fault.is_none());
    assert_eq!(outcome.accumulator.value(), 4);
}

#[test]
fn deep_definition_chain_matches_shallow_equivalent() {
    // the same final state must come out of a chain that exceeds any
    // native recursion limit by a wide margin
    let mut deep = String::new();
    for i in 0..10_000 {
        deep.push_str(&format!("§define v{i};\n"));
    }
    deep.push_str("LDC(6); STV(v9999); LDV(v9999); HALT();");
    let deep_outcome = run_mimax(&deep);
    assert!(deep_outcome.fault.is_none());
    assert_eq!(deep_outcome.accumulator.value(), 6);
    assert_eq!(deep_outcome.memory.get(&-10_000).map(|w| w.value()), Some(6));

    let shallow_outcome = run_mimax("§define v; LDC(6); STV(v); LDV(v); HALT();");
    assert_eq!(
        shallow_outcome.accumulator.value(),
        deep_outcome.accumulator.value()
    );
}

#[test]
fn deeply_nested_scopes_evaluate_without_overflow() {
    let depth = 400;
    let mut source = String::new();
    for _ in 0..depth {
        source.push_str("{ ");
    }
    source.push_str("LDC(5); STV(0); ");
    for _ in 0..depth {
        source.push_str("}; ");
    }
    source.push_str("LDV(0); HALT();");
    let outcome = run_mimax(&source);
    assert!(outcome.fault.is_none());
    assert_eq!(outcome.accumulator.value(), 5);
}

#[test]
fn step_count_matches_statement_count() {
    let statements = 6;
    let source = "LDC(1); LDC(2); LDC(3); LDC(4); LDC(5); HALT();";
    let runner = MimaRunner::start_debug(&program(source, InstructionSet::MimaX));
    for _ in 0..statements - 1 {
        runner.step();
    }
    // the final statement has not run yet; the worker is waiting
    assert!(runner.is_running());
    runner.step();
    let outcome = runner.join();
    assert!(outcome.fault.is_none());
    assert_eq!(outcome.accumulator.value(), 5);
}

#[test]
fn stop_releases_a_blocked_worker() {
    let runner = MimaRunner::start_debug(&program(
        "LDC(1); LDC(2); HALT();",
        InstructionSet::MimaX,
    ));
    runner.step();
    runner.stop();
    let outcome = runner.join();
    assert!(outcome.fault.is_none());
    assert_eq!(outcome.accumulator.value(), 1);
}

#[test]
fn faults_surface_in_the_outcome() {
    let outcome = run_mimax("LDC(1); STV(missing); HALT();");
    let fault = outcome.fault.expect("fault expected");
    assert!(fault.message.contains("missing"));
    assert_eq!(fault.line, Some(1));
}
