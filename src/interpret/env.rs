// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The environment chain: lexically scoped bindings for variables,
//! constants, functions and jump points, plus per-scope execution state.
//!
//! Scopes live in an arena and refer to their parent by index, so scope
//! lifetime is owned by the arena and lookups are index-chasing loops.
//! A failed lookup is `None`; the `get_*` accessors turn it into an
//! "undefined" fault.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::word::MachineWord;
use crate::interpret::instruction::Instruction;
use crate::interpret::value::RuntimeFault;
use crate::parse::token::ProgramNode;

/// Handle to one scope in the [`EnvArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvRef(usize);

impl EnvRef {
    /// The root (global) environment.
    pub fn root() -> Self {
        EnvRef(0)
    }
}

#[derive(Debug)]
struct Environment {
    parent: Option<EnvRef>,
    program: Arc<ProgramNode>,
    variables: HashMap<String, MachineWord>,
    constants: HashMap<String, MachineWord>,
    functions: HashMap<String, Instruction>,
    jumps: HashMap<String, usize>,
    /// Index of the statement currently being evaluated in this scope.
    expression_index: usize,
    /// Next auto-assigned memory address, decrementing from -1.
    reserved_index: i64,
}

/// Arena of scopes for one program run. Index 0 is the root environment.
#[derive(Debug)]
pub struct EnvArena {
    environments: Vec<Environment>,
}

impl EnvArena {
    /// Create an arena whose root environment is associated with the
    /// whole program.
    pub fn new(program: Arc<ProgramNode>) -> Self {
        Self {
            environments: vec![Environment {
                parent: None,
                program,
                variables: HashMap::new(),
                constants: HashMap::new(),
                functions: HashMap::new(),
                jumps: HashMap::new(),
                expression_index: 0,
                reserved_index: -1,
            }],
        }
    }

    /// Create a child scope of `parent` for `program`. The reserved
    /// address counter is inherited by value so auto-assigned addresses
    /// stay unique across nested scopes in one pass.
    pub fn extend(&mut self, parent: EnvRef, program: Arc<ProgramNode>) -> EnvRef {
        let reserved_index = self.env(parent).reserved_index;
        self.environments.push(Environment {
            parent: Some(parent),
            program,
            variables: HashMap::new(),
            constants: HashMap::new(),
            functions: HashMap::new(),
            jumps: HashMap::new(),
            expression_index: 0,
            reserved_index,
        });
        EnvRef(self.environments.len() - 1)
    }

    /// The program node this scope evaluates.
    pub fn program(&self, env: EnvRef) -> &Arc<ProgramNode> {
        &self.env(env).program
    }

    /// The parent scope, if any.
    pub fn parent(&self, env: EnvRef) -> Option<EnvRef> {
        self.env(env).parent
    }

    pub fn expression_index(&self, env: EnvRef) -> usize {
        self.env(env).expression_index
    }

    pub fn set_expression_index(&mut self, env: EnvRef, index: usize) {
        self.env_mut(env).expression_index = index;
    }

    pub fn reserved_index(&self, env: EnvRef) -> i64 {
        self.env(env).reserved_index
    }

    pub fn set_reserved_index(&mut self, env: EnvRef, index: i64) {
        self.env_mut(env).reserved_index = index;
    }

    /// Define a variable in `env`'s own scope. Fails if the name is
    /// already a variable or constant there; shadowing outer scopes is
    /// allowed.
    pub fn define_variable(
        &mut self,
        env: EnvRef,
        name: &str,
        value: MachineWord,
    ) -> Result<(), RuntimeFault> {
        self.check_free(env, name)?;
        self.env_mut(env).variables.insert(name.to_string(), value);
        Ok(())
    }

    /// Define a constant in `env`'s own scope.
    pub fn define_constant(
        &mut self,
        env: EnvRef,
        name: &str,
        value: MachineWord,
    ) -> Result<(), RuntimeFault> {
        self.check_free(env, name)?;
        self.env_mut(env).constants.insert(name.to_string(), value);
        Ok(())
    }

    /// Define a function in `env`'s own scope.
    pub fn define_function(
        &mut self,
        env: EnvRef,
        name: &str,
        function: Instruction,
    ) -> Result<(), RuntimeFault> {
        if self.env(env).functions.contains_key(name) {
            return Err(already_defined(name));
        }
        self.env_mut(env)
            .functions
            .insert(name.to_string(), function);
        Ok(())
    }

    /// Define a jump point in `env`'s own scope.
    pub fn define_jump(
        &mut self,
        env: EnvRef,
        name: &str,
        index: usize,
    ) -> Result<(), RuntimeFault> {
        if self.env(env).jumps.contains_key(name) {
            return Err(already_defined(name));
        }
        self.env_mut(env).jumps.insert(name.to_string(), index);
        Ok(())
    }

    /// The nearest scope owning variable `name`.
    pub fn lookup_variable(&self, env: EnvRef, name: &str) -> Option<EnvRef> {
        self.lookup(env, |e| e.variables.contains_key(name))
    }

    /// The nearest scope owning constant `name`.
    pub fn lookup_constant(&self, env: EnvRef, name: &str) -> Option<EnvRef> {
        self.lookup(env, |e| e.constants.contains_key(name))
    }

    /// The nearest scope owning function `name`.
    pub fn lookup_function(&self, env: EnvRef, name: &str) -> Option<EnvRef> {
        self.lookup(env, |e| e.functions.contains_key(name))
    }

    /// The nearest scope owning jump point `name`.
    pub fn lookup_jump(&self, env: EnvRef, name: &str) -> Option<EnvRef> {
        self.lookup(env, |e| e.jumps.contains_key(name))
    }

    /// Resolve variable `name` through the scope chain.
    pub fn get_variable(&self, env: EnvRef, name: &str) -> Result<MachineWord, RuntimeFault> {
        self.lookup_variable(env, name)
            .map(|e| self.env(e).variables[name])
            .ok_or_else(|| undefined(name))
    }

    /// Resolve constant `name` through the scope chain.
    pub fn get_constant(&self, env: EnvRef, name: &str) -> Result<MachineWord, RuntimeFault> {
        self.lookup_constant(env, name)
            .map(|e| self.env(e).constants[name])
            .ok_or_else(|| undefined(name))
    }

    /// Resolve function `name` through the scope chain.
    pub fn get_function(&self, env: EnvRef, name: &str) -> Result<Instruction, RuntimeFault> {
        self.lookup_function(env, name)
            .map(|e| self.env(e).functions[name])
            .ok_or_else(|| undefined(name))
    }

    /// Resolve jump point `name` to its defining scope and statement
    /// index.
    pub fn get_jump(&self, env: EnvRef, name: &str) -> Result<(EnvRef, usize), RuntimeFault> {
        self.lookup_jump(env, name)
            .map(|e| (e, self.env(e).jumps[name]))
            .ok_or_else(|| undefined(name))
    }

    /// Use the current reserved address of `env` and move the counter to
    /// the next (more negative) one.
    pub fn reserve_address(&mut self, env: EnvRef) -> i64 {
        let address = self.env(env).reserved_index;
        self.env_mut(env).reserved_index = address - 1;
        address
    }

    /// Variable and constant bindings of one scope, for host snapshots.
    pub fn definitions(
        &self,
        env: EnvRef,
    ) -> (&HashMap<String, MachineWord>, &HashMap<String, MachineWord>) {
        let environment = self.env(env);
        (&environment.variables, &environment.constants)
    }

    fn lookup(&self, env: EnvRef, owns: impl Fn(&Environment) -> bool) -> Option<EnvRef> {
        let mut scope = Some(env);
        while let Some(current) = scope {
            if owns(self.env(current)) {
                return Some(current);
            }
            scope = self.env(current).parent;
        }
        None
    }

    fn check_free(&self, env: EnvRef, name: &str) -> Result<(), RuntimeFault> {
        let environment = self.env(env);
        if environment.variables.contains_key(name) || environment.constants.contains_key(name) {
            return Err(already_defined(name));
        }
        Ok(())
    }

    fn env(&self, env: EnvRef) -> &Environment {
        &self.environments[env.0]
    }

    fn env_mut(&mut self, env: EnvRef) -> &mut Environment {
        &mut self.environments[env.0]
    }
}

fn already_defined(name: &str) -> RuntimeFault {
    RuntimeFault::new(format!("\"{name}\" already defined in scope"))
}

fn undefined(name: &str) -> RuntimeFault {
    RuntimeFault::new(format!("undefined reference: {name}"))
}
