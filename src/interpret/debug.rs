// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Pause/step/resume control for the evaluator.
//!
//! The host holds a [`DebugController`] and the evaluation worker holds
//! the matching [`DebugGate`]. Commands travel over a channel; while the
//! gate is paused the worker blocks at each statement boundary until a
//! command arrives, so one `step` executes exactly one statement. A
//! free-running gate only polls for a pending `stop`/`pause`.

use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

/// Command sent from the host into the evaluation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugCommand {
    /// Execute one statement, then pause again.
    Step,
    /// Leave paused mode and run freely.
    Resume,
    /// Pause at the next statement boundary.
    Pause,
    /// Terminate the run at the next statement boundary.
    Stop,
}

/// What the evaluator should do at a statement boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Continue,
    Stop,
}

/// Host-side handle issuing commands to a running evaluation.
#[derive(Debug, Clone)]
pub struct DebugController {
    sender: Sender<DebugCommand>,
}

impl DebugController {
    /// Execute a single statement.
    pub fn step(&self) {
        let _ = self.sender.send(DebugCommand::Step);
    }

    /// Continue free-running execution.
    pub fn resume(&self) {
        let _ = self.sender.send(DebugCommand::Resume);
    }

    /// Pause at the next statement boundary.
    pub fn pause(&self) {
        let _ = self.sender.send(DebugCommand::Pause);
    }

    /// Terminate the run. Always releases a blocked worker.
    pub fn stop(&self) {
        let _ = self.sender.send(DebugCommand::Stop);
    }
}

/// Worker-side gate checked at every statement boundary.
#[derive(Debug)]
pub struct DebugGate {
    receiver: Receiver<DebugCommand>,
    paused: bool,
}

impl DebugGate {
    /// A controller/gate pair that starts paused: nothing executes until
    /// the first `step` or `resume`.
    pub fn paused() -> (DebugController, DebugGate) {
        Self::pair(true)
    }

    /// A controller/gate pair that starts free-running.
    pub fn running() -> (DebugController, DebugGate) {
        Self::pair(false)
    }

    /// A gate with no controller; never pauses. For synchronous runs.
    pub fn detached() -> DebugGate {
        let (_, gate) = Self::pair(false);
        gate
    }

    fn pair(paused: bool) -> (DebugController, DebugGate) {
        let (sender, receiver) = channel();
        (
            DebugController { sender },
            DebugGate { receiver, paused },
        )
    }

    /// Whether the gate is currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Statement boundary. Blocks while paused until the host commands
    /// otherwise; polls without blocking while free-running.
    pub fn boundary(&mut self) -> Boundary {
        loop {
            if self.paused {
                match self.receiver.recv() {
                    Ok(DebugCommand::Step) => return Boundary::Continue,
                    Ok(DebugCommand::Resume) => {
                        self.paused = false;
                        return Boundary::Continue;
                    }
                    Ok(DebugCommand::Pause) => continue,
                    // a vanished host cannot resume the run; stop
                    Ok(DebugCommand::Stop) | Err(_) => return Boundary::Stop,
                }
            } else {
                match self.receiver.try_recv() {
                    Ok(DebugCommand::Stop) => return Boundary::Stop,
                    Ok(DebugCommand::Pause) => {
                        self.paused = true;
                        continue;
                    }
                    Ok(DebugCommand::Step) => {
                        self.paused = true;
                        return Boundary::Continue;
                    }
                    Ok(DebugCommand::Resume) => continue,
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                        return Boundary::Continue
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_gate_never_blocks() {
        let mut gate = DebugGate::detached();
        for _ in 0..3 {
            assert_eq!(gate.boundary(), Boundary::Continue);
        }
    }

    #[test]
    fn stop_releases_a_paused_gate() {
        let (controller, mut gate) = DebugGate::paused();
        controller.stop();
        assert_eq!(gate.boundary(), Boundary::Stop);
    }

    #[test]
    fn step_keeps_the_gate_paused() {
        let (controller, mut gate) = DebugGate::paused();
        controller.step();
        controller.step();
        assert_eq!(gate.boundary(), Boundary::Continue);
        assert!(gate.is_paused());
        assert_eq!(gate.boundary(), Boundary::Continue);
    }

    #[test]
    fn resume_switches_to_free_running() {
        let (controller, mut gate) = DebugGate::paused();
        controller.resume();
        assert_eq!(gate.boundary(), Boundary::Continue);
        assert!(!gate.is_paused());
        assert_eq!(gate.boundary(), Boundary::Continue);
    }

    #[test]
    fn pause_while_running_blocks_at_next_boundary() {
        let (controller, mut gate) = DebugGate::running();
        controller.pause();
        controller.step();
        assert_eq!(gate.boundary(), Boundary::Continue);
        assert!(gate.is_paused());
    }
}
