//! Scripted command runner

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;

use enforcer_sys::{CommandOutput, CommandRunner, Result};

/// Returns canned output keyed by the full command line (`program arg1 arg2`)
///
/// Outputs queued for one command line are returned in order; the last one
/// repeats forever. A command line with nothing queued fails to spawn, as if
/// the program were not installed.
#[derive(Debug, Default)]
pub struct FakeCommandRunner {
    responses: RefCell<HashMap<String, VecDeque<CommandOutput>>>,
    calls: RefCell<Vec<String>>,
}

impl FakeCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `output` for `command_line`
    pub fn respond(self, command_line: &str, output: CommandOutput) -> Self {
        self.responses
            .borrow_mut()
            .entry(command_line.to_string())
            .or_default()
            .push_back(output);
        self
    }

    /// Every command line run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// How many times `command_line` was run
    pub fn count(&self, command_line: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| *call == command_line)
            .count()
    }
}

impl CommandRunner for FakeCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let command_line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.borrow_mut().push(command_line.clone());

        let output = self
            .responses
            .borrow_mut()
            .get_mut(&command_line)
            .and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            });
        output.ok_or_else(|| enforcer_sys::Error::Spawn {
            program: program.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "program not found"),
        })
    }
}
