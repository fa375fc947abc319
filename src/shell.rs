//! Interactive operator shell.
//!
//! Reads commands line by line and interleaves them with controller events, so
//! status reports show up while the operator is typing. Command lines are parsed
//! with clap in multicall mode: the first word selects the command.

use crate::controller::{ControllerEvent, Dispatcher};
use crate::protocol::UmState;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

const PROMPT: &str = ">>> ";

#[derive(Parser, Debug)]
#[command(multicall = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

/// Commands understood by the shell.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Ask a client to prepare an update: prepare <id> <path> <version>
    Prepare {
        id: String,
        path: String,
        version: u64,
    },
    /// Ask a client to start the prepared update: update <id>
    Update { id: String },
    /// Ask a client to apply the update: apply <id>
    Apply { id: String },
    /// Ask a client to revert the update: revert <id>
    Revert { id: String },
    /// List clients that have reported status
    Clients,
    /// Leave the shell
    #[command(alias = "quit")]
    Exit,
}

impl ShellCommand {
    /// Parses one input line. Returns `Ok(None)` for blank lines.
    pub fn parse_line(line: &str) -> Result<Option<Self>, clap::Error> {
        let args: Vec<&str> = line.split_whitespace().collect();
        if args.is_empty() {
            return Ok(None);
        }
        ShellLine::try_parse_from(args).map(|parsed| Some(parsed.command))
    }
}

/// Last status seen from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientStatus {
    pub state: UmState,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Shell<W: Write> {
    dispatcher: Dispatcher,
    clients: BTreeMap<String, ClientStatus>,
    out: W,
}

impl<W: Write> Shell<W> {
    pub fn new(dispatcher: Dispatcher, out: W) -> Self {
        Self {
            dispatcher,
            clients: BTreeMap::new(),
            out,
        }
    }

    /// Clients that have reported status and not disconnected since.
    pub fn clients(&self) -> &BTreeMap<String, ClientStatus> {
        &self.clients
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs until `exit` or end of input.
    pub async fn run<R>(
        &mut self,
        input: R,
        mut events: mpsc::UnboundedReceiver<ControllerEvent>,
    ) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        self.prompt()?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if self.execute_line(&line).await? == Flow::Exit {
                        break;
                    }
                    self.prompt()?;
                }
                Some(event) = events.recv() => self.handle_event(event)?,
            }
        }

        // Report whatever arrived while the last command ran.
        while let Ok(event) = events.try_recv() {
            self.handle_event(event)?;
        }
        Ok(())
    }

    /// Parses and executes one input line.
    pub async fn execute_line(&mut self, line: &str) -> io::Result<Flow> {
        match ShellCommand::parse_line(line) {
            Ok(Some(command)) => self.execute(command).await,
            Ok(None) => Ok(Flow::Continue),
            Err(e) => {
                write!(self.out, "{}", e)?;
                self.out.flush()?;
                Ok(Flow::Continue)
            }
        }
    }

    pub async fn execute(&mut self, command: ShellCommand) -> io::Result<Flow> {
        let result = match command {
            ShellCommand::Prepare { id, path, version } => {
                self.dispatcher.prepare_update(&id, &path, version).await
            }
            ShellCommand::Update { id } => self.dispatcher.start_update(&id).await,
            ShellCommand::Apply { id } => self.dispatcher.apply_update(&id).await,
            ShellCommand::Revert { id } => self.dispatcher.revert_update(&id).await,
            ShellCommand::Clients => {
                self.print_clients()?;
                return Ok(Flow::Continue);
            }
            ShellCommand::Exit => return Ok(Flow::Exit),
        };

        if let Err(e) = result {
            writeln!(self.out, "Error: {}", e)?;
            self.out.flush()?;
        }
        Ok(Flow::Continue)
    }

    /// Prints an event and updates the known-client list.
    pub fn handle_event(&mut self, event: ControllerEvent) -> io::Result<()> {
        match event {
            ControllerEvent::Registered => {
                writeln!(self.out, "Client registered")?;
            }
            ControllerEvent::Disconnected { id, .. } => {
                writeln!(self.out, "Client {} disconnected", id)?;
                self.clients.remove(&id);
            }
            ControllerEvent::Status { id, state, error } => {
                writeln!(
                    self.out,
                    "Status received, id: {}, state: {}, err: {}",
                    id, state, error
                )?;
                self.clients.insert(id, ClientStatus { state, error });
            }
        }
        self.out.flush()
    }

    fn print_clients(&mut self) -> io::Result<()> {
        if self.clients.is_empty() {
            writeln!(self.out, "No clients")?;
        }
        for (id, status) in &self.clients {
            if status.error.is_empty() {
                writeln!(self.out, "{}\t{}", id, status.state)?;
            } else {
                writeln!(self.out, "{}\t{}\t{}", id, status.state, status.error)?;
            }
        }
        self.out.flush()
    }

    fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "{}", PROMPT)?;
        self.out.flush()
    }
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;
