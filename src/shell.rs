use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use thiserror::Error;
use tracing::info;

use crate::daemon::{Mode, Shared};
use crate::pose_template::{PoseTemplate, ToleranceConfig};
use crate::store::Command;
use crate::types::HandSample;

const PROMPT: &str = "handsign > ";
const HELP: &str = "Commands: run, pause, train, remove <name>, list, help, exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Run,
    Pause,
    Train,
    Remove(String),
    List,
    Help,
    Exit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShellError {
    #[error("Unknown command '{0}'! Type 'help' for the list of commands")]
    Unknown(String),

    #[error("Usage: {0}")]
    MissingArgument(&'static str),
}

impl ShellCommand {
    /// `Ok(None)` para una línea vacía
    pub fn parse(line: &str) -> Result<Option<Self>, ShellError> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Ok(None);
        };

        let command = match word {
            "run" => Self::Run,
            "pause" => Self::Pause,
            "train" => Self::Train,
            "remove" => {
                let name = words
                    .next()
                    .ok_or(ShellError::MissingArgument("remove <name>"))?;
                Self::Remove(name.to_string())
            }
            "list" => Self::List,
            "help" => Self::Help,
            "exit" | "quit" => Self::Exit,
            other => return Err(ShellError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// Consola interactiva: cambia de modo y entrena o borra gestos
pub struct Shell<R: BufRead, W: Write> {
    shared: Arc<Shared>,
    training_rx: Receiver<HandSample>,
    tolerance: ToleranceConfig,
    train_timeout: Duration,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub fn new(
        shared: Arc<Shared>,
        training_rx: Receiver<HandSample>,
        tolerance: ToleranceConfig,
        train_timeout: Duration,
        input: R,
        output: W,
    ) -> Self {
        Self {
            shared,
            training_rx,
            tolerance,
            train_timeout,
            input,
            output,
        }
    }

    /// Lee comandos hasta `exit` o fin de entrada
    pub fn run(&mut self) -> Result<()> {
        loop {
            let Some(line) = self.prompt(PROMPT)? else {
                break;
            };
            match ShellCommand::parse(&line) {
                Ok(Some(command)) => {
                    if !self.execute(command)? {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => writeln!(self.output, "{}", e)?,
            }
        }
        writeln!(self.output, "Exiting...")?;
        Ok(())
    }

    /// Devuelve `false` cuando hay que salir
    pub fn execute(&mut self, command: ShellCommand) -> Result<bool> {
        match command {
            ShellCommand::Run => {
                self.shared.set_mode(Mode::Running);
                info!("▶️  Reconocimiento activo");
                writeln!(self.output, "Running")?;
            }
            ShellCommand::Pause => {
                self.shared.set_mode(Mode::Paused);
                info!("⏸️  Reconocimiento en pausa");
                writeln!(self.output, "Paused")?;
            }
            ShellCommand::Train => self.train()?,
            ShellCommand::Remove(name) => {
                let removed = self.shared.store().remove_named(&name);
                match removed {
                    Ok(entry) => writeln!(self.output, "Removed {}", entry.name)?,
                    Err(_) => writeln!(self.output, "Couldn't find {}", name)?,
                }
            }
            ShellCommand::List => {
                let listing = self.shared.store().to_string();
                write!(self.output, "{}", listing)?;
            }
            ShellCommand::Help => writeln!(self.output, "{}", HELP)?,
            ShellCommand::Exit => return Ok(false),
        }
        Ok(true)
    }

    fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Pausa el reconocimiento, espera una mano del hilo de frames y la guarda
    /// con el nombre y comando que introduzca el usuario.
    fn train(&mut self) -> Result<()> {
        if self.prompt("Prepare gesture and press enter...")?.is_none() {
            return Ok(());
        }
        writeln!(self.output, "Training...")?;
        // Descarta capturas de un entrenamiento anterior que llegaron tarde
        while self.training_rx.try_recv().is_ok() {}
        self.shared.set_mode(Mode::Training);

        let hand = match self.training_rx.recv_timeout(self.train_timeout) {
            Ok(hand) => hand,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                self.shared.transition(Mode::Training, Mode::Paused);
                while self.training_rx.try_recv().is_ok() {}
                writeln!(self.output, "No hand seen, training cancelled")?;
                return Ok(());
            }
        };
        self.shared.transition(Mode::Training, Mode::Paused);
        writeln!(self.output, "Saw extended fingers: {}", hand.extended_count())?;

        let template = PoseTemplate::build(&hand, self.tolerance);
        if !template.is_valid() {
            writeln!(self.output, "Captured hand is not usable, training cancelled")?;
            return Ok(());
        }

        let Some(name) = self.prompt("Enter name for new gesture: ")? else {
            return Ok(());
        };
        if name.is_empty() || name.contains(char::is_whitespace) {
            writeln!(self.output, "Gesture names must be a single word")?;
            return Ok(());
        }

        let Some(raw) = self.prompt("Enter script name: ")? else {
            return Ok(());
        };
        let command = match Command::parse(&raw) {
            Ok(command) => command,
            Err(e) => {
                writeln!(self.output, "Invalid command: {}", e)?;
                return Ok(());
            }
        };

        let index = self.shared.store().add(template, name.clone(), command.clone());
        info!("💾 Gesto {} guardado en la posición {}", name, index);
        writeln!(self.output, "Done! {} -> {}", name, command)?;
        Ok(())
    }
}
