/*
Reconocimiento de poses de mano - daemon interactivo

1. Lee frames de mano (CSV) desde una grabación o un FIFO escrito por el puente del sensor
2. Compara cada frame contra las plantillas entrenadas, en orden
3. Dispara el script asociado con anti-rebote y encadenado de modificadores ($prefijo)

Para ejecutar con el puente del sensor escribiendo en un FIFO:
    mkfifo /tmp/hand_frames
    ./target/release/handsign --frames /tmp/hand_frames --script-dir ./scripts

Comandos de la consola: run, pause, train, remove <nombre>, list, help, exit
*/

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use handsign::config::AppConfig;
use handsign::daemon::{stream_frames, training_slot, FrameHandler, Mode, Shared};
use handsign::dispatch::DispatchEngine;
use handsign::executor::ScriptExecutor;
use handsign::shell::Shell;
use handsign::store::TemplateStore;
use handsign::types::PoseFrame;

/// Capacidad del canal de frames entre el lector y el motor
const FRAME_QUEUE: usize = 100;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// CSV de frames: fichero grabado o FIFO del puente del sensor
    #[arg(short, long, value_name = "PATH")]
    frames: PathBuf,

    /// Configuración JSON (tolerancias, tiempos, directorio de scripts)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directorio de scripts (sustituye al de la configuración)
    #[arg(long, value_name = "PATH")]
    script_dir: Option<PathBuf>,

    /// Arrancar reconociendo en vez de en pausa
    #[arg(long)]
    run: bool,

    /// Logs de depuración (diagnóstico de cada plantilla)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs a stderr: stdout es de la consola
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if cli.frames.as_os_str() == "-" {
        bail!("stdin está reservado para la consola; usa un fichero o FIFO");
    }

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if let Some(dir) = cli.script_dir {
        config.script_dir = dir;
    }

    let initial_mode = if cli.run { Mode::Running } else { Mode::Paused };
    let shared = Shared::new(TemplateStore::new(), initial_mode);

    // Hilo lector de frames
    let (frame_tx, frame_rx) = bounded::<PoseFrame>(FRAME_QUEUE);
    let frames_path = cli.frames.clone();
    std::thread::spawn(move || {
        if let Err(e) = stream_frames(&frames_path, frame_tx) {
            error!("❌ Error en la fuente de frames: {:#}", e);
        }
    });

    // Hilo de reconocimiento
    let (train_tx, train_rx) = training_slot();
    let executor = ScriptExecutor::new(config.script_dir.clone());
    info!("📂 Scripts en {}", executor.script_dir().display());
    let handler = FrameHandler::new(
        Arc::clone(&shared),
        DispatchEngine::new(config.dispatch),
        executor,
        train_tx,
    );
    std::thread::spawn(move || handler.run(frame_rx));

    println!("✋ Hand pose recognition - type 'help' for commands");
    let stdin = io::stdin();
    let mut shell = Shell::new(
        shared,
        train_rx,
        config.tolerance,
        Duration::from_secs(config.train_timeout_secs),
        stdin.lock(),
        io::stdout(),
    );
    shell.run()?;

    info!("👋 Saliendo");
    Ok(())
}
