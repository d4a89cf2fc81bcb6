use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use handsign::config::AppConfig;
use handsign::dispatch::{DispatchEngine, FrameAction};
use handsign::executor::DryRunExecutor;
use handsign::frame_csv::load_frames_from_csv;
use handsign::pose_template::PoseTemplate;
use handsign::store::{Command, TemplateStore};

/// Entrena plantillas con frames concretos de una grabación y reproduce
/// la grabación completa por el motor, sin ejecutar nada.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV de frames grabados
    csv: PathBuf,

    /// Plantilla a entrenar, p.ej. `12=point:$media` (repetible, en orden de prioridad)
    #[arg(long = "train", value_name = "FRAME=NAME:COMMAND")]
    train: Vec<String>,

    /// Configuración JSON
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Muestra el motivo de cada no-coincidencia
    #[arg(short, long)]
    verbose: bool,
}

struct TrainSpec {
    frame: u64,
    name: String,
    command: Command,
}

fn parse_train_spec(spec: &str) -> Result<TrainSpec> {
    let (frame, rest) = spec
        .split_once('=')
        .ok_or_else(|| anyhow!("Formato esperado FRAME=NAME:COMMAND en {:?}", spec))?;
    let (name, command) = rest
        .split_once(':')
        .ok_or_else(|| anyhow!("Falta ':' entre nombre y comando en {:?}", spec))?;
    if name.is_empty() {
        bail!("Nombre vacío en {:?}", spec);
    }
    Ok(TrainSpec {
        frame: frame
            .parse()
            .with_context(|| format!("Frame inválido en {:?}", spec))?,
        name: name.to_string(),
        command: Command::parse(command).with_context(|| format!("Comando inválido en {:?}", spec))?,
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::load_or_default(args.config.as_deref())?;
    println!("🎞️  Reproduciendo frames desde {:?}", args.csv);
    let frames = load_frames_from_csv(&args.csv)?;
    println!("   {} frames cargados", frames.len());

    let mut store = TemplateStore::new();
    for raw in &args.train {
        let spec = parse_train_spec(raw)?;
        let frame = frames
            .iter()
            .find(|f| f.id == spec.frame)
            .ok_or_else(|| anyhow!("El frame {} no existe en la grabación", spec.frame))?;
        let hand = frame
            .hand
            .as_ref()
            .ok_or_else(|| anyhow!("El frame {} no tiene mano", spec.frame))?;
        let template = PoseTemplate::build(hand, config.tolerance);
        if !template.is_valid() {
            bail!("El frame {} no produce una plantilla válida", spec.frame);
        }
        let index = store.add(template, spec.name.clone(), spec.command.clone());
        println!("💾 [{}] {} -> {} (frame {})", index, spec.name, spec.command, spec.frame);
    }

    if store.is_empty() {
        println!("ℹ️  Sin plantillas: usa --train FRAME=NAME:COMMAND");
    }

    let mut engine = DispatchEngine::new(config.dispatch);
    let mut executor = DryRunExecutor::default();
    let base = Instant::now();
    let first_ts = frames[0].timestamp_us;

    for frame in &frames {
        let offset_us = frame.timestamp_us.saturating_sub(first_ts);
        let Some(now) = base.checked_add(Duration::from_micros(offset_us)) else {
            bail!("Marca de tiempo fuera de rango en el frame {}", frame.id);
        };
        let t_ms = offset_us / 1000;
        let outcome = engine.process(&store, frame.hand.as_ref(), now, &mut executor);

        if outcome.chain_cleared {
            println!("  {:>8} ms  frame {:>6}: modificador caducado", t_ms, frame.id);
        }
        let name = |index: usize| store.get_name(index).unwrap_or("?").to_string();
        match outcome.action {
            FrameAction::NoMatch => {}
            FrameAction::Suppressed { .. } => {}
            FrameAction::ChainBlocked { index } => {
                println!("  {:>8} ms  frame {:>6}: {} bloqueado por cadena pendiente", t_ms, frame.id, name(index));
            }
            FrameAction::ModifierQueued { index, pending } => {
                println!("  {:>8} ms  frame {:>6}: {} → modificador {}", t_ms, frame.id, name(index), pending);
            }
            FrameAction::Execute { index, command } => {
                println!("  {:>8} ms  frame {:>6}: {} → ejecutaría {}", t_ms, frame.id, name(index), command);
            }
        }
    }

    println!("\n🥇 Comandos que se habrían ejecutado: {}", executor.executed.len());
    for (idx, command) in executor.executed.iter().enumerate() {
        println!("  {:>2}. {}", idx + 1, command);
    }

    Ok(())
}
