use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::dispatch::{DispatchEngine, FrameOutcome};
use crate::executor::CommandExecutor;
use crate::frame_csv::FrameReader;
use crate::store::TemplateStore;
use crate::types::{HandSample, PoseFrame};

/// Modo de operación compartido entre la consola y el hilo de frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Paused,
    Running,
    Training,
}

/// Estado compartido: modo y almacén de plantillas.
/// El almacén sólo se modifica desde la consola; el hilo de frames lo lee
/// bajo el mismo lock mientras evalúa, así que nunca ve una mutación a medias.
/// El lock no se mantiene mientras corre el script disparado.
#[derive(Debug)]
pub struct Shared {
    mode: Mutex<Mode>,
    store: Mutex<TemplateStore>,
}

impl Shared {
    pub fn new(store: TemplateStore, mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(mode),
            store: Mutex::new(store),
        })
    }

    pub fn mode(&self) -> Mode {
        *self.lock_mode()
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.lock_mode() = mode;
    }

    /// Cambia a `to` sólo si el modo actual es `from`
    pub fn transition(&self, from: Mode, to: Mode) -> bool {
        let mut mode = self.lock_mode();
        if *mode == from {
            *mode = to;
            true
        } else {
            false
        }
    }

    pub fn store(&self) -> MutexGuard<'_, TemplateStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_mode(&self) -> MutexGuard<'_, Mode> {
        self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Canal de un solo hueco por el que el hilo de frames entrega la mano capturada en `train`
pub fn training_slot() -> (Sender<HandSample>, Receiver<HandSample>) {
    bounded(1)
}

/// Procesa cada frame según el modo actual
pub struct FrameHandler<E: CommandExecutor> {
    shared: Arc<Shared>,
    engine: DispatchEngine,
    executor: E,
    training_tx: Sender<HandSample>,
}

impl<E: CommandExecutor> FrameHandler<E> {
    pub fn new(
        shared: Arc<Shared>,
        engine: DispatchEngine,
        executor: E,
        training_tx: Sender<HandSample>,
    ) -> Self {
        Self {
            shared,
            engine,
            executor,
            training_tx,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Devuelve el resultado del motor sólo en modo `Running`
    pub fn on_frame(&mut self, frame: &PoseFrame, now: Instant) -> Option<FrameOutcome> {
        match self.shared.mode() {
            Mode::Paused => None,
            Mode::Running => {
                // El script se ejecuta con el almacén ya liberado
                let outcome = {
                    let store = self.shared.store();
                    self.engine.evaluate(&store, frame.hand.as_ref(), now)
                };
                DispatchEngine::run_outcome(&outcome, &mut self.executor);
                Some(outcome)
            }
            Mode::Training => {
                if let Some(hand) = &frame.hand {
                    self.capture(hand);
                }
                None
            }
        }
    }

    fn capture(&mut self, hand: &HandSample) {
        match self.training_tx.try_send(hand.clone()) {
            Ok(()) => {
                self.shared.transition(Mode::Training, Mode::Paused);
                info!(
                    "✋ Mano capturada: {} dedos, {} extendidos",
                    hand.finger_count(),
                    hand.extended_count()
                );
            }
            // La consola aún no ha recogido la captura anterior
            Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {
                warn!("⚠️  Nadie espera la captura de entrenamiento");
                self.shared.transition(Mode::Training, Mode::Paused);
            }
        }
    }

    /// Bucle del hilo de frames: termina cuando la fuente cierra el canal
    pub fn run(mut self, frames: Receiver<PoseFrame>) {
        for frame in frames.iter() {
            self.on_frame(&frame, Instant::now());
        }
        info!("📴 Fuente de frames cerrada");
    }
}

/// Lee frames de un CSV (fichero o FIFO) y los envía por el canal.
/// Los frames mal formados se descartan con un aviso.
pub fn stream_frames(path: &Path, tx: Sender<PoseFrame>) -> Result<()> {
    let reader = FrameReader::from_path(path)?;
    info!("📡 Leyendo frames de {}", path.display());

    let mut sent = 0u64;
    for frame in reader {
        match frame {
            Ok(frame) => {
                if tx.send(frame).is_err() {
                    debug!("Canal de frames cerrado");
                    break;
                }
                sent += 1;
            }
            Err(e) => warn!("⚠️  Frame descartado: {:#}", e),
        }
    }

    info!("📴 Fin de la fuente de frames ({} frames)", sent);
    Ok(())
}
