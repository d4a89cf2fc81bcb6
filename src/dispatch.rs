use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::executor::CommandExecutor;
use crate::store::{Command, StoreEntry, TemplateStore};
use crate::types::HandSample;

/// Tiempos de anti-rebote y encadenado (milisegundos)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Un gesto distinto del último puede dispararse pasado este tiempo
    pub rearm_ms: u64,
    /// El mismo gesto sostenido vuelve a dispararse pasado este tiempo
    pub repeat_ms: u64,
    /// Un modificador pendiente caduca pasado este tiempo
    pub chain_timeout_ms: u64,
    /// Espera extra que se suma tras ejecutar un comando. Con el valor por
    /// defecto un gesto sostenido se repite cada `repeat_ms + fire_cooldown_ms`.
    pub fire_cooldown_ms: u64,
    /// Permite acumular varios modificadores antes del comando final
    pub stack_modifiers: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            rearm_ms: 500,
            repeat_ms: 2000,
            chain_timeout_ms: 4000,
            fire_cooldown_ms: 1000,
            stack_modifiers: false,
        }
    }
}

/// Estado mutable del motor entre frames
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchState {
    pub last_trigger: Option<Instant>,
    pub last_index: Option<usize>,
    /// Prefijo acumulado por modificadores, p.ej. "media_"
    pub pending: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Cooldown,
    AwaitingChain,
}

/// Qué hizo el motor con un frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameAction {
    NoMatch,
    /// Hubo match pero el anti-rebote lo bloqueó
    Suppressed { index: usize },
    /// Modificador rechazado porque ya hay una cadena pendiente
    ChainBlocked { index: usize },
    ModifierQueued { index: usize, pending: String },
    Execute { index: usize, command: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutcome {
    /// La cadena de modificadores caducó en este frame
    pub chain_cleared: bool,
    pub action: FrameAction,
}

/// Máquina de estados por frame: anti-rebote, encadenado de modificadores
/// y como máximo un comando por frame.
#[derive(Debug, Clone, Default)]
pub struct DispatchEngine {
    config: DispatchConfig,
    state: DispatchState,
}

impl DispatchEngine {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            state: DispatchState::default(),
        }
    }

    pub fn state(&self) -> &DispatchState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = DispatchState::default();
    }

    pub fn phase(&self, now: Instant) -> Phase {
        if !self.state.pending.is_empty() {
            return Phase::AwaitingChain;
        }
        match self.elapsed(now) {
            Some(elapsed) if elapsed <= ms(self.config.repeat_ms) => Phase::Cooldown,
            _ => Phase::Idle,
        }
    }

    /// Evalúa un frame sin ejecutar nada
    pub fn evaluate(&mut self, store: &TemplateStore, hand: Option<&HandSample>, now: Instant) -> FrameOutcome {
        let chain_cleared = self.expire_chain(now);

        let action = match hand {
            Some(hand) => self.scan(store, hand, now),
            None => FrameAction::NoMatch,
        };

        FrameOutcome {
            chain_cleared,
            action,
        }
    }

    /// Evalúa un frame y lanza el comando resultante, si lo hay.
    /// Un fallo del ejecutor se registra y no se reintenta.
    pub fn process(
        &mut self,
        store: &TemplateStore,
        hand: Option<&HandSample>,
        now: Instant,
        executor: &mut dyn CommandExecutor,
    ) -> FrameOutcome {
        let outcome = self.evaluate(store, hand, now);
        Self::run_outcome(&outcome, executor);
        outcome
    }

    /// Lanza el comando de un resultado ya evaluado. Permite soltar el
    /// almacén antes de esperar al script.
    pub fn run_outcome(outcome: &FrameOutcome, executor: &mut dyn CommandExecutor) {
        if let FrameAction::Execute { command, .. } = &outcome.action {
            match executor.execute(command) {
                Ok(()) => info!("✅ Comando ejecutado: {}", command),
                Err(e) => warn!("❌ Fallo ejecutando {}: {}", command, e),
            }
        }
    }

    /// Tiempo desde el último disparo; cero si el disparo quedó en el futuro
    fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.state
            .last_trigger
            .map(|last| now.saturating_duration_since(last))
    }

    fn expire_chain(&mut self, now: Instant) -> bool {
        if self.state.pending.is_empty() {
            return false;
        }
        let expired = self
            .elapsed(now)
            .map_or(true, |elapsed| elapsed > ms(self.config.chain_timeout_ms));
        if expired {
            info!("🔗 Modificador descartado: {}", self.state.pending);
            self.state.pending.clear();
        }
        expired
    }

    fn eligible(&self, index: usize, now: Instant) -> bool {
        match self.elapsed(now) {
            None => true,
            Some(elapsed) => {
                (elapsed > ms(self.config.rearm_ms) && self.state.last_index != Some(index))
                    || elapsed > ms(self.config.repeat_ms)
            }
        }
    }

    /// Sólo se considera la primera plantilla que coincide, en orden del almacén
    fn scan(&mut self, store: &TemplateStore, hand: &HandSample, now: Instant) -> FrameAction {
        for (index, entry) in store.iter().enumerate() {
            match entry.template.check(hand) {
                Ok(()) => return self.trigger(index, entry, now),
                Err(mismatch) => {
                    debug!(
                        "Plantilla {} ({}): no, código {} ({})",
                        index,
                        entry.name,
                        mismatch.code(),
                        mismatch
                    );
                }
            }
        }
        FrameAction::NoMatch
    }

    fn trigger(&mut self, index: usize, entry: &StoreEntry, now: Instant) -> FrameAction {
        if !self.eligible(index, now) {
            debug!("Plantilla {} ({}): en anti-rebote", index, entry.name);
            return FrameAction::Suppressed { index };
        }

        match &entry.command {
            Command::Modifier(name) => {
                if !self.state.pending.is_empty() && !self.config.stack_modifiers {
                    return FrameAction::ChainBlocked { index };
                }
                if self.state.last_index == Some(index) {
                    return FrameAction::Suppressed { index };
                }

                self.state.pending.push_str(name);
                self.state.pending.push('_');
                self.state.last_trigger = Some(now);
                self.state.last_index = Some(index);

                info!("🎯 Gesto {} disparado, modificador: {}", entry.name, self.state.pending);
                FrameAction::ModifierQueued {
                    index,
                    pending: self.state.pending.clone(),
                }
            }
            Command::Terminal(body) => {
                let mut command = std::mem::take(&mut self.state.pending);
                command.push_str(body);
                let until = now.checked_add(ms(self.config.fire_cooldown_ms)).unwrap_or(now);
                self.state.last_trigger = Some(until);
                self.state.last_index = Some(index);

                info!("🎯 Gesto {} disparado, comando: {}", entry.name, command);
                FrameAction::Execute { index, command }
            }
        }
    }
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}
