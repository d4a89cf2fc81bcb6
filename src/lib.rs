//! Reconocimiento de poses de mano contra plantillas entrenadas y disparo de scripts.
//!
//! Flujo por frame: fuente de frames → `FrameHandler` → `DispatchEngine::process`
//! → `PoseTemplate::check` sobre el `TemplateStore` en orden → `CommandExecutor`.

pub mod config;
pub mod daemon;
pub mod dispatch;
pub mod executor;
pub mod frame_csv;
pub mod pose_template;
pub mod shell;
pub mod store;
pub mod types;

#[cfg(test)]
mod fixtures;
