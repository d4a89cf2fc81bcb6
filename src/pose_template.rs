use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{sub, BoneKind, FingerKind, HandSample, Vec3, BONES_PER_FINGER, MAX_FINGERS};

/// Umbrales de comparación de una plantilla
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    /// Diferencia máxima de longitud de dedo (mm)
    pub finger_length_diff: f32,
    /// Diferencia máxima por eje de articulaciones relativas (mm)
    pub position_diff: f32,
    /// Diferencia máxima por componente del vector dirección
    pub direction_diff: f32,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            finger_length_diff: 50.0,
            position_diff: 60.0,
            direction_diff: 0.55,
        }
    }
}

/// Motivo por el que una muestra no coincide con una plantilla.
/// Cada variante tiene un código de diagnóstico estable (`code()`).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    #[error("template is invalid")]
    InvalidTemplate,

    #[error("finger count differs: expected {expected}, got {actual}")]
    FingerCount { expected: usize, actual: usize },

    #[error("finger {finger} length out of tolerance")]
    FingerLength { finger: usize },

    #[error("finger {finger} {bone} bone start out of tolerance on axis {axis}")]
    BoneStart { finger: usize, bone: BoneKind, axis: usize },

    #[error("finger {finger} {bone} bone end out of tolerance on axis {axis}")]
    BoneEnd { finger: usize, bone: BoneKind, axis: usize },

    #[error("finger {finger} {bone} bone direction out of tolerance on axis {axis}")]
    BoneDirection { finger: usize, bone: BoneKind, axis: usize },

    #[error("finger {finger} extension state differs")]
    Extension { finger: usize },
}

impl Mismatch {
    pub fn code(&self) -> u8 {
        match self {
            Self::InvalidTemplate => 1,
            Self::FingerCount { .. } => 2,
            Self::FingerLength { .. } => 3,
            Self::BoneStart { .. } => 4,
            Self::BoneEnd { .. } => 5,
            Self::BoneDirection { .. } => 6,
            Self::Extension { .. } => 7,
        }
    }
}

/// Geometría de un dedo ya normalizada respecto a su propio metacarpiano
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateFinger {
    pub kind: FingerKind,
    pub extended: bool,
    pub length: f32,
    pub bone_start: [Vec3; BONES_PER_FINGER],
    pub bone_end: [Vec3; BONES_PER_FINGER],
    pub bone_direction: [Vec3; BONES_PER_FINGER],
}

/// Pose de referencia inmutable.
///
/// Cada dedo se traslada para que la articulación inicial de su metacarpiano
/// quede en el origen, así que la plantilla tolera traslaciones de la mano
/// completa pero NO rotaciones: la misma forma con otra orientación no coincide.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseTemplate {
    fingers: Vec<TemplateFinger>,
    tolerance: ToleranceConfig,
}

impl PoseTemplate {
    /// Plantilla vacía: no coincide con nada
    pub fn invalid(tolerance: ToleranceConfig) -> Self {
        Self {
            fingers: Vec::new(),
            tolerance,
        }
    }

    /// Construye la plantilla desde una muestra cruda.
    /// Una muestra sin dedos o con más de `MAX_FINGERS` produce una plantilla inválida.
    pub fn build(sample: &HandSample, tolerance: ToleranceConfig) -> Self {
        if sample.is_empty() || sample.finger_count() > MAX_FINGERS {
            return Self::invalid(tolerance);
        }

        let fingers = sample
            .fingers
            .iter()
            .map(|finger| {
                let offset = finger.base_joint();
                let mut bone_start = [[0.0; 3]; BONES_PER_FINGER];
                let mut bone_end = [[0.0; 3]; BONES_PER_FINGER];
                let mut bone_direction = [[0.0; 3]; BONES_PER_FINGER];

                for (b, bone) in finger.bones.iter().enumerate() {
                    bone_start[b] = sub(bone.start, offset);
                    bone_end[b] = sub(bone.end, offset);
                    bone_direction[b] = bone.direction;
                }

                TemplateFinger {
                    kind: finger.kind,
                    extended: finger.extended,
                    length: finger.length,
                    bone_start,
                    bone_end,
                    bone_direction,
                }
            })
            .collect();

        Self { fingers, tolerance }
    }

    pub fn is_valid(&self) -> bool {
        !self.fingers.is_empty()
    }

    pub fn finger_count(&self) -> usize {
        self.fingers.len()
    }

    pub fn fingers(&self) -> &[TemplateFinger] {
        &self.fingers
    }

    /// Plantilla de "todos los dedos recogidos" (puño)
    fn all_retracted(&self) -> bool {
        self.fingers.iter().all(|f| !f.extended)
    }

    pub fn matches(&self, sample: &HandSample) -> bool {
        self.check(sample).is_ok()
    }

    /// Compara una muestra en vivo contra la plantilla.
    /// Devuelve el primer motivo de fallo encontrado.
    pub fn check(&self, sample: &HandSample) -> Result<(), Mismatch> {
        if !self.is_valid() {
            return Err(Mismatch::InvalidTemplate);
        }
        if sample.finger_count() != self.finger_count() {
            return Err(Mismatch::FingerCount {
                expected: self.finger_count(),
                actual: sample.finger_count(),
            });
        }

        let tol = &self.tolerance;
        let all_retracted = self.all_retracted();

        for (i, (stored, live)) in self.fingers.iter().zip(&sample.fingers).enumerate() {
            if live.extended != stored.extended {
                return Err(Mismatch::Extension { finger: i });
            }
            // La posición de un dedo recogido no discrimina, salvo en el puño
            if !live.extended && !all_retracted {
                continue;
            }
            if !within(stored.length, live.length, tol.finger_length_diff) {
                return Err(Mismatch::FingerLength { finger: i });
            }

            let origin = live.base_joint();
            for bone in BoneKind::ALL {
                let b = bone.index();
                let live_bone = &live.bones[b];
                let live_start = sub(live_bone.start, origin);
                let live_end = sub(live_bone.end, origin);

                for axis in 0..3 {
                    let mismatch = if !within(stored.bone_start[b][axis], live_start[axis], tol.position_diff) {
                        Some(Mismatch::BoneStart { finger: i, bone, axis })
                    } else if !within(stored.bone_end[b][axis], live_end[axis], tol.position_diff) {
                        Some(Mismatch::BoneEnd { finger: i, bone, axis })
                    } else if !within(
                        stored.bone_direction[b][axis],
                        live_bone.direction[axis],
                        tol.direction_diff,
                    ) {
                        Some(Mismatch::BoneDirection { finger: i, bone, axis })
                    } else {
                        None
                    };

                    if let Some(mismatch) = mismatch {
                        return Err(mismatch);
                    }
                }
            }
        }

        Ok(())
    }
}

/// NaN nunca está dentro de tolerancia
fn within(base: f32, value: f32, tolerance: f32) -> bool {
    (value - base).abs() <= tolerance
}

fn fmt_vec(v: &Vec3) -> String {
    format!("({}, {}, {})", v[0], v[1], v[2])
}

impl fmt::Display for PoseTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return writeln!(f, "    invalid template");
        }

        for finger in &self.fingers {
            writeln!(
                f,
                "    {} finger ({}), length: {}mm",
                finger.kind,
                if finger.extended { "extended" } else { "retracted" },
                finger.length
            )?;
            for bone in BoneKind::ALL {
                let b = bone.index();
                writeln!(
                    f,
                    "      {} bone, start: {}, end: {}, direction: {}",
                    bone,
                    fmt_vec(&finger.bone_start[b]),
                    fmt_vec(&finger.bone_end[b]),
                    fmt_vec(&finger.bone_direction[b])
                )?;
            }
        }
        Ok(())
    }
}
