//! Manos sintéticas para los tests.

use crate::types::{BoneSample, FingerKind, FingerSample, HandSample, Vec3, BONES_PER_FINGER};

const KINDS: [FingerKind; 5] = [
    FingerKind::Thumb,
    FingerKind::Index,
    FingerKind::Middle,
    FingerKind::Ring,
    FingerKind::Pinky,
];

/// Dedo recto a lo largo de `direction` (unitaria), cada hueso de `bone_len` mm
pub fn finger(kind: FingerKind, base: Vec3, direction: Vec3, bone_len: f32, extended: bool) -> FingerSample {
    let mut bones = [BoneSample::default(); BONES_PER_FINGER];
    let mut joint = base;
    for bone in bones.iter_mut() {
        let next = [
            joint[0] + direction[0] * bone_len,
            joint[1] + direction[1] * bone_len,
            joint[2] + direction[2] * bone_len,
        ];
        *bone = BoneSample {
            start: joint,
            end: next,
            direction,
        };
        joint = next;
    }
    FingerSample {
        kind,
        extended,
        length: bone_len * 3.0,
        bones,
    }
}

/// Mano con cinco dedos; `extended[i]` decide si el dedo i apunta hacia arriba o se dobla
pub fn hand(extended: [bool; 5]) -> HandSample {
    let fingers = KINDS
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            let base = [i as f32 * 20.0, 150.0, -10.0];
            let direction = if extended[i] { [0.0, 1.0, 0.0] } else { [0.0, 0.0, 1.0] };
            finger(*kind, base, direction, 16.0 + i as f32 * 2.0, extended[i])
        })
        .collect();
    HandSample { fingers }
}

pub fn open_hand() -> HandSample {
    hand([true; 5])
}

pub fn fist() -> HandSample {
    hand([false; 5])
}

pub fn pointing() -> HandSample {
    hand([false, true, false, false, false])
}

pub fn victory() -> HandSample {
    hand([false, true, true, false, false])
}

/// Traslada todas las articulaciones (las direcciones no cambian)
pub fn translate(sample: &HandSample, t: Vec3) -> HandSample {
    let mut out = sample.clone();
    for finger in out.fingers.iter_mut() {
        for bone in finger.bones.iter_mut() {
            for w in 0..3 {
                bone.start[w] += t[w];
                bone.end[w] += t[w];
            }
        }
    }
    out
}
