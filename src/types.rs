use std::fmt;

/// Vector 3D en milímetros del espacio del sensor: [x, y, z]
pub type Vec3 = [f32; 3];

/// Límite de dedos que acepta el SDK del sensor por mano
pub const MAX_FINGERS: usize = 20;

/// Segmentos por dedo: metacarpiano, proximal, intermedio, distal
pub const BONES_PER_FINGER: usize = 4;

/// Tipo de dedo tal como lo reporta el sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FingerKind {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl FingerKind {
    /// Código numérico del sensor (0 = pulgar ... 4 = meñique)
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Thumb),
            1 => Some(Self::Index),
            2 => Some(Self::Middle),
            3 => Some(Self::Ring),
            4 => Some(Self::Pinky),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thumb => "Thumb",
            Self::Index => "Index",
            Self::Middle => "Middle",
            Self::Ring => "Ring",
            Self::Pinky => "Pinky",
        }
    }
}

impl fmt::Display for FingerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Segmento óseo de un dedo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoneKind {
    Metacarpal,
    Proximal,
    Intermediate,
    Distal,
}

impl BoneKind {
    pub const ALL: [BoneKind; BONES_PER_FINGER] = [
        Self::Metacarpal,
        Self::Proximal,
        Self::Intermediate,
        Self::Distal,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metacarpal => "Metacarpal",
            Self::Proximal => "Proximal",
            Self::Intermediate => "Intermediate",
            Self::Distal => "Distal",
        }
    }
}

impl fmt::Display for BoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Un hueso: articulación inicial, final y dirección unitaria
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoneSample {
    pub start: Vec3,
    pub end: Vec3,
    pub direction: Vec3,
}

/// Un dedo detectado en el frame
#[derive(Debug, Clone, PartialEq)]
pub struct FingerSample {
    pub kind: FingerKind,
    pub extended: bool,
    /// Longitud en mm
    pub length: f32,
    /// Indexado por `BoneKind::index()`
    pub bones: [BoneSample; BONES_PER_FINGER],
}

impl FingerSample {
    /// Articulación inicial del metacarpiano: origen local del dedo
    pub fn base_joint(&self) -> Vec3 {
        self.bones[BoneKind::Metacarpal.index()].start
    }
}

/// Muestra cruda de una mano, en el orden en que el sensor reporta los dedos
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandSample {
    pub fingers: Vec<FingerSample>,
}

impl HandSample {
    pub fn finger_count(&self) -> usize {
        self.fingers.len()
    }

    pub fn extended_count(&self) -> usize {
        self.fingers.iter().filter(|f| f.extended).count()
    }

    pub fn is_empty(&self) -> bool {
        self.fingers.is_empty()
    }
}

/// Frame completo entregado por la fuente del sensor.
/// `hand == None` representa un frame sin mano válida.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseFrame {
    pub id: u64,
    pub timestamp_us: u64,
    pub hand: Option<HandSample>,
}

/// Resta componente a componente
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}
