use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};

use crate::types::{BoneSample, FingerKind, FingerSample, HandSample, PoseFrame, BONES_PER_FINGER};

/// Cabecera del formato de frames: una fila por hueso
pub const CSV_HEADER: &str =
    "frame,timestamp_us,finger,kind,extended,length,bone,sx,sy,sz,ex,ey,ez,dx,dy,dz";

const COLUMNS: usize = 16;

struct BoneRow {
    finger: usize,
    kind: FingerKind,
    extended: bool,
    length: f32,
    bone: usize,
    sample: BoneSample,
}

struct Row {
    frame: u64,
    timestamp_us: u64,
    /// `None`: frame sin mano
    bone: Option<BoneRow>,
}

struct PartialFinger {
    finger: usize,
    kind: FingerKind,
    extended: bool,
    length: f32,
    bones: [Option<BoneSample>; BONES_PER_FINGER],
}

struct FrameBuilder {
    id: u64,
    timestamp_us: u64,
    fingers: Vec<PartialFinger>,
}

impl FrameBuilder {
    fn new(id: u64, timestamp_us: u64) -> Self {
        Self {
            id,
            timestamp_us,
            fingers: Vec::new(),
        }
    }

    fn push(&mut self, bone: BoneRow) {
        // Los dedos se ordenan por primera aparición
        let idx = match self.fingers.iter().position(|f| f.finger == bone.finger) {
            Some(idx) => idx,
            None => {
                self.fingers.push(PartialFinger {
                    finger: bone.finger,
                    kind: bone.kind,
                    extended: bone.extended,
                    length: bone.length,
                    bones: [None; BONES_PER_FINGER],
                });
                self.fingers.len() - 1
            }
        };
        self.fingers[idx].bones[bone.bone] = Some(bone.sample);
    }

    fn finish(self) -> Result<PoseFrame> {
        if self.fingers.is_empty() {
            return Ok(PoseFrame {
                id: self.id,
                timestamp_us: self.timestamp_us,
                hand: None,
            });
        }

        let mut fingers = Vec::with_capacity(self.fingers.len());
        for partial in self.fingers {
            let mut bones = [BoneSample::default(); BONES_PER_FINGER];
            for (b, bone) in partial.bones.into_iter().enumerate() {
                bones[b] = bone.ok_or_else(|| {
                    anyhow!(
                        "Frame {}: al dedo {} le falta el hueso {}",
                        self.id,
                        partial.finger,
                        b
                    )
                })?;
            }
            fingers.push(FingerSample {
                kind: partial.kind,
                extended: partial.extended,
                length: partial.length,
                bones,
            });
        }

        Ok(PoseFrame {
            id: self.id,
            timestamp_us: self.timestamp_us,
            hand: Some(HandSample { fingers }),
        })
    }
}

/// Lee frames de un CSV (fichero grabado o FIFO del puente del sensor).
/// Las filas de un mismo frame deben ser consecutivas.
pub struct FrameReader<R: Read> {
    records: StringRecordsIntoIter<R>,
    row: usize,
    current: Option<FrameBuilder>,
}

impl FrameReader<File> {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("No se pudo abrir el CSV {:?}", path))?;
        Ok(Self::new(file))
    }
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        let records = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader)
            .into_records();
        Self {
            records,
            row: 0,
            current: None,
        }
    }

    fn accept(&mut self, row: Row) -> Option<Result<PoseFrame>> {
        let same_frame = matches!(&self.current, Some(builder) if builder.id == row.frame);
        let finished = if same_frame {
            None
        } else {
            self.current
                .replace(FrameBuilder::new(row.frame, row.timestamp_us))
        };

        if let (Some(bone), Some(builder)) = (row.bone, self.current.as_mut()) {
            builder.push(bone);
        }

        finished.map(FrameBuilder::finish)
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<PoseFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.records.next() {
                None => return self.current.take().map(FrameBuilder::finish),
                Some(Err(e)) => {
                    self.row += 1;
                    return Some(Err(anyhow!(e).context(format!("Fila {} ilegible", self.row))));
                }
                Some(Ok(record)) => {
                    self.row += 1;
                    match parse_row(&record, self.row) {
                        Ok(row) => {
                            if let Some(frame) = self.accept(row) {
                                return Some(frame);
                            }
                        }
                        Err(e) => return Some(Err(e)),
                    }
                }
            }
        }
    }
}

fn field<T>(record: &StringRecord, idx: usize, name: &str, row: usize) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    record[idx]
        .parse()
        .with_context(|| format!("{} inválido en fila {}: {:?}", name, row, &record[idx]))
}

fn parse_bool(value: &str, row: usize) -> Result<bool> {
    match value {
        "1" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "false" | "FALSE" | "False" => Ok(false),
        other => bail!("extended inválido en fila {}: {:?}", row, other),
    }
}

fn parse_vec(record: &StringRecord, first: usize, row: usize) -> Result<[f32; 3]> {
    Ok([
        field(record, first, "coordenada", row)?,
        field(record, first + 1, "coordenada", row)?,
        field(record, first + 2, "coordenada", row)?,
    ])
}

fn parse_row(record: &StringRecord, row: usize) -> Result<Row> {
    if record.len() < 3 {
        bail!("La fila {} no tiene columnas frame,timestamp_us,finger", row);
    }

    let frame: u64 = field(record, 0, "frame", row)?;
    let timestamp_us: u64 = field(record, 1, "timestamp_us", row)?;

    if record[2].is_empty() {
        return Ok(Row {
            frame,
            timestamp_us,
            bone: None,
        });
    }

    if record.len() < COLUMNS {
        bail!("La fila {} no tiene {} columnas", row, COLUMNS);
    }

    let finger: usize = field(record, 2, "finger", row)?;
    let kind_code: u8 = field(record, 3, "kind", row)?;
    let kind = FingerKind::from_code(kind_code)
        .ok_or_else(|| anyhow!("Tipo de dedo {} fuera de rango (fila {})", kind_code, row))?;
    let extended = parse_bool(&record[4], row)?;
    let length: f32 = field(record, 5, "length", row)?;
    let bone: usize = field(record, 6, "bone", row)?;
    if bone >= BONES_PER_FINGER {
        bail!("Hueso {} fuera de rango (fila {})", bone, row);
    }

    Ok(Row {
        frame,
        timestamp_us,
        bone: Some(BoneRow {
            finger,
            kind,
            extended,
            length,
            bone,
            sample: BoneSample {
                start: parse_vec(record, 7, row)?,
                end: parse_vec(record, 10, row)?,
                direction: parse_vec(record, 13, row)?,
            },
        }),
    })
}

/// Carga todos los frames de un fichero
pub fn load_frames_from_csv(path: impl AsRef<Path>) -> Result<Vec<PoseFrame>> {
    let path = path.as_ref();
    let frames = FrameReader::from_path(path)?
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Error leyendo frames de {:?}", path))?;
    if frames.is_empty() {
        bail!("El CSV {:?} no contiene frames", path);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn finger_rows(frame: u64, ts: u64, finger: usize, kind: u8, extended: u8, x: f32) -> String {
        (0..BONES_PER_FINGER)
            .map(|b| {
                let y0 = b as f32 * 10.0;
                format!(
                    "{},{},{},{},{},30,{},{},{},0,{},{},0,0,1,0\n",
                    frame,
                    ts,
                    finger,
                    kind,
                    extended,
                    b,
                    x,
                    y0,
                    x,
                    y0 + 10.0
                )
            })
            .collect()
    }

    fn sample_csv() -> String {
        let mut csv = format!("{}\n", CSV_HEADER);
        csv.push_str(&finger_rows(0, 1000, 0, 0, 0, 0.0));
        csv.push_str(&finger_rows(0, 1000, 1, 1, 1, 20.0));
        csv.push_str("1,17000,,,,,,,,,,,,,,\n");
        csv.push_str(&finger_rows(2, 33000, 1, 1, 1, 20.0));
        csv
    }

    #[test]
    fn test_reads_frames_in_order() {
        let frames: Vec<PoseFrame> = FrameReader::new(sample_csv().as_bytes())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(frames.len(), 3);

        let hand = frames[0].hand.as_ref().unwrap();
        assert_eq!(frames[0].timestamp_us, 1000);
        assert_eq!(hand.finger_count(), 2);
        assert_eq!(hand.fingers[0].kind, FingerKind::Thumb);
        assert!(!hand.fingers[0].extended);
        assert_eq!(hand.fingers[1].kind, FingerKind::Index);
        assert!(hand.fingers[1].extended);
        assert_eq!(hand.fingers[1].bones[2].start, [20.0, 20.0, 0.0]);
        assert_eq!(hand.fingers[1].bones[2].end, [20.0, 30.0, 0.0]);
        assert_eq!(hand.fingers[1].bones[2].direction, [0.0, 1.0, 0.0]);
        assert_eq!(hand.fingers[1].length, 30.0);

        assert_eq!(frames[1].id, 1);
        assert!(frames[1].hand.is_none());
        assert_eq!(frames[2].hand.as_ref().unwrap().finger_count(), 1);
    }

    #[test]
    fn test_missing_bone_rejects_frame() {
        let mut csv = format!("{}\n", CSV_HEADER);
        let rows = finger_rows(0, 0, 0, 0, 1, 0.0);
        // Sólo los tres primeros huesos
        for line in rows.lines().take(3) {
            csv.push_str(line);
            csv.push('\n');
        }
        let result: Result<Vec<PoseFrame>> = FrameReader::new(csv.as_bytes()).collect();
        let err = result.unwrap_err().to_string();
        assert!(err.contains("le falta el hueso 3"), "{err}");
    }

    #[test]
    fn test_bad_value_reports_row() {
        let csv = format!("{}\n0,0,0,0,1,abc,0,0,0,0,0,0,0,0,1,0\n", CSV_HEADER);
        let err = FrameReader::new(csv.as_bytes()).next().unwrap().unwrap_err();
        assert!(err.to_string().contains("fila 1"), "{err}");
    }

    #[test]
    fn test_out_of_range_kind() {
        let csv = format!("{}\n0,0,0,9,1,30,0,0,0,0,0,0,0,0,1,0\n", CSV_HEADER);
        assert!(FrameReader::new(csv.as_bytes()).next().unwrap().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_csv().as_bytes()).unwrap();
        let frames = load_frames_from_csv(file.path()).unwrap();
        assert_eq!(frames.len(), 3);
    }

    #[test]
    fn test_empty_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", CSV_HEADER).unwrap();
        assert!(load_frames_from_csv(file.path()).is_err());
    }
}
