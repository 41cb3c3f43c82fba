//! Marker time series: loading, unit normalization, and indexing.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use hashbrown::HashMap;
use marq_types::Point3;

use crate::error::{LoadError, Result};

/// Frame-rate agreement tolerance, relative to one frame period.
const RATE_TOLERANCE: f64 = 1e-6;

/// The linear unit of a marker source.
///
/// Millimeters are the most common unit in motion-capture exports; positions
/// are normalized to meters once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearUnit {
    /// Positions are already in meters.
    Meters,
    /// Positions are in millimeters.
    Millimeters,
}

impl LinearUnit {
    /// Conversion factor from this unit to meters.
    #[must_use]
    pub const fn meters_per_unit(self) -> f64 {
        match self {
            Self::Meters => 1.0,
            Self::Millimeters => 1e-3,
        }
    }
}

/// One marker observation: a position and a validity flag.
///
/// Negative validity marks a dropout, a frame in which the marker was not
/// observed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerSample {
    /// World-space position, meters.
    pub position: Point3<f64>,
    /// Observation validity; negative means dropout.
    pub validity: f64,
}

impl MarkerSample {
    /// A valid observation at the given position.
    #[must_use]
    pub const fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            validity: 0.0,
        }
    }

    /// A dropout sample.
    #[must_use]
    pub fn dropout() -> Self {
        Self {
            position: Point3::origin(),
            validity: -1.0,
        }
    }

    /// Whether this sample is a dropout.
    #[must_use]
    pub fn is_dropout(&self) -> bool {
        self.validity < 0.0
    }
}

/// Raw output of a marker-file loader, before track validation.
#[derive(Debug, Clone)]
pub struct MarkerData {
    /// Channel labels, one per marker, in source column order.
    pub labels: Vec<String>,
    /// Per-frame samples, one inner vector per frame.
    pub frames: Vec<Vec<MarkerSample>>,
    /// Source frame rate in Hz.
    pub frame_rate: f64,
    /// Source linear unit.
    pub unit: LinearUnit,
}

/// Load marker data from a file path, dispatching on the extension.
///
/// Only `.csv` sources are recognized.
pub fn load_markers(path: &Path, frame_rate: f64, unit: LinearUnit) -> Result<MarkerData> {
    let recognized = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !recognized {
        return Err(LoadError::unrecognized_format(path.display().to_string()));
    }
    let file = std::fs::File::open(path)?;
    let data = load_csv(file, frame_rate, unit)?;
    tracing::info!(
        path = %path.display(),
        frames = data.frames.len(),
        markers = data.labels.len(),
        "loaded marker data"
    );
    Ok(data)
}

/// Load marker data from CSV text.
///
/// The first row holds one label per marker; every following row holds an
/// `x,y,z,validity` quadruple per marker. The CSV container carries no rate
/// or unit metadata, so both are supplied by the caller.
pub fn load_csv<R: Read>(reader: R, frame_rate: f64, unit: LinearUnit) -> Result<MarkerData> {
    let mut lines = BufReader::new(reader).lines().enumerate();

    let labels: Vec<String> = loop {
        match lines.next() {
            Some((_, line)) => {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                break line.split(',').map(|s| s.trim().to_owned()).collect();
            }
            None => return Err(LoadError::malformed_row(1, "missing header row")),
        }
    };

    let mut frames = Vec::new();
    for (index, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        frames.push(parse_row(&line, index + 1, labels.len())?);
    }

    Ok(MarkerData {
        labels,
        frames,
        frame_rate,
        unit,
    })
}

fn parse_row(line: &str, line_no: usize, num_markers: usize) -> Result<Vec<MarkerSample>> {
    let values: Vec<f64> = line
        .split(',')
        .map(|field| {
            field
                .trim()
                .parse::<f64>()
                .map_err(|e| LoadError::malformed_row(line_no, e.to_string()))
        })
        .collect::<Result<_>>()?;

    if values.len() != 4 * num_markers {
        return Err(LoadError::malformed_row(
            line_no,
            format!("expected {} values, got {}", 4 * num_markers, values.len()),
        ));
    }

    Ok(values
        .chunks_exact(4)
        .map(|quad| MarkerSample {
            position: Point3::new(quad[0], quad[1], quad[2]),
            validity: quad[3],
        })
        .collect())
}

/// An immutable marker time series, validated against a world timestep.
///
/// Construction freezes the channel-name to index map, the frame count, and
/// the marker count; nothing about the track changes afterwards.
#[derive(Debug, Clone)]
pub struct MarkerTrack {
    labels: Vec<String>,
    index: HashMap<String, usize>,
    frames: Vec<Vec<MarkerSample>>,
    dt: f64,
}

impl MarkerTrack {
    /// Validate loader output against the world timestep `dt`.
    ///
    /// Fails with [`LoadError::FrameRateMismatch`] unless the source frame
    /// rate equals `1 / dt`. Positions are normalized to meters and the
    /// frame count is capped at `max_frames` when given.
    pub fn from_data(data: MarkerData, dt: f64, max_frames: Option<usize>) -> Result<Self> {
        let world_hz = 1.0 / dt;
        if (data.frame_rate * dt - 1.0).abs() > RATE_TOLERANCE {
            return Err(LoadError::frame_rate_mismatch(data.frame_rate, world_hz));
        }

        let scale = data.unit.meters_per_unit();
        let mut frames = data.frames;
        if let Some(max) = max_frames {
            frames.truncate(max);
        }
        for (frame_no, frame) in frames.iter_mut().enumerate() {
            if frame.len() != data.labels.len() {
                return Err(LoadError::malformed_row(
                    frame_no + 1,
                    format!(
                        "frame has {} markers, track has {}",
                        frame.len(),
                        data.labels.len()
                    ),
                ));
            }
            if scale != 1.0 {
                for sample in frame.iter_mut() {
                    sample.position *= scale;
                }
            }
        }

        let index = data
            .labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();

        Ok(Self {
            labels: data.labels,
            index,
            frames,
            dt,
        })
    }

    /// Number of frames. Fixed after load.
    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Number of marker channels. Fixed after load.
    #[must_use]
    pub fn num_markers(&self) -> usize {
        self.labels.len()
    }

    /// The world timestep this track was validated against.
    #[must_use]
    pub const fn dt(&self) -> f64 {
        self.dt
    }

    /// Channel labels in column order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Column index of a channel label.
    #[must_use]
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// The sample for one marker at one frame.
    #[must_use]
    pub fn sample(&self, frame_no: usize, marker: usize) -> &MarkerSample {
        &self.frames[frame_no][marker]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f64 = 1.0 / 60.0;

    const CSV: &str = "\
m0, m1
0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0
0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 2.0, -1.0
";

    #[test]
    fn test_csv_happy_path() {
        let data = load_csv(CSV.as_bytes(), 60.0, LinearUnit::Meters).unwrap();
        assert_eq!(data.labels, vec!["m0", "m1"]);
        assert_eq!(data.frames.len(), 2);

        let track = MarkerTrack::from_data(data, DT, None).unwrap();
        assert_eq!(track.num_frames(), 2);
        assert_eq!(track.num_markers(), 2);
        assert_eq!(track.index_of("m1"), Some(1));
        assert_eq!(track.index_of("nope"), None);
        assert!(track.sample(1, 1).is_dropout());
        assert!(!track.sample(0, 1).is_dropout());
    }

    #[test]
    fn test_csv_malformed_row() {
        let bad = "m0\n1.0, 2.0\n";
        let err = load_csv(bad.as_bytes(), 60.0, LinearUnit::Meters).unwrap_err();
        assert!(matches!(err, LoadError::MalformedRow { line: 2, .. }));

        let nonnumeric = "m0\n1.0, 2.0, x, 0.0\n";
        let err = load_csv(nonnumeric.as_bytes(), 60.0, LinearUnit::Meters).unwrap_err();
        assert!(matches!(err, LoadError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn test_frame_rate_mismatch() {
        let data = load_csv(CSV.as_bytes(), 120.0, LinearUnit::Meters).unwrap();
        let err = MarkerTrack::from_data(data, DT, None).unwrap_err();
        assert!(matches!(err, LoadError::FrameRateMismatch { .. }));
    }

    #[test]
    fn test_millimeter_normalization() {
        let csv = "m0\n1000.0, 0.0, 500.0, 0.0\n";
        let data = load_csv(csv.as_bytes(), 60.0, LinearUnit::Millimeters).unwrap();
        let track = MarkerTrack::from_data(data, DT, None).unwrap();
        let p = track.sample(0, 0).position;
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.z, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_max_frames_caps_track() {
        let data = load_csv(CSV.as_bytes(), 60.0, LinearUnit::Meters).unwrap();
        let track = MarkerTrack::from_data(data, DT, Some(1)).unwrap();
        assert_eq!(track.num_frames(), 1);
    }

    #[test]
    fn test_unrecognized_extension() {
        let err = load_markers(Path::new("walk.c3d"), 60.0, LinearUnit::Meters).unwrap_err();
        assert!(matches!(err, LoadError::UnrecognizedFormat { .. }));
    }
}
