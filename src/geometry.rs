//! Instrument geometry: bore profile, tone holes, mouthpiece and termination.
//!
//! All modelling is done in metres. Instruments read from a document keep their declared
//! length unit in [`LengthType`]; call [`Instrument::convert_to_metres`] before modelling
//! and [`Instrument::convert_to_length_type`] before writing the result back.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Length unit declared by an instrument document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LengthType {
    #[default]
    M,
    CM,
    MM,
    IN,
    FT,
}

impl LengthType {
    /// Multiplier converting this unit to metres.
    pub fn to_metres(self) -> f64 {
        match self {
            LengthType::M => 1.0,
            LengthType::CM => 0.01,
            LengthType::MM => 0.001,
            LengthType::IN => 0.0254,
            LengthType::FT => 0.3048,
        }
    }
}

/// A point on the bore profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BorePoint {
    pub position: f64,
    pub diameter: f64,
}

impl BorePoint {
    pub fn new(position: f64, diameter: f64) -> Self {
        Self { position, diameter }
    }
}

/// A tone hole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub position: f64,
    pub diameter: f64,
    /// Wall thickness at the hole (chimney height).
    pub height: f64,
}

impl Hole {
    pub fn new(position: f64, diameter: f64, height: f64) -> Self {
        Self {
            name: None,
            position,
            diameter,
            height,
        }
    }

    pub fn named(name: impl Into<String>, position: f64, diameter: f64, height: f64) -> Self {
        Self {
            name: Some(name.into()),
            position,
            diameter,
            height,
        }
    }
}

/// Transverse-flute embouchure hole.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmbouchureHole {
    pub inner_diameter: f64,
    pub outer_diameter: f64,
    pub height: f64,
}

/// Fipple (duct flute) window and windway.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fipple {
    pub window_width: f64,
    pub window_length: f64,
    /// Empirical scale on the window's effective length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fipple_factor: Option<f64>,
    /// Thickness of the wall at the window (labium block).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windway_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windway_height: Option<f64>,
}

/// Mouthpiece variants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouthpieceKind {
    EmbouchureHole(EmbouchureHole),
    Fipple(Fipple),
}

/// Mouthpiece at the input end of the bore.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mouthpiece {
    pub position: f64,
    /// Jet/lip coverage factor scaling the outer end correction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    pub kind: MouthpieceKind,
}

/// Radiating end of the bore. Its position is the last bore point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Termination {
    pub flange_diameter: f64,
}

/// Bore segment between two adjacent stations, derived fresh for every model build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoreSection {
    pub length: f64,
    pub left_radius: f64,
    pub right_radius: f64,
    pub right_bore_position: f64,
}

impl BoreSection {
    pub fn new(length: f64, left_radius: f64, right_radius: f64) -> Self {
        Self {
            length,
            left_radius,
            right_radius,
            right_bore_position: length,
        }
    }

    /// Same section seen from the other end.
    pub fn reversed(&self, left_position: f64) -> Self {
        Self {
            length: self.length,
            left_radius: self.right_radius,
            right_radius: self.left_radius,
            right_bore_position: left_position,
        }
    }
}

/// Complete instrument geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub length_type: LengthType,
    pub mouthpiece: Mouthpiece,
    pub bore_points: Vec<BorePoint>,
    #[serde(default)]
    pub holes: Vec<Hole>,
    pub termination: Termination,
    /// Whether dimensions are currently in metres.
    #[serde(skip)]
    in_metres: bool,
}

impl Instrument {
    pub fn new(
        name: impl Into<String>,
        mouthpiece: Mouthpiece,
        bore_points: Vec<BorePoint>,
        holes: Vec<Hole>,
        termination: Termination,
    ) -> Self {
        let mut instrument = Self {
            name: name.into(),
            description: None,
            length_type: LengthType::M,
            mouthpiece,
            bore_points,
            holes,
            termination,
            in_metres: true,
        };
        instrument.update_components();
        instrument
    }

    /// Parse an instrument document and bring it to metres, sorted.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut instrument: Instrument = serde_json::from_str(json)?;
        instrument.in_metres = instrument.length_type == LengthType::M;
        instrument.convert_to_metres();
        instrument.update_components();
        Ok(instrument)
    }

    /// Serialize in the document's declared length unit.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut copy = self.clone();
        copy.convert_to_length_type();
        serde_json::to_string_pretty(&copy)
    }

    /// Sort bore points and holes by position.
    pub fn update_components(&mut self) {
        self.bore_points
            .sort_by(|a, b| a.position.total_cmp(&b.position));
        self.holes.sort_by(|a, b| a.position.total_cmp(&b.position));
    }

    /// Convert dimensions from the declared unit to metres (no-op if already converted).
    pub fn convert_to_metres(&mut self) {
        if self.in_metres {
            return;
        }
        self.scale_dimensions(self.length_type.to_metres());
        self.in_metres = true;
    }

    /// Convert dimensions from metres back to the declared unit.
    pub fn convert_to_length_type(&mut self) {
        if !self.in_metres {
            return;
        }
        self.scale_dimensions(1.0 / self.length_type.to_metres());
        self.in_metres = false;
    }

    pub fn is_in_metres(&self) -> bool {
        self.in_metres
    }

    fn scale_dimensions(&mut self, multiplier: f64) {
        if multiplier == 1.0 {
            return;
        }
        for point in &mut self.bore_points {
            point.position *= multiplier;
            point.diameter *= multiplier;
        }
        for hole in &mut self.holes {
            hole.position *= multiplier;
            hole.diameter *= multiplier;
            hole.height *= multiplier;
        }
        self.mouthpiece.position *= multiplier;
        match &mut self.mouthpiece.kind {
            MouthpieceKind::EmbouchureHole(hole) => {
                hole.inner_diameter *= multiplier;
                hole.outer_diameter *= multiplier;
                hole.height *= multiplier;
            }
            MouthpieceKind::Fipple(fipple) => {
                fipple.window_width *= multiplier;
                fipple.window_length *= multiplier;
                for value in [
                    &mut fipple.window_height,
                    &mut fipple.windway_length,
                    &mut fipple.windway_height,
                ]
                .into_iter()
                .flatten()
                {
                    *value *= multiplier;
                }
            }
        }
        self.termination.flange_diameter *= multiplier;
    }

    /// Check the geometry invariants required by the acoustic model.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.bore_points.len() < 2 {
            return Err(GeometryError::TooFewBorePoints(self.bore_points.len()));
        }
        for (i, point) in self.bore_points.iter().enumerate() {
            if !point.position.is_finite() || !point.diameter.is_finite() {
                return Err(GeometryError::NonFinite(format!("bore point {}", i)));
            }
            if point.diameter <= 0.0 {
                return Err(GeometryError::NonPositiveBoreDiameter {
                    position: point.position,
                    diameter: point.diameter,
                });
            }
            if i > 0 {
                let previous = self.bore_points[i - 1].position;
                if point.position <= previous {
                    return Err(GeometryError::NonMonotonicBore {
                        index: i,
                        position: point.position,
                        previous,
                    });
                }
            }
        }

        let start = self.bore_start();
        let end = self.bore_end();
        for (i, hole) in self.holes.iter().enumerate() {
            if !hole.position.is_finite() || !hole.diameter.is_finite() || !hole.height.is_finite()
            {
                return Err(GeometryError::NonFinite(format!("hole {}", i)));
            }
            if hole.position < start || hole.position > end {
                return Err(GeometryError::HoleOutsideBore {
                    index: i,
                    position: hole.position,
                    start,
                    end,
                });
            }
            if hole.diameter <= 0.0 || hole.height <= 0.0 {
                return Err(GeometryError::InvalidHole {
                    index: i,
                    diameter: hole.diameter,
                    height: hole.height,
                });
            }
        }

        let position = self.mouthpiece.position;
        if !position.is_finite() || position < start || position >= end {
            return Err(GeometryError::MouthpieceOutsideBore {
                position,
                start,
                end,
            });
        }
        if let Some(first_hole) = self.holes.first() {
            if first_hole.position <= position {
                return Err(GeometryError::InvalidMouthpiece(format!(
                    "hole at {} is above the mouthpiece at {}",
                    first_hole.position, position
                )));
            }
        }
        match &self.mouthpiece.kind {
            MouthpieceKind::EmbouchureHole(hole) => {
                if hole.inner_diameter <= 0.0 || hole.outer_diameter <= 0.0 || hole.height <= 0.0 {
                    return Err(GeometryError::InvalidMouthpiece(
                        "embouchure hole dimensions must be positive".into(),
                    ));
                }
            }
            MouthpieceKind::Fipple(fipple) => {
                if fipple.window_width <= 0.0 || fipple.window_length <= 0.0 {
                    return Err(GeometryError::InvalidMouthpiece(
                        "fipple window dimensions must be positive".into(),
                    ));
                }
            }
        }

        if self.termination.flange_diameter.is_nan() || self.termination.flange_diameter <= 0.0 {
            return Err(GeometryError::InvalidFlange(self.termination.flange_diameter));
        }
        Ok(())
    }

    /// Position of the top of the bore.
    pub fn bore_start(&self) -> f64 {
        self.bore_points.first().map_or(0.0, |p| p.position)
    }

    /// Position of the foot of the bore.
    pub fn bore_end(&self) -> f64 {
        self.bore_points.last().map_or(0.0, |p| p.position)
    }

    pub fn bore_length(&self) -> f64 {
        self.bore_end() - self.bore_start()
    }

    /// Bore diameter at a position, linearly interpolated (clamped at the ends).
    pub fn bore_diameter_at(&self, position: f64) -> f64 {
        let points = &self.bore_points;
        match points.len() {
            0 => 0.0,
            1 => points[0].diameter,
            _ => {
                if position <= points[0].position {
                    return points[0].diameter;
                }
                for pair in points.windows(2) {
                    let (left, right) = (pair[0], pair[1]);
                    if position <= right.position {
                        let span = right.position - left.position;
                        if span <= 0.0 {
                            return right.diameter;
                        }
                        let t = (position - left.position) / span;
                        return left.diameter + t * (right.diameter - left.diameter);
                    }
                }
                points[points.len() - 1].diameter
            }
        }
    }

    /// Bore sections between adjacent bore points.
    pub fn bore_sections(&self) -> Vec<BoreSection> {
        self.sections_between(self.bore_start(), self.bore_end())
    }

    /// Bore sections covering [from, to], split at every bore point inside the range.
    pub fn sections_between(&self, from: f64, to: f64) -> Vec<BoreSection> {
        let mut stations = vec![from];
        stations.extend(
            self.bore_points
                .iter()
                .map(|p| p.position)
                .filter(|&x| x > from && x < to),
        );
        stations.push(to);

        stations
            .windows(2)
            .filter(|w| w[1] > w[0])
            .map(|w| BoreSection {
                length: w[1] - w[0],
                left_radius: self.bore_diameter_at(w[0]) / 2.0,
                right_radius: self.bore_diameter_at(w[1]) / 2.0,
                right_bore_position: w[1],
            })
            .collect()
    }

    pub fn num_holes(&self) -> usize {
        self.holes.len()
    }
}
