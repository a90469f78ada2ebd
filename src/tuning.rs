//! Target notes, fingerings and tunings.

use serde::{Deserialize, Serialize};

use crate::error::{DesignError, DesignResult};
use crate::types::{A4_FREQUENCY, A4_MIDI};

/// A target note, by frequency, by scientific name, or both (frequency wins).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Note {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
}

impl Note {
    pub fn from_frequency(frequency: f64) -> Self {
        Self {
            name: None,
            frequency: Some(frequency),
        }
    }

    pub fn from_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            frequency: None,
        }
    }

    /// Target frequency in Hz.
    pub fn target_frequency(&self) -> DesignResult<f64> {
        match (&self.frequency, &self.name) {
            (Some(f), _) if *f > 0.0 && f.is_finite() => Ok(*f),
            (_, Some(name)) => note_name_to_frequency(name),
            _ => Err(DesignError::UnknownNote(self.label())),
        }
    }

    /// Human-readable label for logs and error messages.
    pub fn label(&self) -> String {
        match (&self.name, self.frequency) {
            (Some(name), _) => name.clone(),
            (None, Some(f)) => format!("{:.2} Hz", f),
            (None, None) => "<unnamed>".to_string(),
        }
    }
}

/// Equal-tempered frequency (A4 = 440 Hz) of a name such as `A4`, `C#5` or `Bb3`.
pub fn note_name_to_frequency(name: &str) -> DesignResult<f64> {
    let unknown = || DesignError::UnknownNote(name.to_string());
    let trimmed = name.trim();
    let mut chars = trimmed.chars();
    let letter = chars.next().ok_or_else(unknown)?;
    let base = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return Err(unknown()),
    };

    let rest = chars.as_str();
    let (accidental, octave_text) = if let Some(s) = rest.strip_prefix(['#', '♯']) {
        (1, s)
    } else if let Some(s) = rest.strip_prefix(['b', '♭']) {
        (-1, s)
    } else {
        (0, rest)
    };
    let octave: i32 = octave_text.parse().map_err(|_| unknown())?;

    let midi = (octave + 1) * 12 + base + accidental;
    Ok(A4_FREQUENCY * 2f64.powf(f64::from(midi - A4_MIDI) / 12.0))
}

/// Hole pattern for one note; `open_holes` lists holes top to bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingering {
    pub note: Note,
    pub open_holes: Vec<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimization_weight: Option<i32>,
}

impl Fingering {
    pub fn new(note: Note, open_holes: Vec<bool>) -> Self {
        Self {
            note,
            open_holes,
            optimization_weight: None,
        }
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.optimization_weight = Some(weight);
        self
    }

    /// Optimization weight: 1 when unset, never negative.
    pub fn weight(&self) -> u32 {
        match self.optimization_weight {
            None => 1,
            Some(w) => w.max(0) as u32,
        }
    }

    pub fn is_hole_open(&self, index: usize) -> bool {
        self.open_holes.get(index).copied().unwrap_or(false)
    }
}

/// Ordered set of target fingerings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tuning {
    #[serde(default)]
    pub name: String,
    pub number_of_holes: usize,
    pub fingerings: Vec<Fingering>,
}

impl Tuning {
    pub fn new(name: impl Into<String>, number_of_holes: usize, fingerings: Vec<Fingering>) -> Self {
        Self {
            name: name.into(),
            number_of_holes,
            fingerings,
        }
    }

    pub fn from_json(json: &str) -> DesignResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> DesignResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Fingerings that contribute to the error vector.
    pub fn weighted_fingerings(&self) -> impl Iterator<Item = &Fingering> {
        self.fingerings.iter().filter(|f| f.weight() > 0)
    }
}
