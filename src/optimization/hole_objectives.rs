//! Tone-hole geometry components: hole positions and hole diameters.

use crate::geometry::{Hole, Instrument};

use super::bore_objectives::BoreLengthAdjustment;
use super::constraint::{Constraint, ConstraintType, Constraints};
use super::objective::{relative_bounds, GeometryComponent};
use super::types::OptimizerType;

pub const HOLE_POSITION_CATEGORY: &str = "Hole position";
pub const HOLE_SIZE_CATEGORY: &str = "Hole size";

/// Extra room allowed beyond 1.5× a short hole spacing (m).
const MIN_SPACING_TRAVEL: f64 = 0.01;

fn hole_label(hole: &Hole, index: usize) -> String {
    match &hole.name {
        Some(name) => format!("Hole {} ({})", index + 1, name),
        None => format!("Hole {}", index + 1),
    }
}

/// Bore end position followed by hole spacings.
///
/// Dimension 0 is the bore end; dimension i + 1 is the distance from hole i to the next
/// hole down, the last one being the distance from the lowest hole to the bore end.
#[derive(Debug, Clone)]
pub struct HolePositionObjective {
    adjustment: BoreLengthAdjustment,
    nr_holes: usize,
}

impl HolePositionObjective {
    pub const NAME: &'static str = "HolePositionObjective";
    pub const DISPLAY_NAME: &'static str = "Hole position optimizer";

    pub fn new(instrument: &Instrument, adjustment: BoreLengthAdjustment) -> Self {
        Self {
            adjustment,
            nr_holes: instrument.holes.len(),
        }
    }

    pub fn adjustment(&self) -> BoreLengthAdjustment {
        self.adjustment
    }
}

impl GeometryComponent for HolePositionObjective {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn display_name(&self) -> &str {
        Self::DISPLAY_NAME
    }

    fn nr_dimensions(&self) -> usize {
        1 + self.nr_holes
    }

    fn geometry_point(&self, instrument: &Instrument) -> Vec<f64> {
        let end = instrument.bore_end();
        let mut point = Vec::with_capacity(self.nr_dimensions());
        point.push(end);
        let holes = &instrument.holes;
        for (i, hole) in holes.iter().enumerate() {
            let next = holes.get(i + 1).map_or(end, |h| h.position);
            point.push(next - hole.position);
        }
        point
    }

    fn set_geometry_point(&self, instrument: &mut Instrument, point: &[f64]) {
        let current = self.geometry_point(instrument);
        // Holes below the lowest changed entry keep their stored positions.
        let mut moved = point[0] != current[0];
        if moved {
            self.adjustment.set_bore_end(instrument, point[0]);
        }
        let mut position = point[0];
        for (hole, (spacing, old)) in instrument
            .holes
            .iter_mut()
            .zip(point[1..].iter().zip(&current[1..]))
            .rev()
        {
            moved |= spacing != old;
            if moved {
                position -= spacing;
                hole.position = position;
            } else {
                position = hole.position;
            }
        }
    }

    fn default_constraints(&self, instrument: &Instrument) -> Constraints {
        let mut constraints =
            Constraints::new(Self::NAME, Self::DISPLAY_NAME, instrument.holes.len());
        constraints.constraints_name = "Default".into();
        let point = self.geometry_point(instrument);

        let (lower, upper) = self.adjustment.bore_end_bounds(instrument);
        constraints.push(
            Constraint::new(
                "Bore length",
                HOLE_POSITION_CATEGORY,
                ConstraintType::Dimensional,
                lower,
                upper,
            )
            .with_value(point[0]),
        );

        let holes = &instrument.holes;
        for (i, hole) in holes.iter().enumerate() {
            let spacing = point[i + 1];
            let name = match holes.get(i + 1) {
                Some(next) => format!(
                    "{} to {} distance",
                    hole_label(hole, i),
                    hole_label(next, i + 1)
                ),
                None => format!("{} to bore end distance", hole_label(hole, i)),
            };
            let upper = (1.5 * spacing).max(spacing + MIN_SPACING_TRAVEL);
            constraints.push(
                Constraint::new(
                    name,
                    HOLE_POSITION_CATEGORY,
                    ConstraintType::Dimensional,
                    0.5 * spacing,
                    upper,
                )
                .with_value(spacing),
            );
        }
        constraints
    }

    fn optimizer_type(&self) -> OptimizerType {
        if self.nr_dimensions() > 1 {
            OptimizerType::Bobyqa
        } else {
            OptimizerType::Brent
        }
    }
}

/// One diameter per hole, top to bottom.
#[derive(Debug, Clone)]
pub struct HoleSizeObjective {
    nr_holes: usize,
}

impl HoleSizeObjective {
    pub const NAME: &'static str = "HoleSizeObjective";
    pub const DISPLAY_NAME: &'static str = "Hole size optimizer";

    pub fn new(instrument: &Instrument) -> Self {
        Self {
            nr_holes: instrument.holes.len(),
        }
    }
}

impl GeometryComponent for HoleSizeObjective {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn display_name(&self) -> &str {
        Self::DISPLAY_NAME
    }

    fn nr_dimensions(&self) -> usize {
        self.nr_holes
    }

    fn geometry_point(&self, instrument: &Instrument) -> Vec<f64> {
        instrument.holes.iter().map(|h| h.diameter).collect()
    }

    fn set_geometry_point(&self, instrument: &mut Instrument, point: &[f64]) {
        for (hole, &diameter) in instrument.holes.iter_mut().zip(point) {
            hole.diameter = diameter;
        }
    }

    fn default_constraints(&self, instrument: &Instrument) -> Constraints {
        let mut constraints =
            Constraints::new(Self::NAME, Self::DISPLAY_NAME, instrument.holes.len());
        constraints.constraints_name = "Default".into();
        for (i, hole) in instrument.holes.iter().enumerate() {
            // A hole cannot be wider than the bore it is drilled into.
            let bore = instrument.bore_diameter_at(hole.position);
            let (lower, upper) = relative_bounds(hole.diameter, 0.5, 1.5);
            constraints.push(
                Constraint::new(
                    format!("{} diameter", hole_label(hole, i)),
                    HOLE_SIZE_CATEGORY,
                    ConstraintType::Dimensional,
                    lower,
                    upper.min(bore).max(hole.diameter),
                )
                .with_value(hole.diameter),
            );
        }
        constraints
    }

    fn optimizer_type(&self) -> OptimizerType {
        if self.nr_holes > 1 {
            OptimizerType::Bobyqa
        } else {
            OptimizerType::Brent
        }
    }
}
