//! Bore geometry components: bore diameters and bore length.

use serde::{Deserialize, Serialize};

use crate::geometry::Instrument;
use crate::types::MIN_RATIO_DENOMINATOR;

use super::constraint::{Constraint, ConstraintType, Constraints};
use super::objective::{relative_bounds, GeometryComponent};
use super::types::OptimizerType;

pub const BORE_DIAMETER_CATEGORY: &str = "Bore diameters";
pub const BORE_LENGTH_CATEGORY: &str = "Bore length";

/// Fraction of the bore length the foot may move either way.
const BORE_LENGTH_TRAVEL: f64 = 0.25;

/// Smallest gap kept between the moving foot and the fixed geometry above it (m).
const MIN_FOOT_GAP: f64 = 0.001;

/// How the bore follows a change of its end position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoreLengthAdjustment {
    /// Move the bottom point only, extrapolating its diameter along the last section.
    #[default]
    PreserveTaper,
    /// Shift every bore point below the lowest hole, keeping the bell profile.
    PreserveBell,
}

impl BoreLengthAdjustment {
    /// Move the foot of the bore to `new_end`.
    pub fn set_bore_end(self, instrument: &mut Instrument, new_end: f64) {
        let n = instrument.bore_points.len();
        if n < 2 {
            return;
        }
        match self {
            BoreLengthAdjustment::PreserveTaper => {
                let previous = instrument.bore_points[n - 2];
                let last = instrument.bore_points[n - 1];
                if new_end == last.position {
                    return;
                }
                let span = last.position - previous.position;
                let diameter = if span > 0.0 {
                    let taper = (last.diameter - previous.diameter) / span;
                    previous.diameter + taper * (new_end - previous.position)
                } else {
                    last.diameter
                };
                let foot = &mut instrument.bore_points[n - 1];
                foot.position = new_end;
                foot.diameter = diameter;
            }
            BoreLengthAdjustment::PreserveBell => {
                let shift = new_end - instrument.bore_end();
                let top_of_bell = bell_start(instrument);
                for point in instrument.bore_points[..n - 1].iter_mut() {
                    if point.position > top_of_bell {
                        point.position += shift;
                    }
                }
                instrument.bore_points[n - 1].position = new_end;
            }
        }
    }

    /// Lowest end position that keeps the moving points below the fixed geometry.
    fn min_bore_end(self, instrument: &Instrument) -> f64 {
        let n = instrument.bore_points.len();
        let fixed = match self {
            BoreLengthAdjustment::PreserveTaper => {
                let above = if n >= 2 {
                    instrument.bore_points[n - 2].position
                } else {
                    instrument.bore_start()
                };
                above.max(bell_start(instrument))
            }
            BoreLengthAdjustment::PreserveBell => {
                // The bell keeps its own length; its top cannot cross the lowest hole.
                let bell_top = instrument
                    .bore_points
                    .iter()
                    .map(|p| p.position)
                    .find(|&x| x > bell_start(instrument))
                    .unwrap_or(instrument.bore_end());
                bell_start(instrument) + (instrument.bore_end() - bell_top)
            }
        };
        fixed + MIN_FOOT_GAP
    }

    /// Default bounds on the bore end position.
    pub(crate) fn bore_end_bounds(self, instrument: &Instrument) -> (f64, f64) {
        let end = instrument.bore_end();
        let travel = BORE_LENGTH_TRAVEL * instrument.bore_length();
        let lower = (end - travel).max(self.min_bore_end(instrument)).min(end);
        (lower, end + travel)
    }
}

/// Position of the lowest hole, or the mouthpiece when there are no holes.
fn bell_start(instrument: &Instrument) -> f64 {
    instrument
        .holes
        .iter()
        .map(|h| h.position)
        .fold(instrument.mouthpiece.position, f64::max)
}

/// Bore diameters as bottom diameter plus diameter ratios going up the bore.
///
/// The top bore point is always fixed, as are the `unchanged_bore_points` points below it.
/// Dimension 0 is the bottom diameter; dimension i ≥ 1 is the ratio of the diameter at
/// the point below to the diameter at the point it controls, working upward.
#[derive(Debug, Clone)]
pub struct BoreDiameterObjective {
    unchanged_bore_points: usize,
    nr_dimensions: usize,
}

impl BoreDiameterObjective {
    pub const NAME: &'static str = "BoreDiameterObjective";
    pub const DISPLAY_NAME: &'static str = "Bore diameter optimizer";

    pub fn new(instrument: &Instrument, unchanged_bore_points: usize) -> Self {
        let fixed = (unchanged_bore_points + 1).min(instrument.bore_points.len());
        Self {
            unchanged_bore_points,
            nr_dimensions: instrument.bore_points.len() - fixed,
        }
    }

    pub fn unchanged_bore_points(&self) -> usize {
        self.unchanged_bore_points
    }

    /// Bore point index (0-based, top first) controlled by dimension `dim`.
    fn point_index(&self, instrument: &Instrument, dim: usize) -> usize {
        instrument.bore_points.len() - 1 - dim
    }
}

impl GeometryComponent for BoreDiameterObjective {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn display_name(&self) -> &str {
        Self::DISPLAY_NAME
    }

    fn nr_dimensions(&self) -> usize {
        self.nr_dimensions
    }

    fn geometry_point(&self, instrument: &Instrument) -> Vec<f64> {
        let mut point = Vec::with_capacity(self.nr_dimensions);
        if self.nr_dimensions == 0 {
            return point;
        }
        let bottom = self.point_index(instrument, 0);
        let mut below = instrument.bore_points[bottom].diameter;
        point.push(below);
        for dim in 1..self.nr_dimensions {
            let diameter = instrument.bore_points[self.point_index(instrument, dim)].diameter;
            point.push(below / diameter.max(MIN_RATIO_DENOMINATOR));
            below = diameter;
        }
        point
    }

    fn set_geometry_point(&self, instrument: &mut Instrument, point: &[f64]) {
        if self.nr_dimensions == 0 {
            return;
        }
        let bottom = self.point_index(instrument, 0);
        instrument.bore_points[bottom].diameter = point[0];
        let mut below = point[0];
        for (dim, ratio) in point.iter().enumerate().skip(1) {
            let index = self.point_index(instrument, dim);
            let diameter = below / ratio.max(MIN_RATIO_DENOMINATOR);
            instrument.bore_points[index].diameter = diameter;
            below = diameter;
        }
    }

    fn default_constraints(&self, instrument: &Instrument) -> Constraints {
        let mut constraints =
            Constraints::new(Self::NAME, Self::DISPLAY_NAME, instrument.holes.len());
        constraints.constraints_name = "Default".into();
        let point = self.geometry_point(instrument);
        let n_points = instrument.bore_points.len();

        for (dim, &value) in point.iter().enumerate() {
            let constraint = if dim == 0 {
                let (lower, upper) = relative_bounds(value, 0.5, 1.5);
                Constraint::new(
                    format!("Diameter at bore point {} (bottom)", n_points),
                    BORE_DIAMETER_CATEGORY,
                    ConstraintType::Dimensional,
                    lower,
                    upper,
                )
            } else {
                let number = n_points - dim;
                let (lower, upper) = (value.min(0.5), value.max(2.0));
                Constraint::new(
                    format!(
                        "Ratio of diameters, bore point {} / bore point {}",
                        number + 1,
                        number
                    ),
                    BORE_DIAMETER_CATEGORY,
                    ConstraintType::Dimensionless,
                    lower,
                    upper,
                )
            };
            constraints.push(constraint.with_value(value));
        }
        constraints
    }

    fn optimizer_type(&self) -> OptimizerType {
        if self.nr_dimensions > 1 {
            OptimizerType::Bobyqa
        } else {
            OptimizerType::Brent
        }
    }
}

/// Position of the foot of the bore.
#[derive(Debug, Clone)]
pub struct BoreLengthObjective {
    adjustment: BoreLengthAdjustment,
}

impl BoreLengthObjective {
    pub const NAME: &'static str = "BoreLengthObjective";
    pub const DISPLAY_NAME: &'static str = "Bore length optimizer";

    pub fn new(adjustment: BoreLengthAdjustment) -> Self {
        Self { adjustment }
    }
}

impl GeometryComponent for BoreLengthObjective {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn display_name(&self) -> &str {
        Self::DISPLAY_NAME
    }

    fn nr_dimensions(&self) -> usize {
        1
    }

    fn geometry_point(&self, instrument: &Instrument) -> Vec<f64> {
        vec![instrument.bore_end()]
    }

    fn set_geometry_point(&self, instrument: &mut Instrument, point: &[f64]) {
        self.adjustment.set_bore_end(instrument, point[0]);
    }

    fn default_constraints(&self, instrument: &Instrument) -> Constraints {
        let mut constraints =
            Constraints::new(Self::NAME, Self::DISPLAY_NAME, instrument.holes.len());
        constraints.constraints_name = "Default".into();
        let (lower, upper) = self.adjustment.bore_end_bounds(instrument);
        constraints.push(
            Constraint::new(
                "Bore length",
                BORE_LENGTH_CATEGORY,
                ConstraintType::Dimensional,
                lower,
                upper,
            )
            .with_value(instrument.bore_end()),
        );
        constraints
    }

    fn optimizer_type(&self) -> OptimizerType {
        OptimizerType::Brent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::tests::whistle;
    use crate::geometry::BorePoint;

    fn four_point() -> Instrument {
        let mut instrument = whistle();
        instrument.bore_points = vec![
            BorePoint::new(0.0, 0.0130),
            BorePoint::new(0.10, 0.0127),
            BorePoint::new(0.20, 0.0124),
            BorePoint::new(0.27, 0.0120),
        ];
        instrument
    }

    #[test]
    fn four_points_one_unchanged_gives_two_dimensions() {
        let instrument = four_point();
        let objective = BoreDiameterObjective::new(&instrument, 1);
        assert_eq!(objective.nr_dimensions(), 2);
        assert_eq!(objective.optimizer_type(), OptimizerType::Bobyqa);

        let point = objective.geometry_point(&instrument);
        assert_eq!(point[0], 0.0120);
        assert!((point[1] - 0.0120 / 0.0124).abs() < 1e-15);
    }

    #[test]
    fn dimension_zero_sets_bottom_diameter_exactly() {
        let mut instrument = four_point();
        let objective = BoreDiameterObjective::new(&instrument, 1);
        let mut point = objective.geometry_point(&instrument);
        point[0] = 0.0150;
        objective.set_geometry_point(&mut instrument, &point);
        assert_eq!(instrument.bore_points[3].diameter, 0.0150);
        // Ratio kept, so the point above scales with it
        assert!((instrument.bore_points[2].diameter - 0.0150 * 0.0124 / 0.0120).abs() < 1e-15);
        // Fixed points untouched
        assert_eq!(instrument.bore_points[1].diameter, 0.0127);
        assert_eq!(instrument.bore_points[0].diameter, 0.0130);
    }

    #[test]
    fn single_dimension_uses_brent() {
        let instrument = whistle();
        let objective = BoreDiameterObjective::new(&instrument, 1);
        assert_eq!(objective.nr_dimensions(), 1);
        assert_eq!(objective.optimizer_type(), OptimizerType::Brent);
    }

    #[test]
    fn default_constraints_name_points() {
        let instrument = four_point();
        let objective = BoreDiameterObjective::new(&instrument, 1);
        let constraints = objective.default_constraints(&instrument);
        assert_eq!(constraints.len(), 2);
        assert_eq!(
            constraints.get(0).map(|c| c.name.as_str()),
            Some("Diameter at bore point 4 (bottom)")
        );
        assert_eq!(
            constraints.get(1).map(|c| c.name.as_str()),
            Some("Ratio of diameters, bore point 4 / bore point 3")
        );
        assert_eq!(constraints.get(1).map(|c| c.kind), Some(ConstraintType::Dimensionless));
    }

    #[test]
    fn preserve_taper_extrapolates_foot_diameter() {
        let mut instrument = whistle();
        BoreLengthAdjustment::PreserveTaper.set_bore_end(&mut instrument, 0.29);
        let foot = instrument.bore_points[2];
        assert_eq!(foot.position, 0.29);
        // Taper of the last section is -0.0003 over 0.12 m
        assert!((foot.diameter - (0.0125 - 0.0003 * 0.14 / 0.12)).abs() < 1e-12);
    }

    #[test]
    fn preserve_bell_shifts_points_below_lowest_hole() {
        let mut instrument = whistle();
        instrument.bore_points.insert(2, BorePoint::new(0.25, 0.0123));
        BoreLengthAdjustment::PreserveBell.set_bore_end(&mut instrument, 0.30);
        assert!((instrument.bore_points[2].position - 0.28).abs() < 1e-12);
        assert_eq!(instrument.bore_points[3].position, 0.30);
        assert_eq!(instrument.bore_points[1].position, 0.15);
    }

    #[test]
    fn bore_length_bounds_keep_foot_below_last_hole() {
        let instrument = whistle();
        let objective = BoreLengthObjective::new(BoreLengthAdjustment::PreserveTaper);
        let constraints = objective.default_constraints(&instrument);
        let lower = constraints.lower_bounds()[0];
        assert!(lower > 0.238);
        assert!(lower < 0.27);
        assert!(constraints.upper_bounds()[0] > 0.27);
    }
}
