//! Composite objective: concatenates sub-components in registration order.

use std::sync::Arc;

use crate::geometry::Instrument;

use super::bore_objectives::{BoreDiameterObjective, BoreLengthAdjustment};
use super::constraint::Constraints;
use super::hole_objectives::{HolePositionObjective, HoleSizeObjective};
use super::objective::GeometryComponent;
use super::types::OptimizerType;

/// Ordered list of components sharing one geometry vector.
#[derive(Debug, Clone)]
pub struct MergedObjective {
    name: String,
    display_name: String,
    components: Vec<Arc<dyn GeometryComponent>>,
    max_evaluations: Option<usize>,
}

impl MergedObjective {
    pub const HOLE_NAME: &'static str = "HoleObjective";
    pub const HOLE_DISPLAY_NAME: &'static str = "Hole position and size optimizer";
    pub const HOLE_AND_BORE_NAME: &'static str = "HoleAndBoreDiameterObjective";
    pub const HOLE_AND_BORE_DISPLAY_NAME: &'static str = "Hole and bore diameter optimizer";

    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            components: Vec::new(),
            max_evaluations: None,
        }
    }

    /// Register a component; its dimensions follow those already registered.
    pub fn with_component(mut self, component: Arc<dyn GeometryComponent>) -> Self {
        self.components.push(component);
        self
    }

    /// Fix the evaluation budget instead of summing the components'.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = Some(max_evaluations);
        self
    }

    /// Hole positions then hole sizes; budget 20000 + 5000 per dimension beyond the first.
    pub fn hole(instrument: &Instrument, adjustment: BoreLengthAdjustment) -> Self {
        let merged = Self::new(Self::HOLE_NAME, Self::HOLE_DISPLAY_NAME)
            .with_component(Arc::new(HolePositionObjective::new(instrument, adjustment)))
            .with_component(Arc::new(HoleSizeObjective::new(instrument)));
        let n = merged.nr_dimensions();
        merged.with_max_evaluations(20_000 + n.saturating_sub(1) * 5_000)
    }

    /// Hole positions, hole sizes, then bore diameters; budget 30000.
    pub fn hole_and_bore_diameter(
        instrument: &Instrument,
        adjustment: BoreLengthAdjustment,
        unchanged_bore_points: usize,
    ) -> Self {
        Self::new(Self::HOLE_AND_BORE_NAME, Self::HOLE_AND_BORE_DISPLAY_NAME)
            .with_component(Arc::new(HolePositionObjective::new(instrument, adjustment)))
            .with_component(Arc::new(HoleSizeObjective::new(instrument)))
            .with_component(Arc::new(BoreDiameterObjective::new(
                instrument,
                unchanged_bore_points,
            )))
            .with_max_evaluations(30_000)
    }

    pub fn components(&self) -> &[Arc<dyn GeometryComponent>] {
        &self.components
    }

    /// Start and end of each component's span in the flat vector.
    fn spans(&self) -> impl Iterator<Item = (&Arc<dyn GeometryComponent>, usize, usize)> {
        let mut start = 0;
        self.components.iter().map(move |component| {
            let end = start + component.nr_dimensions();
            let span = (component, start, end);
            start = end;
            span
        })
    }
}

impl GeometryComponent for MergedObjective {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn nr_dimensions(&self) -> usize {
        self.components.iter().map(|c| c.nr_dimensions()).sum()
    }

    fn geometry_point(&self, instrument: &Instrument) -> Vec<f64> {
        self.components
            .iter()
            .flat_map(|c| c.geometry_point(instrument))
            .collect()
    }

    fn set_geometry_point(&self, instrument: &mut Instrument, point: &[f64]) {
        for (component, start, end) in self.spans() {
            component.set_geometry_point(instrument, &point[start..end]);
        }
    }

    fn default_constraints(&self, instrument: &Instrument) -> Constraints {
        let mut constraints = Constraints::new(
            self.name.clone(),
            self.display_name.clone(),
            instrument.holes.len(),
        );
        constraints.constraints_name = "Default".into();
        for component in &self.components {
            constraints.concat(&component.default_constraints(instrument));
        }
        constraints
    }

    fn optimizer_type(&self) -> OptimizerType {
        OptimizerType::Bobyqa
    }

    fn max_evaluations(&self) -> usize {
        self.max_evaluations
            .unwrap_or_else(|| self.components.iter().map(|c| c.max_evaluations()).sum())
    }
}
