//! Named bounds on each dimension of a geometry vector.

use serde::{Deserialize, Serialize};

use crate::error::{DesignError, DesignResult};
use crate::geometry::LengthType;

/// Whether a constraint value carries a length unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    Dimensional,
    Dimensionless,
}

/// Bound on one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: ConstraintType,
    pub lower: f64,
    pub upper: f64,
    /// Geometry value when the constraint set was built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Constraint {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        kind: ConstraintType,
        lower: f64,
        upper: f64,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            kind,
            lower,
            upper,
            value: None,
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn range(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Ordered constraint list for one objective.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Constraints {
    pub objective_name: String,
    pub objective_display_name: String,
    #[serde(default)]
    pub constraints_name: String,
    pub number_of_holes: usize,
    /// Unit of dimensional bounds and values; metres when absent.
    #[serde(default)]
    pub length_type: LengthType,
    pub constraints: Vec<Constraint>,
}

impl Constraints {
    pub fn new(
        objective_name: impl Into<String>,
        objective_display_name: impl Into<String>,
        number_of_holes: usize,
    ) -> Self {
        Self {
            objective_name: objective_name.into(),
            objective_display_name: objective_display_name.into(),
            constraints_name: String::new(),
            number_of_holes,
            length_type: LengthType::M,
            constraints: Vec::new(),
        }
    }

    /// Scale dimensional bounds and values from `length_type` to metres.
    pub fn convert_to_metres(&mut self) {
        let multiplier = self.length_type.to_metres();
        self.length_type = LengthType::M;
        if multiplier == 1.0 {
            return;
        }
        for constraint in &mut self.constraints {
            if constraint.kind == ConstraintType::Dimensional {
                constraint.lower *= multiplier;
                constraint.upper *= multiplier;
                constraint.value = constraint.value.map(|v| v * multiplier);
            }
        }
    }

    pub fn push(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Append another set's constraints in order.
    pub fn concat(&mut self, other: &Constraints) {
        self.constraints.extend(other.constraints.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Constraint> {
        self.constraints.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn lower_bounds(&self) -> Vec<f64> {
        self.constraints.iter().map(|c| c.lower).collect()
    }

    pub fn upper_bounds(&self) -> Vec<f64> {
        self.constraints.iter().map(|c| c.upper).collect()
    }

    /// Distinct categories in first-appearance order.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for constraint in &self.constraints {
            if !categories.contains(&constraint.category.as_str()) {
                categories.push(&constraint.category);
            }
        }
        categories
    }

    /// Replace all bounds; lengths must match and each lower ≤ upper.
    pub fn set_bounds(&mut self, lower: &[f64], upper: &[f64]) -> DesignResult<()> {
        for found in [lower.len(), upper.len()] {
            if found != self.len() {
                return Err(DesignError::DimensionMismatch {
                    expected: self.len(),
                    found,
                });
            }
        }
        check_ordered(lower, upper)?;
        for (constraint, (&lo, &hi)) in self
            .constraints
            .iter_mut()
            .zip(lower.iter().zip(upper.iter()))
        {
            constraint.lower = lo;
            constraint.upper = hi;
        }
        Ok(())
    }

    /// Check that this set can drive an objective with `expected` dimensions.
    pub fn validate(&self, expected: usize) -> DesignResult<()> {
        if self.len() != expected {
            return Err(DesignError::DimensionMismatch {
                expected,
                found: self.len(),
            });
        }
        check_ordered(&self.lower_bounds(), &self.upper_bounds())
    }

    pub fn from_json(json: &str) -> DesignResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> DesignResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn check_ordered(lower: &[f64], upper: &[f64]) -> DesignResult<()> {
    for (i, (lo, hi)) in lower.iter().zip(upper.iter()).enumerate() {
        if !lo.is_finite() || !hi.is_finite() || lo > hi {
            return Err(DesignError::InvalidConstraints(format!(
                "bound {} has lower {} above upper {}",
                i, lo, hi
            )));
        }
    }
    Ok(())
}
