use crate::error::PatternError;
use crate::field::{FieldRole, PatternField};
use crate::grid::{Grid, ScalarField};
use crate::params::{PatternParameters, PatternType};

/// Half-width of the square sampling domain for a pattern family.
///
/// Every backend builds its grid through this rule so a family always sees
/// the same coordinates no matter where it is evaluated.
pub fn domain_extent(pattern_type: PatternType) -> f64 {
    match pattern_type {
        PatternType::Linear | PatternType::Circular | PatternType::Radial | PatternType::Spiral => {
            5.0
        }
        PatternType::Wave => 3.0,
        PatternType::TreeRings => 2.0,
    }
}

/// Combines the primary and secondary fields of one parameter block.
#[derive(Debug, Clone)]
pub struct MoireCompositor {
    primary: PatternField,
    secondary: PatternField,
}

impl MoireCompositor {
    /// Validates `params` and resolves both fields.
    pub fn new(params: &PatternParameters) -> Result<Self, PatternError> {
        params.validate()?;
        Ok(Self {
            primary: PatternField::new(params, FieldRole::Primary)?,
            secondary: PatternField::new(params, FieldRole::Secondary)?,
        })
    }

    /// Grid matching the family's domain at the requested resolution.
    pub fn grid_for(
        params: &PatternParameters,
        resolution: (u32, u32),
    ) -> Result<Grid, PatternError> {
        Grid::new(
            resolution.0,
            resolution.1,
            domain_extent(params.pattern_type),
        )
    }

    pub fn primary(&self) -> &PatternField {
        &self.primary
    }

    pub fn secondary(&self) -> &PatternField {
        &self.secondary
    }

    /// Moiré value at one domain point.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        self.primary.sample(x, y) * self.secondary.sample(x, y)
    }

    /// Evaluates the product of both fields over `grid`.
    pub fn compose(&self, grid: &Grid) -> ScalarField {
        let xs = grid.xs();
        let ys = grid.ys();
        ScalarField::from_fn(grid, |i, j| {
            self.sample(xs[i as usize], ys[j as usize]) as f32
        })
    }

    /// One-shot helper: validate, resolve, and compose.
    pub fn evaluate(grid: &Grid, params: &PatternParameters) -> Result<ScalarField, PatternError> {
        Ok(Self::new(params)?.compose(grid))
    }
}
