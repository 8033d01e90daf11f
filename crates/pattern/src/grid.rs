use crate::error::PatternError;

/// Smallest compute resolution along either axis.
pub const MIN_RESOLUTION: u32 = 300;
/// Largest compute resolution along either axis.
pub const MAX_RESOLUTION: u32 = 1200;

/// Immutable sampling domain: `resolution_x × resolution_y` points spread
/// evenly over `[-extent, extent]²`, endpoints included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    resolution_x: u32,
    resolution_y: u32,
    extent: f64,
}

impl Grid {
    /// Builds a grid, clamping each resolution into
    /// `[MIN_RESOLUTION, MAX_RESOLUTION]`.
    pub fn new(resolution_x: u32, resolution_y: u32, extent: f64) -> Result<Self, PatternError> {
        if !extent.is_finite() || extent <= 0.0 {
            return Err(PatternError::invalid(format!(
                "grid extent must be a positive finite number (got {extent})"
            )));
        }
        Ok(Self {
            resolution_x: resolution_x.clamp(MIN_RESOLUTION, MAX_RESOLUTION),
            resolution_y: resolution_y.clamp(MIN_RESOLUTION, MAX_RESOLUTION),
            extent,
        })
    }

    pub fn resolution_x(&self) -> u32 {
        self.resolution_x
    }

    pub fn resolution_y(&self) -> u32 {
        self.resolution_y
    }

    pub fn extent(&self) -> f64 {
        self.extent
    }

    pub fn len(&self) -> usize {
        self.resolution_x as usize * self.resolution_y as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn step_x(&self) -> f64 {
        2.0 * self.extent / f64::from(self.resolution_x - 1)
    }

    pub fn step_y(&self) -> f64 {
        2.0 * self.extent / f64::from(self.resolution_y - 1)
    }

    /// Domain coordinate of column `i`.
    pub fn x_at(&self, i: u32) -> f64 {
        -self.extent + f64::from(i) * self.step_x()
    }

    /// Domain coordinate of row `j`.
    pub fn y_at(&self, j: u32) -> f64 {
        -self.extent + f64::from(j) * self.step_y()
    }

    /// Column coordinates, left to right.
    pub fn xs(&self) -> Vec<f64> {
        (0..self.resolution_x).map(|i| self.x_at(i)).collect()
    }

    /// Row coordinates, top to bottom.
    pub fn ys(&self) -> Vec<f64> {
        (0..self.resolution_y).map(|j| self.y_at(j)).collect()
    }
}

/// Dense row-major field with one value per grid sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl ScalarField {
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self, PatternError> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(PatternError::invalid(format!(
                "field of {width}x{height} needs {expected} values, got {}",
                values.len()
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Fills a field shaped like `grid` by calling `f(column, row)`.
    pub fn from_fn(grid: &Grid, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut values = Vec::with_capacity(grid.len());
        for j in 0..grid.resolution_y() {
            for i in 0..grid.resolution_x() {
                values.push(f(i, j));
            }
        }
        Self {
            width: grid.resolution_x(),
            height: grid.resolution_y(),
            values,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn matches(&self, grid: &Grid) -> bool {
        self.width == grid.resolution_x() && self.height == grid.resolution_y()
    }

    /// Elementwise product; `None` when shapes differ.
    pub fn multiply(&self, other: &ScalarField) -> Option<ScalarField> {
        if self.width != other.width || self.height != other.height {
            return None;
        }
        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| a * b)
            .collect();
        Some(ScalarField {
            width: self.width,
            height: self.height,
            values,
        })
    }

    /// Largest absolute elementwise difference; `None` when shapes differ.
    pub fn max_abs_diff(&self, other: &ScalarField) -> Option<f32> {
        if self.width != other.width || self.height != other.height {
            return None;
        }
        Some(
            self.values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f32::max),
        )
    }

    /// Minimum and maximum value, ignoring NaN. `None` for an empty field.
    pub fn range(&self) -> Option<(f32, f32)> {
        let mut iter = self.values.iter().copied().filter(|v| !v.is_nan());
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_resolution_into_bounds() {
        let grid = Grid::new(10, 5000, 5.0).unwrap();
        assert_eq!(grid.resolution_x(), MIN_RESOLUTION);
        assert_eq!(grid.resolution_y(), MAX_RESOLUTION);
    }

    #[test]
    fn endpoints_cover_the_extent() {
        let grid = Grid::new(301, 300, 5.0).unwrap();
        assert!((grid.x_at(0) + 5.0).abs() < 1e-12);
        assert!((grid.x_at(300) - 5.0).abs() < 1e-12);
        assert!(grid.x_at(150).abs() < 1e-12);
        assert!((grid.y_at(299) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_degenerate_extent() {
        assert!(Grid::new(300, 300, 0.0).is_err());
        assert!(Grid::new(300, 300, f64::NAN).is_err());
    }

    #[test]
    fn field_shape_is_checked() {
        assert!(ScalarField::new(2, 2, vec![0.0; 3]).is_err());
        let field = ScalarField::new(2, 2, vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(field.get(1, 1), Some(3.0));
        assert_eq!(field.get(2, 0), None);
    }

    #[test]
    fn multiply_and_diff_require_matching_shapes() {
        let a = ScalarField::new(2, 1, vec![0.5, -1.0]).unwrap();
        let b = ScalarField::new(2, 1, vec![2.0, 0.5]).unwrap();
        let product = a.multiply(&b).unwrap();
        assert_eq!(product.values(), &[1.0, -0.5]);
        assert_eq!(a.max_abs_diff(&b), Some(1.5));

        let c = ScalarField::new(1, 2, vec![0.0, 0.0]).unwrap();
        assert!(a.multiply(&c).is_none());
        assert!(a.max_abs_diff(&c).is_none());
    }
}
