//! Container constraints handed to row layout.

/// Size bounds a row is laid out against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Constraints {
    pub min_width: f32,
    pub max_width: f32,
    pub min_height: f32,
    pub max_height: f32,
}

impl Default for Constraints {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Constraints {
    /// Creates constraints with loose bounds (min = 0, max = given values).
    pub fn loose(max_width: f32, max_height: f32) -> Self {
        Self {
            min_width: 0.0,
            max_width,
            min_height: 0.0,
            max_height,
        }
    }

    /// No bounds at all.
    pub fn unbounded() -> Self {
        Self::loose(f32::INFINITY, f32::INFINITY)
    }

    /// Constraints for a row of a vertical list: the row fills the list's
    /// width and picks its own height.
    pub fn row(list_width: f32) -> Self {
        Self {
            min_width: list_width,
            max_width: list_width,
            min_height: 0.0,
            max_height: f32::INFINITY,
        }
    }

    /// Clamps `width` and `height` into these constraints.
    pub fn constrain(&self, width: f32, height: f32) -> (f32, f32) {
        (
            width.clamp(self.min_width, self.max_width),
            height.clamp(self.min_height, self.max_height),
        )
    }
}
