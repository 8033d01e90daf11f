//! Pattern synthesis core for moirew.
//!
//! Everything in this crate is pure and UI-free. A frame is produced by
//! evaluating two oscillatory fields over the same sampling grid and
//! multiplying them:
//!
//! ```text
//!   PatternParameters ──▶ PatternField (primary)   ──┐
//!          │                                         ├─▶ MoireCompositor ─▶ ScalarField
//!          └──────────▶ PatternField (secondary) ──┘
//!                               ▲
//!                    Grid (resolution + bounds)
//! ```
//!
//! The compute backends in the `renderer` crate reimplement the same maths in
//! other execution styles; [`PatternField::sample`] is the ground truth they
//! are tested against.

mod compositor;
mod error;
mod field;
mod grid;
mod params;

pub use compositor::{domain_extent, MoireCompositor};
pub use error::PatternError;
pub use field::{FieldRole, PatternField};
pub use grid::{Grid, ScalarField, MAX_RESOLUTION, MIN_RESOLUTION};
pub use params::{wrap_phase, PatternParameters, PatternType, Preset};
