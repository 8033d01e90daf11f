use bytemuck::{Pod, Zeroable};
use pattern::{Grid, MoireCompositor, PatternField, PatternType};

/// Per-field block. `ratio`, `ratio_phase`, `sign`, and `overtone_phase`
/// carry the wave or ring harmonics; other families leave them zero.
/// For tree rings `sign` is 1.0 when the modulation runs along rotated Y.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub(crate) struct FieldUniform {
    pub freq: f32,
    pub angle: f32,
    pub phase: f32,
    pub ratio: f32,
    pub ratio_phase: f32,
    pub sign: f32,
    pub overtone_phase: f32,
    pub _pad: f32,
}

impl FieldUniform {
    fn from_field(field: &PatternField) -> Self {
        let mut uniform = Self {
            freq: field.freq() as f32,
            angle: field.angle() as f32,
            phase: field.phase() as f32,
            ..Self::default()
        };
        match field.pattern_type() {
            PatternType::Wave => {
                let h = field.role().wave();
                uniform.ratio = h.cross_ratio as f32;
                uniform.ratio_phase = h.cross_phase as f32;
                uniform.sign = h.diagonal_sign as f32;
                uniform.overtone_phase = h.overtone_phase as f32;
            }
            PatternType::TreeRings => {
                let h = field.role().rings();
                uniform.ratio = h.modulation_ratio as f32;
                uniform.ratio_phase = h.modulation_phase as f32;
                uniform.sign = if h.modulate_along_y { 1.0 } else { 0.0 };
                uniform.overtone_phase = h.overtone_phase as f32;
            }
            _ => {}
        }
        uniform
    }
}

/// Mirrors `MoireParams` in `moire.wgsl`; 112 bytes, 16-byte aligned fields.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct MoireUniform {
    pub width: u32,
    pub height: u32,
    pub pattern: u32,
    pub _pad0: u32,
    pub extent: f32,
    pub center_x: f32,
    pub center_y: f32,
    pub complexity: f32,
    pub distortion: f32,
    pub _pad1: [f32; 3],
    pub fields: [FieldUniform; 2],
}

impl MoireUniform {
    pub fn new(grid: &Grid, compositor: &MoireCompositor) -> Self {
        let primary = compositor.primary();
        let (center_x, center_y) = primary.center();
        Self {
            width: grid.resolution_x(),
            height: grid.resolution_y(),
            pattern: primary.pattern_type().index(),
            _pad0: 0,
            extent: grid.extent() as f32,
            center_x: center_x as f32,
            center_y: center_y as f32,
            complexity: primary.complexity() as f32,
            distortion: primary.distortion() as f32,
            _pad1: [0.0; 3],
            fields: [
                FieldUniform::from_field(primary),
                FieldUniform::from_field(compositor.secondary()),
            ],
        }
    }
}
