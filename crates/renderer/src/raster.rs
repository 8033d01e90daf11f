use pattern::ScalarField;

use crate::types::RasterMode;

/// Single-channel 8-bit image, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

/// Maps one field value to a gray level.
pub fn shade(value: f32, mode: RasterMode) -> u8 {
    match mode {
        RasterMode::Grayscale => {
            let level = ((value + 1.0) * 0.5 * 255.0).round();
            if level.is_nan() {
                128
            } else {
                level.clamp(0.0, 255.0) as u8
            }
        }
        RasterMode::TriLevel => {
            if value > 0.5 {
                0
            } else if value < -0.5 {
                255
            } else {
                128
            }
        }
    }
}

/// Scales `field` onto a `viewport` of pixels with nearest-neighbour sampling.
///
/// Destination pixel `(dx, dy)` reads source `(dx * fw / w, dy * fh / h)`,
/// which always lands inside the field.
pub fn rasterize(field: &ScalarField, viewport: (u32, u32), mode: RasterMode) -> PixelBuffer {
    let (width, height) = viewport;
    let (fw, fh) = (field.width() as u64, field.height() as u64);
    if width == 0 || height == 0 || fw == 0 || fh == 0 {
        return PixelBuffer::default();
    }

    let values = field.values();
    let columns: Vec<usize> = (0..width as u64)
        .map(|dx| (dx * fw / width as u64) as usize)
        .collect();
    let mut data = Vec::with_capacity(width as usize * height as usize);
    for dy in 0..height as u64 {
        let row = (dy * fh / height as u64) as usize * fw as usize;
        data.extend(columns.iter().map(|&sx| shade(values[row + sx], mode)));
    }

    PixelBuffer {
        width,
        height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(width: u32, height: u32, values: Vec<f32>) -> ScalarField {
        ScalarField::new(width, height, values).unwrap()
    }

    #[test]
    fn grayscale_maps_unit_range_to_bytes() {
        assert_eq!(shade(-1.0, RasterMode::Grayscale), 0);
        assert_eq!(shade(1.0, RasterMode::Grayscale), 255);
        assert_eq!(shade(0.0, RasterMode::Grayscale), 128);
        assert_eq!(shade(-3.0, RasterMode::Grayscale), 0);
        assert_eq!(shade(2.5, RasterMode::Grayscale), 255);
    }

    #[test]
    fn trilevel_thresholds() {
        assert_eq!(shade(0.75, RasterMode::TriLevel), 0);
        assert_eq!(shade(0.5, RasterMode::TriLevel), 128);
        assert_eq!(shade(-0.5, RasterMode::TriLevel), 128);
        assert_eq!(shade(-0.51, RasterMode::TriLevel), 255);
    }

    #[test]
    fn upscales_with_nearest_neighbour() {
        let source = field(2, 2, vec![-1.0, 1.0, 1.0, -1.0]);
        let pixels = rasterize(&source, (4, 4), RasterMode::Grayscale);
        assert_eq!(pixels.width(), 4);
        assert_eq!(pixels.data().len(), 16);
        assert_eq!(pixels.get(0, 0), Some(0));
        assert_eq!(pixels.get(1, 1), Some(0));
        assert_eq!(pixels.get(2, 0), Some(255));
        assert_eq!(pixels.get(3, 3), Some(0));
        assert_eq!(pixels.get(0, 3), Some(255));
    }

    #[test]
    fn downscales_without_reading_out_of_bounds() {
        let values: Vec<f32> = (0..300 * 301).map(|i| (i % 3) as f32 - 1.0).collect();
        let source = field(300, 301, values);
        let pixels = rasterize(&source, (7, 1999), RasterMode::TriLevel);
        assert_eq!(pixels.data().len(), 7 * 1999);
        assert!(pixels.data().iter().all(|&p| p == 0 || p == 128 || p == 255));
    }

    #[test]
    fn empty_viewport_yields_empty_buffer() {
        let source = field(1, 1, vec![0.0]);
        assert!(rasterize(&source, (0, 10), RasterMode::Grayscale).is_empty());
        assert!(rasterize(&source, (10, 0), RasterMode::Grayscale).is_empty());
    }
}
