//! Box to center/scale conversion for the pose model's crop transform.

use crate::tracker::Rect;

/// Normalisation constant baked into top-down pose models' training crops.
pub const PIXEL_STD: f32 = 200.0;

/// Margin added around the subject box.
pub const SCALE_MARGIN: f32 = 1.25;

/// Pose model input size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInputSize {
    pub width: u32,
    pub height: u32,
}

impl ModelInputSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// width / height
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl Default for ModelInputSize {
    fn default() -> Self {
        Self::new(192, 256)
    }
}

/// Crop description handed to the pose estimator: box midpoint plus
/// aspect-corrected size divided by the pixel std.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterScale {
    pub center: [f32; 2],
    pub scale: [f32; 2],
}

impl CenterScale {
    /// Crop size in frame pixels for the given pixel std.
    pub fn crop_size(&self, pixel_std: f32) -> [f32; 2] {
        [self.scale[0] * pixel_std, self.scale[1] * pixel_std]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterScaleMapper {
    input: ModelInputSize,
    pixel_std: f32,
    margin: f32,
}

impl CenterScaleMapper {
    pub fn new(input: ModelInputSize) -> Self {
        Self {
            input,
            pixel_std: PIXEL_STD,
            margin: SCALE_MARGIN,
        }
    }

    pub fn with_pixel_std(mut self, pixel_std: f32) -> Self {
        self.pixel_std = pixel_std;
        self
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    pub fn input(&self) -> ModelInputSize {
        self.input
    }

    pub fn pixel_std(&self) -> f32 {
        self.pixel_std
    }

    /// Center/scale for `rect`, padding the shorter side to the model's
    /// aspect ratio (never cropping) and applying the margin.
    pub fn map(&self, rect: &Rect) -> CenterScale {
        let (cx, cy) = rect.center();
        let aspect_ratio = self.input.aspect_ratio();

        let mut width = rect.width;
        let mut height = rect.height;
        if width > aspect_ratio * height {
            height = width / aspect_ratio;
        } else if width < aspect_ratio * height {
            width = height * aspect_ratio;
        }

        CenterScale {
            center: [cx, cy],
            scale: [
                width / self.pixel_std * self.margin,
                height / self.pixel_std * self.margin,
            ],
        }
    }
}

impl Default for CenterScaleMapper {
    fn default() -> Self {
        Self::new(ModelInputSize::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_wide_box_on_square_model_pads_height() {
        let mapper = CenterScaleMapper::new(ModelInputSize::new(256, 256));
        let cs = mapper.map(&Rect::from_tlbr(0.0, 0.0, 100.0, 50.0));
        assert_eq!(cs.center, [50.0, 25.0]);
        assert!(approx(cs.scale[0], 100.0 / 200.0 * 1.25));
        assert!(approx(cs.scale[1], 100.0 / 200.0 * 1.25));
    }

    #[test]
    fn test_tall_box_pads_width() {
        // 192x256 model: aspect 0.75, a 30x200 box becomes 150x200
        let mapper = CenterScaleMapper::default();
        let cs = mapper.map(&Rect::from_tlbr(10.0, 0.0, 40.0, 200.0));
        assert_eq!(cs.center, [25.0, 100.0]);
        assert!(approx(cs.scale[0], 150.0 / 200.0 * 1.25));
        assert!(approx(cs.scale[1], 200.0 / 200.0 * 1.25));
    }

    #[test]
    fn test_matching_aspect_is_untouched() {
        let mapper = CenterScaleMapper::default().with_margin(1.0);
        let cs = mapper.map(&Rect::from_tlbr(0.0, 0.0, 150.0, 200.0));
        assert!(approx(cs.scale[0], 0.75));
        assert!(approx(cs.scale[1], 1.0));
        assert!(approx(cs.crop_size(PIXEL_STD)[0], 150.0));
    }
}
