mod stats;

use nalgebra::Vector3;

use crate::geometry::FloatType;

pub use stats::Stats;

/// Linear RGB radiance or reflectance.
pub type Color = Vector3<FloatType>;

/// Output pixel type.
pub type Rgb = rgb::RGB<f32>;

pub fn color_to_rgb(color: &Color) -> Rgb {
    Rgb::new(color.x, color.y, color.z)
}

/// Maps a 0-1 f32 rgb pixel to pixel type compatible with module image.
pub fn rgb_to_image(color: Rgb) -> image::Rgb<u8> {
    image::Rgb([
        (color.r * 255.0).round().clamp(0.0, 255.0) as u8,
        (color.g * 255.0).round().clamp(0.0, 255.0) as u8,
        (color.b * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;
    use test_case::test_case;

    #[test_case(Rgb::new(0.0, 0.5, 1.0) => [0, 128, 255]; "in range")]
    #[test_case(Rgb::new(-1.0, 2.0, f32::NAN) => [0, 255, 0]; "clamped")]
    fn to_image(color: Rgb) -> [u8; 3] {
        rgb_to_image(color).0
    }

    #[test]
    fn color_channels_map_in_order() {
        let rgb = color_to_rgb(&Color::new(0.1, 0.2, 0.3));
        assert!(rgb == Rgb::new(0.1, 0.2, 0.3));
    }
}
