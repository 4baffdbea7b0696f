//! Image decoding for inference.

use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::model::TargetSize;

/// Decodes PNG/JPEG/WebP bytes, converts to RGB, resizes exactly to `size` and
/// scales pixels to `[0, 1]`.
///
/// Returns a `[1, height, width, 3]` batch.
pub fn image_bytes_to_input(bytes: &[u8], size: TargetSize) -> Result<Array4<f32>, image::ImageError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let rgb = imageops::resize(&rgb, size.width, size.height, FilterType::CatmullRom);

    let mut input = Array4::<f32>::zeros((1, size.height as usize, size.width as usize, 3));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for (c, &value) in pixel.0.iter().enumerate() {
            input[[0, y as usize, x as usize, c]] = f32::from(value) / 255.0;
        }
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageOutputFormat, Luma, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut bytes = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut bytes, ImageOutputFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_shape_and_range() {
        let input = image_bytes_to_input(&png(10, 6, [255, 0, 51]), TargetSize { width: 8, height: 4 }).unwrap();
        assert_eq!(input.shape(), &[1, 4, 8, 3]);
        assert!((input[[0, 2, 5, 0]] - 1.0).abs() < 0.01);
        assert!(input[[0, 2, 5, 1]].abs() < 0.01);
        assert!((input[[0, 2, 5, 2]] - 0.2).abs() < 0.01);
        assert!(input.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_grayscale_is_expanded_to_rgb() {
        let mut bytes = Cursor::new(Vec::new());
        image::DynamicImage::ImageLuma8(GrayImage::from_pixel(9, 9, Luma([102])))
            .write_to(&mut bytes, ImageOutputFormat::Png)
            .unwrap();

        let input = image_bytes_to_input(&bytes.into_inner(), TargetSize { width: 5, height: 3 }).unwrap();
        assert_eq!(input.shape(), &[1, 3, 5, 3]);
        assert!(input.iter().all(|&v| (v - 0.4).abs() < 0.01));
    }

    #[test]
    fn test_rejects_non_image() {
        assert!(image_bytes_to_input(b"not an image", TargetSize { width: 4, height: 4 }).is_err());
    }
}
