use candle_core::{DType, Device, Tensor};
use image::{imageops::FilterType, DynamicImage};

/// Input resolution of the 224 PaliGemma checkpoints.
pub const IMAGE_SIZE: u32 = 224;

/// Converts decoded images into the pixel tensor expected by the vision tower.
pub struct Preprocessor {
    image_size: u32,
    filter: FilterType,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            image_size: IMAGE_SIZE,
            filter: FilterType::Triangle,
        }
    }
}

impl Preprocessor {
    /// Resize the image to a square of `image_size` and normalize it to `[-1, 1]`.
    ///
    /// # Returns
    ///
    /// * A tensor with shape [1, 3, image_size, image_size]
    pub fn preprocess(
        &self,
        image: &DynamicImage,
        device: &Device,
        dtype: DType,
    ) -> candle_core::Result<Tensor> {
        let size = self.image_size as usize;
        let rgb = image
            .resize_exact(self.image_size, self.image_size, self.filter)
            .to_rgb8();

        Tensor::from_vec(rgb.into_raw(), (size, size, 3), device)?
            .to_dtype(dtype)?
            .permute((2, 0, 1))?
            .affine(2. / 255., -1.)?
            .unsqueeze(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn preprocess_shape_and_range() -> candle_core::Result<()> {
        let mut image = RgbImage::from_pixel(64, 32, Rgb([0, 0, 0]));
        image.put_pixel(0, 0, Rgb([255, 255, 255]));
        let image = DynamicImage::ImageRgb8(image);

        let pixels = Preprocessor::default().preprocess(&image, &Device::Cpu, DType::F32)?;
        assert_eq!(pixels.dims(), &[1, 3, 224, 224]);

        let min = pixels.flatten_all()?.min(0)?.to_scalar::<f32>()?;
        let max = pixels.flatten_all()?.max(0)?.to_scalar::<f32>()?;
        assert!(min >= -1.0 && min < 0.0);
        assert!(max <= 1.0 && max > min);
        Ok(())
    }

    #[test]
    fn preprocess_grayscale_input() -> candle_core::Result<()> {
        let image = DynamicImage::new_luma8(10, 10);
        let pixels = Preprocessor::default().preprocess(&image, &Device::Cpu, DType::F32)?;
        assert_eq!(pixels.dims(), &[1, 3, 224, 224]);
        Ok(())
    }
}
