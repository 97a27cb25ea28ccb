//! Color frames as produced by the capture device.
//!
//! A [`Frame`] stores interleaved RGB samples in an `Array3<u8>` with shape
//! `(height, width, 3)`. Full-frame captures and rectified tray canvases use
//! the same type; only their size differs.

use image::{Rgb, RgbImage};
use ndarray::{Array2, Array3, ArrayView3};

use crate::image_proc::color::{rgb_to_gray, rgb_to_hsv};
use crate::image_size::ImageSize;

/// RGB color frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    data: Array3<u8>,
}

impl Frame {
    /// Wrap an RGB array with shape `(height, width, 3)`.
    ///
    /// Returns `None` if the channel axis is not exactly 3 wide.
    pub fn from_array(data: Array3<u8>) -> Option<Self> {
        if data.dim().2 != 3 {
            return None;
        }
        Some(Self { data })
    }

    /// Frame of the given size with every pixel set to `rgb`.
    pub fn filled(size: ImageSize, rgb: [u8; 3]) -> Self {
        let mut data = Array3::zeros((size.height, size.width, 3));
        for (c, value) in rgb.iter().enumerate() {
            data.index_axis_mut(ndarray::Axis(2), c).fill(*value);
        }
        Self { data }
    }

    pub fn from_rgb_image(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let mut data = Array3::zeros((height as usize, width as usize, 3));
        for (x, y, pixel) in image.enumerate_pixels() {
            for c in 0..3 {
                data[[y as usize, x as usize, c]] = pixel.0[c];
            }
        }
        Self { data }
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        let size = self.size();
        RgbImage::from_fn(size.width as u32, size.height as u32, |x, y| {
            Rgb(self.pixel(x as usize, y as usize))
        })
    }

    pub fn size(&self) -> ImageSize {
        let (height, width, _) = self.data.dim();
        ImageSize::from_width_height(width, height)
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// RGB value at column `x`, row `y`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the frame.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        [
            self.data[[y, x, 0]],
            self.data[[y, x, 1]],
            self.data[[y, x, 2]],
        ]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        for (c, value) in rgb.iter().enumerate() {
            self.data[[y, x, c]] = *value;
        }
    }

    /// Paint an axis-aligned rectangle, clipped to the frame bounds.
    pub fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize, rgb: [u8; 3]) {
        let size = self.size();
        let x_end = (x + width).min(size.width);
        let y_end = (y + height).min(size.height);
        for row in y.min(y_end)..y_end {
            for col in x.min(x_end)..x_end {
                self.set_pixel(col, row, rgb);
            }
        }
    }

    /// Single-channel intensity using BT.601 luma weights.
    pub fn to_gray(&self) -> Array2<u8> {
        let size = self.size();
        Array2::from_shape_fn(size.shape(), |(y, x)| {
            let [r, g, b] = self.pixel(x, y);
            rgb_to_gray(r, g, b)
        })
    }

    /// HSV representation with hue in `0..180` and saturation/value in `0..=255`.
    pub fn to_hsv(&self) -> Array3<u8> {
        let size = self.size();
        let mut hsv = Array3::zeros((size.height, size.width, 3));
        for y in 0..size.height {
            for x in 0..size.width {
                let [r, g, b] = self.pixel(x, y);
                let [h, s, v] = rgb_to_hsv(r, g, b);
                hsv[[y, x, 0]] = h;
                hsv[[y, x, 1]] = s;
                hsv[[y, x, 2]] = v;
            }
        }
        hsv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_array_rejects_non_rgb() {
        assert!(Frame::from_array(Array3::zeros((4, 4, 1))).is_none());
        assert!(Frame::from_array(Array3::zeros((4, 4, 3))).is_some());
    }

    #[test]
    fn rgb_image_conversion_preserves_pixels() {
        let mut frame = Frame::filled(ImageSize::from_width_height(5, 3), [10, 20, 30]);
        frame.set_pixel(4, 2, [200, 100, 50]);

        let image = frame.to_rgb_image();
        assert_eq!(image.dimensions(), (5, 3));
        assert_eq!(image.get_pixel(4, 2).0, [200, 100, 50]);
        assert_eq!(Frame::from_rgb_image(&image), frame);
    }

    #[test]
    fn fill_rect_clips_to_frame() {
        let mut frame = Frame::filled(ImageSize::from_width_height(10, 10), [0, 0, 0]);
        frame.fill_rect(8, 8, 5, 5, [255, 255, 255]);

        let gray = frame.to_gray();
        assert_eq!(gray.iter().filter(|&&v| v == 255).count(), 4);
        assert_eq!(gray[[9, 9]], 255);
        assert_eq!(gray[[7, 9]], 0);
    }

    #[test]
    fn gray_of_white_and_black() {
        let white = Frame::filled(ImageSize::from_width_height(2, 2), [255, 255, 255]);
        let black = Frame::filled(ImageSize::from_width_height(2, 2), [0, 0, 0]);
        assert!(white.to_gray().iter().all(|&v| v == 255));
        assert!(black.to_gray().iter().all(|&v| v == 0));
    }
}
