//! Composed Image Slicing
//!
//! A provider composes its whole scrolling content once into a wide RGB
//! image. Each frame only a viewport-wide window of it is pushed to the
//! display.

/// Bytes per pixel (RGB888)
pub const BYTES_PER_PIXEL: usize = 3;

/// Row-major RGB888 image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl ComposedImage {
    /// Create a black image
    pub fn new(width: u32, height: u32) -> Self {
        ComposedImage {
            width,
            height,
            data: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    /// Wrap existing RGB888 pixel data.
    ///
    /// Returns `None` if `data` does not hold exactly `width * height` pixels.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == width as usize * height as usize * BYTES_PER_PIXEL).then_some(
            ComposedImage {
                width,
                height,
                data,
            },
        )
    }

    /// Image width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB888 data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Read one pixel (`None` when out of bounds)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = self.offset(x, y);
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }

    /// Write one pixel (ignored when out of bounds)
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = self.offset(x, y);
        self.data[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&rgb);
    }

    /// Copy the viewport-wide window starting at the rounded `position`.
    ///
    /// With `wrap` enabled, a window that runs past the right edge continues
    /// with the image's own head so the loop is seamless. Without wrapping,
    /// columns past the edge are left black.
    pub fn extract_visible(&self, position: f64, viewport_width: u32, wrap: bool) -> ComposedImage {
        let mut frame = ComposedImage::new(viewport_width, self.height);
        if self.width == 0 || viewport_width == 0 {
            return frame;
        }

        let rounded = if position.is_finite() {
            position.round().max(0.0) as u64
        } else {
            0
        };
        let width = u64::from(self.width);
        let start = if wrap { rounded % width } else { rounded };

        let row_bytes = viewport_width as usize * BYTES_PER_PIXEL;
        for y in 0..self.height {
            let dst_row = y as usize * row_bytes;
            // Copy in at most two runs: [start, width) then, when wrapping, [0, ..)
            let mut dst_x = 0u64;
            let mut src_x = start;
            while dst_x < u64::from(viewport_width) {
                if src_x >= width {
                    if !wrap {
                        break;
                    }
                    src_x = 0;
                }
                let run = (width - src_x).min(u64::from(viewport_width) - dst_x);
                let src = self.offset(src_x as u32, y);
                let dst = dst_row + dst_x as usize * BYTES_PER_PIXEL;
                let len = run as usize * BYTES_PER_PIXEL;
                frame.data[dst..dst + len].copy_from_slice(&self.data[src..src + len]);
                dst_x += run;
                src_x += run;
            }
        }
        frame
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }
}
