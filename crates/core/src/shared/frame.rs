use ndarray::ArrayView3;

use super::bounding_box::ClampedBox;

/// A single camera frame: contiguous BGR bytes in row-major order.
///
/// Channel order matches what the virtual camera consumes, so frames flow
/// from capture to delivery without per-frame swizzling.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// A frame filled with a single byte value.
    pub fn filled(width: u32, height: u32, channels: u8, value: u8, index: usize) -> Self {
        let len = (width as usize) * (height as usize) * (channels as usize);
        Self::new(vec![value; len], width, height, channels, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels inside `rect` into a new, tightly-packed frame.
    ///
    /// The crop keeps this frame's index so redaction results can be traced
    /// back to the capture they came from.
    pub fn crop(&self, rect: &ClampedBox) -> Frame {
        let channels = self.channels as usize;
        let row_bytes = rect.width() as usize * channels;
        let mut out = Vec::with_capacity(row_bytes * rect.height() as usize);
        for row in rect.y1..rect.y2 {
            let start = self.offset(rect.x1, row);
            out.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        Frame::new(out, rect.width(), rect.height(), self.channels, self.index)
    }

    /// Writes `patch` back over the pixels inside `rect`.
    pub fn paste(&mut self, rect: &ClampedBox, patch: &Frame) -> Result<(), String> {
        if patch.width != rect.width()
            || patch.height != rect.height()
            || patch.channels != self.channels
        {
            return Err(format!(
                "patch is {}x{}x{}, expected {}x{}x{}",
                patch.width,
                patch.height,
                patch.channels,
                rect.width(),
                rect.height(),
                self.channels
            ));
        }
        let row_bytes = rect.width() as usize * self.channels as usize;
        for (i, row) in (rect.y1..rect.y2).enumerate() {
            let dst = self.offset(rect.x1, row);
            let src = i * row_bytes;
            self.data[dst..dst + row_bytes].copy_from_slice(&patch.data[src..src + row_bytes]);
        }
        Ok(())
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + x as usize) * self.channels as usize
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
