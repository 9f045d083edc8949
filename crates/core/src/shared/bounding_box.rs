/// A face box as reported by a locator, in frame pixel space.
///
/// Coordinates are not guaranteed to lie inside the frame or to be
/// well-ordered; call [`BoundingBox::clamp_to`] before touching pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Clamps the box to `[0, width] × [0, height]`.
    ///
    /// Returns `None` when the clamped box is degenerate (`x2 <= x1` or
    /// `y2 <= y1`), which covers inverted boxes and boxes lying entirely
    /// outside the frame.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<ClampedBox> {
        let w = i64::from(width);
        let h = i64::from(height);
        let x1 = i64::from(self.x1).clamp(0, w);
        let y1 = i64::from(self.y1).clamp(0, h);
        let x2 = i64::from(self.x2).clamp(0, w);
        let y2 = i64::from(self.y2).clamp(0, h);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(ClampedBox {
            x1: x1 as u32,
            y1: y1 as u32,
            x2: x2 as u32,
            y2: y2 as u32,
        })
    }
}

/// A non-degenerate box fully inside its frame. Upper bounds are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClampedBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl ClampedBox {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }
}
