use serde::{Deserialize, Serialize};

/// Half-open pixel rectangle `[start_x, end_x) × [start_y, end_y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub start_x: usize,
    pub start_y: usize,
    pub end_x: usize,
    pub end_y: usize,
}

impl Rect {
    pub const fn new(start_x: usize, start_y: usize, end_x: usize, end_y: usize) -> Self {
        Self {
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    /// Rectangle anchored at `(x, y)` with the given extent.
    pub const fn from_origin(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.end_x.saturating_sub(self.start_x)
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.end_y.saturating_sub(self.start_y)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// True when the rectangle is non-empty and lies inside a `width × height` grid.
    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        !self.is_empty() && self.end_x <= width && self.end_y <= height
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.start_x && x < self.end_x && y >= self.start_y && y < self.end_y
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.start_x < other.end_x
            && other.start_x < self.end_x
            && self.start_y < other.end_y
            && other.start_y < self.end_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_and_overlap() {
        let r = Rect::new(10, 10, 118, 118);
        assert_eq!(r.width(), 108);
        assert!(r.fits_within(128, 128));
        assert!(!r.fits_within(117, 128));
        assert!(r.overlaps(&Rect::from_origin(0, 0, 11, 11)));
        assert!(!r.overlaps(&Rect::from_origin(0, 0, 10, 128)));
        assert!(!Rect::new(4, 4, 4, 9).fits_within(16, 16));
    }
}
