use serde::{Deserialize, Serialize};
use std::fmt;

/// Rectangular region of the output image, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Tile {
    /// Create new tile
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Number of pixels covered by the tile
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Byte length of this tile's packed RGB data.
    pub fn rgb_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// One past the last column.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// One past the last row.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Check if point is inside the tile
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// True when the tile is non-empty and lies inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= height)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {}x{}", self.x, self.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_area_and_rgb_len() {
        let tile = Tile::new(0, 0, 40, 10);

        assert_eq!(tile.area(), 400);
        assert_eq!(tile.rgb_len(), 1200);
    }

    #[test]
    fn test_huge_tile_does_not_overflow() {
        let tile = Tile::new(0, 0, 70_000, 70_000);

        assert_eq!(tile.area(), 4_900_000_000);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(tile.rgb_len(), 14_700_000_000);
    }

    #[test]
    fn test_tile_contains_point() {
        let tile = Tile::new(10, 20, 100, 50);

        assert!(tile.contains(50, 40));
        assert!(tile.contains(10, 20)); // Top-left corner
        assert!(tile.contains(109, 69)); // Bottom-right corner
        assert!(!tile.contains(110, 70)); // Just outside
        assert!(!tile.contains(9, 20)); // Just left
        assert!(!tile.contains(50, 19)); // Just above
    }

    #[test]
    fn test_tile_fits_within_image() {
        assert!(Tile::new(80, 40, 20, 10).fits_within(100, 50));
        assert!(!Tile::new(80, 40, 21, 10).fits_within(100, 50));
        assert!(!Tile::new(0, 0, 0, 10).fits_within(100, 50));
        assert!(!Tile::new(u32::MAX, 0, 2, 1).fits_within(100, 50));
    }

    #[test]
    fn test_tile_display() {
        assert_eq!(Tile::new(80, 40, 20, 10).to_string(), "(80, 40) 20x10");
    }

    #[test]
    fn test_tile_json_shape() {
        let json = serde_json::to_string(&Tile::new(1, 2, 3, 4)).unwrap();
        assert_eq!(json, r#"{"x":1,"y":2,"width":3,"height":4}"#);
    }
}
