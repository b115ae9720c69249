use raytile_core::Tile;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Generate tiles covering the image in row-major order.
///
/// The last row and column are clipped to the image bounds. A tile size
/// larger than the image yields a single tile; an empty image yields none.
///
/// Panics if `tile_size` is zero.
pub fn partition(width: u32, height: u32, tile_size: u32) -> Vec<Tile> {
    assert!(tile_size > 0, "tile_size must be positive");

    let mut tiles = Vec::new();

    for y_start in (0..height).step_by(tile_size as usize) {
        for x_start in (0..width).step_by(tile_size as usize) {
            let w = tile_size.min(width - x_start);
            let h = tile_size.min(height - y_start);
            tiles.push(Tile::new(x_start, y_start, w, h));
        }
    }

    tiles
}

/// Tiles for one render pass, handed out first-come-first-served.
///
/// The cursor only moves forward, so each tile goes to exactly one caller.
#[derive(Debug)]
pub struct TileQueue {
    tiles: Vec<Tile>,
    cursor: AtomicUsize,
}

impl TileQueue {
    pub fn new(tiles: Vec<Tile>) -> Self {
        Self {
            tiles,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Pop the next tile, or None once every tile has been handed out.
    pub fn next_tile(&self) -> Option<Tile> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.tiles.get(index).copied()
    }

    /// Total tiles in this pass.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tiles not yet handed out.
    pub fn remaining(&self) -> usize {
        self.tiles
            .len()
            .saturating_sub(self.cursor.load(Ordering::Relaxed))
    }
}
