//! Assembles tile results into the framebuffer and pushes it to a display surface.

use crate::error::CompositeError;
use raytile_core::{Framebuffer, Tile};

/// 2D pixel surface the framebuffer is shown on.
pub trait Surface {
    fn set_size(&mut self, width: u32, height: u32);
    fn clear(&mut self);
    /// Repaint from the framebuffer. Called after every composited tile.
    fn blit(&mut self, framebuffer: &Framebuffer);
}

/// Surface that displays nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSurface;

impl Surface for NullSurface {
    fn set_size(&mut self, _width: u32, _height: u32) {}
    fn clear(&mut self) {}
    fn blit(&mut self, _framebuffer: &Framebuffer) {}
}

/// Sole writer of the framebuffer.
pub struct Compositor<S> {
    framebuffer: Option<Framebuffer>,
    surface: S,
}

impl<S: Surface> Compositor<S> {
    pub fn new(surface: S) -> Self {
        Self {
            framebuffer: None,
            surface,
        }
    }

    pub fn framebuffer(&self) -> Option<&Framebuffer> {
        self.framebuffer.as_ref()
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.framebuffer.as_ref().map(Framebuffer::size)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Allocate a zeroed framebuffer of the given size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.framebuffer = Some(Framebuffer::new(width, height));
        self.surface.set_size(width, height);
    }

    /// Drop the framebuffer; tiles are rejected until the next `resize`.
    pub fn release(&mut self) {
        self.framebuffer = None;
    }

    pub fn clear(&mut self) -> Result<(), CompositeError> {
        let framebuffer = self
            .framebuffer
            .as_mut()
            .ok_or(CompositeError::NoFramebuffer)?;
        framebuffer.clear();
        self.surface.clear();
        Ok(())
    }

    /// Copy a tile's packed RGB into the framebuffer with alpha forced to 255.
    pub fn apply_tile(&mut self, tile: Tile, rgb: &[u8]) -> Result<(), CompositeError> {
        let framebuffer = self
            .framebuffer
            .as_mut()
            .ok_or(CompositeError::NoFramebuffer)?;

        let (width, height) = framebuffer.size();
        if !tile.fits_within(width, height) {
            return Err(CompositeError::OutOfBounds {
                tile,
                width,
                height,
            });
        }
        if rgb.len() != tile.rgb_len() {
            return Err(CompositeError::DataLength {
                tile,
                expected: tile.rgb_len(),
                actual: rgb.len(),
            });
        }

        let src_row_len = tile.width as usize * 3;
        let dst_row_len = tile.width as usize * Framebuffer::BYTES_PER_PIXEL;

        for (local_y, src_row) in rgb.chunks_exact(src_row_len).enumerate() {
            let start = framebuffer.byte_offset(tile.x, tile.y + local_y as u32);
            let dst_row = &mut framebuffer.as_bytes_mut()[start..start + dst_row_len];

            for (dst, src) in dst_row
                .chunks_exact_mut(Framebuffer::BYTES_PER_PIXEL)
                .zip(src_row.chunks_exact(3))
            {
                dst[..3].copy_from_slice(src);
                dst[3] = 255;
            }
        }

        self.surface.blit(framebuffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSurface {
        size: Option<(u32, u32)>,
        clears: usize,
        blits: usize,
    }

    impl Surface for RecordingSurface {
        fn set_size(&mut self, width: u32, height: u32) {
            self.size = Some((width, height));
        }
        fn clear(&mut self) {
            self.clears += 1;
        }
        fn blit(&mut self, _framebuffer: &Framebuffer) {
            self.blits += 1;
        }
    }

    fn rgb(values: &[u8]) -> Vec<u8> {
        values.iter().flat_map(|&v| [v, v + 1, v + 2]).collect()
    }

    fn reds(framebuffer: &Framebuffer) -> Vec<u8> {
        framebuffer.as_bytes().chunks_exact(4).map(|p| p[0]).collect()
    }

    fn compositor(width: u32, height: u32) -> Compositor<RecordingSurface> {
        let mut compositor = Compositor::new(RecordingSurface::default());
        compositor.resize(width, height);
        compositor
    }

    #[test]
    fn tile_placed_at_correct_position() {
        let mut compositor = compositor(4, 4);
        compositor
            .apply_tile(Tile::new(2, 2, 2, 2), &rgb(&[10, 20, 30, 40]))
            .unwrap();

        let fb = compositor.framebuffer().unwrap();
        #[rustfmt::skip]
        assert_eq!(reds(fb), vec![
            0, 0, 0, 0,
            0, 0, 0, 0,
            0, 0, 10, 20,
            0, 0, 30, 40,
        ]);
        assert_eq!(fb.pixel(3, 3), Some([40, 41, 42, 255]));
        assert_eq!(fb.pixel(1, 1), Some([0, 0, 0, 0]));
        assert_eq!(compositor.surface().blits, 1);
    }

    #[test]
    fn tiles_out_of_order() {
        let mut compositor = compositor(4, 2);
        compositor
            .apply_tile(Tile::new(2, 0, 2, 2), &rgb(&[3, 4, 7, 8]))
            .unwrap();
        compositor
            .apply_tile(Tile::new(0, 0, 2, 2), &rgb(&[1, 2, 5, 6]))
            .unwrap();

        #[rustfmt::skip]
        assert_eq!(reds(compositor.framebuffer().unwrap()), vec![
            1, 2, 3, 4,
            5, 6, 7, 8,
        ]);
    }

    #[test]
    fn applying_twice_matches_applying_once() {
        let tile = Tile::new(1, 0, 2, 3);
        let data = rgb(&[9, 8, 7, 6, 5, 4]);

        let mut once = compositor(4, 3);
        once.apply_tile(tile, &data).unwrap();

        let mut twice = compositor(4, 3);
        twice.apply_tile(tile, &data).unwrap();
        twice.apply_tile(tile, &data).unwrap();

        assert_eq!(once.framebuffer(), twice.framebuffer());
    }

    #[test]
    fn tile_extending_past_right_edge_is_rejected() {
        let mut compositor = compositor(4, 2);
        let err = compositor
            .apply_tile(Tile::new(3, 0, 2, 2), &rgb(&[1, 2, 3, 4]))
            .unwrap_err();

        assert_eq!(
            err,
            CompositeError::OutOfBounds {
                tile: Tile::new(3, 0, 2, 2),
                width: 4,
                height: 2
            }
        );
        assert!(compositor.framebuffer().unwrap().as_bytes().iter().all(|&b| b == 0));
        assert_eq!(compositor.surface().blits, 0);
    }

    #[test]
    fn tile_with_insufficient_data_is_rejected() {
        let mut compositor = compositor(2, 2);
        let err = compositor
            .apply_tile(Tile::new(0, 0, 2, 2), &rgb(&[1, 2]))
            .unwrap_err();

        assert!(matches!(
            err,
            CompositeError::DataLength {
                expected: 12,
                actual: 6,
                ..
            }
        ));
    }

    #[test]
    fn apply_without_framebuffer_fails() {
        let mut compositor = Compositor::new(NullSurface);
        assert_eq!(
            compositor.apply_tile(Tile::new(0, 0, 1, 1), &[1, 2, 3]),
            Err(CompositeError::NoFramebuffer)
        );
        assert_eq!(compositor.clear(), Err(CompositeError::NoFramebuffer));
    }

    #[test]
    fn clear_resets_pixels_and_surface() {
        let mut compositor = compositor(2, 1);
        compositor
            .apply_tile(Tile::new(0, 0, 2, 1), &rgb(&[50, 60]))
            .unwrap();
        compositor.clear().unwrap();

        assert_eq!(compositor.framebuffer().unwrap().pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(compositor.surface().clears, 1);
        assert_eq!(compositor.surface().size, Some((2, 1)));
    }
}
