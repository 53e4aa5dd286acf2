//! Checkerboard fill
//!
//! Eight-pixel tiles alternating between two greys. The animation offset
//! shifts the pattern diagonally; only its integer part modulo 8 matters.

use super::Canvas;

/// Dark tile colour (XRGB8888)
pub const DARK: u32 = 0xFF66_6666;

/// Light tile colour (XRGB8888)
pub const LIGHT: u32 = 0xFFEE_EEEE;

/// Tile edge length in pixels
pub const TILE: u32 = 8;

/// Integer shift applied to both axes for a given animation offset
pub fn tile_shift(offset: f64) -> u32 {
    if !offset.is_finite() || offset <= 0.0 {
        return 0;
    }
    (offset.floor() as u64 % u64::from(TILE)) as u32
}

/// Colour of pixel `(x, y)` with an already reduced `shift`
#[inline]
pub fn pixel_at(x: u32, y: u32, shift: u32) -> u32 {
    let x = u64::from(x) + u64::from(shift);
    let y = u64::from(y) + u64::from(shift);
    let tile = u64::from(TILE);
    if (x + y / tile * tile) % (2 * tile) < tile {
        DARK
    } else {
        LIGHT
    }
}

/// Paint the whole canvas into `pixels`, row by row.
///
/// `pixels` must hold at least `width * height` entries; anything past
/// that is left untouched.
pub fn fill_checkerboard(pixels: &mut [u32], canvas: Canvas, offset: f64) {
    let shift = tile_shift(offset);
    let width = canvas.width as usize;
    if width == 0 {
        return;
    }

    for (y, row) in pixels
        .chunks_exact_mut(width)
        .take(canvas.height as usize)
        .enumerate()
    {
        for (x, px) in row.iter_mut().enumerate() {
            *px = pixel_at(x as u32, y as u32, shift);
        }
    }
}
