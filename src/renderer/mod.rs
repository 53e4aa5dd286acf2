//! Frame renderer
//!
//! Produces the pixel data for one frame in a freshly allocated shm file.
//! The lifecycle of a [`ShmFrame`] follows the order the compositor needs:
//!
//! 1. [`ShmFrame::allocate`] creates the unlinked shm file and maps it.
//! 2. The caller hands [`ShmFrame::fd`] to `wl_shm.create_pool`; the server
//!    now holds its own reference to the memory.
//! 3. [`ShmFrame::paint`] closes our descriptor, fills the checkerboard and
//!    unmaps.
//!
//! Every early return drops the file and mapping, so no path leaks either.

pub mod pattern;

use log::trace;
use memmap2::MmapMut;
use std::fs::File;
use std::os::fd::{AsFd, BorrowedFd};
use thiserror::Error;

use crate::shm::{self, ShmError};

/// Why a frame could not be produced
#[derive(Debug, Error)]
pub enum FrameError {
    #[error(transparent)]
    Shm(#[from] ShmError),

    #[error("{0} is not bound")]
    MissingGlobal(&'static str),

    #[error("no surface to render into")]
    NoSurface,

    #[error("canvas {width}x{height} does not fit a wl_shm pool")]
    TooLarge { width: u32, height: u32 },
}

/// Size of the drawable area in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// XRGB8888 is four bytes per pixel
    pub const BYTES_PER_PIXEL: u32 = 4;

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Bytes per row, `None` if it does not fit in a `u32`
    pub fn stride(&self) -> Option<u32> {
        self.width.checked_mul(Self::BYTES_PER_PIXEL)
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Total buffer size in bytes, `None` on overflow
    pub fn byte_size(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(Self::BYTES_PER_PIXEL as usize)
    }
}

/// Canvas geometry in the signed form `wl_shm` requests take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShmLayout {
    pub width: i32,
    pub height: i32,
    pub stride: i32,
    pub size: i32,
}

impl Canvas {
    /// Pool and buffer parameters for this canvas.
    ///
    /// An empty canvas is rejected before any size arithmetic.
    pub fn shm_layout(&self) -> Result<ShmLayout, FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(ShmError::EmptySize.into());
        }
        let too_large = || FrameError::TooLarge {
            width: self.width,
            height: self.height,
        };
        let fits = |v: Option<usize>| v.and_then(|v| i32::try_from(v).ok()).ok_or_else(too_large);

        Ok(ShmLayout {
            width: fits(Some(self.width as usize))?,
            height: fits(Some(self.height as usize))?,
            stride: fits(self.stride().map(|s| s as usize))?,
            size: fits(self.byte_size())?,
        })
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

/// Shared-memory backing for a single frame
#[derive(Debug)]
pub struct ShmFrame {
    file: File,
    map: MmapMut,
    canvas: Canvas,
}

impl ShmFrame {
    /// Allocate and map an shm file sized for `canvas`
    pub fn allocate(canvas: Canvas) -> Result<Self, ShmError> {
        let size = canvas.byte_size().ok_or(ShmError::TooLarge {
            width: canvas.width,
            height: canvas.height,
        })?;
        let file = shm::allocate_shm_file(size)?;

        // SAFETY: the file is unlinked and private to this process, so no one
        // else can truncate it underneath the mapping.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(ShmError::Map)?;

        trace!(
            "allocated {}x{} shm frame ({} bytes)",
            canvas.width,
            canvas.height,
            size
        );
        Ok(Self { file, map, canvas })
    }

    /// Descriptor to pass to `wl_shm.create_pool`
    pub fn fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Close the descriptor, paint the checkerboard at `offset` and unmap.
    pub fn paint(self, offset: f64) -> Result<(), ShmError> {
        let ShmFrame {
            file,
            mut map,
            canvas,
        } = self;
        drop(file);

        let pixels: &mut [u32] =
            bytemuck::try_cast_slice_mut(&mut map[..]).map_err(|_| ShmError::Misaligned)?;
        pattern::fill_checkerboard(pixels, canvas, offset);
        Ok(())
    }
}
