//! Anonymous shared-memory files for `wl_shm` pools
//!
//! A pool needs a file descriptor the compositor can map. We create a POSIX
//! shm object under a throwaway `/wl_shm-XXXXXX` name, unlink it straight
//! away so nothing stays visible in `/dev/shm`, and size it with `ftruncate`.
//! The returned [`File`] is the only reference left; dropping it closes the
//! descriptor.

use log::{debug, trace};
use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Maximum number of names tried before giving up on collisions
pub const MAX_NAME_ATTEMPTS: usize = 100;

const NAME_PREFIX: &str = "/wl_shm-";
const SUFFIX_LEN: usize = 6;

/// Failures of the shared-memory allocator
#[derive(Debug, Error)]
pub enum ShmError {
    #[error("requested shared memory size must be non-zero")]
    EmptySize,

    #[error("{width}x{height} pixels do not fit in addressable memory")]
    TooLarge { width: u32, height: u32 },

    #[error("no free shm name after {attempts} attempts")]
    NamesExhausted { attempts: usize },

    #[error("shm_open({name}) failed: {source}")]
    Open {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to resize shm file to {size} bytes: {source}")]
    Truncate {
        size: usize,
        #[source]
        source: io::Error,
    },

    #[error("failed to map shm file: {0}")]
    Map(#[source] io::Error),

    #[error("shm mapping is not suitably aligned for 32-bit pixels")]
    Misaligned,
}

/// Six name characters derived from a clock reading.
///
/// Each character takes five bits of `seed`: the low four pick a letter
/// and the fifth selects lower case, so the result is always in `A..=P`
/// or `a..=p`.
pub fn random_suffix(seed: u64) -> [u8; SUFFIX_LEN] {
    let mut r = seed;
    let mut out = [0u8; SUFFIX_LEN];
    for c in out.iter_mut() {
        *c = b'A' + (r & 15) as u8 + ((r & 16) * 2) as u8;
        r >>= 5;
    }
    out
}

/// A fresh candidate name seeded from the realtime clock
pub fn random_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    let suffix = random_suffix(u64::from(nanos));
    // The suffix is ASCII by construction.
    format!("{}{}", NAME_PREFIX, String::from_utf8_lossy(&suffix))
}

/// Create and immediately unlink an shm object, drawing names from `next_name`.
///
/// Only `EEXIST` is retried; every other `shm_open` error is returned as is.
pub fn create_shm_file_with<F>(mut next_name: F) -> Result<File, ShmError>
where
    F: FnMut() -> String,
{
    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let name = next_name();
        let c_name = CString::new(name.as_str()).map_err(|e| ShmError::Open {
            name: name.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, e),
        })?;

        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_RDWR | libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::mode_t,
            )
        };

        if fd >= 0 {
            unsafe {
                libc::shm_unlink(c_name.as_ptr());
            }
            trace!("shm object {} created on attempt {}", name, attempt);
            // SAFETY: shm_open just returned this descriptor and nothing else owns it.
            let owned = unsafe { OwnedFd::from_raw_fd(fd) };
            return Ok(File::from(owned));
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::EEXIST) {
            return Err(ShmError::Open { name, source: err });
        }
        debug!("shm name {} already taken, retrying", name);
    }

    Err(ShmError::NamesExhausted {
        attempts: MAX_NAME_ATTEMPTS,
    })
}

/// Create an unlinked shm object with a clock-seeded name
pub fn create_shm_file() -> Result<File, ShmError> {
    create_shm_file_with(random_name)
}

/// Create an unlinked shm object of exactly `size` bytes.
///
/// On any failure after creation the descriptor is closed before returning.
pub fn allocate_shm_file(size: usize) -> Result<File, ShmError> {
    if size == 0 {
        return Err(ShmError::EmptySize);
    }
    let len = libc::off_t::try_from(size).map_err(|_| ShmError::Truncate {
        size,
        source: io::Error::new(io::ErrorKind::InvalidInput, "size exceeds off_t"),
    })?;

    let file = create_shm_file()?;
    truncate(&file, len).map_err(|source| ShmError::Truncate { size, source })?;
    Ok(file)
}

fn truncate(file: &File, len: libc::off_t) -> io::Result<()> {
    loop {
        let ret = unsafe { libc::ftruncate(file.as_raw_fd(), len) };
        if ret == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(test)]
mod tests;
