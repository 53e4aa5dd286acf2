//! Unit tests for the shm allocator
//!
//! These run against the real `/dev/shm`; collisions are provoked by holding
//! a name open and feeding it back to the allocator.

use super::*;
use std::ffi::CString;
use std::sync::atomic::{AtomicUsize, Ordering};

fn suffix_is_valid(suffix: &[u8]) -> bool {
    suffix
        .iter()
        .all(|c| (b'A'..=b'P').contains(c) || (b'a'..=b'p').contains(c))
}

/// Holds a named shm object open for the lifetime of the guard
struct HeldName {
    name: String,
    _file: File,
}

impl HeldName {
    fn new(tag: &str) -> Self {
        let name = format!("/wlcheck-{}-{}", tag, std::process::id());
        let c_name = CString::new(name.as_str()).unwrap();
        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_RDWR | libc::O_CREAT,
                0o600 as libc::mode_t,
            )
        };
        assert!(fd >= 0, "test setup could not create {}", name);
        let file = File::from(unsafe { OwnedFd::from_raw_fd(fd) });
        Self { name, _file: file }
    }
}

impl Drop for HeldName {
    fn drop(&mut self) {
        let c_name = CString::new(self.name.as_str()).unwrap();
        unsafe {
            libc::shm_unlink(c_name.as_ptr());
        }
    }
}

#[test]
fn test_random_suffix_uses_sixteen_letters_per_case() {
    assert_eq!(&random_suffix(0), b"AAAAAA");
    // 15 in the low bits gives 'P'; bit 4 switches to lower case.
    assert_eq!(random_suffix(15)[0], b'P');
    assert_eq!(random_suffix(16)[0], b'a');
    assert_eq!(random_suffix(31)[0], b'p');
    // Second character starts at bit 5.
    assert_eq!(random_suffix(1 << 5)[1], b'B');

    for seed in [1u64, 999_999_999, 123_456_789, u64::from(u32::MAX)] {
        assert!(suffix_is_valid(&random_suffix(seed)));
    }
}

#[test]
fn test_random_name_shape() {
    let name = random_name();
    assert!(name.starts_with("/wl_shm-"));
    assert_eq!(name.len(), "/wl_shm-".len() + 6);
    assert!(suffix_is_valid(name["/wl_shm-".len()..].as_bytes()));
}

#[test]
fn test_allocate_exact_size() -> anyhow::Result<()> {
    for size in [1usize, 4096, 640 * 480 * 4] {
        let file = allocate_shm_file(size)?;
        assert_eq!(file.metadata()?.len(), size as u64);
    }
    Ok(())
}

#[test]
fn test_allocate_zero_size_is_rejected() {
    assert!(matches!(allocate_shm_file(0), Err(ShmError::EmptySize)));
}

#[test]
fn test_created_object_is_unlinked() -> anyhow::Result<()> {
    let name = format!("/wlcheck-unlink-{}", std::process::id());
    let _file = create_shm_file_with(|| name.clone())?;

    // The name is free again, so an exclusive create succeeds.
    let again = create_shm_file_with(|| name.clone())?;
    drop(again);
    Ok(())
}

#[test]
fn test_persistent_collision_exhausts_after_limit() {
    let held = HeldName::new("exhaust");
    let calls = AtomicUsize::new(0);

    let result = create_shm_file_with(|| {
        calls.fetch_add(1, Ordering::SeqCst);
        held.name.clone()
    });

    match result {
        Err(ShmError::NamesExhausted { attempts }) => assert_eq!(attempts, MAX_NAME_ATTEMPTS),
        other => panic!("expected exhaustion, got {:?}", other.map(|_| ())),
    }
    assert_eq!(calls.load(Ordering::SeqCst), MAX_NAME_ATTEMPTS);
}

#[test]
fn test_collision_then_free_name_succeeds() -> anyhow::Result<()> {
    let held = HeldName::new("collide");
    let fresh = format!("/wlcheck-fresh-{}", std::process::id());
    let mut calls = 0;

    let _file = create_shm_file_with(|| {
        calls += 1;
        if calls < 3 {
            held.name.clone()
        } else {
            fresh.clone()
        }
    })?;

    assert_eq!(calls, 3);
    Ok(())
}

#[test]
fn test_invalid_name_is_not_retried() {
    let mut calls = 0;
    let result = create_shm_file_with(|| {
        calls += 1;
        "/bad\0name".to_string()
    });
    assert!(matches!(result, Err(ShmError::Open { .. })));
    assert_eq!(calls, 1);
}
