//! Host mount primitives.
//!
//! The driver never calls `mount(2)` directly; it goes through a [`Mounter`]
//! so that tests can substitute an in-memory recorder.  [`SystemMounter`] is
//! the production implementation.

use std::ffi::OsString;
use std::io;
use std::os::unix::ffi::OsStringExt;
use std::path::{Path, PathBuf};

use nix::mount::{MntFlags, MsFlags};
use tracing::debug;

const MOUNTINFO_PATH: &str = "/proc/self/mountinfo";

/// The three OS-level operations the driver depends on.
///
/// Implementations are called from Tokio's blocking pool and may block.
pub trait Mounter: Send + Sync {
    /// Bind-mount `source` read-write at `target`.
    fn bind_mount(&self, source: &Path, target: &Path) -> io::Result<()>;

    /// Unmount whatever is mounted at `target`.
    fn unmount(&self, target: &Path) -> io::Result<()>;

    /// Return `true` if `path` is a mount point.
    fn is_mount_point(&self, path: &Path) -> io::Result<bool>;
}

/// [`Mounter`] backed by `mount(2)`, `umount2(2)` and
/// `/proc/self/mountinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMounter;

impl Mounter for SystemMounter {
    fn bind_mount(&self, source: &Path, target: &Path) -> io::Result<()> {
        debug!(source = %source.display(), target = %target.display(), "bind mount");
        nix::mount::mount(
            Some(source),
            target,
            None::<&str>,
            MsFlags::MS_BIND | MsFlags::MS_REC,
            None::<&str>,
        )?;
        Ok(())
    }

    fn unmount(&self, target: &Path) -> io::Result<()> {
        debug!(target = %target.display(), "unmount");
        nix::mount::umount2(target, MntFlags::empty())?;
        Ok(())
    }

    fn is_mount_point(&self, path: &Path) -> io::Result<bool> {
        // mountinfo lists resolved paths, so symlinks must be followed first.
        let path = path.canonicalize()?;
        let mountinfo = std::fs::read(MOUNTINFO_PATH)?;
        Ok(mount_points(&mountinfo).any(|mp| mp == path))
    }
}

/// Iterate over the mount points listed in a `mountinfo` document.
///
/// Line format (see `proc(5)`):
/// `<id> <parent> <major:minor> <root> <mount point> <options> ...`
///
/// Paths are raw bytes and need not be UTF-8.
fn mount_points(mountinfo: &[u8]) -> impl Iterator<Item = PathBuf> + '_ {
    mountinfo
        .split(|&b| b == b'\n')
        .filter_map(|line| {
            line.split(|b| b.is_ascii_whitespace())
                .filter(|field| !field.is_empty())
                .nth(4)
        })
        .map(unescape_octal)
}

/// Decode the `\ooo` escapes the kernel uses for space, tab, newline and
/// backslash in mountinfo paths.
fn unescape_octal(field: &[u8]) -> PathBuf {
    let mut out = Vec::with_capacity(field.len());
    let mut i = 0;
    while i < field.len() {
        if field[i] == b'\\'
            && i + 3 < field.len()
            && field[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let value = (field[i + 1] - b'0') as u32 * 64
                + (field[i + 2] - b'0') as u32 * 8
                + (field[i + 3] - b'0') as u32;
            if let Ok(b) = u8::try_from(value) {
                out.push(b);
                i += 4;
                continue;
            }
        }
        out.push(field[i]);
        i += 1;
    }
    PathBuf::from(OsString::from_vec(out))
}
