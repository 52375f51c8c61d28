//! Process-wide output sink
//!
//! Routines that print their results (scaled data, cross-validation
//! reports) write through [`output`]. By default that is standard output;
//! a [`RedirectGuard`] points it at a file until the guard is dropped.
//! Redirections are serialized, so at most one is in flight at a time.
//! Writers that must not leak into another thread's redirection go through
//! [`with_exclusive_output`].

use crate::core::{Result, SVMError};
use log::{debug, warn};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

static SINK: Mutex<Option<BufWriter<File>>> = Mutex::new(None);
static REDIRECT_LOCK: Mutex<()> = Mutex::new(());
/// Thread holding the active redirection
static OWNER: Mutex<Option<ThreadId>> = Mutex::new(None);

/// Held by unit tests that inspect the sink, so parallel tests don't observe each other
#[cfg(test)]
pub(crate) fn test_serial() -> MutexGuard<'static, ()> {
    static SERIAL: Mutex<()> = Mutex::new(());
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

fn sink() -> MutexGuard<'static, Option<BufWriter<File>>> {
    SINK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle on the current output sink
#[derive(Debug, Clone, Copy, Default)]
pub struct Output;

/// The current output sink
pub fn output() -> Output {
    Output
}

fn owner() -> MutexGuard<'static, Option<ThreadId>> {
    OWNER.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run `f` on the output sink without interleaving with another thread's redirection
///
/// If the calling thread holds the active [`RedirectGuard`], `f` writes into
/// that file. Otherwise it waits until no redirection is in flight, so its
/// output goes to standard output.
pub fn with_exclusive_output<T>(f: impl FnOnce(&mut Output) -> T) -> T {
    let owned = *owner() == Some(thread::current().id());
    let _exclusive = (!owned).then(|| REDIRECT_LOCK.lock().unwrap_or_else(PoisonError::into_inner));
    f(&mut Output)
}

/// Whether output currently goes to a file
pub fn is_redirected() -> bool {
    sink().is_some()
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match sink().as_mut() {
            Some(file) => file.write(buf),
            None => io::stdout().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match sink().as_mut() {
            Some(file) => file.flush(),
            None => io::stdout().flush(),
        }
    }
}

/// Scoped redirection of the output sink to a file
///
/// Dropping the guard flushes and closes the file and restores standard
/// output, on every exit path including unwinding.
pub struct RedirectGuard {
    path: PathBuf,
    _exclusive: MutexGuard<'static, ()>,
}

impl RedirectGuard {
    /// Redirect output to `path`, truncating it
    ///
    /// Blocks while another redirection is active.
    pub fn to_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let exclusive = REDIRECT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

        let file = File::create(&path).map_err(|source| SVMError::OutputRedirect {
            path: path.clone(),
            source,
        })?;
        *sink() = Some(BufWriter::new(file));
        *owner() = Some(thread::current().id());
        debug!("output redirected to {}", path.display());

        Ok(Self {
            path,
            _exclusive: exclusive,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RedirectGuard {
    fn drop(&mut self) {
        *owner() = None;
        if let Some(mut file) = sink().take() {
            if let Err(e) = file.flush() {
                warn!("failed to flush {}: {e}", self.path.display());
            }
        }
        debug!("output restored to stdout");
    }
}
