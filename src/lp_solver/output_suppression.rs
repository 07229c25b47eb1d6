//! Silencing of solver console output
//!
//! Native solver libraries print banners and progress straight to the process
//! stdout/stderr, which would interleave with our own logging. The `gag` crate
//! can redirect a stream only once at a time per process, so redirections are
//! shared: every [`QuietSolve`] alive at the same moment holds the same `Gag`
//! through an `Arc`, and the stream is restored when the last one is dropped.

use gag::Gag;
use std::io;
use std::sync::{Arc, Mutex, Weak};

/// Shared ownership of one stream redirection
pub struct GagHandle {
    _gag: Arc<Gag>,
}

impl GagHandle {
    /// Share (or start) the redirection of stdout
    pub fn stdout() -> io::Result<Self> {
        STDOUT.acquire()
    }

    /// Share (or start) the redirection of stderr
    pub fn stderr() -> io::Result<Self> {
        STDERR.acquire()
    }
}

/// Lazily created, weakly held redirection of a single stream
struct SharedGag {
    current: Mutex<Weak<Gag>>,
    open: fn() -> io::Result<Gag>,
}

impl SharedGag {
    const fn new(open: fn() -> io::Result<Gag>) -> Self {
        Self {
            current: Mutex::new(Weak::new()),
            open,
        }
    }

    fn acquire(&self) -> io::Result<GagHandle> {
        // A poisoned lock only means another thread panicked while holding a
        // handle; the weak pointer inside is still usable.
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(gag) = current.upgrade() {
            return Ok(GagHandle { _gag: gag });
        }

        let gag = Arc::new((self.open)()?);
        *current = Arc::downgrade(&gag);
        Ok(GagHandle { _gag: gag })
    }
}

static STDOUT: SharedGag = SharedGag::new(Gag::stdout);
static STDERR: SharedGag = SharedGag::new(Gag::stderr);

/// Guard silencing solver output for the duration of one solve
///
/// Failing to redirect a stream is not an error: the solve proceeds and the
/// solver simply stays chatty.
pub struct QuietSolve {
    _stdout: Option<GagHandle>,
    _stderr: Option<GagHandle>,
}

impl QuietSolve {
    /// Silence stdout and stderr unless `verbose` is set
    pub fn new(verbose: bool) -> Self {
        if verbose {
            return Self {
                _stdout: None,
                _stderr: None,
            };
        }

        let stdout = GagHandle::stdout()
            .inspect_err(|err| tracing::debug!("solver stdout left attached: {err}"))
            .ok();
        let stderr = GagHandle::stderr()
            .inspect_err(|err| tracing::debug!("solver stderr left attached: {err}"))
            .ok();
        Self {
            _stdout: stdout,
            _stderr: stderr,
        }
    }

    pub fn is_silencing(&self) -> bool {
        self._stdout.is_some() || self._stderr.is_some()
    }
}
