use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command as StdCommand, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

static GLOBAL_CHILDREN: Lazy<ChildRegistry> = Lazy::new(ChildRegistry::new);

type SharedChild = Arc<Mutex<Child>>;

/// Children spawned by [`Command::run`] that have not been reaped yet.
///
/// Interrupt handling calls [`terminate_all`](Self::terminate_all) so an
/// external tool does not outlive the run that started it.
#[derive(Clone, Debug, Default)]
pub struct ChildRegistry {
    children: Arc<Mutex<Vec<SharedChild>>>,
}

impl ChildRegistry {
    pub fn new() -> Self { Self::default() }

    /// The registry every [`Command`] uses unless given another one.
    pub fn global() -> &'static ChildRegistry { &GLOBAL_CHILDREN }

    pub fn len(&self) -> usize { self.lock().len() }

    pub fn is_empty(&self) -> bool { self.lock().is_empty() }

    /// Kill every registered child, returning how many were signalled.
    pub fn terminate_all(&self) -> usize {
        let children: Vec<SharedChild> = self.lock().clone();
        let mut killed = 0;
        for child in children {
            let mut child = lock_child(&child);
            match child.kill() {
                Ok(()) => {
                    tracing::warn!(pid = child.id(), "terminated child process");
                    killed += 1;
                }
                Err(err) => tracing::debug!(pid = child.id(), %err, "child already exited"),
            }
        }
        killed
    }

    fn register(&self, child: SharedChild) { self.lock().push(child); }

    fn unregister(&self, child: &SharedChild) { self.lock().retain(|c| !Arc::ptr_eq(c, child)); }

    fn lock(&self) -> MutexGuard<'_, Vec<SharedChild>> {
        self.children.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn lock_child(child: &SharedChild) -> MutexGuard<'_, Child> {
    child.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Captured result of a finished child process.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

#[derive(Debug)]
pub struct Command {
    inner: StdCommand,
    program: String,
    timeout: Option<Duration>,
    registry: ChildRegistry,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        Self {
            inner: StdCommand::new(&program),
            program,
            timeout: None,
            registry: ChildRegistry::global().clone(),
        }
    }

    /// Run a resolved executable while keeping `name` for diagnostics.
    pub fn at(name: impl Into<String>, exe: &Path) -> Self {
        Self {
            inner: StdCommand::new(exe),
            program: name.into(),
            timeout: None,
            registry: ChildRegistry::global().clone(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.inner.arg(arg);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.inner.args(args);
        self
    }

    /// Kill the child and fail with [`Error::TimedOut`] once `limit` elapses.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Track the spawned child in `registry` instead of the global one.
    pub fn registry(mut self, registry: &ChildRegistry) -> Self {
        self.registry = registry.clone();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Spawn, capture both streams and wait, honouring the configured timeout.
    ///
    /// A non-zero exit status is not an error here; callers decide what the
    /// status means for their tool.
    pub fn run(mut self) -> Result<CommandOutput> {
        self.inner
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(cmd = %self.program, args = ?self.inner.get_args().collect::<Vec<_>>(), "spawning");
        let mut child = self.inner.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::CommandNotFound {
                cmd: self.program.clone(),
            },
            _ => Error::CommandFailed {
                cmd: self.program.clone(),
                source: e,
            },
        })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let child = Arc::new(Mutex::new(child));
        self.registry.register(Arc::clone(&child));
        let status = wait_with_deadline(&child, self.timeout, &self.program);
        self.registry.unregister(&child);
        let status = status?;

        Ok(CommandOutput {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(err) = reader.read_to_end(&mut buf) {
            tracing::debug!(%err, read = buf.len(), "child output stream ended with an error");
        }
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Poll `child` without holding its lock across sleeps, so a registry can
/// kill it concurrently.
fn wait_with_deadline(child: &SharedChild, limit: Option<Duration>, program: &str) -> Result<ExitStatus> {
    let started = Instant::now();
    loop {
        let mut guard = lock_child(child);
        match guard.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if limit.is_some_and(|limit| started.elapsed() >= limit) => {
                let _ = guard.kill();
                let _ = guard.wait();
                let limit = limit.unwrap_or_default();
                return Err(Error::TimedOut {
                    cmd: program.to_string(),
                    limit,
                });
            }
            Ok(None) => {
                drop(guard);
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(Error::CommandFailed {
                    cmd: program.to_string(),
                    source: e,
                });
            }
        }
    }
}
