//! The `logger` module configures `env_logger` for atsshd.
//!
//! The installed global logger is a shim over a replaceable `env_logger`
//! instance, so the `setup_*` functions may be called more than once (tests do).

use {
    env_logger::{Builder, Env, Target},
    log::{info, Log},
    parking_lot::{Mutex, RwLock},
    std::{
        fs::{File, OpenOptions},
        io::{self, Write},
        path::{Path, PathBuf},
        sync::{Arc, LazyLock},
    },
};

static LOGGER: LazyLock<RwLock<env_logger::Logger>> =
    LazyLock::new(|| RwLock::new(env_logger::Logger::from_default_env()));

pub const DEFAULT_FILTER: &str = "atsshd=info,atsshd_honeypot=info,atsshd_retaliation=info";

struct LoggerShim;

impl Log for LoggerShim {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        LOGGER.read().enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        LOGGER.read().log(record);
    }

    fn flush(&self) {
        LOGGER.read().flush();
    }
}

fn replace_logger(logger: env_logger::Logger) {
    log::set_max_level(logger.filter());
    *LOGGER.write() = logger;
    let _ = log::set_boxed_logger(Box::new(LoggerShim));
}

fn builder(filter: &str) -> Builder {
    let mut builder = Builder::from_env(Env::new().default_filter_or(filter));
    builder.format_timestamp_micros();
    builder
}

/// Log to stderr, using `RUST_LOG` if set and `filter` otherwise.
pub fn setup_with_default(filter: &str) {
    replace_logger(builder(filter).build());
}

/// Log to stderr with [`DEFAULT_FILTER`].
pub fn setup() {
    setup_with_default(DEFAULT_FILTER);
}

/// An append-mode log file that can be reopened in place after rotation.
#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl LogFile {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_append(&path)?;
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Swap in a fresh handle for `path`, creating the file if it was moved away.
    pub fn reopen(&self) -> io::Result<()> {
        let file = open_append(&self.path)?;
        *self.file.lock() = file;
        Ok(())
    }

    fn tee(&self) -> TeeWriter {
        TeeWriter { file: self.clone() }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Writes every record to the log file and to stderr.
struct TeeWriter {
    file: LogFile,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.file.lock().write_all(buf)?;
        io::stderr().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.file.lock().flush()?;
        io::stderr().flush()
    }
}

/// Log to both `logfile` and stderr.  On unix, `SIGUSR1` reopens the file so
/// external rotation works.
pub fn setup_file_with_default(logfile: impl AsRef<Path>, filter: &str) -> io::Result<LogFile> {
    let log_file = LogFile::open(logfile)?;

    let mut builder = builder(filter);
    builder.target(Target::Pipe(Box::new(log_file.tee())));
    replace_logger(builder.build());

    #[cfg(unix)]
    reopen_on_sigusr1(log_file.clone())?;

    info!("Logging output to: {}", log_file.path().display());
    Ok(log_file)
}

#[cfg(unix)]
fn reopen_on_sigusr1(log_file: LogFile) -> io::Result<()> {
    use signal_hook::{consts::SIGUSR1, iterator::Signals};

    let mut signals = Signals::new([SIGUSR1])?;
    std::thread::Builder::new()
        .name("atsshdLogReopen".to_string())
        .spawn(move || {
            for _ in signals.forever() {
                match log_file.reopen() {
                    Ok(()) => info!("reopened {}", log_file.path().display()),
                    Err(e) => eprintln!("unable to reopen {}: {}", log_file.path().display(), e),
                }
            }
        })?;
    Ok(())
}
