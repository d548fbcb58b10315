use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

use config::LoadConfigError;
use config::shared::ValidationError;
use shift::error::ShiftError;

/// Exit code of configuration errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;

/// Exit code of failed shifts.
pub const EXIT_SHIFT_ERROR: u8 = 2;

/// Exit code of i/o errors, including a missing configuration file.
pub const EXIT_IO_ERROR: u8 = 7;

/// Returns whether terminal output should include backtraces.
fn should_render_backtrace() -> bool {
    matches!(
        std::env::var("RUST_BACKTRACE").as_deref(),
        Ok("1") | Ok("full")
    )
}

pub type DshiftResult<T> = Result<T, DshiftError>;

/// Captured backtrace wrapper to avoid thiserror's unstable feature detection.
pub struct CapturedBacktrace(Backtrace);

impl CapturedBacktrace {
    fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type of the dshift binary.
#[derive(Debug)]
pub enum DshiftError {
    /// A shift failed.
    Shift(ShiftError),
    /// The configuration can't be loaded or is invalid.
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    /// I/O error.
    Io(std::io::Error, CapturedBacktrace),
}

impl DshiftError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            DshiftError::Shift(err) if err.kind().is_configuration() => "configuration error",
            DshiftError::Shift(_) => "shift error",
            DshiftError::Config(_, _) => "configuration error",
            DshiftError::Io(_, _) => "i/o error",
        }
    }

    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            DshiftError::Shift(err) if err.kind().is_configuration() => EXIT_CONFIG_ERROR,
            DshiftError::Shift(_) => EXIT_SHIFT_ERROR,
            DshiftError::Config(_, _) => EXIT_CONFIG_ERROR,
            DshiftError::Io(_, _) => EXIT_IO_ERROR,
        }
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            DshiftError::Shift(err) => Some(err.backtrace()),
            DshiftError::Config(_, cb) => Some(&cb.0),
            DshiftError::Io(_, cb) => Some(&cb.0),
        }
    }

    /// Creates a configuration error from any source.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        DshiftError::Config(Box::new(err), CapturedBacktrace::capture())
    }

    /// Returns a user-oriented report for terminal output.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("dshift failed\n");
        out.push_str(&format!("category: {}\n", self.category()));
        out.push_str(&format!("error: {self}\n"));

        let mut source = Error::source(self);
        let mut idx = 1usize;
        while let Some(err) = source {
            out.push_str(&format!("cause {idx}: {err}\n"));
            source = err.source();
            idx += 1;
        }

        if should_render_backtrace()
            && let Some(backtrace) = self.backtrace()
        {
            out.push_str("backtrace:\n");
            out.push_str(&backtrace.to_string());
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }

        out
    }
}

impl fmt::Display for DshiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DshiftError::Shift(err) => write!(f, "{err}"),
            DshiftError::Config(source, _) => write!(f, "configuration error: {source}"),
            DshiftError::Io(source, _) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for DshiftError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DshiftError::Shift(err) => err.source(),
            DshiftError::Config(source, _) => Some(source.as_ref()),
            DshiftError::Io(source, _) => Some(source),
        }
    }
}

impl From<LoadConfigError> for DshiftError {
    /// A missing file is reported as an i/o error, every other loading failure as a
    /// configuration error.
    fn from(err: LoadConfigError) -> Self {
        match err {
            LoadConfigError::MissingFile(path) => DshiftError::Io(
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("configuration file `{}` does not exist", path.display()),
                ),
                CapturedBacktrace::capture(),
            ),
            err => DshiftError::config(err),
        }
    }
}

impl From<ValidationError> for DshiftError {
    fn from(err: ValidationError) -> Self {
        DshiftError::config(err)
    }
}

impl From<std::io::Error> for DshiftError {
    fn from(err: std::io::Error) -> Self {
        DshiftError::Io(err, CapturedBacktrace::capture())
    }
}

impl From<ShiftError> for DshiftError {
    fn from(err: ShiftError) -> Self {
        DshiftError::Shift(err)
    }
}
