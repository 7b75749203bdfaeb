use std::sync::{Arc, Mutex, PoisonError};

use chrono::Local;
use env_logger::{Env, Logger};
use log::{Log, Metadata, Record, SetLoggerError};

type Listener = Arc<dyn Fn(&str) + Send + Sync>;

/// Append-only record of everything the engine logged, for a control surface
/// to show instead of a console.
#[derive(Default)]
pub struct LogSink {
    lines: Mutex<Vec<String>>,
    listeners: Mutex<Vec<Listener>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, line: impl Into<String>) {
        let line = line.into();
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.clone());

        // Listeners run without any lock held
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(&line);
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `listener` with every line appended from now on.
    pub fn on_log_message(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink").field("lines", &self.len()).finish()
    }
}

/// Sends records through the `env_logger` filter to the sink, and to the
/// console too when asked.
struct SinkLogger {
    console: Logger,
    echo_console: bool,
    sink: Arc<LogSink>,
}

impl Log for SinkLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.console.matches(record) {
            return;
        }

        if self.echo_console {
            self.console.log(record);
        }
        self.sink.append(format_line(record));
    }

    fn flush(&self) {
        self.console.flush();
    }
}

fn format_line(record: &Record) -> String {
    format!(
        "{} {:<5} {}",
        Local::now().format("%H:%M:%S"),
        record.level(),
        record.args()
    )
}

/// Install the global logger. `RUST_LOG` picks the filter, `info` if unset.
/// Can only succeed once per process.
pub fn init(echo_console: bool) -> Result<Arc<LogSink>, SetLoggerError> {
    let console = env_logger::Builder::from_env(Env::default().default_filter_or("info")).build();
    let max_level = console.filter();
    let sink = Arc::new(LogSink::new());

    log::set_boxed_logger(Box::new(SinkLogger {
        console,
        echo_console,
        sink: sink.clone(),
    }))?;
    log::set_max_level(max_level);

    Ok(sink)
}
