use std::fmt;
use std::fmt::Write;
use std::path::PathBuf;

use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{format::FmtSpan, Layer as FmtLayer};
use tracing_subscriber::{prelude::*, registry::Registry, EnvFilter};

use super::app_config::config;
use super::error::Result;

pub mod prelude {
    pub use tracing::{debug, error, info, trace, warn};
    pub use tracing::{debug_span, error_span, info_span, trace_span, warn_span};
    pub use tracing::{event, field::Empty, instrument, span};
}

/// Keeps the background log writers alive, must be held in main until exit
pub struct LoggingGuard {
    _worker_guards: Vec<WorkerGuard>,
}

/// Install the global subscriber as described by the `logging` config section
pub fn setup() -> Result<LoggingGuard> {
    let cfg: LoggingConfig = config().get("logging")?;
    setup_with(cfg)
}

fn setup_with(cfg: LoggingConfig) -> Result<LoggingGuard> {
    let (term_writer, term_guard) = cfg.term.to_writer();
    let (file_writer, file_guard) = cfg.file.to_writer()?;

    Registry::default()
        .with(cfg.filter.to_env_filter())
        .with(
            FmtLayer::default()
                .with_ansi(cfg.term.enabled && cfg.term.ansi)
                .with_target(false)
                .with_span_events(span_events(&cfg.term.span_events))
                .with_timer(ISOTimeFormat)
                .with_writer(term_writer),
        )
        .with(
            FmtLayer::default()
                .with_ansi(false)
                .with_span_events(span_events(&cfg.file.span_events))
                .with_timer(ISOTimeFormat)
                .with_writer(file_writer),
        )
        .try_init()?;

    Ok(LoggingGuard {
        _worker_guards: vec![term_guard, file_guard],
    })
}

fn span_events(events: &[SpanEvent]) -> FmtSpan {
    events
        .iter()
        .fold(FmtSpan::NONE, |f, e| f | (*e).into())
}

fn non_blocking<W: std::io::Write + Send + Sync + 'static>(writer: W) -> (NonBlocking, WorkerGuard) {
    NonBlockingBuilder::default()
        .lossy(false)
        .finish(writer)
}

struct ISOTimeFormat;

impl FormatTime for ISOTimeFormat {
    fn format_time(&self, w: &mut dyn Write) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

// ====== Config to Layer ======

impl FilterConfig {
    fn to_env_filter(&self) -> EnvFilter {
        let filter = match &self.from_env {
            Some(env) => EnvFilter::from_env(env),
            None => EnvFilter::default(),
        };

        self.directives
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match s.parse() {
                Ok(d) => Some(d),
                Err(err) => {
                    eprintln!("ignoring log directive `{}`: {}", s, err);
                    None
                }
            })
            .fold(filter, |f, dir| f.add_directive(dir))
    }
}

impl TermOutput {
    /// a disabled terminal output still gets a writer, it just goes nowhere
    fn to_writer(&self) -> (NonBlocking, WorkerGuard) {
        match (self.enabled, &self.target) {
            (false, _) => non_blocking(std::io::sink()),
            (true, TermTarget::Stdout) => non_blocking(std::io::stdout()),
            (true, TermTarget::Stderr) => non_blocking(std::io::stderr()),
        }
    }
}

impl FileOutput {
    fn to_writer(&self) -> Result<(NonBlocking, WorkerGuard)> {
        if !self.enabled {
            return Ok(non_blocking(std::io::sink()));
        }
        std::fs::create_dir_all(&self.directory)?;
        Ok(non_blocking(RollingFileAppender::new(
            Rotation::NEVER,
            &self.directory,
            &self.name,
        )))
    }
}

impl From<SpanEvent> for FmtSpan {
    fn from(e: SpanEvent) -> Self {
        match e {
            SpanEvent::New => FmtSpan::NEW,
            SpanEvent::Enter => FmtSpan::ENTER,
            SpanEvent::Exit => FmtSpan::EXIT,
            SpanEvent::Close => FmtSpan::CLOSE,
            SpanEvent::Active => FmtSpan::ACTIVE,
            SpanEvent::Full => FmtSpan::FULL,
        }
    }
}

// ====== Logging Config ======

#[derive(Debug, serde::Deserialize)]
struct LoggingConfig {
    #[serde(default)]
    filter: FilterConfig,
    term: TermOutput,
    file: FileOutput,
}

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
struct FilterConfig {
    /// comma separated `EnvFilter` directives, applied on top of the env var
    directives: String,
    #[serde(deserialize_with = "deserialize_filter_from_env")]
    from_env: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct TermOutput {
    enabled: bool,
    target: TermTarget,
    #[serde(default)]
    ansi: bool,
    #[serde(default)]
    span_events: Vec<SpanEvent>,
}

#[derive(Debug, serde::Deserialize)]
struct FileOutput {
    enabled: bool,
    directory: PathBuf,
    name: PathBuf,
    #[serde(default)]
    span_events: Vec<SpanEvent>,
}

#[derive(Copy, Clone, Debug, serde::Deserialize)]
enum SpanEvent {
    New,
    Enter,
    Exit,
    Close,
    Active,
    Full,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum TermTarget {
    Stdout,
    Stderr,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            directives: "warn".into(),
            from_env: Some("RUST_LOG".into()),
        }
    }
}

// ====== serde helpers ======

/// Deserialize `false` to `None`, `true` to `Some("RUST_LOG")`, and string to `Some(xxx)`
fn deserialize_filter_from_env<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct VisitFromEnv;

    impl<'de> serde::de::Visitor<'de> for VisitFromEnv {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("bool or env var name")
        }

        fn visit_bool<E>(self, value: bool) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value {
                Ok(Some("RUST_LOG".into()))
            } else {
                Ok(None)
            }
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            // values coming from environment variables are always strings
            match value {
                "true" => Ok(Some("RUST_LOG".into())),
                "false" => Ok(None),
                _ => Ok(Some(value.to_owned())),
            }
        }
    }

    deserializer.deserialize_any(VisitFromEnv)
}
