//! Инициализация `tracing`: человекочитаемый вывод или JSON строки в stderr.
//! stdout остаётся за командами CLI.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Instant;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// One JSON log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredLogEntry {
    /// RFC 3339
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ExecutionContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub app_version: String,
    pub pid: u32,
    pub thread: String,
}

impl ExecutionContext {
    fn current() -> Self {
        let thread = std::thread::current();
        Self {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            pid: std::process::id(),
            thread: thread
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{:?}", thread.id())),
        }
    }
}

/// Layer that serialises every event as a [`StructuredLogEntry`].
struct JsonLinesLayer {
    include_context: bool,
}

impl<S> Layer<S> for JsonLinesLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let meta = event.metadata();
        let entry = fields.into_entry(*meta.level(), meta.target(), self.include_context);

        if let Ok(line) = serde_json::to_string(&entry) {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "{}", line);
        }
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    fields: BTreeMap<String, Value>,
}

impl FieldCollector {
    fn put(&mut self, field: &Field, value: Value) {
        match (field.name(), value) {
            ("message", Value::String(text)) => self.message = Some(text),
            (name, value) => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }

    fn into_entry(mut self, level: Level, target: &str, include_context: bool) -> StructuredLogEntry {
        let duration_ms = self.fields.remove("duration_ms").and_then(|v| v.as_u64());

        StructuredLogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level: level.as_str().to_string(),
            target: target.to_string(),
            message: self.message.unwrap_or_default(),
            fields: self.fields,
            context: include_context.then(ExecutionContext::current),
            duration_ms,
        }
    }
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.into());
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub json_output: bool,
    /// ANSI colours, text mode only
    pub color_output: bool,
    /// Attach pid/thread/version to JSON lines
    pub include_context: bool,
    pub include_line_numbers: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_output: false,
            color_output: true,
            include_context: true,
            include_line_numbers: cfg!(debug_assertions),
        }
    }
}

impl LoggingConfig {
    /// Уровень из строки конфигурации, неизвестное значение даёт `INFO`
    pub fn with_level_str(mut self, level: &str) -> Self {
        self.level = level.trim().parse().unwrap_or(Level::INFO);
        self
    }

    pub fn with_json(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `config.level`.
/// Fails if a global subscriber is already set.
pub fn init_structured_logging(config: LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_lowercase()));

    let json = config.json_output.then(|| JsonLinesLayer {
        include_context: config.include_context,
    });
    let text = (!config.json_output).then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_ansi(config.color_output)
            .with_line_number(config.include_line_numbers)
            .with_span_events(FmtSpan::CLOSE)
    });

    let subscriber = Registry::default().with(filter).with(json).with(text);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Measures one named operation and logs its duration when finished.
pub struct OperationTimer {
    name: String,
    started: Instant,
    fields: BTreeMap<String, Value>,
}

impl OperationTimer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: Instant::now(),
            fields: BTreeMap::new(),
        }
    }

    pub fn add_field(&mut self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(value) = serde_json::to_value(value) {
            self.fields.insert(key.into(), value);
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn finish(self) {
        self.finish_with_result::<(), String>(&Ok(()));
    }

    pub fn finish_with_result<T, E: std::fmt::Display>(self, result: &Result<T, E>) {
        let duration_ms = self.elapsed_ms();
        let fields = Value::Object(self.fields.into_iter().collect());

        match result {
            Ok(_) => tracing::debug!(
                operation = %self.name,
                duration_ms,
                success = true,
                fields = %fields,
                "operation completed"
            ),
            Err(e) => tracing::warn!(
                operation = %self.name,
                duration_ms,
                success = false,
                error = %e,
                fields = %fields,
                "operation failed"
            ),
        }
    }
}
