//! Structured logging setup, grounded directly on the teacher's `script/src/lib/tracing.rs`:
//! an `EnvFilter` built from `RUST_LOG`, a pluggable plain/JSON formatting layer, and a
//! `std::sync::Once` guard so repeated calls (e.g. from tests) don't panic on double-init.
//! The teacher's SP1-zkVM-specific directive suppressions (`p3_*`, `sp1_cuda`) don't apply to a
//! node with no prover component, so they are dropped rather than carried forward unused.

use std::sync::Once;

use tracing_subscriber::{layer::Layer, layer::SubscriberExt, registry::Registry, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Plain,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Plain" | "plain" => Ok(Self::Plain),
            "Json" | "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

pub struct LoggingConfig {
    format: LogFormat,
    is_test: bool,
    with_thread_names: bool,
}

impl LoggingConfig {
    pub fn default_for_test() -> Self {
        Self {
            format: LogFormat::Plain,
            is_test: true,
            with_thread_names: false,
        }
    }

    pub fn use_format(mut self, value: LogFormat) -> Self {
        self.format = value;
        self
    }

    pub fn is_test(mut self, value: bool) -> Self {
        self.is_test = value;
        self
    }

    pub fn with_thread_names(mut self, value: bool) -> Self {
        self.with_thread_names = value;
        self
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Plain,
            is_test: false,
            with_thread_names: false,
        }
    }
}

pub fn setup_logger(config: LoggingConfig) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let fmt_layer = match config.format {
            LogFormat::Json => json_subscriber::layer()
                .with_target(true)
                .with_thread_names(config.with_thread_names)
                .with_current_span(false)
                .with_span_list(false)
                .flatten_span_list_on_top_level(true)
                .flatten_event(true)
                .boxed(),
            LogFormat::Plain => tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_thread_names(config.with_thread_names)
                .boxed(),
        };

        let test_layer = if config.is_test {
            Some(tracing_subscriber::fmt::layer().compact().with_test_writer())
        } else {
            None
        };

        let registry = Registry::default().with(env_filter).with(fmt_layer).with(test_layer);
        registry.init();
    });
}
