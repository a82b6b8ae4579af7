use super::otel_layer::{OTEL_LEVEL_VAR, OtelOptions, otel_layer};
use opentelemetry::{global::Error, trace::TraceError};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, filter::ParseError, layer::SubscriberExt};

pub struct TracerOptions<'a> {
    pub otel_options: Option<OtelOptions<'a>>,
    pub stdout_level: LevelFilter,
}

impl<'a> TracerOptions<'a> {
    pub fn new(otel_endpoint: Option<&'a str>, otel_namespace: String) -> Self {
        Self {
            otel_options: otel_endpoint.map(|endpoint| OtelOptions {
                endpoint,
                namespace: otel_namespace,
            }),
            stdout_level: LevelFilter::INFO,
        }
    }
}

/// Owns the global subscriber, given a TracerOptions struct.
/// If TracerOptions contains an OtelOptions struct then spans are also
/// exported through OpenTelemetry, until the engine is dropped.
/// Log lines go to stderr so that the standard output stays free for the component.
pub struct TracerEngine {
    use_otel: bool,
    otel_setup_error: Option<TraceError>,
    otel_filter_error: Option<ParseError>,
}

impl TracerEngine {
    /// Installs the global subscriber. Use the `init_tracer!` macro rather than calling this directly.
    pub fn new(options: TracerOptions, service_name: &str) -> Self {
        let stdout_filter = EnvFilter::builder()
            .with_default_directive(options.stdout_level.into())
            .from_env_lossy();
        let stdout_tracer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(stdout_filter);

        let (otel, otel_setup_error, otel_filter_error) = match options
            .otel_options
            .map(|otel_options| otel_layer(otel_options, service_name))
        {
            Some(Ok((layer, filter_error))) => (Some(layer), None, filter_error),
            Some(Err(e)) => (None, Some(e), None),
            None => (None, None, None),
        };
        let use_otel = otel.is_some();

        let subscriber = tracing_subscriber::registry()
            .with(stdout_tracer)
            .with(otel);

        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("Tracing subscriber already set: {e}");
        }

        Self {
            use_otel,
            otel_setup_error,
            otel_filter_error,
        }
    }

    pub fn use_otel(&self) -> bool {
        self.use_otel
    }

    pub fn get_otel_setup_error(&self) -> Option<&TraceError> {
        self.otel_setup_error.as_ref()
    }

    /// Describes invalid span filter directives, which were replaced by the default level.
    pub fn get_otel_filter_warning(&self) -> Option<String> {
        self.otel_filter_error
            .as_ref()
            .map(|e| format!("Invalid directive(s) in {OTEL_LEVEL_VAR}: {e}"))
    }

    pub fn set_otel_error_handler<F>(&self, f: F) -> Result<(), Error>
    where
        F: Fn(Error) + Send + Sync + 'static,
    {
        opentelemetry::global::set_error_handler(f)
    }
}

impl Drop for TracerEngine {
    fn drop(&mut self) {
        if self.use_otel {
            opentelemetry::global::shutdown_tracer_provider();
        }
    }
}
