//! Export of tracing spans to an OpenTelemetry collector.
use opentelemetry::{KeyValue, trace::TraceError};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::Tracer};
use tracing::level_filters::LevelFilter;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::{Builder, Filtered, ParseError},
    registry::LookupSpan,
};

/// Variable holding the filter directives of exported spans.
pub(super) const OTEL_LEVEL_VAR: &str = "OTEL_LEVEL";

pub struct OtelOptions<'a> {
    /// Address of the OTLP collector.
    pub endpoint: &'a str,
    /// Reported as `service.namespace` on every span.
    pub namespace: String,
}

pub(super) type OtelLayer<S> = Filtered<OpenTelemetryLayer<S, Tracer>, EnvFilter, S>;

fn resource(namespace: String, service_name: &str) -> Resource {
    Resource::new([
        KeyValue::new("service.name", service_name.to_owned()),
        KeyValue::new("service.namespace", namespace),
    ])
}

fn filter_builder() -> Builder {
    EnvFilter::builder().with_default_directive(LevelFilter::INFO.into())
}

/// Spans at `info` and above are exported unless `directives` say otherwise.
/// Invalid directives are returned alongside the default filter.
fn span_filter(directives: Option<&str>) -> (EnvFilter, Option<ParseError>) {
    match directives.map(|directives| filter_builder().parse(directives)) {
        Some(Ok(filter)) => (filter, None),
        Some(Err(e)) => (filter_builder().parse_lossy(""), Some(e)),
        None => (filter_builder().parse_lossy(""), None),
    }
}

/// Builds a layer sending spans to the collector in batches, filtered by the
/// directives in `OTEL_LEVEL`. Invalid directives are returned for the caller
/// to report once logging is in place.
/// Must be called from inside a tokio runtime.
pub(super) fn otel_layer<S>(
    options: OtelOptions,
    service_name: &str,
) -> Result<(OtelLayer<S>, Option<ParseError>), TraceError>
where
    S: tracing::Subscriber,
    for<'span> S: LookupSpan<'span>,
{
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(options.endpoint);
    let config = opentelemetry_sdk::trace::Config::default()
        .with_resource(resource(options.namespace, service_name));

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_trace_config(config)
        .with_exporter(exporter)
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    let directives = std::env::var(OTEL_LEVEL_VAR).ok();
    let (filter, filter_error) = span_filter(directives.as_deref());
    let layer = tracing_opentelemetry::layer()
        .with_tracer(tracer)
        .with_filter(filter);
    Ok((layer, filter_error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_span_filter() {
        let (filter, error) = span_filter(None);
        assert!(error.is_none());
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn valid_span_filter() {
        let (filter, error) = span_filter(Some("debug"));
        assert!(error.is_none());
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn invalid_span_filter_is_returned() {
        let (filter, error) = span_filter(Some("seed_classifier=loud"));
        assert!(error.is_some());
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }
}
