mod otel_layer;
mod tracer_engine;

pub use otel_layer::OtelOptions;
pub use tracer_engine::{TracerEngine, TracerOptions};

/// Should be called at the start of each component, from inside a tokio runtime
/// if an OpenTelemetry endpoint is given.
/// Any problem setting up OpenTelemetry is reported as a warning once the
/// stdout subscriber is in place, and the component carries on without it.
#[macro_export]
macro_rules! init_tracer {
    ($options:expr) => {{
        let tracer = $crate::tracer::TracerEngine::new($options, env!("CARGO_BIN_NAME"));
        // This is called here (in the macro) rather than as part of `TracerEngine::new`
        // to ensure the warning is emitted in the correct module.
        if let Some(e) = tracer.get_otel_setup_error() {
            tracing::warn!("{e}");
        } else if tracer.use_otel() {
            if let Some(warning) = tracer.get_otel_filter_warning() {
                tracing::warn!("{warning}");
            }
            if let Err(e) = tracer.set_otel_error_handler(|e| tracing::warn!("{e}")) {
                tracing::warn!("{e}");
            }
        }
        tracer
    }};
}
