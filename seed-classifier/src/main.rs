mod parameters;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use parameters::Mode;
use seed_classifier::{
    classifier::{ClassifierConfig, DEFAULT_ETA_PT_THRESHOLD},
    output::build_document,
    processing::{Progress, process_files},
    source::{count_events, expand_inputs},
};
use seed_validation_common::{
    DEFAULT_PROGRESS_INTERVAL, Real,
    init_tracer,
    metrics::{
        component_info_metric,
        failures::{self, FailureKind},
        metric_names::{
            DUPLICATES_SUPPRESSED, EVENTS_PROCESSED, FAILURES, FILES_READ, MATCHES_FILED,
            MATCHES_REJECTED,
        },
    },
    tracer::TracerOptions,
};
use std::{net::SocketAddr, path::PathBuf};
use tracing::info;

// cargo run --bin seed-classifier -- --input 'ntuples/*.jsonl' --eta-bands driven-fraction

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Event files in JSON Lines format, as glob patterns. Files are read in the given order.
    #[clap(long, env, required = true, num_args = 1..)]
    input: Vec<String>,

    /// Path of the JSON histogram document.
    #[clap(long, env, default_value = "seed_histograms.json")]
    output: PathBuf,

    /// Also break the total transverse momentum down by |eta| band.
    #[clap(long, env)]
    eta_bands: bool,

    /// Pseudorapidity histograms are only filled above this transverse momentum, in GeV.
    #[clap(long, env, default_value_t = DEFAULT_ETA_PT_THRESHOLD)]
    eta_pt_threshold: Real,

    /// Names of the seeding steps, indexed by algorithm code.
    #[clap(long, env, value_delimiter = ',')]
    algorithm_names: Option<Vec<String>>,

    /// Number of events between progress records.
    #[clap(long, env, default_value_t = DEFAULT_PROGRESS_INTERVAL)]
    progress_interval: usize,

    /// Read the inputs once beforehand so that progress records show the total.
    #[clap(long, env)]
    count_events: bool,

    /// Number of files processed in parallel. With one, the files are read as a single chain.
    #[clap(long, env, default_value_t = 1)]
    threads: usize,

    /// If set, then open-telemetry data is sent to the URL specified, otherwise the standard tracing subscriber is used
    #[clap(long, env)]
    otel_endpoint: Option<String>,

    /// All OpenTelemetry spans are emitted with this as the "service.namespace" property.
    #[clap(long, env, default_value = "")]
    otel_namespace: String,

    /// If set, run metrics are served in the Prometheus format on this address.
    #[clap(long, env)]
    observability_address: Option<SocketAddr>,

    #[command(subcommand)]
    mode: Mode,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let tracer_options =
        TracerOptions::new(args.otel_endpoint.as_deref(), args.otel_namespace.clone());
    let _tracer = init_tracer!(tracer_options);

    if let Some(address) = args.observability_address {
        PrometheusBuilder::new()
            .with_http_listener(address)
            .install()?;
    }

    // Metrics
    metrics::describe_counter!(
        FILES_READ,
        metrics::Unit::Count,
        "Number of event files opened"
    );
    metrics::describe_counter!(
        EVENTS_PROCESSED,
        metrics::Unit::Count,
        "Number of events classified"
    );
    metrics::describe_counter!(
        MATCHES_FILED,
        metrics::Unit::Count,
        "Number of simulated electrons filed"
    );
    metrics::describe_counter!(
        DUPLICATES_SUPPRESSED,
        metrics::Unit::Count,
        "Number of tracks whose electron was already filed in the same event"
    );
    metrics::describe_counter!(
        MATCHES_REJECTED,
        metrics::Unit::Count,
        "Number of candidates rejected by the matching policy"
    );
    metrics::describe_counter!(
        FAILURES,
        metrics::Unit::Count,
        "Number of failures encountered"
    );
    component_info_metric(env!("CARGO_BIN_NAME"));

    let mut config = ClassifierConfig::new(args.mode.policy())
        .with_eta_bands(args.eta_bands)
        .with_eta_pt_threshold(args.eta_pt_threshold);
    if let Some(algorithm_names) = args.algorithm_names.clone() {
        config = config.with_algorithm_names(algorithm_names);
    }

    let inputs = expand_inputs(&args.input)?;
    let total = if args.count_events {
        Some(count_events(&inputs)?)
    } else {
        None
    };
    let progress = Progress::new(args.progress_interval, total);

    let (classifier, summary) = tokio::task::spawn_blocking({
        let inputs = inputs.clone();
        let threads = args.threads;
        move || process_files(inputs, &config, &progress, threads)
    })
    .await??;
    info!(
        events = summary.events,
        filed = summary.matches.filed,
        duplicates = summary.matches.duplicates,
        rejected = summary.matches.rejected,
        "Run complete"
    );

    let document = build_document(&classifier, &summary, &inputs, Utc::now())?;
    document.log_shares();
    document.write_to_file(&args.output).inspect_err(|_| {
        counter!(FAILURES, &[failures::get_label(FailureKind::FileWriteFailed)]).increment(1);
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seed_classifier::classifier::MatchingPolicy;

    #[test]
    fn parse_efficiency() {
        let cli = Cli::try_parse_from([
            "seed-classifier",
            "--input",
            "a.jsonl",
            "b/*.jsonl",
            "--eta-bands",
            "efficiency",
            "--max-abs-eta",
            "2.4",
        ])
        .expect("valid arguments");
        assert_eq!(cli.input, vec!["a.jsonl", "b/*.jsonl"]);
        assert!(cli.eta_bands);
        assert_eq!(cli.threads, 1);
        assert_eq!(cli.output, PathBuf::from("seed_histograms.json"));
        assert_eq!(
            cli.mode.policy(),
            MatchingPolicy::Efficiency { max_abs_eta: 2.4 }
        );
    }

    #[test]
    fn parse_algorithm_names() {
        let cli = Cli::try_parse_from([
            "seed-classifier",
            "--input",
            "a.jsonl",
            "--algorithm-names",
            "first,second",
            "--threads",
            "4",
            "seed-type",
        ])
        .expect("valid arguments");
        assert_eq!(
            cli.algorithm_names,
            Some(vec!["first".to_owned(), "second".to_owned()])
        );
        assert_eq!(cli.threads, 4);
        assert_eq!(cli.mode.policy(), MatchingPolicy::SeedType);
    }

    #[test]
    fn input_is_required() {
        assert!(Cli::try_parse_from(["seed-classifier", "driven-fraction"]).is_err());
    }
}
