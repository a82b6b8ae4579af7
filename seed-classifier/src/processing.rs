use crate::{
    classifier::{Classifier, ClassifierConfig, ClassifierError, EventSummary},
    source::{EventChain, EventLocation, EventReader, EventRecord, SourceError},
};
use metrics::counter;
use rayon::prelude::*;
use seed_validation_common::metrics::{
    failures::{self, FailureKind},
    matches_filed,
    metric_names::{DUPLICATES_SUPPRESSED, EVENTS_PROCESSED, FAILURES, MATCHES_FILED, MATCHES_REJECTED},
};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, info_span, instrument};

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("{0}")]
    Source(#[from] SourceError),
    #[error("{source} in event at {location}")]
    Classifier {
        location: EventLocation,
        source: ClassifierError,
    },
    #[error("Invalid classifier configuration: {0}")]
    Setup(ClassifierError),
    #[error("{0}")]
    Merge(ClassifierError),
    #[error("Cannot build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Logs the number of events processed every `interval` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub interval: usize,
    /// Number of events in the whole run, if known.
    pub total: Option<usize>,
}

impl Progress {
    pub fn new(interval: usize, total: Option<usize>) -> Self {
        Self { interval, total }
    }

    /// Never reports.
    pub fn disabled() -> Self {
        Self::new(0, None)
    }

    /// Whether event number `index` (zero-based) triggers a progress record.
    pub fn is_due(&self, index: usize) -> bool {
        self.interval != 0 && index % self.interval == 0
    }

    fn report(&self, index: usize) {
        if self.is_due(index) {
            match self.total {
                Some(total) => info!("{index} / {total}"),
                None => info!("{index} events"),
            }
        }
    }
}

/// Totals over a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub events: usize,
    pub matches: EventSummary,
}

fn record_failure(kind: FailureKind) {
    counter!(FAILURES, &[failures::get_label(kind)]).increment(1);
}

fn record_source_failure(error: &SourceError) {
    record_failure(match error {
        SourceError::Decode { .. } => FailureKind::UnableToDecodeEvent,
        _ => FailureKind::FileReadFailed,
    });
}

/// Feeds every event to the classifier, in order, stopping at the first error.
#[instrument(skip_all, fields(policy = %classifier.config().policy.kind()))]
pub fn process_events<I>(
    events: I,
    classifier: &mut Classifier,
    progress: &Progress,
) -> Result<RunSummary, ProcessingError>
where
    I: IntoIterator<Item = Result<EventRecord, SourceError>>,
{
    let policy_label = matches_filed::get_label(classifier.config().policy.kind());
    let mut summary = RunSummary::default();

    for (index, record) in events.into_iter().enumerate() {
        progress.report(index);
        let record = record.inspect_err(record_source_failure)?;
        let matches = classifier.process_event(&record.event).map_err(|source| {
            record_failure(FailureKind::InputContractViolation);
            ProcessingError::Classifier {
                location: record.location.clone(),
                source,
            }
        })?;

        counter!(EVENTS_PROCESSED).increment(1);
        counter!(MATCHES_FILED, &[policy_label.clone()]).increment(matches.filed as u64);
        counter!(DUPLICATES_SUPPRESSED).increment(matches.duplicates as u64);
        counter!(MATCHES_REJECTED).increment(matches.rejected as u64);

        summary.events += 1;
        summary.matches += matches;
    }
    Ok(summary)
}

/// Classifies the events of all the files.
///
/// With one thread the files are read as one chain in a single pass.
/// With more, each worker classifies whole files into its own histograms,
/// which are merged in file order once all are done. Progress is then
/// reported once per file rather than every `progress.interval` events.
#[instrument(skip_all, fields(files = paths.len(), threads = threads))]
pub fn process_files(
    paths: Vec<PathBuf>,
    config: &ClassifierConfig,
    progress: &Progress,
    threads: usize,
) -> Result<(Classifier, RunSummary), ProcessingError> {
    let mut classifier = Classifier::new(config.clone()).map_err(ProcessingError::Setup)?;

    if threads <= 1 {
        let summary = process_events(EventChain::new(paths), &mut classifier, progress)?;
        return Ok((classifier, summary));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()?;
    let partials = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                info_span!("file", path = %path.display()).in_scope(|| {
                    let mut partial =
                        Classifier::new(config.clone()).map_err(ProcessingError::Setup)?;
                    let summary = process_events(
                        EventReader::open(path).inspect_err(record_source_failure)?,
                        &mut partial,
                        &Progress::disabled(),
                    )?;
                    info!("{}: {} events", path.display(), summary.events);
                    Ok::<_, ProcessingError>((partial, summary))
                })
            })
            .collect::<Result<Vec<_>, ProcessingError>>()
    })?;

    let mut summary = RunSummary::default();
    for (partial, partial_summary) in partials {
        classifier.merge(&partial).map_err(ProcessingError::Merge)?;
        summary.events += partial_summary.events;
        summary.matches += partial_summary.matches;
    }
    Ok((classifier, summary))
}
