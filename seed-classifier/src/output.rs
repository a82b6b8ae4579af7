use crate::{
    binning::{ETA_BAND_COUNT, eta_band_label},
    classifier::{Classifier, MatchingPolicy, SeedHistograms},
    histogram::{Bin, HistogramError},
    processing::RunSummary,
};
use chrono::{DateTime, Utc};
use seed_validation_common::Real;
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("{0}")]
    Histogram(#[from] HistogramError),
    #[error("Cannot write {path}: {source}")]
    IO {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot encode histogram document: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    pub policy: String,
    pub ratio_kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_abs_eta: Option<Real>,
    pub eta_bands: bool,
    /// `|eta|` range of each `pt_all_eta_band_<k>` histogram, indexed by `k`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub eta_band_ranges: Vec<String>,
    pub eta_pt_threshold: Real,
    pub algorithm_names: Vec<String>,
    pub events: usize,
    pub filed: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub inputs: Vec<PathBuf>,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramRecord {
    pub name: String,
    pub entries: u64,
    pub underflow: Real,
    pub overflow: Real,
    pub integral: Real,
    pub bins: Vec<Bin>,
}

/// A category histogram divided bin by bin by its total. Undefined bins are `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioRecord {
    pub kind: String,
    pub numerator: String,
    pub denominator: String,
    pub bins: Vec<Bin>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareRecord {
    pub name: String,
    pub denominator: String,
    pub share: Real,
}

/// Everything a run produces, ready to be written out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramDocument {
    pub metadata: RunMetadata,
    pub histograms: Vec<HistogramRecord>,
    pub ratios: Vec<RatioRecord>,
    pub shares: Vec<ShareRecord>,
}

fn histogram_records(histograms: &SeedHistograms) -> Vec<HistogramRecord> {
    histograms
        .iter()
        .map(|histogram| HistogramRecord {
            name: histogram.name().to_owned(),
            entries: histogram.entries(),
            underflow: histogram.underflow(),
            overflow: histogram.overflow(),
            integral: histogram.integral(),
            bins: histogram.bins().collect(),
        })
        .collect()
}

pub fn build_document(
    classifier: &Classifier,
    summary: &RunSummary,
    inputs: &[PathBuf],
    created: DateTime<Utc>,
) -> Result<HistogramDocument, OutputError> {
    let config = classifier.config();
    let histograms = classifier.histograms();
    let ratio_kind = config.policy.ratio_kind().to_string();

    let mut ratios = Vec::new();
    let mut shares = Vec::new();
    for (family, total) in histograms.category_families() {
        for histogram in family.iter() {
            ratios.push(RatioRecord {
                kind: ratio_kind.clone(),
                numerator: histogram.name().to_owned(),
                denominator: total.name().to_owned(),
                bins: histogram.ratio(total)?,
            });
            shares.push(ShareRecord {
                name: histogram.name().to_owned(),
                denominator: total.name().to_owned(),
                share: histogram.share_of(total),
            });
        }
    }

    Ok(HistogramDocument {
        metadata: RunMetadata {
            policy: config.policy.kind().to_string(),
            ratio_kind,
            max_abs_eta: match config.policy {
                MatchingPolicy::Efficiency { max_abs_eta } => Some(max_abs_eta),
                _ => None,
            },
            eta_bands: config.eta_bands,
            eta_band_ranges: if config.eta_bands {
                (0..ETA_BAND_COUNT).filter_map(eta_band_label).collect()
            } else {
                Vec::new()
            },
            eta_pt_threshold: config.eta_pt_threshold,
            algorithm_names: config.algorithm_names.clone(),
            events: summary.events,
            filed: summary.matches.filed,
            duplicates: summary.matches.duplicates,
            rejected: summary.matches.rejected,
            inputs: inputs.to_vec(),
            created,
        },
        histograms: histogram_records(histograms),
        ratios,
        shares,
    })
}

impl HistogramDocument {
    /// Logs the share of each category, as a percentage of its total.
    pub fn log_shares(&self) {
        for share in &self.shares {
            if share.share.is_nan() {
                info!("{}: {} is empty", share.name, share.denominator);
            } else {
                info!("{}: {:.1}%", share.name, 100.0 * share.share);
            }
        }
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), OutputError> {
        Ok(serde_json::to_writer_pretty(writer, self)?)
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn write_to_file(&self, path: &Path) -> Result<(), OutputError> {
        let io_error = |source: std::io::Error| OutputError::IO {
            path: path.to_owned(),
            source,
        };
        let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
        self.to_writer(&mut writer)?;
        writer.flush().map_err(io_error)?;
        info!("Histograms written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classifier::ClassifierConfig,
        event::Event,
        kinematics::FourMomentum,
    };
    use assert_approx_eq::assert_approx_eq;
    use chrono::TimeZone;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn one_electron_run(policy: MatchingPolicy) -> (Classifier, RunSummary) {
        let mut event = Event::default();
        let vertex = event.push_vertex(Vec::new());
        let sim = event.push_sim(
            11,
            FourMomentum::electron_from_pt_eta_phi(20.0, 0.5, 0.0),
            vertex,
        );
        let seed = event.push_seed(true, 2);
        event.push_track(seed, vec![sim]);

        let mut classifier =
            Classifier::new(ClassifierConfig::new(policy).with_eta_bands(true)).expect("valid config");
        let matches = classifier.process_event(&event).expect("valid event");
        (classifier, RunSummary { events: 1, matches })
    }

    fn find<'a, T>(records: &'a [T], name: impl Fn(&T) -> bool) -> &'a T {
        records.iter().find(|record| name(record)).expect("record exists")
    }

    #[test]
    fn document_lists_every_histogram() {
        let (classifier, summary) = one_electron_run(MatchingPolicy::SeedType);
        let document =
            build_document(&classifier, &summary, &[PathBuf::from("a.jsonl")], created())
                .expect("consistent histograms");
        // Totals, seven algorithms and two driven types for both pt and eta, five bands.
        assert_eq!(document.histograms.len(), 2 + 2 * 7 + 2 * 2 + 5);
        assert_eq!(document.ratios.len(), document.histograms.len() - 2);
        assert_eq!(document.shares.len(), document.ratios.len());
        assert_eq!(document.metadata.events, 1);
        assert_eq!(document.metadata.filed, 1);
        assert_eq!(document.metadata.duplicates, 0);
        assert_eq!(document.metadata.policy, "seed_type");
        assert_eq!(document.metadata.max_abs_eta, None);

        let pt = find(&document.histograms, |h| h.name == "pt_mixedTripletStepSeeds");
        assert_eq!(pt.entries, 1);
        assert_eq!(pt.bins.len(), 50);
        assert!(find(&document.histograms, |h| h.name == "pt_all_eta_band_0").integral == 1.0);
        assert_eq!(
            document.metadata.eta_band_ranges,
            vec![
                "0.000-1.000",
                "1.000-1.444",
                "1.444-1.556",
                "1.556-2.000",
                "2.000-2.500"
            ]
        );
    }

    #[test]
    fn shares_and_ratios() {
        let (classifier, summary) = one_electron_run(MatchingPolicy::SeedType);
        let document =
            build_document(&classifier, &summary, &[], created()).expect("consistent histograms");

        let share = find(&document.shares, |s| s.name == "pt_mixedTripletStepSeeds");
        assert_eq!(share.denominator, "pt_all");
        assert_approx_eq!(share.share, 1.0);
        let share = find(&document.shares, |s| s.name == "pt_initialStepSeeds");
        assert_approx_eq!(share.share, 0.0);

        let ratio = find(&document.ratios, |r| r.numerator == "pt_mixedTripletStepSeeds");
        assert_eq!(ratio.kind, "fraction");
        assert_eq!(ratio.bins.iter().filter(|bin| bin.value == 1.0).count(), 1);
        assert_eq!(ratio.bins.iter().filter(|bin| bin.value.is_nan()).count(), 49);
    }

    #[test]
    fn empty_run_has_undefined_shares() {
        let classifier = Classifier::new(ClassifierConfig::new(MatchingPolicy::efficiency()))
            .expect("valid config");
        let document = build_document(&classifier, &RunSummary::default(), &[], created())
            .expect("consistent histograms");
        assert_eq!(document.metadata.ratio_kind, "efficiency");
        assert_eq!(document.metadata.max_abs_eta, Some(2.5));
        assert!(document.metadata.eta_band_ranges.is_empty());
        assert!(document.shares.iter().all(|share| share.share.is_nan()));
    }

    #[test]
    fn undefined_values_serialise_as_null() {
        let (classifier, summary) = one_electron_run(MatchingPolicy::Efficiency { max_abs_eta: 2.5 });
        let document =
            build_document(&classifier, &summary, &[], created()).expect("consistent histograms");
        let mut buffer = Vec::new();
        document.to_writer(&mut buffer).expect("serialisable");
        let json: serde_json::Value = serde_json::from_slice(&buffer).expect("valid json");

        assert_eq!(json["metadata"]["created"], "2024-05-01T12:00:00Z");
        assert_eq!(json["metadata"]["policy"], "efficiency");
        let ratio = json["ratios"]
            .as_array()
            .expect("ratios are a list")
            .iter()
            .find(|ratio| ratio["numerator"] == "pt_ecal_driven")
            .expect("driven type ratio exists");
        let bins = ratio["bins"].as_array().expect("bins are a list");
        assert_eq!(bins.len(), 50);
        assert!(bins.iter().any(|bin| bin["value"] == 1.0));
        assert!(bins.iter().any(|bin| bin["value"].is_null()));
    }

    #[test]
    fn unwritable_path_is_reported() {
        let (classifier, summary) = one_electron_run(MatchingPolicy::DrivenFraction);
        let document =
            build_document(&classifier, &summary, &[], created()).expect("consistent histograms");
        let result = document.write_to_file(Path::new("/nonexistent/directory/out.json"));
        assert!(matches!(result, Err(OutputError::IO { .. })));
    }
}
