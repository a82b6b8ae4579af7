//! Reading events from JSON Lines ntuple dumps, one event per line.
use crate::event::Event;
use glob::{GlobError, PatternError};
use metrics::counter;
use seed_validation_common::metrics::metric_names::FILES_READ;
use std::{
    fmt::Display,
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Glob Pattern Error: {0}")]
    GlobPattern(#[from] PatternError),
    #[error("Glob Error: {0}")]
    Glob(#[from] GlobError),
    #[error("No input file matches {0}")]
    NoMatches(String),
    #[error("IO Error reading {path}: {source}")]
    IO {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot decode event at {location}: {source}")]
    Decode {
        location: EventLocation,
        source: serde_json::Error,
    },
}

/// Where an event was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLocation {
    pub path: PathBuf,
    /// One-based line number.
    pub line: usize,
}

impl Display for EventLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub location: EventLocation,
    pub event: Event,
}

/// Expands each pattern into the paths it matches, in sorted order,
/// keeping the order of the patterns themselves.
/// A pattern matching nothing is an error.
pub fn expand_inputs<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>, SourceError> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let mut matches = glob::glob(pattern)?.collect::<Result<Vec<_>, _>>()?;
        if matches.is_empty() {
            return Err(SourceError::NoMatches(pattern.to_owned()));
        }
        matches.sort();
        paths.append(&mut matches);
    }
    info!("{} input file(s)", paths.len());
    Ok(paths)
}

/// Iterates over the events of one file. Blank lines are skipped.
pub struct EventReader<R> {
    path: PathBuf,
    lines: Lines<R>,
    line: usize,
}

impl EventReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        debug!("Opening {}", path.display());
        let file = File::open(path).map_err(|source| SourceError::IO {
            path: path.to_owned(),
            source,
        })?;
        counter!(FILES_READ).increment(1);
        Ok(Self::new(path.to_owned(), BufReader::new(file)))
    }
}

impl<R: BufRead> EventReader<R> {
    pub fn new(path: PathBuf, reader: R) -> Self {
        Self {
            path,
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<EventRecord, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line += 1;
            let line = match line {
                Ok(line) => line,
                Err(source) => {
                    return Some(Err(SourceError::IO {
                        path: self.path.clone(),
                        source,
                    }));
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let location = EventLocation {
                path: self.path.clone(),
                line: self.line,
            };
            return Some(match serde_json::from_str::<Event>(&line) {
                Ok(event) => Ok(EventRecord { location, event }),
                Err(source) => Err(SourceError::Decode { location, source }),
            });
        }
    }
}

/// Reads several files one after the other, as a single sequence of events.
pub struct EventChain {
    paths: std::vec::IntoIter<PathBuf>,
    current: Option<EventReader<BufReader<File>>>,
}

impl EventChain {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths: paths.into_iter(),
            current: None,
        }
    }
}

impl Iterator for EventChain {
    type Item = Result<EventRecord, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(reader) = &mut self.current {
                if let Some(record) = reader.next() {
                    return Some(record);
                }
                self.current = None;
            }
            let path = self.paths.next()?;
            match EventReader::open(&path) {
                Ok(reader) => self.current = Some(reader),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Counts the non-blank lines of the files, which is the number of events they hold.
pub fn count_events(paths: &[PathBuf]) -> Result<usize, SourceError> {
    let mut total = 0;
    for path in paths {
        let file = File::open(path).map_err(|source| SourceError::IO {
            path: path.clone(),
            source,
        })?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| SourceError::IO {
                path: path.clone(),
                source,
            })?;
            if !line.trim().is_empty() {
                total += 1;
            }
        }
    }
    Ok(total)
}
