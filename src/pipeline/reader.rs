//! Example readers and mode-dependent record sequences.
//!
//! [`ExampleStream`] is the restartable record sequence a graph consumes.
//! It comes in two variants:
//!
//! * [`RepeatingShuffled`] for training: passes are repeated forever, the
//!   path order is reshuffled each pass and records are drawn at random from
//!   a bounded buffer.
//! * [`BoundedOrdered`] for evaluation and prediction: records are read in
//!   order for a fixed number of passes, then the stream ends.

use crate::core::constants::DEFAULT_SHUFFLE_BUFFER;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::traits::{ExampleReader, KeyedRecord, RecordIter};
use crate::pipeline::mode::GraphMode;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads examples from JSON Lines files, one serialized example per line.
///
/// Keys are `<path>:<line>` with 1-based line numbers. Blank lines are skipped.
/// Lines are passed on as raw bytes; whether they hold a valid example is
/// decided when they are parsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesReader;

impl JsonLinesReader {
    /// Creates a new JSON Lines reader.
    pub fn new() -> Self {
        Self
    }
}

impl ExampleReader for JsonLinesReader {
    fn read_pass(&self, paths: &[PathBuf]) -> PipelineResult<RecordIter> {
        let paths = paths.to_vec();
        Ok(Box::new(paths.into_iter().flat_map(read_json_lines)))
    }
}

fn read_json_lines(path: PathBuf) -> RecordIter {
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) => return Box::new(std::iter::once(Err(PipelineError::Io(e)))),
    };
    let display = path.display().to_string();
    Box::new(
        BufReader::new(file)
            .split(b'\n')
            .enumerate()
            .filter_map(move |(index, line)| match line {
                Ok(mut line) => {
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    if line.iter().all(u8::is_ascii_whitespace) {
                        return None;
                    }
                    Some(Ok(KeyedRecord::new(format!("{display}:{}", index + 1), line)))
                }
                Err(e) => Some(Err(PipelineError::Io(e))),
            }),
    )
}

/// Serves records held in memory, addressed by the path they belong to.
///
/// Useful for serving pre-loaded data and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    files: HashMap<PathBuf, Vec<Vec<u8>>>,
}

impl MemoryReader {
    /// Creates an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the records stored under `path`.
    pub fn with_file(mut self, path: impl Into<PathBuf>, records: Vec<Vec<u8>>) -> Self {
        self.files.insert(path.into(), records);
        self
    }
}

impl ExampleReader for MemoryReader {
    fn read_pass(&self, paths: &[PathBuf]) -> PipelineResult<RecordIter> {
        let mut records = Vec::new();
        for path in paths {
            let file = self.files.get(path).ok_or_else(|| {
                PipelineError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no records registered for {}", path.display()),
                ))
            })?;
            records.extend(file.iter().enumerate().map(|(index, record)| {
                Ok(KeyedRecord::new(
                    format!("{}:{}", path.display(), index + 1),
                    record.clone(),
                ))
            }));
        }
        Ok(Box::new(records.into_iter()))
    }
}

/// How records are sequenced across passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Repeat forever, shuffling with the given buffer capacity.
    RepeatingShuffled {
        /// Capacity of the record shuffle buffer.
        buffer: usize,
        /// Seed for reproducible shuffling; `None` seeds from entropy.
        seed: Option<u64>,
    },
    /// Read in order for a fixed number of passes.
    BoundedOrdered {
        /// Number of passes over the data.
        passes: usize,
    },
}

impl ReadPolicy {
    /// Returns the policy for a graph mode.
    pub fn for_mode(mode: GraphMode, seed: Option<u64>) -> Self {
        match mode.passes() {
            None => ReadPolicy::RepeatingShuffled {
                buffer: DEFAULT_SHUFFLE_BUFFER,
                seed,
            },
            Some(passes) => ReadPolicy::BoundedOrdered { passes },
        }
    }
}

/// Records read in order for a fixed number of passes.
pub struct BoundedOrdered {
    reader: Arc<dyn ExampleReader>,
    paths: Vec<PathBuf>,
    passes: usize,
    completed: usize,
    current: Option<RecordIter>,
}

impl BoundedOrdered {
    /// Creates a sequence over `paths` that ends after `passes` passes.
    pub fn new(reader: Arc<dyn ExampleReader>, paths: Vec<PathBuf>, passes: usize) -> Self {
        Self {
            reader,
            paths,
            passes,
            completed: 0,
            current: None,
        }
    }

    /// Returns the number of passes completed so far.
    pub fn completed_passes(&self) -> usize {
        self.completed
    }
}

impl Iterator for BoundedOrdered {
    type Item = PipelineResult<KeyedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.completed >= self.passes {
                return None;
            }
            if self.current.is_none() {
                match self.reader.read_pass(&self.paths) {
                    Ok(pass) => self.current = Some(pass),
                    Err(e) => {
                        self.completed = self.passes;
                        return Some(Err(e));
                    }
                }
            }
            let Some(current) = self.current.as_mut() else {
                return None;
            };
            match current.next() {
                Some(item) => return Some(item),
                None => {
                    self.completed += 1;
                    self.current = None;
                    debug!("completed pass {}/{}", self.completed, self.passes);
                }
            }
        }
    }
}

/// Records repeated forever, drawn at random from a bounded shuffle buffer.
///
/// Errors for individual records are shuffled along with the records and do
/// not end the sequence. It only ends if the source turns out to be empty,
/// in which case a single error is yielded, or if a pass cannot be started.
pub struct RepeatingShuffled {
    reader: Arc<dyn ExampleReader>,
    paths: Vec<PathBuf>,
    rng: StdRng,
    capacity: usize,
    buffer: Vec<PipelineResult<KeyedRecord>>,
    current: Option<RecordIter>,
    records_in_pass: usize,
    passes_started: usize,
    finished: bool,
}

impl RepeatingShuffled {
    /// Creates an endless shuffled sequence over `paths`.
    pub fn new(
        reader: Arc<dyn ExampleReader>,
        paths: Vec<PathBuf>,
        buffer: usize,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            reader,
            paths,
            rng,
            capacity: buffer.max(1),
            buffer: Vec::new(),
            current: None,
            records_in_pass: 0,
            passes_started: 0,
            finished: false,
        }
    }

    /// Returns the number of passes started so far.
    pub fn passes_started(&self) -> usize {
        self.passes_started
    }

    /// Pulls the next record from the source, starting new passes as needed.
    /// Returns `None` only if a whole pass produced no records. A pass that
    /// cannot be started finishes the sequence.
    fn pull(&mut self) -> Option<PipelineResult<KeyedRecord>> {
        loop {
            if self.current.is_none() {
                self.paths.shuffle(&mut self.rng);
                self.records_in_pass = 0;
                self.passes_started += 1;
                match self.reader.read_pass(&self.paths) {
                    Ok(pass) => self.current = Some(pass),
                    Err(e) => {
                        self.finished = true;
                        return Some(Err(e));
                    }
                }
            }
            let current = self.current.as_mut()?;
            match current.next() {
                Some(item) => {
                    self.records_in_pass += 1;
                    return Some(item);
                }
                None if self.records_in_pass == 0 => {
                    self.current = None;
                    return None;
                }
                None => self.current = None,
            }
        }
    }
}

impl Iterator for RepeatingShuffled {
    type Item = PipelineResult<KeyedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        while self.buffer.len() < self.capacity {
            match self.pull() {
                Some(Ok(record)) => self.buffer.push(Ok(record)),
                Some(Err(e)) if self.finished => return Some(Err(e)),
                Some(Err(e)) => self.buffer.push(Err(e)),
                None => break,
            }
        }

        if self.buffer.is_empty() {
            self.finished = true;
            warn!("training data source yielded no records");
            return Some(Err(PipelineError::invalid_input(
                "training data source contains no records",
            )));
        }

        let index = self.rng.gen_range(0..self.buffer.len());
        Some(self.buffer.swap_remove(index))
    }
}

/// The record sequence consumed by a graph.
pub enum ExampleStream {
    /// Endless shuffled sequence used for training.
    RepeatingShuffled(RepeatingShuffled),
    /// Finite ordered sequence used for evaluation and prediction.
    BoundedOrdered(BoundedOrdered),
}

impl ExampleStream {
    /// Opens the sequence for `paths` under the given policy.
    pub fn open(reader: Arc<dyn ExampleReader>, paths: Vec<PathBuf>, policy: ReadPolicy) -> Self {
        debug!("opening example stream over {} path(s): {:?}", paths.len(), policy);
        match policy {
            ReadPolicy::RepeatingShuffled { buffer, seed } => {
                let stream = RepeatingShuffled::new(reader, paths, buffer, seed);
                ExampleStream::RepeatingShuffled(stream)
            }
            ReadPolicy::BoundedOrdered { passes } => {
                ExampleStream::BoundedOrdered(BoundedOrdered::new(reader, paths, passes))
            }
        }
    }
}

impl Iterator for ExampleStream {
    type Item = PipelineResult<KeyedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ExampleStream::RepeatingShuffled(stream) => stream.next(),
            ExampleStream::BoundedOrdered(stream) => stream.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn memory_source(count: usize) -> (Arc<dyn ExampleReader>, Vec<PathBuf>) {
        let records = (0..count).map(|i| format!("record-{i}").into_bytes()).collect();
        let reader = MemoryReader::new().with_file("data.jsonl", records);
        (Arc::new(reader), vec![PathBuf::from("data.jsonl")])
    }

    #[test]
    fn test_json_lines_reader_keys_and_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{\"a\": 1}}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{{\"a\": 2}}").unwrap();

        let records: Vec<_> = JsonLinesReader::new()
            .read_pass(&[file.path().to_path_buf()])
            .unwrap()
            .collect::<PipelineResult<_>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, format!("{}:1", file.path().display()));
        assert_eq!(records[1].key, format!("{}:3", file.path().display()));
        assert_eq!(records[1].record, b"{\"a\": 2}".to_vec());
    }

    #[test]
    fn test_json_lines_reader_passes_undecodable_lines_through() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"a\": 1}\r\n\xff\xfe garbage\n{\"a\": 2}").unwrap();

        let records: Vec<_> = JsonLinesReader::new()
            .read_pass(&[file.path().to_path_buf()])
            .unwrap()
            .collect::<PipelineResult<_>>()
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].record, b"{\"a\": 1}".to_vec());
        assert_eq!(records[1].key, format!("{}:2", file.path().display()));
        assert_eq!(records[1].record, b"\xff\xfe garbage".to_vec());
        assert_eq!(records[2].record, b"{\"a\": 2}".to_vec());
    }

    #[test]
    fn test_json_lines_reader_missing_file_yields_io_error() {
        let mut pass = JsonLinesReader::new()
            .read_pass(&[PathBuf::from("/nonexistent/examples.jsonl")])
            .unwrap();
        assert!(matches!(pass.next(), Some(Err(PipelineError::Io(_)))));
    }

    #[test]
    fn test_bounded_ordered_ends_after_two_passes() {
        let (reader, paths) = memory_source(3);
        let policy = ReadPolicy::for_mode(GraphMode::Evaluate, None);
        let stream = ExampleStream::open(reader, paths, policy);
        let keys: Vec<String> = stream.map(|record| record.unwrap().key).collect();

        assert_eq!(
            keys,
            vec![
                "data.jsonl:1",
                "data.jsonl:2",
                "data.jsonl:3",
                "data.jsonl:1",
                "data.jsonl:2",
                "data.jsonl:3",
            ]
        );
    }

    #[test]
    fn test_bounded_ordered_counts_passes() {
        let (reader, paths) = memory_source(2);
        let mut stream = BoundedOrdered::new(reader, paths, 2);
        assert_eq!(stream.by_ref().count(), 4);
        assert_eq!(stream.completed_passes(), 2);
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_bounded_ordered_over_empty_source_terminates() {
        let reader: Arc<dyn ExampleReader> =
            Arc::new(MemoryReader::new().with_file("empty.jsonl", Vec::new()));
        let stream = BoundedOrdered::new(reader, vec![PathBuf::from("empty.jsonl")], 2);
        assert_eq!(stream.count(), 0);
    }

    #[test]
    fn test_repeating_shuffled_keeps_yielding() {
        let (reader, paths) = memory_source(3);
        let mut stream = RepeatingShuffled::new(reader, paths, 2, Some(7));

        let taken: Vec<_> = stream.by_ref().take(3 * 10).map(|r| r.unwrap()).collect();
        assert_eq!(taken.len(), 30);
        assert!(stream.passes_started() > 2);
        // one record per key may still sit in the shuffle buffer
        for i in 0..3 {
            let key = format!("data.jsonl:{}", i + 1);
            let seen = taken.iter().filter(|r| r.key == key).count();
            assert!((9..=11).contains(&seen), "{key} seen {seen} times");
        }
    }

    #[test]
    fn test_repeating_shuffled_is_reproducible_with_seed() {
        let (reader, paths) = memory_source(5);
        let first: Vec<String> = RepeatingShuffled::new(reader.clone(), paths.clone(), 4, Some(11))
            .take(12)
            .map(|r| r.unwrap().key)
            .collect();
        let second: Vec<String> = RepeatingShuffled::new(reader, paths, 4, Some(11))
            .take(12)
            .map(|r| r.unwrap().key)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_repeating_shuffled_over_empty_source_errors_once() {
        let reader: Arc<dyn ExampleReader> =
            Arc::new(MemoryReader::new().with_file("empty.jsonl", Vec::new()));
        let mut stream =
            RepeatingShuffled::new(reader, vec![PathBuf::from("empty.jsonl")], 4, Some(1));
        assert!(matches!(stream.next(), Some(Err(PipelineError::InvalidInput { .. }))));
        assert!(stream.next().is_none());
    }

    /// Yields `good-1`, a read error, then `good-3` on every pass.
    struct OneBadRecord;

    impl ExampleReader for OneBadRecord {
        fn read_pass(&self, _paths: &[PathBuf]) -> PipelineResult<RecordIter> {
            Ok(Box::new(
                vec![
                    Ok(KeyedRecord::new("good-1", Vec::new())),
                    Err(PipelineError::invalid_input("unreadable record")),
                    Ok(KeyedRecord::new("good-3", Vec::new())),
                ]
                .into_iter(),
            ))
        }
    }

    #[test]
    fn test_repeating_shuffled_survives_bad_records() {
        let mut stream =
            RepeatingShuffled::new(Arc::new(OneBadRecord), vec![PathBuf::from("a")], 4, Some(9));

        let taken: Vec<_> = stream.by_ref().take(60).collect();
        assert_eq!(taken.len(), 60);
        let errors = taken.iter().filter(|r| r.is_err()).count();
        let good: Vec<_> = taken.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert!(errors > 0);
        assert!(good.iter().any(|r| r.key == "good-1"));
        assert!(good.iter().any(|r| r.key == "good-3"));
        assert!(stream.passes_started() > 2);
        assert!(stream.next().is_some());
    }

    #[test]
    fn test_repeating_shuffled_ends_when_pass_cannot_start() {
        let mut stream = RepeatingShuffled::new(
            Arc::new(MemoryReader::new()),
            vec![PathBuf::from("missing.jsonl")],
            4,
            Some(1),
        );
        assert!(matches!(stream.next(), Some(Err(PipelineError::Io(_)))));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_memory_reader_unknown_path_is_error() {
        let reader = MemoryReader::new();
        assert!(reader.read_pass(&[PathBuf::from("missing.jsonl")]).is_err());
    }
}
