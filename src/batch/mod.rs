//! Batch document generation.
//!
//! One independent job per output document: copy the template to the
//! destination, load it, substitute one row's values, store it back.
//! Jobs share nothing and run in parallel on rayon; a failed document
//! never aborts its siblings, and its destination file is left as-is
//! (untrusted). Destination paths are taken as given, duplicates and all.

use crate::common::{Error, Result};
use crate::config::Settings;
use crate::doc::tree::{DocumentTree, PartKind};
use crate::doc::xml::{parse_part, serialize_part};
use crate::engine::{SubstitutionTable, process_document};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Storage seam for batch generation.
///
/// The engine never touches a container format; implementations decide
/// what a "document" is on their medium (a part file on disk, an entry in
/// a memory map).
pub trait DocumentIo: Send + Sync {
    /// Copy the template to `destination`, failing when the destination
    /// exists and `overwrite` is false.
    fn copy_template(&self, template: &Path, destination: &Path, overwrite: bool) -> Result<()>;

    /// Load a document for mutation.
    fn load(&self, path: &Path) -> Result<DocumentTree>;

    /// Store a mutated document back.
    fn store(&self, path: &Path, tree: &DocumentTree) -> Result<()>;
}

/// Filesystem storage for single-part XML documents.
///
/// The whole document is one WordprocessingML body part; header and
/// footer parts do not exist on this medium.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartFileIo;

impl DocumentIo for PartFileIo {
    fn copy_template(&self, template: &Path, destination: &Path, overwrite: bool) -> Result<()> {
        if destination.exists() && !overwrite {
            return Err(Error::InvalidInput(format!(
                "destination already exists: {}",
                destination.display()
            )));
        }
        fs::copy(template, destination)?;
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<DocumentTree> {
        let bytes = fs::read(path)?;
        let body = parse_part(&bytes, PartKind::Body)?;
        Ok(DocumentTree {
            body,
            headers: Vec::new(),
            footers: Vec::new(),
        })
    }

    fn store(&self, path: &Path, tree: &DocumentTree) -> Result<()> {
        let bytes = serialize_part(&tree.body)?;
        fs::write(path, bytes)?;
        Ok(())
    }
}

/// In-memory storage keyed by path. Mainly for tests and previews.
#[derive(Debug, Default)]
pub struct MemoryIo {
    entries: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryIo {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a document's bytes at `path`.
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.entries.lock().insert(path.into(), bytes);
    }

    /// Bytes currently stored at `path`.
    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.entries.lock().get(path).cloned()
    }
}

impl DocumentIo for MemoryIo {
    fn copy_template(&self, template: &Path, destination: &Path, overwrite: bool) -> Result<()> {
        let mut entries = self.entries.lock();
        let bytes = entries
            .get(template)
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("no template at {}", template.display())))?;
        if entries.contains_key(destination) && !overwrite {
            return Err(Error::InvalidInput(format!(
                "destination already exists: {}",
                destination.display()
            )));
        }
        entries.insert(destination.to_path_buf(), bytes);
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<DocumentTree> {
        let bytes = self
            .get(path)
            .ok_or_else(|| Error::InvalidInput(format!("no document at {}", path.display())))?;
        let body = parse_part(&bytes, PartKind::Body)?;
        Ok(DocumentTree {
            body,
            headers: Vec::new(),
            footers: Vec::new(),
        })
    }

    fn store(&self, path: &Path, tree: &DocumentTree) -> Result<()> {
        let bytes = serialize_part(&tree.body)?;
        self.insert(path, bytes);
        Ok(())
    }
}

/// One output document: where it goes and which values fill it.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub destination: PathBuf,
    pub values: SubstitutionTable,
}

impl BatchJob {
    pub fn new(destination: impl Into<PathBuf>, values: SubstitutionTable) -> Self {
        Self {
            destination: destination.into(),
            values,
        }
    }
}

/// One failed document.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    /// Index of the job within the batch.
    pub index: usize,
    pub destination: PathBuf,
    pub message: String,
}

impl BatchFailure {
    /// The failure as a crate error, for callers that propagate it.
    pub fn to_error(&self) -> Error {
        Error::Document {
            index: self.index,
            message: self.message.clone(),
        }
    }
}

/// Per-batch outcome summary.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Failures ordered by job index.
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    /// The highest-index failure, if any document failed.
    pub fn last_failure(&self) -> Option<&BatchFailure> {
        self.failures.last()
    }
}

/// Per-document progress callback: `(job index, percent 0-100)`.
///
/// Fire-and-forget; calls arrive from worker threads in no particular
/// interleaving, and marshalling to a UI thread is the caller's job.
pub type ProgressFn<'a> = &'a (dyn Fn(usize, u8) + Send + Sync);

fn generate_one<I: DocumentIo>(
    io: &I,
    template: &Path,
    job: &BatchJob,
    index: usize,
    overwrite: bool,
    progress: Option<ProgressFn<'_>>,
) -> Result<()> {
    io.copy_template(template, &job.destination, overwrite)?;
    let mut tree = io.load(&job.destination)?;
    process_document(&mut tree, &job.values, |pct| {
        if let Some(report) = progress {
            report(index, pct);
        }
    });
    io.store(&job.destination, &tree)
}

/// Generate one document per job, in parallel.
///
/// `settings.worker_threads` picks the pool size (rayon's default when
/// unset); `settings.overwrite_existing` governs destination collisions.
/// The report carries both counts and the ordered failure list.
///
/// # Example
///
/// ```rust,no_run
/// use rambutan::batch::{BatchJob, PartFileIo, run_batch};
/// use rambutan::config::Settings;
/// use rambutan::engine::SubstitutionTable;
///
/// let jobs = vec![BatchJob::new(
///     "out/ada.xml",
///     SubstitutionTable::from_pairs([("name", "Ada")]),
/// )];
/// let report = run_batch(&PartFileIo, "template.xml".as_ref(), jobs, &Settings::default(), None);
/// assert_eq!(report.failed, report.failures.len());
/// ```
pub fn run_batch<I: DocumentIo>(
    io: &I,
    template: &Path,
    jobs: Vec<BatchJob>,
    settings: &Settings,
    progress: Option<ProgressFn<'_>>,
) -> BatchReport {
    let overwrite = settings.overwrite_existing;

    let run = move || {
        jobs.into_par_iter()
            .enumerate()
            .map(|(index, job)| {
                generate_one(io, template, &job, index, overwrite, progress).map_err(|e| {
                    BatchFailure {
                        index,
                        destination: job.destination.clone(),
                        message: e.to_string(),
                    }
                })
            })
            .collect::<Vec<_>>()
    };

    let pool = settings
        .worker_threads
        .and_then(|n| rayon::ThreadPoolBuilder::new().num_threads(n).build().ok());
    let outcomes = match pool {
        Some(pool) => pool.install(run),
        None => run(),
    };

    let mut report = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(()) => report.succeeded += 1,
            Err(failure) => {
                report.failed += 1;
                report.failures.push(failure);
            },
        }
    }
    report.failures.sort_by_key(|f| f.index);
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &[u8] = br#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>Dear {name}, your grade is {grade}.</w:t></w:r></w:p></w:body></w:document>"#;

    fn memory_with_template() -> MemoryIo {
        let io = MemoryIo::new();
        io.insert("template.xml", TEMPLATE.to_vec());
        io
    }

    fn job(dest: &str, pairs: &[(&str, &str)]) -> BatchJob {
        BatchJob::new(dest, SubstitutionTable::from_pairs(pairs.iter().copied()))
    }

    #[test]
    fn test_every_job_produces_its_own_document() {
        let io = memory_with_template();
        let jobs = vec![
            job("out/a.xml", &[("name", "Ada"), ("grade", "A")]),
            job("out/b.xml", &[("name", "Bob"), ("grade", "B")]),
        ];
        let report = run_batch(&io, "template.xml".as_ref(), jobs, &Settings::default(), None);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 0);

        let a = String::from_utf8(io.get("out/a.xml".as_ref()).unwrap()).unwrap();
        assert!(a.contains("Dear Ada, your grade is A."));
        let b = String::from_utf8(io.get("out/b.xml".as_ref()).unwrap()).unwrap();
        assert!(b.contains("Dear Bob, your grade is B."));
    }

    #[test]
    fn test_failed_document_does_not_abort_siblings() {
        let io = memory_with_template();
        // Occupy one destination so its job fails without overwrite.
        io.insert("out/taken.xml", b"occupied".to_vec());

        let jobs = vec![
            job("out/taken.xml", &[("name", "Ada"), ("grade", "A")]),
            job("out/free.xml", &[("name", "Bob"), ("grade", "B")]),
        ];
        let report = run_batch(&io, "template.xml".as_ref(), jobs, &Settings::default(), None);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        let failure = report.last_failure().unwrap();
        assert_eq!(failure.index, 0);
        assert!(failure.message.contains("already exists"));
        assert!(failure.to_error().to_string().starts_with("Document 0:"));
        // The occupied destination is untouched.
        assert_eq!(io.get("out/taken.xml".as_ref()).unwrap(), b"occupied");
    }

    #[test]
    fn test_overwrite_setting_allows_collisions() {
        let io = memory_with_template();
        io.insert("out/taken.xml", b"occupied".to_vec());

        let settings = Settings {
            overwrite_existing: true,
            ..Default::default()
        };
        let jobs = vec![job("out/taken.xml", &[("name", "Ada"), ("grade", "A")])];
        let report = run_batch(&io, "template.xml".as_ref(), jobs, &settings, None);
        assert_eq!(report.succeeded, 1);
        let out = String::from_utf8(io.get("out/taken.xml".as_ref()).unwrap()).unwrap();
        assert!(out.contains("Dear Ada"));
    }

    #[test]
    fn test_progress_reports_carry_job_index_and_end_at_100() {
        let io = memory_with_template();
        let jobs = vec![
            job("out/a.xml", &[("name", "Ada"), ("grade", "A")]),
            job("out/b.xml", &[("name", "Bob"), ("grade", "B")]),
        ];

        let reports: Mutex<Vec<(usize, u8)>> = Mutex::new(Vec::new());
        let record = |index: usize, pct: u8| reports.lock().push((index, pct));
        run_batch(
            &io,
            "template.xml".as_ref(),
            jobs,
            &Settings::default(),
            Some(&record),
        );

        let reports = reports.into_inner();
        for index in 0..2 {
            let per_doc: Vec<u8> = reports
                .iter()
                .filter(|(i, _)| *i == index)
                .map(|(_, pct)| *pct)
                .collect();
            assert_eq!(per_doc.last().copied(), Some(100));
        }
    }

    #[test]
    fn test_part_file_io_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.xml");
        fs::write(&template, TEMPLATE).unwrap();

        let jobs = vec![BatchJob::new(
            dir.path().join("ada.xml"),
            SubstitutionTable::from_pairs([("name", "Ada"), ("grade", "A")]),
        )];
        let report = run_batch(&PartFileIo, &template, jobs, &Settings::default(), None);
        assert_eq!(report.succeeded, 1);

        let out = fs::read_to_string(dir.path().join("ada.xml")).unwrap();
        assert!(out.contains("Dear Ada, your grade is A."));
        // The template itself is untouched.
        assert_eq!(fs::read(&template).unwrap(), TEMPLATE);
    }

    #[test]
    fn test_explicit_worker_thread_count() {
        let io = memory_with_template();
        let settings = Settings {
            worker_threads: Some(2),
            ..Default::default()
        };
        let jobs = (0..8)
            .map(|i| {
                job(
                    &format!("out/{i}.xml"),
                    &[("name", "Ada"), ("grade", "A")],
                )
            })
            .collect();
        let report = run_batch(&io, "template.xml".as_ref(), jobs, &settings, None);
        assert_eq!(report.succeeded, 8);
    }
}
