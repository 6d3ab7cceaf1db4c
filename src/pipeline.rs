//! Ingest pipeline: files -> records -> interpolated address documents -> sink.
//!
//! Each file is expanded on a blocking worker and its documents are pushed
//! through a bounded channel, so a slow sink throttles interpolation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use hashbrown::HashSet;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::interpolate::{IdGenerator, InterpolationError, RangeInterpolator, SequentialIds};
use crate::models::{AddressDoc, AdminTable, AdminValues, Side, TigerRecord};
use crate::sink::AddressSink;
use crate::source::{file_stem, fips_from_path, open_records, RecordSource};

/// One input file with the admin names its addresses are tagged with.
#[derive(Debug, Clone)]
pub struct FileJob {
    pub path: PathBuf,
    pub admin: AdminValues,
}

impl FileJob {
    /// Resolve admin names from the FIPS code in the file name
    pub fn new(path: PathBuf, admin_table: &AdminTable) -> Self {
        let admin = match fips_from_path(&path) {
            Some(fips) => {
                let admin = admin_table.lookup(&fips);
                if admin.county.is_none() {
                    warn!("Unknown FIPS code {} for {}", fips, path.display());
                }
                admin
            }
            None => {
                warn!("No FIPS code in file name: {}", path.display());
                AdminValues::country_only(admin_table.country())
            }
        };

        Self { path, admin }
    }

    /// Name used for `source_file` on every document
    pub fn source_file(&self) -> String {
        file_name(&self.path)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Id prefixes handed out during one run, no two files share one.
#[derive(Debug, Default)]
pub struct IdPrefixes {
    used: HashSet<String>,
}

impl IdPrefixes {
    /// The file stem, or the full file name once that stem is taken.
    /// A `~n` suffix is appended if the file name is taken as well.
    pub fn claim(&mut self, path: &Path) -> String {
        let stem = file_stem(path);
        let base = if self.used.contains(&stem) {
            file_name(path)
        } else {
            stem
        };

        let mut prefix = base.clone();
        let mut n = 1;
        while self.used.contains(&prefix) {
            prefix = format!("{}~{}", base, n);
            n += 1;
        }

        self.used.insert(prefix.clone());
        prefix
    }
}

/// Counters collected while expanding records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandStats {
    pub records: usize,
    pub unreadable_records: usize,
    pub invalid_geometries: usize,
    pub malformed_ranges: usize,
    pub addresses: usize,
}

impl ExpandStats {
    fn merge(&mut self, other: &ExpandStats) {
        self.records += other.records;
        self.unreadable_records += other.unreadable_records;
        self.invalid_geometries += other.invalid_geometries;
        self.malformed_ranges += other.malformed_ranges;
        self.addresses += other.addresses;
    }
}

/// Explodes road segment records of one file into address documents.
pub struct RecordExpander<G = SequentialIds> {
    interpolator: RangeInterpolator,
    admin: AdminValues,
    ids: G,
    source_file: String,
    import_timestamp: DateTime<Utc>,
    stats: ExpandStats,
}

impl RecordExpander<SequentialIds> {
    /// Expander for a file job, ids prefixed with `id_prefix`
    pub fn for_job(
        interpolator: RangeInterpolator,
        job: &FileJob,
        id_prefix: String,
        import_timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(
            interpolator,
            job.admin.clone(),
            SequentialIds::new(id_prefix),
            job.source_file(),
            import_timestamp,
        )
    }
}

impl<G: IdGenerator> RecordExpander<G> {
    pub fn new(
        interpolator: RangeInterpolator,
        admin: AdminValues,
        ids: G,
        source_file: String,
        import_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            interpolator,
            admin,
            ids,
            source_file,
            import_timestamp,
            stats: ExpandStats::default(),
        }
    }

    pub fn stats(&self) -> &ExpandStats {
        &self.stats
    }

    /// Lazily interpolate both sides of `record`, left side first.
    ///
    /// A side with a malformed range contributes nothing. Geometry with fewer
    /// than 2 coordinates fails the whole record.
    pub fn expand<'r>(
        &'r mut self,
        record: &'r TigerRecord,
    ) -> Result<impl Iterator<Item = AddressDoc> + 'r, InterpolationError> {
        self.stats.records += 1;
        if let Err(e) = self.interpolator.validate(&record.geometry) {
            self.stats.invalid_geometries += 1;
            return Err(e);
        }

        let mut sides = Vec::with_capacity(Side::all().len());
        for &side in Side::all() {
            let range = match record.range(side) {
                Ok(range) => range,
                Err(e) => {
                    debug!("Skipping {} side of {:?}: {}", side, record.properties.tlid, e);
                    self.stats.malformed_ranges += 1;
                    continue;
                }
            };
            sides.push(self.interpolator.interpolate(&record.geometry, range, side)?);
        }

        let street = record.street_name();
        let Self {
            admin,
            ids,
            source_file,
            import_timestamp,
            stats,
            ..
        } = self;
        let admin = &*admin;
        let source_file = source_file.as_str();
        let import_timestamp = *import_timestamp;

        Ok(sides.into_iter().flatten().map(move |address| {
            stats.addresses += 1;
            AddressDoc::new(
                ids.next_id(),
                &address,
                street,
                admin,
                source_file,
                import_timestamp,
            )
        }))
    }
}

/// Totals for a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub files: usize,
    pub failed_files: usize,
    pub written: usize,
    pub stats: ExpandStats,
}

/// Expand every record of `source` into `tx`. Returns `false` once the receiver is gone.
fn send_records<G: IdGenerator>(
    expander: &mut RecordExpander<G>,
    source: &mut dyn RecordSource,
    tx: &mpsc::Sender<AddressDoc>,
) -> bool {
    for result in source {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable record: {:#}", e);
                expander.stats.unreadable_records += 1;
                continue;
            }
        };

        let docs = match expander.expand(&record) {
            Ok(docs) => docs,
            Err(e) => {
                warn!("Skipping record {:?}: {}", record.properties.tlid, e);
                continue;
            }
        };

        for doc in docs {
            if tx.blocking_send(doc).is_err() {
                return false;
            }
        }
    }
    true
}

/// Run the importer over `jobs`, writing every document to `sink`.
///
/// Files are processed in order. A file that cannot be opened is logged and
/// skipped. Sink errors abort the run. Document ids are unique across all jobs
/// of the run, see [`IdPrefixes`].
pub async fn run<S>(
    jobs: Vec<FileJob>,
    interpolator: RangeInterpolator,
    mut sink: S,
    channel_capacity: usize,
    progress: ProgressBar,
) -> Result<IngestSummary>
where
    S: AddressSink,
{
    let (tx, mut rx) = mpsc::channel::<AddressDoc>(channel_capacity.max(1));
    let import_timestamp = Utc::now();

    let producer = tokio::task::spawn_blocking(move || {
        let mut summary = IngestSummary::default();
        let mut prefixes = IdPrefixes::default();

        for job in &jobs {
            progress.set_message(job.source_file());
            info!("Importing {}", job.path.display());

            let mut source = match open_records(&job.path) {
                Ok(source) => source,
                Err(e) => {
                    warn!("Skipping {}: {:#}", job.path.display(), e);
                    summary.failed_files += 1;
                    progress.inc(1);
                    continue;
                }
            };

            let prefix = prefixes.claim(&job.path);
            if prefix != file_stem(&job.path) {
                warn!(
                    "Another file already uses id prefix {}, {} uses {}",
                    file_stem(&job.path),
                    job.path.display(),
                    prefix
                );
            }
            let mut expander =
                RecordExpander::for_job(interpolator, job, prefix, import_timestamp);
            let open = send_records(&mut expander, source.as_mut(), &tx);

            let stats = *expander.stats();
            info!(
                "{}: {} records, {} addresses ({} malformed ranges, {} invalid geometries)",
                job.source_file(),
                stats.records,
                stats.addresses,
                stats.malformed_ranges,
                stats.invalid_geometries
            );
            summary.stats.merge(&stats);
            summary.files += 1;
            progress.inc(1);

            if !open {
                info!("Receiver dropped, stopping producer.");
                break;
            }
        }

        progress.finish_with_message("Processing complete");
        summary
    });

    let mut write_result = Ok(());
    while let Some(doc) = rx.recv().await {
        if let Err(e) = sink.write(&doc) {
            write_result = Err(e);
            break;
        }
    }
    // Unblocks the producer if the sink failed
    drop(rx);

    let mut summary = producer.await.context("Import worker panicked")?;
    write_result?;
    summary.written = sink.finish()?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolate::InterpolationConfig;
    use crate::models::{AddressRange, TigerProperties};
    use geo_types::LineString;

    fn record(l: (&str, &str), r: (&str, &str)) -> TigerRecord {
        TigerRecord::new(
            LineString::from(vec![(-86.50, 32.5), (-86.49, 32.5)]),
            TigerProperties {
                tlid: Some("1".into()),
                fullname: Some("Main St".into()),
                lfromadd: Some(l.0.into()),
                ltoadd: Some(l.1.into()),
                rfromadd: Some(r.0.into()),
                rtoadd: Some(r.1.into()),
            },
        )
    }

    fn expander() -> RecordExpander {
        RecordExpander::new(
            RangeInterpolator::default(),
            AdminValues::country_only("United States"),
            SequentialIds::new("f"),
            "f.geojsonl".to_string(),
            Utc::now(),
        )
    }

    fn feature(l: (&str, &str), r: (&str, &str)) -> String {
        serde_json::json!({
            "type": "Feature",
            "properties": {
                "FULLNAME": "Main St",
                "LFROMADD": l.0, "LTOADD": l.1,
                "RFROMADD": r.0, "RTOADD": r.1
            },
            "geometry": {
                "type": "LineString",
                "coordinates": [[-86.50, 32.5], [-86.49, 32.5]]
            }
        })
        .to_string()
    }

    #[test]
    fn test_expand_both_sides() {
        let mut expander = expander();
        let record = record(("101", "105"), ("100", "104"));
        let docs: Vec<_> = expander.expand(&record).unwrap().collect();

        let names: Vec<_> = docs.iter().map(|d| d.default_name().unwrap().clone()).collect();
        assert_eq!(
            names,
            vec![
                "101 Main St",
                "103 Main St",
                "105 Main St",
                "100 Main St",
                "102 Main St",
                "104 Main St"
            ]
        );
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["f:0", "f:1", "f:2", "f:3", "f:4", "f:5"]);

        // Odd numbers on the left (north of an eastbound road)
        assert!(docs[0].center_point.lat > 32.5);
        assert!(docs[3].center_point.lat < 32.5);
        assert_eq!(expander.stats().addresses, 6);
    }

    #[test]
    fn test_expand_skips_malformed_side() {
        let mut expander = expander();
        let record = record(("NaN", "10"), ("2", "4"));
        let numbers: Vec<_> = expander
            .expand(&record)
            .unwrap()
            .map(|d| d.address_parts.number)
            .collect();

        assert_eq!(numbers, vec!["2", "4"]);
        assert_eq!(expander.stats().malformed_ranges, 1);
    }

    #[test]
    fn test_expand_rejects_degenerate_geometry() {
        let mut expander = expander();
        let mut record = record(("1", "9"), ("2", "10"));
        record.geometry = LineString::from(vec![(-86.5, 32.5)]);

        assert!(matches!(
            expander.expand(&record).err(),
            Some(InterpolationError::InvalidGeometry { len: 1 })
        ));
        assert_eq!(expander.stats().invalid_geometries, 1);
    }

    #[test]
    fn test_ids_continue_across_records() {
        let mut expander = expander();
        let first = record(("1", "1"), ("x", "y"));
        let second = record(("3", "3"), ("x", "y"));

        let a: Vec<_> = expander.expand(&first).unwrap().map(|d| d.id).collect();
        let b: Vec<_> = expander.expand(&second).unwrap().map(|d| d.id).collect();
        assert_eq!(a, vec!["f:0"]);
        assert_eq!(b, vec!["f:1"]);
    }

    #[test]
    fn test_closure_ids() {
        let mut next = 0u64;
        let mut expander = RecordExpander::new(
            RangeInterpolator::default(),
            AdminValues::country_only("United States"),
            || {
                next += 1;
                format!("custom-{}", next)
            },
            "f".to_string(),
            Utc::now(),
        );
        let record = record(("1", "3"), ("", ""));
        let ids: Vec<_> = expander.expand(&record).unwrap().map(|d| d.id).collect();
        assert_eq!(ids, vec!["custom-1", "custom-2"]);
    }

    #[test]
    fn test_file_job_admin() {
        let table = AdminTable::embedded().unwrap();

        let job = FileJob::new(PathBuf::from("tl_2016_01001_addrfeat.geojsonl"), &table);
        assert_eq!(job.admin.state.as_deref(), Some("Alabama"));
        assert_eq!(job.admin.county.as_deref(), Some("Autauga"));
        assert_eq!(job.source_file(), "tl_2016_01001_addrfeat.geojsonl");

        let job = FileJob::new(PathBuf::from("tl_2016_99999_addrfeat.geojsonl"), &table);
        assert_eq!(job.admin, AdminValues::country_only("United States"));

        let job = FileJob::new(PathBuf::from("roads.geojsonl"), &table);
        assert_eq!(job.admin, AdminValues::country_only("United States"));
    }

    #[tokio::test]
    async fn test_run_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("tl_2016_01001_addrfeat.geojsonl");
        let second = dir.path().join("tl_2016_01003_addrfeat.geojsonl");
        let missing = dir.path().join("tl_2016_01005_addrfeat.geojsonl");

        std::fs::write(
            &first,
            format!(
                "{}\nnot json\n{}\n",
                feature(("1", "5"), ("2", "6")),
                feature(("NaN", "10"), ("8", "8"))
            ),
        )
        .unwrap();
        std::fs::write(&second, format!("{}\n", feature(("7", "1"), ("", "")))).unwrap();

        let table = AdminTable::embedded().unwrap();
        let jobs = vec![
            FileJob::new(first, &table),
            FileJob::new(missing, &table),
            FileJob::new(second, &table),
        ];

        let mut docs = Vec::new();
        let summary = {
            let sink = &mut docs;
            run(jobs, RangeInterpolator::default(), VecSink(sink), 2, ProgressBar::hidden())
                .await
                .unwrap()
        };

        assert_eq!(summary.files, 2);
        assert_eq!(summary.failed_files, 1);
        assert_eq!(summary.written, 11);
        assert_eq!(summary.stats.records, 3);
        assert_eq!(summary.stats.unreadable_records, 1);
        assert_eq!(summary.stats.malformed_ranges, 2);
        assert_eq!(summary.stats.addresses, 11);

        let numbers: Vec<_> = docs.iter().map(|d| d.address_parts.number.as_str()).collect();
        assert_eq!(
            numbers,
            vec!["1", "3", "5", "2", "4", "6", "8", "7", "5", "3", "1"]
        );

        assert_eq!(docs[0].id, "tl_2016_01001_addrfeat:0");
        assert_eq!(docs[6].id, "tl_2016_01001_addrfeat:6");
        assert_eq!(docs[7].id, "tl_2016_01003_addrfeat:0");
        assert_eq!(docs[7].admin.admin2.as_deref(), Some("Baldwin"));

        let mut ids: Vec<_> = docs.iter().map(|d| d.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), docs.len());
    }

    #[test]
    fn test_id_prefixes() {
        let mut prefixes = IdPrefixes::default();

        assert_eq!(prefixes.claim(Path::new("/a/roads.geojsonl")), "roads");
        assert_eq!(prefixes.claim(Path::new("/a/roads.ndjson")), "roads.ndjson");
        assert_eq!(prefixes.claim(Path::new("/b/roads.ndjson")), "roads.ndjson~1");
        assert_eq!(prefixes.claim(Path::new("/c/roads.ndjson")), "roads.ndjson~2");
        assert_eq!(prefixes.claim(Path::new("/a/streets.ndjson")), "streets");
    }

    #[tokio::test]
    async fn test_run_ids_unique_for_shared_stems() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let content = format!("{}\n", feature(("1", "3"), ("", "")));
        std::fs::write(dir.path().join("roads.geojsonl"), &content).unwrap();
        std::fs::write(dir.path().join("roads.ndjson"), &content).unwrap();

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content.as_bytes()).unwrap();
        std::fs::write(
            dir.path().join("roads.geojsonl.gz"),
            encoder.finish().unwrap(),
        )
        .unwrap();

        let table = AdminTable::embedded().unwrap();
        let jobs: Vec<_> = crate::source::scan_dir(dir.path())
            .unwrap()
            .into_iter()
            .map(|path| FileJob::new(path, &table))
            .collect();
        assert_eq!(jobs.len(), 3);

        let mut docs = Vec::new();
        let summary = run(
            jobs,
            RangeInterpolator::default(),
            VecSink(&mut docs),
            4,
            ProgressBar::hidden(),
        )
        .await
        .unwrap();
        assert_eq!(summary.written, 6);

        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "roads:0",
                "roads:1",
                "roads.geojsonl.gz:0",
                "roads.geojsonl.gz:1",
                "roads.ndjson:0",
                "roads.ndjson:1"
            ]
        );
    }

    #[tokio::test]
    async fn test_run_stops_on_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tl_2016_01001_addrfeat.geojsonl");
        let line = feature(("1", "99"), ("2", "100"));
        std::fs::write(&path, format!("{}\n", vec![line; 50].join("\n"))).unwrap();

        let table = AdminTable::embedded().unwrap();
        let result = run(
            vec![FileJob::new(path, &table)],
            RangeInterpolator::new(InterpolationConfig {
                min_gap: 0.0,
                ..Default::default()
            }),
            FailingSink,
            1,
            ProgressBar::hidden(),
        )
        .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_range_helper_matches_expander() {
        let record = record(("10", "2"), ("", ""));
        assert_eq!(record.range(Side::Left).unwrap(), AddressRange::new(10, 2));
    }

    /// Borrowing sink so the test can inspect documents after `finish`
    struct VecSink<'a>(&'a mut Vec<AddressDoc>);

    impl AddressSink for VecSink<'_> {
        fn write(&mut self, doc: &AddressDoc) -> Result<()> {
            self.0.push(doc.clone());
            Ok(())
        }

        fn finish(self) -> Result<usize> {
            Ok(self.0.len())
        }
    }

    struct FailingSink;

    impl AddressSink for FailingSink {
        fn write(&mut self, _doc: &AddressDoc) -> Result<()> {
            anyhow::bail!("disk full")
        }

        fn finish(self) -> Result<usize> {
            Ok(0)
        }
    }
}
