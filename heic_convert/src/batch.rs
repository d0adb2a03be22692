//! Batch Orchestrator
//!
//! Validates the configuration once, converts every item on a bounded
//! rayon pool, and reassembles results in input order. Output names are
//! de-duplicated after all items finish, so the chosen names never depend
//! on which worker finished first.

use crate::archive::{pack, ArchiveCompression};
use crate::heic_decoder::{DecodeLimits, HeicDecoder, LibHeifDecoder};
use crate::output_names::OutputNamer;
use crate::pipeline::ConversionPipeline;
use crate::types::{ConversionConfig, ConversionResult, InputItem};
use rayon::prelude::*;
use serde::Serialize;
use shared_utils::{BatchSummary, ConvertError, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Cooperative cancellation, checked before each item starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Emitted once per finished item.
///
/// With more than one worker, events arrive in completion order; `index`
/// is the item's position in the input so callers can reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub index: usize,
    /// Items finished so far, including this one
    pub completed: usize,
    pub total: usize,
    pub name: String,
    pub succeeded: bool,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Worker threads; 1 processes strictly in input order
    pub workers: usize,
    pub limits: DecodeLimits,
    pub cancel: CancelToken,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: shared_utils::get_optimal_threads(),
            limits: DecodeLimits::default(),
            cancel: CancelToken::new(),
        }
    }
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strictly sequential processing, one item at a time.
    pub fn sequential() -> Self {
        Self::default().with_workers(1)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedOutput {
    pub name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub name: String,
    pub reason: String,
}

/// Everything a caller gets back from one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub config: Option<ConversionConfig>,
    pub summary: BatchSummary,
    /// Successful outputs in input order, names unique case-insensitively
    pub outputs: Vec<NamedOutput>,
    /// Failed items in input order
    pub failures: Vec<ItemFailure>,
    pub cancelled: bool,
}

impl BatchReport {
    /// First `n` outputs, for previews.
    pub fn preview(&self, n: usize) -> &[NamedOutput] {
        &self.outputs[..n.min(self.outputs.len())]
    }

    pub fn output_bytes(&self) -> u64 {
        self.outputs.iter().map(|o| o.bytes.len() as u64).sum()
    }

    /// Pack all outputs into a ZIP archive. The report stays usable if this fails.
    pub fn pack(&self) -> Result<Vec<u8>> {
        self.pack_with(ArchiveCompression::default())
    }

    pub fn pack_with(&self, compression: ArchiveCompression) -> Result<Vec<u8>> {
        crate::archive::pack_with(
            self.outputs
                .iter()
                .map(|o| (o.name.as_str(), o.bytes.as_slice())),
            compression,
        )
    }

    /// Pack and keep the report, pairing it with the archive result.
    pub fn into_archive(self) -> (Self, Result<Vec<u8>>) {
        let archive = pack(
            self.outputs
                .iter()
                .map(|o| (o.name.as_str(), o.bytes.as_slice())),
        );
        (self, archive)
    }
}

/// Convert a batch with the libheif decoder.
///
/// Fails fast with [`ConvertError::Config`] before touching any item when
/// `config` is invalid.
pub fn run_batch<F>(
    items: &[InputItem],
    config: &ConversionConfig,
    options: &BatchOptions,
    on_progress: F,
) -> Result<BatchReport>
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    run_batch_with_decoder(LibHeifDecoder, items, config, options, on_progress)
}

pub fn run_batch_with_decoder<D, F>(
    decoder: D,
    items: &[InputItem],
    config: &ConversionConfig,
    options: &BatchOptions,
    on_progress: F,
) -> Result<BatchReport>
where
    D: HeicDecoder,
    F: Fn(&ProgressEvent) + Send + Sync,
{
    let pipeline = ConversionPipeline::with_decoder(decoder, config)?.with_limits(options.limits);
    let config = *pipeline.config();
    let total = items.len();
    let start = Instant::now();

    info!(
        total,
        format = %config.format,
        quality = ?config.jpeg_quality(),
        workers = options.workers,
        "Starting batch"
    );

    let completed = AtomicUsize::new(0);
    let process = |(index, item): (usize, &InputItem)| -> Option<ConversionResult> {
        if options.cancel.is_cancelled() {
            return None;
        }
        let result = pipeline.convert_one(item);
        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        on_progress(&ProgressEvent {
            index,
            completed: done,
            total,
            name: item.name.clone(),
            succeeded: result.is_success(),
        });
        Some(result)
    };

    let slots: Vec<Option<ConversionResult>> = if options.workers <= 1 || total <= 1 {
        items.iter().enumerate().map(process).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers.min(total))
            .thread_name(|i| format!("heic-convert-{}", i))
            .build()
            .map_err(|e| ConvertError::Config(format!("Failed to create thread pool: {}", e)))?;
        pool.install(|| items.par_iter().enumerate().map(&process).collect())
    };

    let mut report = assemble(items, slots);
    report.config = Some(config);

    if report.cancelled {
        warn!(
            skipped = report.summary.skipped,
            "Batch cancelled before all items started"
        );
    }
    info!(
        total = report.summary.total,
        succeeded = report.summary.succeeded,
        failed = report.summary.failed,
        skipped = report.summary.skipped,
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Batch finished"
    );

    Ok(report)
}

/// Fold per-item slots (input order) into a report, de-duplicating names.
fn assemble(items: &[InputItem], slots: Vec<Option<ConversionResult>>) -> BatchReport {
    let mut report = BatchReport::default();
    let mut namer = OutputNamer::new();

    for (item, slot) in items.iter().zip(slots) {
        match slot {
            None => report.summary.skip(),
            Some(ConversionResult::Success { output_name, bytes }) => {
                let name = namer.claim(&output_name);
                if name != output_name {
                    debug!(item = %item.name, from = %output_name, to = %name, "renamed duplicate output");
                }
                report.outputs.push(NamedOutput { name, bytes });
                report.summary.success();
            }
            Some(ConversionResult::Failure { input_name, reason }) => {
                report.failures.push(ItemFailure {
                    name: input_name,
                    reason,
                });
                report.summary.fail();
            }
        }
    }

    report.cancelled = report.summary.skipped > 0;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        garbage_item, good_item, heic_item, FakeDecoder, ALPHA_HEIC, OPAQUE_HEIC,
    };
    use std::io::Cursor;
    use std::sync::Mutex;

    fn run(
        items: &[InputItem],
        config: &ConversionConfig,
        options: &BatchOptions,
    ) -> (Result<BatchReport>, Vec<ProgressEvent>) {
        let events = Mutex::new(Vec::new());
        let report = run_batch_with_decoder(FakeDecoder, items, config, options, |e| {
            events.lock().unwrap().push(e.clone())
        });
        (report, events.into_inner().unwrap())
    }

    #[test]
    fn test_garbage_in_middle_is_isolated() {
        let items = vec![good_item("one"), garbage_item("two"), good_item("three")];
        let (report, events) = run(&items, &ConversionConfig::png(), &BatchOptions::sequential());
        let report = report.unwrap();

        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.succeeded, 2);
        assert_eq!(report.summary.failed, 1);
        let names: Vec<_> = report.outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["one.png", "three.png"]);
        assert_eq!(report.failures[0].name, "two");
        assert!(!report.cancelled);

        let indices: Vec<_> = events.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(events[2].completed, 3);
        assert!(!events[1].succeeded);
    }

    #[test]
    fn test_invalid_quality_processes_nothing() {
        let items = vec![good_item("a"), good_item("b")];
        for quality in [0, 101] {
            let (report, events) = run(
                &items,
                &ConversionConfig::jpeg(quality),
                &BatchOptions::sequential(),
            );
            assert!(matches!(report, Err(ConvertError::Config(_))));
            assert!(events.is_empty());
        }
    }

    #[test]
    fn test_empty_batch() {
        let (report, events) = run(&[], &ConversionConfig::png(), &BatchOptions::default());
        let report = report.unwrap();
        assert_eq!(report.summary, BatchSummary::default());
        assert!(report.outputs.is_empty());
        assert!(events.is_empty());

        let archive = report.pack().unwrap();
        let zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        assert_eq!(zip.len(), 0);
    }

    #[test]
    fn test_duplicate_names_survive_into_archive() {
        let items = vec![good_item("IMG_1"), good_item("img_1"), good_item("IMG_1")];
        let (report, _) = run(&items, &ConversionConfig::jpeg(80), &BatchOptions::sequential());
        let report = report.unwrap();

        let names: Vec<_> = report.outputs.iter().map(|o| o.name.clone()).collect();
        assert_eq!(names, vec!["IMG_1.jpg", "img_1_1.jpg", "IMG_1_2.jpg"]);

        let mut zip = zip::ZipArchive::new(Cursor::new(report.pack().unwrap())).unwrap();
        assert_eq!(zip.len(), 3);
        for name in &names {
            assert!(zip.by_name(name).is_ok(), "missing {}", name);
        }
    }

    #[test]
    fn test_parallel_preserves_input_order() {
        let items: Vec<InputItem> = (0..40)
            .map(|i| {
                if i % 7 == 3 {
                    garbage_item(&format!("bad{:02}", i))
                } else {
                    good_item(&format!("img{:02}", i))
                }
            })
            .collect();
        let (report, events) = run(
            &items,
            &ConversionConfig::png(),
            &BatchOptions::new().with_workers(4),
        );
        let report = report.unwrap();

        assert_eq!(report.outputs.len() + report.failures.len(), items.len());
        assert_eq!(report.summary.total, items.len());

        let expected: Vec<String> = items
            .iter()
            .filter(|i| i.name.starts_with("img"))
            .map(|i| format!("{}.png", i.name))
            .collect();
        let got: Vec<String> = report.outputs.iter().map(|o| o.name.clone()).collect();
        assert_eq!(got, expected);

        let mut seen: Vec<usize> = events.iter().map(|e| e.index).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..items.len()).collect::<Vec<_>>());
        assert_eq!(events.iter().map(|e| e.completed).max(), Some(items.len()));
    }

    #[test]
    fn test_cancel_between_items() {
        let items = vec![good_item("a"), good_item("b"), good_item("c")];
        let cancel = CancelToken::new();
        let options = BatchOptions::sequential().with_cancel_token(cancel.clone());

        let report = run_batch_with_decoder(
            FakeDecoder,
            &items,
            &ConversionConfig::png(),
            &options,
            |e| {
                if e.index == 0 {
                    cancel.cancel();
                }
            },
        )
        .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.summary.skipped, 2);
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.outputs[0].name, "a.png");
    }

    #[test]
    fn test_preview_and_totals() {
        let items: Vec<InputItem> = (0..7).map(|i| good_item(&format!("p{}", i))).collect();
        let (report, _) = run(&items, &ConversionConfig::png(), &BatchOptions::sequential());
        let report = report.unwrap();

        assert_eq!(report.preview(5).len(), 5);
        assert_eq!(report.preview(5)[0].name, "p0.png");
        assert_eq!(report.preview(50).len(), 7);
        assert!(report.output_bytes() > 0);
        assert_eq!(report.config, Some(ConversionConfig::png()));
    }

    #[test]
    fn test_into_archive_keeps_report() {
        let items = vec![good_item("x"), garbage_item("y")];
        let (report, _) = run(&items, &ConversionConfig::png(), &BatchOptions::sequential());
        let (report, archive) = report.unwrap().into_archive();
        assert_eq!(report.summary.failed, 1);
        let zip = zip::ZipArchive::new(Cursor::new(archive.unwrap())).unwrap();
        assert_eq!(zip.len(), 1);
    }

    #[test]
    fn test_report_json_omits_bytes() {
        let items = vec![good_item("x"), garbage_item("y")];
        let (report, _) = run(&items, &ConversionConfig::jpeg(70), &BatchOptions::sequential());
        let json = serde_json::to_value(report.unwrap()).unwrap();
        assert_eq!(json["summary"]["succeeded"], 1);
        assert_eq!(json["outputs"][0]["name"], "x.jpg");
        assert!(json["outputs"][0].get("bytes").is_none());
        assert_eq!(json["failures"][0]["name"], "y");
        assert_eq!(json["config"]["quality"], 70);
    }

    #[test]
    fn test_real_heic_batch_isolates_garbage() {
        let items = vec![
            heic_item("IMG_0001", OPAQUE_HEIC),
            garbage_item("IMG_0002"),
            heic_item("IMG_0003", ALPHA_HEIC),
        ];
        for (config, ext) in [
            (ConversionConfig::png(), "png"),
            (ConversionConfig::jpeg(90), "jpg"),
        ] {
            let events = Mutex::new(Vec::new());
            let report = run_batch(&items, &config, &BatchOptions::sequential(), |e| {
                events.lock().unwrap().push(e.succeeded)
            })
            .unwrap();

            assert_eq!(report.summary.total, 3);
            assert_eq!(report.summary.succeeded, 2);
            assert_eq!(report.summary.failed, 1);
            assert_eq!(events.into_inner().unwrap(), vec![true, false, true]);
            assert_eq!(report.failures[0].name, "IMG_0002");

            let names: Vec<_> = report.outputs.iter().map(|o| o.name.clone()).collect();
            assert_eq!(
                names,
                vec![format!("IMG_0001.{}", ext), format!("IMG_0003.{}", ext)]
            );
            for output in &report.outputs {
                let decoded = image::load_from_memory(&output.bytes).unwrap();
                assert_eq!((decoded.width(), decoded.height()), (16, 12));
            }

            let mut zip = zip::ZipArchive::new(Cursor::new(report.pack().unwrap())).unwrap();
            assert_eq!(zip.len(), 2);
            assert!(zip.by_name(&names[1]).is_ok());
        }
    }

    #[test]
    fn test_real_heic_parallel_matches_sequential() {
        let items: Vec<InputItem> = (0..6)
            .map(|i| {
                let bytes = if i % 2 == 0 { OPAQUE_HEIC } else { ALPHA_HEIC };
                heic_item(&format!("shot{}", i), bytes)
            })
            .collect();
        let config = ConversionConfig::png();
        let seq = run_batch(&items, &config, &BatchOptions::sequential(), |_| {}).unwrap();
        let par = run_batch(&items, &config, &BatchOptions::new().with_workers(3), |_| {}).unwrap();
        assert_eq!(seq.summary.succeeded, 6);
        assert_eq!(seq.outputs, par.outputs);
    }
}
