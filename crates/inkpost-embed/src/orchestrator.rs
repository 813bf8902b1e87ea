// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch orchestration — scan, resolve, fan out one blocking task per local
// image, then write every result back to the node it came from.
//
// Every task is issued up front, but at most `concurrency_limit()` of them
// hold a decoded image at any moment; the rest wait on a semaphore.
//
// Tasks share nothing mutable: the codec, reader, and configuration are
// behind `Arc`s and only read. The document is touched once, after every
// task has succeeded, so a failure leaves it exactly as it was.

use std::path::Path;
use std::sync::Arc;

use inkpost_core::error::{InkpostError, Result};
use inkpost_core::{Document, EmbedConfig, EncodingOutcome, NodeId, SourceType};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

use crate::codec::{ImageCodec, RasterCodec};
use crate::encoder::BudgetEncoder;
use crate::scan::{ResolvedSource, resolve, scan};
use crate::source::{FsReader, SourceReader};

/// Counts from a single embedding pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedReport {
    /// Local images replaced by data URIs.
    pub embedded: usize,
    /// `http(s)` references left untouched.
    pub remote: usize,
    /// `data:` references left untouched.
    pub already_embedded: usize,
    /// Total raw payload bytes written.
    pub payload_bytes: usize,
}

/// Replaces local `img` sources with budgeted inline data URIs.
#[derive(Clone)]
pub struct ImageEmbedder {
    codec: Arc<dyn ImageCodec>,
    reader: Arc<dyn SourceReader>,
    config: Arc<EmbedConfig>,
}

impl ImageEmbedder {
    pub fn new(
        codec: Arc<dyn ImageCodec>,
        reader: Arc<dyn SourceReader>,
        config: EmbedConfig,
    ) -> Self {
        Self {
            codec,
            reader,
            config: Arc::new(config),
        }
    }

    /// Filesystem reader and the `image`-backed codec.
    pub fn with_config(config: EmbedConfig) -> Self {
        Self::new(Arc::new(RasterCodec), Arc::new(FsReader), config)
    }

    /// Transform `doc` and hand it back. Running this on its own output is a
    /// no-op, since every local source has become a `data:` URI.
    pub async fn process(&self, mut doc: Document, base_dir: &Path) -> Result<Document> {
        self.embed(&mut doc, base_dir).await?;
        Ok(doc)
    }

    /// Embed every local image in `doc`, in place.
    ///
    /// Fails on the first missing file (before anything is read) or the first
    /// task error; in both cases `doc` is left unmodified.
    #[instrument(skip_all, fields(base_dir = %base_dir.display()))]
    pub async fn embed(&self, doc: &mut Document, base_dir: &Path) -> Result<EmbedReport> {
        let references = scan(doc);
        let mut report = EmbedReport::default();
        for reference in &references {
            match reference.source_type {
                SourceType::Remote => report.remote += 1,
                SourceType::AlreadyEmbedded => report.already_embedded += 1,
                SourceType::Local => {}
            }
        }

        let sources = resolve(
            &references,
            base_dir,
            self.reader.as_ref(),
            self.config.strict_formats,
        )?;
        if sources.is_empty() {
            debug!(total = references.len(), "no local images to embed");
            return Ok(report);
        }
        let limit = self.config.concurrency_limit();
        info!(count = sources.len(), limit, "embedding local images");

        let permits = Arc::new(Semaphore::new(limit));
        let mut tasks = JoinSet::new();
        for source in sources {
            let codec = Arc::clone(&self.codec);
            let reader = Arc::clone(&self.reader);
            let config = Arc::clone(&self.config);
            let permits = Arc::clone(&permits);
            tasks.spawn(gated_encode(permits, source, codec, reader, config));
        }

        // Dropping the set on an early return aborts whatever is still
        // waiting for a permit.
        let mut results: Vec<(NodeId, EncodingOutcome)> = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let result = joined.map_err(|err| InkpostError::Task(err.to_string()))?;
            results.push(result?);
        }

        for (node, outcome) in results {
            report.embedded += 1;
            report.payload_bytes += outcome.len();
            doc.set_attribute(node, "src", outcome.to_data_uri());
        }
        info!(
            embedded = report.embedded,
            payload_bytes = report.payload_bytes,
            "images embedded"
        );
        Ok(report)
    }
}

/// Wait for a permit, then encode on the blocking pool. The permit is held
/// until the blocking work returns.
async fn gated_encode(
    permits: Arc<Semaphore>,
    source: ResolvedSource,
    codec: Arc<dyn ImageCodec>,
    reader: Arc<dyn SourceReader>,
    config: Arc<EmbedConfig>,
) -> Result<(NodeId, EncodingOutcome)> {
    let permit = permits
        .acquire_owned()
        .await
        .map_err(|err| InkpostError::Task(err.to_string()))?;
    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        encode_source(&source, codec.as_ref(), reader.as_ref(), &config)
    })
    .await
    .map_err(|err| InkpostError::Task(err.to_string()))?
}

fn encode_source(
    source: &ResolvedSource,
    codec: &dyn ImageCodec,
    reader: &dyn SourceReader,
    config: &EmbedConfig,
) -> Result<(NodeId, EncodingOutcome)> {
    let bytes = reader.read_bytes(&source.absolute_path)?;
    let source_id = source.absolute_path.display().to_string();
    let outcome = BudgetEncoder::new(codec, config).encode(&bytes, source.kind, source.mime, &source_id)?;
    Ok((source.reference.node, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{EncodeParams, ImageInfo};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MemoryReader {
        files: HashMap<PathBuf, Vec<u8>>,
        exists_calls: AtomicUsize,
        reads: AtomicUsize,
    }

    impl MemoryReader {
        fn with(files: &[(&str, &[u8])]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(p, b)| (Path::new("/docs").join(p), b.to_vec()))
                    .collect(),
                ..Default::default()
            }
        }
    }

    impl SourceReader for MemoryReader {
        fn exists(&self, path: &Path) -> bool {
            self.exists_calls.fetch_add(1, Ordering::SeqCst);
            self.files.contains_key(path)
        }

        fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| InkpostError::SourceNotFound {
                    path: path.to_path_buf(),
                })
        }
    }

    /// Probes every image as 200x200 and encodes to a fixed 10 bytes; input
    /// starting with `bad` fails to decode.
    #[derive(Default)]
    struct CountingCodec {
        calls: AtomicUsize,
    }

    impl ImageCodec for CountingCodec {
        fn probe(&self, bytes: &[u8]) -> Result<ImageInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if bytes.starts_with(b"bad") {
                return Err(InkpostError::CodecFailure("corrupt".into()));
            }
            Ok(ImageInfo {
                width: 200,
                height: 200,
                has_alpha: false,
            })
        }

        fn encode(&self, _bytes: &[u8], _params: &EncodeParams) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1u8; 10])
        }
    }

    /// Sleeps while probing and records how many probes overlap.
    #[derive(Default)]
    struct SlowCodec {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ImageCodec for SlowCodec {
        fn probe(&self, _bytes: &[u8]) -> Result<ImageInfo> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(ImageInfo {
                width: 200,
                height: 200,
                has_alpha: false,
            })
        }

        fn encode(&self, _bytes: &[u8], _params: &EncodeParams) -> Result<Vec<u8>> {
            Ok(vec![1u8; 10])
        }
    }

    fn embedder(reader: &Arc<MemoryReader>, codec: &Arc<CountingCodec>) -> ImageEmbedder {
        ImageEmbedder::new(
            Arc::clone(codec) as Arc<dyn ImageCodec>,
            Arc::clone(reader) as Arc<dyn SourceReader>,
            EmbedConfig::default(),
        )
    }

    fn doc_with(srcs: &[&str]) -> (Document, Vec<NodeId>) {
        let mut doc = Document::new();
        let root = doc.root();
        let ids = srcs
            .iter()
            .map(|src| doc.append_element(root, "img", &[("src", src)]))
            .collect();
        (doc, ids)
    }

    #[tokio::test]
    async fn zero_references_touch_nothing() {
        let reader = Arc::new(MemoryReader::default());
        let codec = Arc::new(CountingCodec::default());
        let mut doc = Document::new();
        let root = doc.root();
        let p = doc.append_element(root, "p", &[]);
        doc.append_text(p, "no images here");

        let report = embedder(&reader, &codec)
            .embed(&mut doc, Path::new("/docs"))
            .await
            .unwrap();
        assert_eq!(report, EmbedReport::default());
        assert_eq!(reader.exists_calls.load(Ordering::SeqCst), 0);
        assert_eq!(reader.reads.load(Ordering::SeqCst), 0);
        assert_eq!(codec.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_and_embedded_are_identity() {
        let reader = Arc::new(MemoryReader::default());
        let codec = Arc::new(CountingCodec::default());
        let srcs = ["https://example.com/img.png", "data:image/png;base64,abc123"];
        let (mut doc, ids) = doc_with(&srcs);

        let report = embedder(&reader, &codec)
            .embed(&mut doc, Path::new("/docs"))
            .await
            .unwrap();
        assert_eq!(report.remote, 1);
        assert_eq!(report.already_embedded, 1);
        for (id, src) in ids.iter().zip(srcs) {
            assert_eq!(doc.attribute(*id, "src"), Some(src));
        }
        assert_eq!(reader.exists_calls.load(Ordering::SeqCst), 0);
        assert_eq!(reader.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_source_fails_before_any_work() {
        let reader = Arc::new(MemoryReader::with(&[("images/ok.png", b"png")]));
        let codec = Arc::new(CountingCodec::default());
        let (mut doc, _) = doc_with(&["images/ok.png", "images/missing.png"]);
        let before = doc.clone();

        let err = embedder(&reader, &codec)
            .embed(&mut doc, Path::new("/docs"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InkpostError::SourceNotFound { path } if path == Path::new("/docs/images/missing.png")
        ));
        assert_eq!(reader.reads.load(Ordering::SeqCst), 0);
        assert_eq!(codec.calls.load(Ordering::SeqCst), 0);
        assert_eq!(doc, before);
    }

    #[tokio::test]
    async fn results_land_on_their_own_nodes() {
        let reader = Arc::new(MemoryReader::with(&[
            ("a.svg", b"<svg id='a'/>"),
            ("b.svg", b"<svg id='b'/>"),
            ("c.png", b"raster"),
        ]));
        let codec = Arc::new(CountingCodec::default());
        let (mut doc, ids) = doc_with(&["a.svg", "b.svg", "c.png"]);

        let report = embedder(&reader, &codec)
            .embed(&mut doc, Path::new("/docs"))
            .await
            .unwrap();
        assert_eq!(report.embedded, 3);
        assert_eq!(
            doc.attribute(ids[0], "src"),
            Some(EncodingOutcome::new("image/svg+xml", b"<svg id='a'/>".to_vec()).to_data_uri().as_str())
        );
        assert_eq!(
            doc.attribute(ids[1], "src"),
            Some(EncodingOutcome::new("image/svg+xml", b"<svg id='b'/>".to_vec()).to_data_uri().as_str())
        );
        assert!(doc.attribute(ids[2], "src").unwrap().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn second_pass_does_no_work() {
        let reader = Arc::new(MemoryReader::with(&[("a.svg", b"<svg/>"), ("b.png", b"raster")]));
        let codec = Arc::new(CountingCodec::default());
        let (doc, _) = doc_with(&["a.svg", "b.png"]);
        let embedder = embedder(&reader, &codec);

        let once = embedder.process(doc, Path::new("/docs")).await.unwrap();
        let reads = reader.reads.load(Ordering::SeqCst);
        let calls = codec.calls.load(Ordering::SeqCst);
        assert_eq!(reads, 2);

        let twice = embedder.process(once.clone(), Path::new("/docs")).await.unwrap();
        assert_eq!(twice, once);
        assert_eq!(reader.reads.load(Ordering::SeqCst), reads);
        assert_eq!(codec.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn one_failure_aborts_without_partial_commit() {
        let reader = Arc::new(MemoryReader::with(&[("good.svg", b"<svg/>"), ("bad.png", b"bad bytes")]));
        let codec = Arc::new(CountingCodec::default());
        let (mut doc, _) = doc_with(&["good.svg", "bad.png"]);
        let before = doc.clone();

        let err = embedder(&reader, &codec)
            .embed(&mut doc, Path::new("/docs"))
            .await
            .unwrap_err();
        assert!(matches!(err, InkpostError::CodecFailure(_)));
        assert_eq!(doc, before);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn decodes_never_exceed_concurrency_limit() {
        let names: Vec<String> = (0..24).map(|i| format!("img{i}.png")).collect();
        let files: Vec<(&str, &[u8])> = names.iter().map(|n| (n.as_str(), &b"raster"[..])).collect();
        let reader = Arc::new(MemoryReader::with(&files));
        let codec = Arc::new(SlowCodec::default());
        let srcs: Vec<&str> = names.iter().map(String::as_str).collect();
        let (mut doc, ids) = doc_with(&srcs);

        let embedder = ImageEmbedder::new(
            Arc::clone(&codec) as Arc<dyn ImageCodec>,
            Arc::clone(&reader) as Arc<dyn SourceReader>,
            EmbedConfig {
                max_concurrency: Some(3),
                ..Default::default()
            },
        );
        let report = embedder.embed(&mut doc, Path::new("/docs")).await.unwrap();

        assert_eq!(report.embedded, 24);
        let peak = codec.peak.load(Ordering::SeqCst);
        assert!((1..=3).contains(&peak), "peak concurrent decodes = {peak}");
        assert!(ids.iter().all(|id| doc.attribute(*id, "src").unwrap().starts_with("data:image/png;base64,")));
    }
}
