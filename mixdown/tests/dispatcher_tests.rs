//! Dispatcher integration tests
//!
//! Real codec, real files: ordering across worker counts and isolation of
//! per-file failures.

mod helpers;

use helpers::{generate_test_library, generate_test_wav, AudioConfig, RecordingSink};
use mixdown::audio::{AudioCodec, SymphoniaCodec};
use mixdown::services::{Dispatcher, FileScanner};
use mixdown_common::{NormalizationTarget, ProgressEvent};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn codec() -> Arc<dyn AudioCodec> {
    Arc::new(SymphoniaCodec::new())
}

fn short_tone() -> AudioConfig {
    AudioConfig {
        duration_seconds: 0.2,
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_order_independent_of_worker_count() {
    let input = TempDir::new().unwrap();
    generate_test_library(input.path(), 8, &short_tone()).unwrap();
    let scan = FileScanner::new().scan(input.path()).unwrap();

    let mut orders = Vec::new();
    for workers in [1, 4] {
        let scratch = TempDir::new().unwrap();
        let dispatcher = Dispatcher::new(
            codec(),
            NormalizationTarget::default(),
            scratch.path(),
            workers,
        );
        let report = dispatcher
            .dispatch(scan.items.clone(), &mixdown::progress::NoProgress)
            .await;

        assert!(report.failures.is_empty());
        orders.push(
            report
                .artifacts
                .iter()
                .map(|a| (a.index, a.source_path.clone()))
                .collect::<Vec<_>>(),
        );
    }

    assert_eq!(orders[0], orders[1]);
    let expected: Vec<(usize, PathBuf)> = scan
        .items
        .iter()
        .map(|item| (item.index, item.path.clone()))
        .collect();
    assert_eq!(orders[0], expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_corrupt_file_is_excluded_and_named() {
    let input = TempDir::new().unwrap();
    generate_test_wav(&input.path().join("a_good.wav"), &short_tone()).unwrap();
    std::fs::write(input.path().join("b_broken.mp3"), b"this is not an mp3 stream").unwrap();
    generate_test_wav(&input.path().join("c_good.wav"), &short_tone()).unwrap();

    let scan = FileScanner::new().scan(input.path()).unwrap();
    let scratch = TempDir::new().unwrap();
    let dispatcher = Dispatcher::new(codec(), NormalizationTarget::default(), scratch.path(), 2);

    let report = dispatcher
        .dispatch(scan.items, &mixdown::progress::NoProgress)
        .await;

    assert_eq!(report.artifacts.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].path.ends_with("b_broken.mp3"));
    assert_eq!(report.artifacts[0].index, 0);
    assert_eq!(report.artifacts[1].index, 2);
    assert_eq!(dispatcher.completed(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_intermediates_are_normalized() {
    let input = TempDir::new().unwrap();
    generate_test_wav(
        &input.path().join("mono_22k.wav"),
        &AudioConfig {
            duration_seconds: 0.5,
            sample_rate: 22050,
            channels: 1,
            ..Default::default()
        },
    )
    .unwrap();

    let scan = FileScanner::new().scan(input.path()).unwrap();
    let scratch = TempDir::new().unwrap();
    let dispatcher = Dispatcher::new(codec(), NormalizationTarget::default(), scratch.path(), 1);
    let report = dispatcher
        .dispatch(scan.items, &mixdown::progress::NoProgress)
        .await;

    let artifact = &report.artifacts[0];
    assert!(artifact.scratch_path.starts_with(scratch.path()));
    let reader = hound::WavReader::open(&artifact.scratch_path).unwrap();
    assert_eq!(reader.spec().sample_rate, 44100);
    assert_eq!(reader.spec().channels, 2);
    let frames = reader.duration() as i64;
    assert!((frames - 22050).abs() < 256, "unexpected frame count {frames}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_colliding_stems_keep_distinct_intermediates() {
    let input = TempDir::new().unwrap();
    generate_test_wav(&input.path().join("song.wav"), &short_tone()).unwrap();
    generate_test_wav(&input.path().join("song.WAV"), &short_tone()).unwrap();

    let scan = FileScanner::new().scan(input.path()).unwrap();
    assert_eq!(scan.items.len(), 2);

    let scratch = TempDir::new().unwrap();
    let dispatcher = Dispatcher::new(codec(), NormalizationTarget::default(), scratch.path(), 2);
    let report = dispatcher
        .dispatch(scan.items, &mixdown::progress::NoProgress)
        .await;

    assert_eq!(report.artifacts.len(), 2);
    assert_ne!(report.artifacts[0].scratch_path, report.artifacts[1].scratch_path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_progress_counts_every_file_once() {
    let input = TempDir::new().unwrap();
    generate_test_library(input.path(), 5, &short_tone()).unwrap();
    std::fs::write(input.path().join("zz_broken.ogg"), b"garbage").unwrap();

    let scan = FileScanner::new().scan(input.path()).unwrap();
    let scratch = TempDir::new().unwrap();
    let dispatcher = Dispatcher::new(codec(), NormalizationTarget::default(), scratch.path(), 3);
    let sink = RecordingSink::default();

    dispatcher.dispatch(scan.items, &sink).await;

    let completed: Vec<usize> = sink
        .events()
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::TranscodeAdvanced { completed, .. } => Some(*completed),
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(
        sink.events().last(),
        Some(&ProgressEvent::TranscodeFinished {
            succeeded: 5,
            failed: 1
        })
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_completed_counter_reaches_item_count() {
    let input = TempDir::new().unwrap();
    generate_test_library(input.path(), 4, &short_tone()).unwrap();
    std::fs::write(input.path().join("zz_broken.flac"), b"not flac").unwrap();

    let scan = FileScanner::new().scan(input.path()).unwrap();
    let total = scan.items.len();
    let scratch = TempDir::new().unwrap();
    let dispatcher = Dispatcher::new(codec(), NormalizationTarget::default(), scratch.path(), 2);
    assert_eq!(dispatcher.completed(), 0);

    dispatcher
        .dispatch(scan.items, &mixdown::progress::NoProgress)
        .await;

    assert_eq!(dispatcher.completed(), total);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_completed_handle_never_decreases_while_running() {
    let input = TempDir::new().unwrap();
    generate_test_library(input.path(), 10, &short_tone()).unwrap();

    let scan = FileScanner::new().scan(input.path()).unwrap();
    let total = scan.items.len();
    let scratch = TempDir::new().unwrap();
    let dispatcher = Dispatcher::new(codec(), NormalizationTarget::default(), scratch.path(), 3);

    let handle = dispatcher.completed_handle();
    let done = Arc::new(AtomicBool::new(false));
    let poller = tokio::spawn({
        let done = Arc::clone(&done);
        async move {
            let mut samples = Vec::new();
            while !done.load(Ordering::Acquire) {
                samples.push(handle.load(Ordering::Relaxed));
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            samples.push(handle.load(Ordering::Relaxed));
            samples
        }
    });

    dispatcher
        .dispatch(scan.items, &mixdown::progress::NoProgress)
        .await;
    done.store(true, Ordering::Release);
    let samples = poller.await.unwrap();

    assert!(
        samples.windows(2).all(|w| w[0] <= w[1]),
        "counter went backwards: {samples:?}"
    );
    assert!(samples.iter().all(|&n| n <= total));
    assert_eq!(samples.last(), Some(&total));
}
