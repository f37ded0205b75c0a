//! Unit tests for region_stats modules
//!
//! These tests cover partitioning, the worker reductions, the engine, the
//! aggregator and the public entry points against in-memory images.

use ndarray::Array2;
use region_stats::{
    bounds::{Bounds, BoundingBox},
    data_source::{ImageNode, NodeResolver},
    engine::{self, JobResult},
    errors::{RegionStatsError, Result},
    memory::{MemoryHost, MemoryImage},
    parallel::{get_parallel_info, ParallelConfig},
    progress::{
        drive, progress_percent, CancellationToken, ConsoleProgress, DriveStatus, ProgressTask,
        SilentProgress,
    },
    statistics::{
        aggregate_centroid, aggregate_max, centroid_partial, max_partial, CentroidPartial,
        RegionJob, RegionStats, StatOperation,
    },
};
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const EPS: f64 = 1e-9;

fn host_with(image: MemoryImage) -> (MemoryHost, Arc<MemoryImage>) {
    let mut host = MemoryHost::new();
    let node = host.insert(image);
    (host, node)
}

fn stats_for(host: MemoryHost, workers: usize) -> RegionStats<MemoryHost> {
    RegionStats::new(host).with_config(ParallelConfig::with_threads(workers))
}

/// Node that fails to sample one pixel
struct FaultyNode {
    name: String,
    bbox: BoundingBox,
    bad_pixel: (i32, i32),
}

impl ImageNode for FaultyNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn bbox(&self) -> Result<BoundingBox> {
        Ok(self.bbox)
    }

    fn sample(&self, _channel: &str, x: i32, y: i32) -> Result<f32> {
        if (x, y) == self.bad_pixel {
            Err(RegionStatsError::Generic(format!("bad pixel ({x}, {y})")))
        } else {
            Ok(1.0)
        }
    }
}

struct FaultyHost {
    bad_pixel: (i32, i32),
}

impl FaultyHost {
    fn node(&self) -> FaultyNode {
        FaultyNode {
            name: "faulty".to_string(),
            bbox: BoundingBox::new(0, 0, 20, 20),
            bad_pixel: self.bad_pixel,
        }
    }
}

impl NodeResolver for FaultyHost {
    type Node = FaultyNode;

    fn resolve(&self, _node_name: &str) -> Result<FaultyNode> {
        Ok(self.node())
    }
}

/// Progress task that cancels once it has received `limit` updates
struct CancelAfter {
    limit: usize,
    updates: Vec<u8>,
}

impl ProgressTask for CancelAfter {
    fn set_progress(&mut self, percent: u8) {
        self.updates.push(percent);
    }

    fn is_cancelled(&self) -> bool {
        self.updates.len() >= self.limit
    }
}

#[test]
fn test_error_types() {
    let err = RegionStatsError::ChannelNotFound {
        node: "plate".to_string(),
        channel: "alpha".to_string(),
    };
    assert_eq!(format!("{}", err), "Channel 'alpha' not found in node 'plate'");

    let err = RegionStatsError::ReductionFailed {
        operation: "centroid",
        job: Some(3),
        message: "bad pixel".to_string(),
    };
    assert_eq!(format!("{}", err), "Failed to compute centroid (job 3): bad pixel");

    let err = RegionStatsError::InvalidStep(0);
    assert!(format!("{}", err).contains("step must be at least 1"));

    let generic: RegionStatsError = "Test error".into();
    assert_eq!(format!("{}", generic), "Test error");
}

#[test]
fn test_parallel_config() {
    let default_config = ParallelConfig::default();
    assert!(default_config.num_threads.is_none());
    assert!(default_config.worker_count() > 0);

    let config_4 = ParallelConfig::with_threads(4);
    assert_eq!(config_4.num_threads, Some(4));
    assert_eq!(config_4.worker_count(), 4);

    // Zero threads still means one worker
    assert_eq!(ParallelConfig::with_threads(0).worker_count(), 1);

    let all_cores = ParallelConfig::all_cores();
    assert!(all_cores.num_threads.unwrap() > 0);
}

#[test]
fn test_build_pool() -> Result<()> {
    let pool = ParallelConfig::with_threads(3).build_pool()?;
    assert_eq!(pool.current_num_threads(), 3);
    Ok(())
}

#[test]
fn test_parallel_info() {
    let info = get_parallel_info();
    assert!(info.available_cores > 0);
    assert!(info.physical_cores > 0);
    assert!(info.available_parallelism > 0);

    info.print_info();
}

#[test]
fn test_stat_operation() {
    assert_eq!(StatOperation::Centroid.as_str(), "centroid");
    assert_eq!(StatOperation::MaxValue.to_string(), "max value");
    assert_eq!(
        StatOperation::MaxValue.progress_message(),
        "Calculating max value..."
    );
}

#[test]
fn test_bounds_construction() -> Result<()> {
    let bounds = Bounds::new(-2, 3, 5, 3)?;
    assert_eq!(bounds.width(), 8);
    assert_eq!(bounds.height(), 1);
    assert_eq!(bounds.area(), 8);
    assert!(bounds.contains(-2, 3));
    assert!(!bounds.contains(6, 3));

    match Bounds::new(5, 0, 4, 0) {
        Err(RegionStatsError::InvalidRegion { .. }) => {}
        other => panic!("Expected InvalidRegion, got {:?}", other),
    }

    let from_bbox = Bounds::from_bbox(BoundingBox::new(10, 20, 4, 3))?;
    assert_eq!(from_bbox, Bounds::new(10, 20, 13, 22)?);

    assert!(Bounds::from_bbox(BoundingBox::new(0, 0, 0, 5)).is_err());
    assert!(Bounds::from_bbox(BoundingBox::new(i32::MAX, 0, 2, 1)).is_err());

    Ok(())
}

fn pixel_counts(regions: &[Bounds]) -> HashMap<(i32, i32), usize> {
    let mut counts = HashMap::new();
    for region in regions {
        for pixel in region.sample_points(1) {
            *counts.entry(pixel).or_insert(0) += 1;
        }
    }
    counts
}

#[test]
fn test_partition_covers_region_exactly() -> Result<()> {
    let regions = [
        Bounds::new(0, 0, 0, 0)?,
        Bounds::new(-3, 4, 9, 4)?,
        Bounds::new(2, -5, 2, 7)?,
        Bounds::new(0, 0, 6, 2)?,
        Bounds::new(-10, -10, 13, 21)?,
    ];

    for region in regions {
        for workers in 1..=12 {
            let parts = region.partition(workers);
            assert!(!parts.is_empty());
            assert!(parts.len() <= workers);

            let counts = pixel_counts(&parts);
            assert_eq!(counts.len() as u64, region.area(), "{region} into {workers}");
            assert!(counts.values().all(|&n| n == 1), "overlap in {region}");
            assert!(counts.keys().all(|&(x, y)| region.contains(x, y)));
        }
    }

    Ok(())
}

#[test]
fn test_partition_single_pixel_and_zero_parts() -> Result<()> {
    let pixel = Bounds::new(4, 4, 4, 4)?;
    assert_eq!(pixel.partition(8), vec![pixel]);
    assert_eq!(pixel.partition(0), vec![pixel]);
    Ok(())
}

#[test]
fn test_partition_aligned_keeps_sample_set() -> Result<()> {
    let region = Bounds::new(-3, 1, 17, 30)?;

    for step in 1..=7 {
        let expected: HashSet<(i32, i32)> = region.sample_points(step).collect();
        for workers in 1..=9 {
            let parts = region.partition_aligned(workers, step);
            assert_eq!(pixel_counts(&parts).len() as u64, region.area());

            let sampled: Vec<(i32, i32)> =
                parts.iter().flat_map(|p| p.sample_points(step)).collect();
            assert_eq!(sampled.len(), expected.len(), "step {step}, {workers} workers");
            assert_eq!(sampled.into_iter().collect::<HashSet<_>>(), expected);
        }
    }

    Ok(())
}

#[test]
fn test_sample_count_shrinks_with_step() -> Result<()> {
    let region = Bounds::new(0, 0, 15, 15)?;
    assert_eq!(region.sample_count(1), 256);
    assert_eq!(region.sample_count(2), 64);
    assert_eq!(region.sample_count(4), 16);
    assert_eq!(region.sample_points(4).count(), 16);

    let odd = Bounds::new(0, 0, 9, 6)?;
    for step in 1..=10 {
        assert_eq!(odd.sample_points(step).count() as u64, odd.sample_count(step));
    }
    assert_eq!(odd.sample_count(10), 1);

    Ok(())
}

#[test]
fn test_area_of_huge_regions_does_not_overflow() -> Result<()> {
    let widest = Bounds::from_bbox(BoundingBox::new(i32::MIN, i32::MIN, u32::MAX, u32::MAX))?;
    assert_eq!(widest.area(), u64::from(u32::MAX) * u64::from(u32::MAX));
    assert_eq!(widest.sample_count(2), (1u64 << 31) * (1u64 << 31));

    let plane = Bounds::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX)?;
    assert_eq!(plane.area(), u64::MAX);
    assert_eq!(plane.sample_count(1 << 16), 1 << 32);

    Ok(())
}

#[test]
fn test_centroid_partial_merge_matches_single_pass() {
    let samples: Vec<(f64, f64, f64)> = (0..50)
        .map(|i| (f64::from(i % 7), f64::from(i / 7), f64::from(i % 5) * 0.25))
        .collect();

    let mut whole = CentroidPartial::default();
    for &(x, y, w) in &samples {
        whole.push(x, y, w);
    }

    let (head, tail) = samples.split_at(13);
    let mut a = CentroidPartial::default();
    let mut b = CentroidPartial::default();
    head.iter().for_each(|&(x, y, w)| a.push(x, y, w));
    tail.iter().for_each(|&(x, y, w)| b.push(x, y, w));

    let merged = a.merge(b);
    assert_eq!(merged.samples, whole.samples);
    assert!((merged.mean_x - whole.mean_x).abs() < EPS);
    assert!((merged.mean_y - whole.mean_y).abs() < EPS);
    assert!((merged.mean_weight - whole.mean_weight).abs() < EPS);

    assert_eq!(
        CentroidPartial::default().merge(CentroidPartial::default()),
        CentroidPartial::default()
    );
}

#[test]
fn test_worker_reductions() -> Result<()> {
    let (host, _) = host_with(
        MemoryImage::new("ramp", (0, 0), 4, 3).with_channel_fn("alpha", |x, y| (x + y) as f32)?,
    );

    let job = RegionJob::new(Bounds::new(0, 0, 3, 2)?, "ramp", "alpha", 1);
    assert_eq!(max_partial(&host, &job)?, 5.0);

    let partial = centroid_partial(&host, &job)?;
    assert_eq!(partial.samples, 12);
    // Mean of x + y over the 4x3 grid
    assert!((partial.mean_weight - 2.5).abs() < EPS);

    let missing = RegionJob::new(Bounds::new(0, 0, 3, 2)?, "nope", "alpha", 1);
    match centroid_partial(&host, &missing) {
        Err(RegionStatsError::NodeNotFound { node }) => assert_eq!(node, "nope"),
        other => panic!("Expected NodeNotFound, got {:?}", other),
    }

    let outside = RegionJob::new(Bounds::new(0, 0, 4, 2)?, "ramp", "alpha", 1);
    assert!(matches!(
        max_partial(&host, &outside),
        Err(RegionStatsError::SampleOutOfBounds { x: 4, y: 0, .. })
    ));

    Ok(())
}

#[test]
fn test_max_partial_floors_negative_regions_at_zero() -> Result<()> {
    let (host, _) = host_with(
        MemoryImage::new("dark", (0, 0), 5, 5).with_channel("alpha", Array2::from_elem((5, 5), -1.0))?,
    );
    let job = RegionJob::new(Bounds::new(0, 0, 4, 4)?, "dark", "alpha", 1);
    assert_eq!(max_partial(&host, &job)?, 0.0);
    Ok(())
}

#[test]
fn test_memory_image_rejects_wrong_shape() {
    let result = MemoryImage::new("img", (0, 0), 4, 3).with_channel("alpha", Array2::zeros((4, 3)));
    assert!(matches!(result, Err(RegionStatsError::InvalidRegion { .. })));
}

#[test]
fn test_aggregate_failures() {
    let results = vec![
        JobResult {
            job: 0,
            outcome: Ok(1.0),
        },
        JobResult {
            job: 2,
            outcome: Err(RegionStatsError::Generic("first".to_string())),
        },
        JobResult {
            job: 1,
            outcome: Err(RegionStatsError::Generic("second".to_string())),
        },
    ];

    match aggregate_max(&results, false) {
        Err(RegionStatsError::ReductionFailed {
            operation,
            job,
            message,
        }) => {
            assert_eq!(operation, "max value");
            assert_eq!(job, Some(2));
            assert_eq!(message, "first");
        }
        other => panic!("Expected ReductionFailed, got {:?}", other),
    }

    let ok = vec![JobResult {
        job: 0,
        outcome: Ok(CentroidPartial::default()),
    }];
    assert!(matches!(
        aggregate_centroid(&ok, false),
        Err(RegionStatsError::ReductionFailed { job: None, .. })
    ));
}

#[test]
fn test_aggregate_combines_partials() -> Result<()> {
    let maxima: Vec<JobResult<f64>> = [0.5, 3.25, 1.0]
        .iter()
        .enumerate()
        .map(|(job, &v)| JobResult { job, outcome: Ok(v) })
        .collect();
    assert_eq!(aggregate_max(&maxima, true)?, 3.25);
    assert_eq!(aggregate_max(&[], true)?, 0.0);

    let zero = vec![JobResult {
        job: 0,
        outcome: Ok(CentroidPartial {
            samples: 10,
            ..CentroidPartial::default()
        }),
    }];
    let centroid = aggregate_centroid(&zero, true)?;
    assert_eq!((centroid.x, centroid.y), (0.0, 0.0));

    Ok(())
}

#[test]
fn test_engine_collects_all_results() -> Result<()> {
    let values = engine::scoped::<usize, _, _>(&ParallelConfig::with_threads(3), |engine| {
        assert_eq!(engine.submit((0..10).map(|i| move || Ok(i * 2))), 10);
        assert_eq!(engine.processes(), 10);

        let mut seen = 0;
        while engine.is_working() {
            assert!(engine.poll_one().is_some());
            seen += 1;
        }
        assert_eq!(seen, 10);
        assert!(engine.poll_one().is_none());
        assert!(engine.state());

        let mut values: Vec<usize> = engine
            .results()
            .iter()
            .map(|r| *r.outcome.as_ref().unwrap())
            .collect();
        values.sort_unstable();
        values
    })?;

    assert_eq!(values, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_engine_captures_failures_and_panics() -> Result<()> {
    engine::scoped::<i32, _, _>(&ParallelConfig::with_threads(2), |engine| {
        engine.submit((0..4).map(|i| {
            move || {
                if i == 1 {
                    return Err(RegionStatsError::Generic("failed".to_string()));
                }
                if i == 2 {
                    panic!("boom");
                }
                Ok(i)
            }
        }));
        engine.wait_all();

        assert_eq!(engine.completed(), 4);
        assert!(!engine.state());

        let panicked = engine.results().iter().find(|r| r.job == 2).unwrap();
        match &panicked.outcome {
            Err(RegionStatsError::WorkerPanicked { job, message }) => {
                assert_eq!(*job, 2);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected WorkerPanicked, got {:?}", other),
        }

        let ok = engine.results().iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 2);
    })?;
    Ok(())
}

#[test]
fn test_engine_abort_keeps_collected_results() -> Result<()> {
    engine::scoped::<usize, _, _>(&ParallelConfig::with_threads(1), |engine| {
        engine.submit((0..6).map(|i| move || Ok(i)));
        assert!(engine.poll_one().is_some());

        engine.abort();
        assert!(engine.is_aborted());
        assert!(!engine.is_working());
        assert!(!engine.state());
        assert!(engine.poll_one().is_none());
        assert_eq!(engine.results().len(), 1);
        assert_eq!(engine.submit(std::iter::once(|| Ok(99))), 0);
    })?;
    Ok(())
}

#[test]
fn test_engine_scope_returns_without_collecting() -> Result<()> {
    let answer = engine::scoped::<u8, _, _>(&ParallelConfig::with_threads(2), |engine| {
        engine.submit((0..8).map(|i| move || Ok(i)));
        42
    })?;
    assert_eq!(answer, 42);
    Ok(())
}

#[test]
fn test_engine_scope_skips_queued_jobs_when_caller_panics() -> Result<()> {
    let ran = Arc::new(AtomicUsize::new(0));

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        engine::scoped::<usize, (), _>(&ParallelConfig::with_threads(2), |engine| {
            engine.submit((0..50).map(|i| {
                let ran = Arc::clone(&ran);
                move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(10));
                    Ok(i)
                }
            }));
            panic!("caller gave up");
        })
    }));

    let payload = outcome.expect_err("the caller's panic propagates");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"caller gave up"));

    // Every started job has finished by the time the scope unwinds
    let started = ran.load(Ordering::SeqCst);
    assert!(started < 50, "{started} of 50 queued jobs ran");
    thread::sleep(Duration::from_millis(50));
    assert_eq!(ran.load(Ordering::SeqCst), started);

    let answer = engine::scoped::<u8, _, _>(&ParallelConfig::with_threads(2), |engine| {
        engine.submit(std::iter::once(|| Ok(7)));
        engine.wait_all();
        engine.completed()
    })?;
    assert_eq!(answer, 1);

    Ok(())
}

#[test]
fn test_progress_percent() {
    assert_eq!(progress_percent(0, 4), 0);
    assert_eq!(progress_percent(1, 3), 33);
    assert_eq!(progress_percent(4, 4), 100);
    assert_eq!(progress_percent(5, 4), 100);
    assert_eq!(progress_percent(0, 0), 100);
}

#[test]
fn test_drive_reports_progress_to_completion() -> Result<()> {
    let mut task = ConsoleProgress::new("Counting...");
    let status = engine::scoped::<usize, _, _>(&ParallelConfig::with_threads(2), |engine| {
        engine.submit((0..5).map(|i| move || Ok(i)));
        drive(engine, &mut task)
    })?;

    assert_eq!(status, DriveStatus::Completed);
    assert_eq!(task.last_progress(), Some(100));
    Ok(())
}

#[test]
fn test_drive_stops_on_cancellation_and_failure() -> Result<()> {
    let token = CancellationToken::new();
    token.cancel();
    let mut cancelled = SilentProgress::with_token(token.clone());
    assert!(token.is_cancelled());

    let status = engine::scoped::<usize, _, _>(&ParallelConfig::with_threads(2), |engine| {
        engine.submit((0..5).map(|i| move || Ok(i)));
        let status = drive(engine, &mut cancelled);
        assert!(engine.is_aborted());
        assert!(engine.results().is_empty());
        status
    })?;
    assert_eq!(status, DriveStatus::Cancelled);

    let status = engine::scoped::<usize, _, _>(&ParallelConfig::with_threads(1), |engine| {
        engine.submit(std::iter::once(|| {
            Err::<usize, _>(RegionStatsError::Generic("nope".to_string()))
        }));
        drive(engine, &mut SilentProgress::new())
    })?;
    assert_eq!(status, DriveStatus::Failed);

    Ok(())
}

#[test]
fn test_uniform_centroid_is_geometric_center() -> Result<()> {
    let (host, node) = host_with(
        MemoryImage::new("flat", (3, -2), 9, 9).with_channel("alpha", Array2::from_elem((9, 9), 1.0))?,
    );
    let shared = Arc::new(host);

    for workers in [1, 2, 3, 5, 8] {
        let stats = RegionStats::from_shared(Arc::clone(&shared))
            .with_config(ParallelConfig::with_threads(workers));
        for step in [1, 2, 4, 8] {
            let centroid = stats
                .centroid(&node, "alpha", step, &mut SilentProgress::new())?
                .expect("not cancelled");
            assert!((centroid.x - 7.0).abs() < EPS, "x = {} ({workers}, {step})", centroid.x);
            assert!((centroid.y - 2.0).abs() < EPS, "y = {} ({workers}, {step})", centroid.y);
        }
    }

    Ok(())
}

#[test]
fn test_zero_field_centroid_is_origin() -> Result<()> {
    let (host, node) = host_with(
        MemoryImage::new("black", (5, 5), 12, 7).with_channel("alpha", Array2::zeros((7, 12)))?,
    );
    let centroid = stats_for(host, 4)
        .centroid(&node, "alpha", 1, &mut SilentProgress::new())?
        .expect("not cancelled");
    assert_eq!((centroid.x, centroid.y), (0.0, 0.0));
    Ok(())
}

#[test]
fn test_negative_field_centroid_ignores_worker_count() -> Result<()> {
    let (host, node) = host_with(
        MemoryImage::new("dark", (0, 0), 4, 4).with_channel("alpha", Array2::from_elem((4, 4), -1.0))?,
    );
    let shared = Arc::new(host);

    for workers in [1, 2, 4] {
        let centroid = RegionStats::from_shared(Arc::clone(&shared))
            .with_config(ParallelConfig::with_threads(workers))
            .centroid(&node, "alpha", 1, &mut SilentProgress::new())?
            .expect("not cancelled");
        assert!((centroid.x + 1.5).abs() < EPS, "x = {} ({workers})", centroid.x);
        assert!((centroid.y + 1.5).abs() < EPS, "y = {} ({workers})", centroid.y);
    }

    Ok(())
}

#[test]
fn test_max_value_finds_single_spike() -> Result<()> {
    let (host, node) = host_with(
        MemoryImage::new("spike", (0, 0), 40, 30)
            .with_channel_fn("alpha", |x, y| if (x, y) == (17, 23) { 5.5 } else { 0.0 })?,
    );
    let shared = Arc::new(host);

    for workers in 1..=8 {
        let max = RegionStats::from_shared(Arc::clone(&shared))
            .with_config(ParallelConfig::with_threads(workers))
            .max_value(&node, "alpha", 1, &mut SilentProgress::new())?;
        assert_eq!(max, Some(5.5), "{workers} workers");
    }

    Ok(())
}

#[test]
fn test_max_value_of_negative_region_is_zero() -> Result<()> {
    let (host, node) = host_with(
        MemoryImage::new("dark", (0, 0), 6, 6).with_channel("alpha", Array2::from_elem((6, 6), -3.0))?,
    );
    let max = stats_for(host, 3).max_value(&node, "alpha", 1, &mut SilentProgress::new())?;
    assert_eq!(max, Some(0.0));
    Ok(())
}

#[test]
fn test_step_one_is_reference_and_larger_steps_approximate() -> Result<()> {
    let (host, node) = host_with(
        MemoryImage::new("ramp", (0, 0), 10, 10).with_channel_fn("alpha", |x, _| (x + 1) as f32)?,
    );
    let stats = stats_for(host, 4);

    let exact = stats
        .centroid(&node, "alpha", 1, &mut SilentProgress::new())?
        .expect("not cancelled");
    // sum(x * (x + 1)) / sum(x + 1) over x in 0..10
    assert!((exact.x - 6.0).abs() < EPS);
    assert!((exact.y - 4.5).abs() < EPS);

    let coarse = stats
        .centroid(&node, "alpha", 3, &mut SilentProgress::new())?
        .expect("not cancelled");
    // Samples x = 0, 3, 6, 9 with weights 1, 4, 7, 10
    assert!((coarse.x - 144.0 / 22.0).abs() < EPS);
    assert!((coarse.x - exact.x).abs() > 0.1);

    Ok(())
}

#[test]
fn test_sampling_failure_fails_both_statistics() {
    let host = FaultyHost { bad_pixel: (13, 7) };
    let node = host.node();
    let stats = RegionStats::new(host).with_config(ParallelConfig::with_threads(4));

    match stats.centroid(&node, "alpha", 1, &mut SilentProgress::new()) {
        Err(RegionStatsError::ReductionFailed {
            operation, message, ..
        }) => {
            assert_eq!(operation, "centroid");
            assert!(message.contains("bad pixel (13, 7)"));
        }
        other => panic!("Expected ReductionFailed, got {:?}", other),
    }

    match stats.max_value(&node, "alpha", 1, &mut SilentProgress::new()) {
        Err(RegionStatsError::ReductionFailed { message, .. }) => {
            assert!(message.contains("bad pixel (13, 7)"));
        }
        other => panic!("Expected ReductionFailed, got {:?}", other),
    }
}

#[test]
fn test_cancellation_returns_none() -> Result<()> {
    let (host, node) = host_with(
        MemoryImage::new("plate", (0, 0), 40, 40).with_channel("alpha", Array2::from_elem((40, 40), 1.0))?,
    );
    let stats = stats_for(host, 4);

    let mut before_any = CancelAfter {
        limit: 0,
        updates: Vec::new(),
    };
    assert_eq!(stats.centroid(&node, "alpha", 1, &mut before_any)?, None);

    let mut after_first = CancelAfter {
        limit: 2,
        updates: Vec::new(),
    };
    assert_eq!(stats.max_value(&node, "alpha", 1, &mut after_first)?, None);
    assert_eq!(after_first.updates, vec![0, 25]);

    // A failing node is not consulted once the task is cancelled
    let faulty = FaultyHost { bad_pixel: (0, 0) };
    let faulty_node = faulty.node();
    let cancelled = SilentProgress::with_token({
        let token = CancellationToken::new();
        token.cancel();
        token
    });
    let result = RegionStats::new(faulty)
        .with_config(ParallelConfig::with_threads(2))
        .centroid(&faulty_node, "alpha", 1, &mut cancelled.clone())?;
    assert_eq!(result, None);

    Ok(())
}

#[test]
fn test_invalid_arguments() -> Result<()> {
    let (host, node) = host_with(
        MemoryImage::new("plate", (0, 0), 4, 4).with_channel("alpha", Array2::zeros((4, 4)))?,
    );
    let stats = stats_for(host, 2);

    assert!(matches!(
        stats.centroid(&node, "alpha", 0, &mut SilentProgress::new()),
        Err(RegionStatsError::InvalidStep(0))
    ));

    match stats.max_value(&node, "beta", 1, &mut SilentProgress::new()) {
        Err(RegionStatsError::ReductionFailed { message, .. }) => {
            assert!(message.contains("Channel 'beta' not found"));
        }
        other => panic!("Expected ReductionFailed, got {:?}", other),
    }

    let plan = stats.plan(&node, "alpha", 1)?;
    assert_eq!(plan.len(), 2);
    assert!(plan.iter().all(|job| job.node_name == "plate" && job.step == 1));

    Ok(())
}
