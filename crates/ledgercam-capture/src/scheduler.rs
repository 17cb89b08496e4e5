// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detection scheduler — drives the corner tracker from a live stream.
//
// One background task per session. It waits (bounded) for the vision engine
// to become ready, then ticks at a fixed interval: sample the current frame,
// run the detector on the blocking pool, and hand the result back to the
// tracker. Ticks are skipped rather than queued when a detection overruns,
// and the tracker itself refuses to start one while corners are locked.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ledgercam_bridge::VideoSource;
use ledgercam_core::error::Result;
use ledgercam_core::CaptureConfig;
use ledgercam_document::{Frame, QuadDetector};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::readiness::ReadinessGate;
use crate::tracker::{CornerTracker, TrackedQuad};

/// Lock the shared tracker. A panic elsewhere never leaves the tracker
/// half-updated, so a poisoned lock is still usable.
pub(crate) fn lock_tracker(tracker: &Mutex<CornerTracker>) -> MutexGuard<'_, CornerTracker> {
    tracker.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run one detection cycle: sample, detect, deliver.
///
/// Returns `Ok(true)` when the result locked new corners, `Ok(false)` when
/// the tick was skipped, found nothing, or went stale. Only the video source
/// can produce an error.
pub async fn run_detection_tick(
    tracker: &Arc<Mutex<CornerTracker>>,
    source: &Arc<dyn VideoSource>,
    detector: &Arc<dyn QuadDetector>,
    max_dimension: u32,
) -> Result<bool> {
    let Some(ticket) = lock_tracker(tracker).begin_detection() else {
        return Ok(false);
    };

    let native = match source.current_frame() {
        Ok(native) => native,
        Err(err) => {
            lock_tracker(tracker).complete_detection(ticket, None);
            return Err(err);
        }
    };

    let detector = Arc::clone(detector);
    let detection = tokio::task::spawn_blocking(move || {
        let (frame_width, frame_height) = native.dimensions();
        let sampled = Frame::sample(&native, max_dimension);
        detector.detect_sampled(&sampled).map(|quad| TrackedQuad {
            quad,
            frame_width,
            frame_height,
        })
    })
    .await;

    let result = match detection {
        Ok(result) => result,
        Err(err) => {
            warn!(error = %err, "Detection task failed");
            None
        }
    };

    Ok(lock_tracker(tracker).complete_detection(ticket, result))
}

/// Handle to the background detection task of one session.
#[derive(Debug)]
pub struct DetectionLoop {
    shutdown: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl DetectionLoop {
    /// Start the loop. Must be called from within a Tokio runtime.
    pub fn spawn(
        tracker: Arc<Mutex<CornerTracker>>,
        source: Arc<dyn VideoSource>,
        detector: Arc<dyn QuadDetector>,
        gate: ReadinessGate,
        config: &CaptureConfig,
    ) -> Self {
        let shutdown = Arc::new(Notify::new());
        let settings = LoopSettings {
            interval: Duration::from_millis(config.detection_interval_ms.max(1)),
            readiness_timeout: Duration::from_millis(config.readiness_timeout_ms),
            max_dimension: config.max_processing_dimension,
        };

        let signal = Arc::clone(&shutdown);
        let handle = tokio::spawn(async move {
            Self::run(tracker, source, detector, gate, settings, signal).await;
        });

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    /// Whether the background task is still alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the loop to exit and wait for it. Idempotent.
    pub async fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.shutdown.notify_one();
        if let Err(err) = handle.await {
            warn!(error = %err, "Detection loop ended abnormally");
        }
        debug!("Detection loop stopped");
    }

    async fn run(
        tracker: Arc<Mutex<CornerTracker>>,
        source: Arc<dyn VideoSource>,
        detector: Arc<dyn QuadDetector>,
        mut gate: ReadinessGate,
        settings: LoopSettings,
        shutdown: Arc<Notify>,
    ) {
        let readiness = tokio::select! {
            _ = shutdown.notified() => return,
            readiness = gate.wait(settings.readiness_timeout) => readiness,
        };
        if let Err(err) = readiness.into_result(settings.readiness_timeout) {
            warn!(error = %err, "Vision engine unavailable; capture continues without detection");
            return;
        }

        info!(interval_ms = settings.interval.as_millis() as u64, "Detection loop started");
        let mut interval = tokio::time::interval(settings.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("Detection loop received shutdown signal");
                    break;
                }
                _ = interval.tick() => {
                    if lock_tracker(&tracker).is_closed() {
                        break;
                    }
                    match run_detection_tick(&tracker, &source, &detector, settings.max_dimension).await {
                        Ok(_) => {}
                        Err(err) if err.is_fatal() => {
                            error!(error = %err, "Video source failed; detection loop exiting");
                            break;
                        }
                        Err(err) => debug!(error = %err, "Detection tick failed"),
                    }
                }
            }
        }
    }
}

impl Drop for DetectionLoop {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LoopSettings {
    interval: Duration,
    readiness_timeout: Duration,
    max_dimension: u32,
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::{Rgba, RgbaImage};
    use ledgercam_bridge::{CameraDevice, StillImageCamera};
    use ledgercam_core::types::FacingMode;
    use ledgercam_core::Quadrilateral;

    use super::*;
    use crate::readiness::readiness;
    use crate::tracker::{HitTest, TrackerState};

    /// Returns a fixed answer and counts how often it was asked.
    struct FixedDetector {
        calls: AtomicUsize,
        answer: Option<Quadrilateral>,
    }

    impl FixedDetector {
        fn new(answer: Option<Quadrilateral>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                answer,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl QuadDetector for FixedDetector {
        fn detect(&self, _frame: &Frame) -> Option<Quadrilateral> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    fn source() -> Arc<dyn VideoSource> {
        let camera = StillImageCamera::new(RgbaImage::from_pixel(320, 240, Rgba([90, 90, 90, 255])));
        camera.open_stream(FacingMode::Environment).expect("stream")
    }

    fn fast_config() -> CaptureConfig {
        CaptureConfig {
            detection_interval_ms: 5,
            readiness_timeout_ms: 50,
            ..CaptureConfig::default()
        }
    }

    fn tracker() -> Arc<Mutex<CornerTracker>> {
        Arc::new(Mutex::new(CornerTracker::new(HitTest::default())))
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..400 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn single_tick_locks_corners() {
        let quad = Quadrilateral::axis_aligned(20.0, 20.0, 300.0, 220.0);
        let detector = FixedDetector::new(Some(quad));
        let detector_dyn: Arc<dyn QuadDetector> = detector.clone();
        let tracker = tracker();

        let locked = run_detection_tick(&tracker, &source(), &detector_dyn, 1920).await.expect("tick");
        assert!(locked);
        let guard = lock_tracker(&tracker);
        assert_eq!(guard.state(), TrackerState::Locked);
        assert_eq!(guard.quadrilateral(), Some(quad));
        assert_eq!(guard.tracked().map(|t| t.frame_width), Some(320));
    }

    #[tokio::test]
    async fn stopped_source_reports_camera_loss_and_clears_flight() {
        let detector: Arc<dyn QuadDetector> = FixedDetector::new(None);
        let tracker = tracker();
        let source = source();
        source.stop();

        let err = run_detection_tick(&tracker, &source, &detector, 1920).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(lock_tracker(&tracker).state(), TrackerState::Idle);
    }

    #[tokio::test]
    async fn loop_pauses_after_lock_and_resumes_after_reset() {
        let quad = Quadrilateral::axis_aligned(20.0, 20.0, 300.0, 220.0);
        let detector = FixedDetector::new(Some(quad));
        let tracker = tracker();
        let mut detection = DetectionLoop::spawn(
            Arc::clone(&tracker),
            source(),
            detector.clone(),
            ReadinessGate::ready(),
            &fast_config(),
        );

        assert!(wait_until(|| lock_tracker(&tracker).state() == TrackerState::Locked).await);
        let calls = detector.calls();
        // Ten or more intervals pass without the detector being consulted.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(detector.calls(), calls);
        assert_eq!(lock_tracker(&tracker).quadrilateral(), Some(quad));

        lock_tracker(&tracker).reset();
        assert!(wait_until(|| detector.calls() > calls).await);
        assert!(wait_until(|| lock_tracker(&tracker).state() == TrackerState::Locked).await);

        detection.stop().await;
        assert!(!detection.is_running());
    }

    #[tokio::test]
    async fn unready_engine_never_detects() {
        let detector = FixedDetector::new(None);
        let (_signal, gate) = readiness();
        let mut detection =
            DetectionLoop::spawn(tracker(), source(), detector.clone(), gate, &fast_config());

        assert!(wait_until(|| !detection.is_running()).await);
        assert_eq!(detector.calls(), 0);
        detection.stop().await;
    }

    #[tokio::test]
    async fn no_detection_after_teardown() {
        let detector = FixedDetector::new(None);
        let tracker = tracker();
        let mut detection = DetectionLoop::spawn(
            Arc::clone(&tracker),
            source(),
            detector.clone(),
            ReadinessGate::ready(),
            &fast_config(),
        );
        assert!(wait_until(|| detector.calls() > 0).await);

        lock_tracker(&tracker).teardown();
        detection.stop().await;
        let calls = detector.calls();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(detector.calls(), calls);
    }

    #[tokio::test]
    async fn camera_loss_ends_the_loop() {
        let detector = FixedDetector::new(None);
        let source = source();
        let mut detection = DetectionLoop::spawn(
            tracker(),
            Arc::clone(&source),
            detector,
            ReadinessGate::ready(),
            &fast_config(),
        );
        source.stop();
        assert!(wait_until(|| !detection.is_running()).await);
        detection.stop().await;
    }
}
