//! Out-of-band analysis of the drawing.
//!
//! The [`AnalysisTrigger`] hands a snapshot of the overlay canvas to an
//! [`AnalysisService`] on a background runtime so the frame loop never waits
//! on the network. Only one request is ever in flight; results are picked up
//! by polling once per frame.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use image::RgbImage;
use tokio::runtime::Runtime;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::canvas::OverlayCanvas;
use crate::error::{Error, Result};
use crate::gesture::Gesture;

pub type AnalysisFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

/// "Given one image, return descriptive text." May be slow and may fail.
pub trait AnalysisService: Send + Sync + 'static {
    fn analyze(&self, image: RgbImage) -> AnalysisFuture;
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Completed { text: String, at: DateTime<Local> },
    Failed { message: String, at: DateTime<Local> },
}

impl AnalysisOutcome {
    pub fn text(&self) -> &str {
        match self {
            AnalysisOutcome::Completed { text, .. } => text,
            AnalysisOutcome::Failed { message, .. } => message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Completed { .. })
    }
}

struct InFlight {
    id: Uuid,
    started: Instant,
    rx: oneshot::Receiver<Result<String>>,
}

pub struct AnalysisTrigger {
    runtime: Runtime,
    service: Arc<dyn AnalysisService>,
    timeout: Duration,
    in_flight: Option<InFlight>,
    latest: Option<AnalysisOutcome>,
    /// Whether the previous frame already showed the Analyze gesture.
    holding: bool,
}

impl AnalysisTrigger {
    pub fn new(service: Arc<dyn AnalysisService>, timeout: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("analysis")
            .enable_all()
            .build()?;

        Ok(Self {
            runtime,
            service,
            timeout,
            in_flight: None,
            latest: None,
            holding: false,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn latest(&self) -> Option<&AnalysisOutcome> {
        self.latest.as_ref()
    }

    /// Feed one frame's gesture. A request is issued when the Analyze gesture
    /// starts; holding it, or starting it while busy, issues nothing.
    pub fn on_gesture(&mut self, gesture: Gesture, canvas: &OverlayCanvas) -> Option<Uuid> {
        let entering = gesture == Gesture::Analyze && !self.holding;
        self.holding = gesture == Gesture::Analyze;
        if !entering {
            return None;
        }

        match self.request(canvas) {
            Ok(id) => Some(id),
            Err(Error::Busy) => {
                debug!("Analyze gesture ignored, a request is still running");
                None
            }
            Err(e) => {
                self.record(Err(e));
                None
            }
        }
    }

    /// Start analysing a copy of `canvas` as it is right now.
    pub fn request(&mut self, canvas: &OverlayCanvas) -> Result<Uuid> {
        if self.is_busy() {
            return Err(Error::Busy);
        }

        let id = Uuid::new_v4();
        let snapshot = canvas.snapshot();
        let timeout = self.timeout;
        let service = Arc::clone(&self.service);
        let (tx, rx) = oneshot::channel();

        self.runtime.spawn(async move {
            let result = match tokio::time::timeout(timeout, service.analyze(snapshot)).await {
                Ok(r) => r,
                Err(_) => Err(Error::Timeout(timeout.as_secs())),
            };
            let _ = tx.send(result);
        });

        info!(request_id = %id, "Analysis requested");
        self.in_flight = Some(InFlight {
            id,
            started: Instant::now(),
            rx,
        });
        Ok(id)
    }

    /// Non-blocking check for a finished request. Returns the new outcome if
    /// one arrived on this call.
    pub fn poll(&mut self) -> Option<&AnalysisOutcome> {
        let job = self.in_flight.as_mut()?;
        let result = match job.rx.try_recv() {
            Ok(r) => r,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => Err(Error::Analysis("analysis worker stopped".into())),
        };
        self.finish(result);
        self.latest.as_ref()
    }

    /// Block until the running request finishes or `limit` passes.
    pub fn wait(&mut self, limit: Duration) -> Option<&AnalysisOutcome> {
        let job = self.in_flight.as_mut()?;
        let result = self
            .runtime
            .block_on(async { tokio::time::timeout(limit, &mut job.rx).await });
        match result {
            Ok(Ok(r)) => self.finish(r),
            Ok(Err(_)) => self.finish(Err(Error::Analysis("analysis worker stopped".into()))),
            Err(_) => return None,
        }
        self.latest.as_ref()
    }

    fn finish(&mut self, result: Result<String>) {
        if let Some(job) = self.in_flight.take() {
            let elapsed = job.started.elapsed().as_secs_f32();
            match &result {
                Ok(_) => info!(request_id = %job.id, elapsed, "Analysis finished"),
                Err(e) => warn!(request_id = %job.id, elapsed, "Analysis failed: {}", e),
            }
        }
        self.record(result);
    }

    fn record(&mut self, result: Result<String>) {
        let at = Local::now();
        self.latest = Some(match result {
            Ok(text) => AnalysisOutcome::Completed { text, at },
            Err(e) => AnalysisOutcome::Failed {
                message: e.to_string(),
                at,
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Point;
    use image::Rgb;
    use std::sync::Mutex;

    struct Echo;

    impl AnalysisService for Echo {
        fn analyze(&self, image: RgbImage) -> AnalysisFuture {
            Box::pin(async move { Ok(format!("{}x{}", image.width(), image.height())) })
        }
    }

    struct Slow(Duration);

    impl AnalysisService for Slow {
        fn analyze(&self, _image: RgbImage) -> AnalysisFuture {
            let d = self.0;
            Box::pin(async move {
                tokio::time::sleep(d).await;
                Ok("late".into())
            })
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Option<RgbImage>>);

    impl AnalysisService for Arc<Recorder> {
        fn analyze(&self, image: RgbImage) -> AnalysisFuture {
            let me = Arc::clone(self);
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                *me.0.lock().unwrap() = Some(image);
                Ok(String::new())
            })
        }
    }

    const LIMIT: Duration = Duration::from_secs(5);

    #[test]
    fn result_is_surfaced() {
        let mut t = AnalysisTrigger::new(Arc::new(Echo), LIMIT).unwrap();
        t.request(&OverlayCanvas::new(8, 4)).unwrap();
        let outcome = t.wait(LIMIT).unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.text(), "8x4");
        assert!(!t.is_busy());
    }

    #[test]
    fn second_request_while_busy_is_rejected() {
        let mut t = AnalysisTrigger::new(Arc::new(Slow(Duration::from_millis(200))), LIMIT).unwrap();
        let canvas = OverlayCanvas::new(4, 4);
        t.request(&canvas).unwrap();
        assert!(matches!(t.request(&canvas), Err(Error::Busy)));
        assert!(t.wait(LIMIT).unwrap().is_success());
        assert!(t.request(&canvas).is_ok());
    }

    #[test]
    fn slow_service_times_out() {
        let mut t =
            AnalysisTrigger::new(Arc::new(Slow(Duration::from_secs(30))), Duration::from_millis(50))
                .unwrap();
        t.request(&OverlayCanvas::new(4, 4)).unwrap();
        let outcome = t.wait(LIMIT).unwrap();
        assert!(!outcome.is_success());
        assert!(outcome.text().contains("timed out"));
    }

    #[test]
    fn snapshot_is_taken_at_trigger_time() {
        let recorder = Arc::new(Recorder::default());
        let mut t = AnalysisTrigger::new(Arc::new(Arc::clone(&recorder)), LIMIT).unwrap();
        let mut canvas = OverlayCanvas::new(10, 10);
        t.request(&canvas).unwrap();

        canvas.draw_line(Point::new(0, 0), Point::new(9, 9), Rgb([255, 255, 255]), 1);
        t.wait(LIMIT).unwrap();

        let seen = recorder.0.lock().unwrap().take().unwrap();
        assert!(seen.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn held_gesture_fires_once() {
        let mut t = AnalysisTrigger::new(Arc::new(Echo), LIMIT).unwrap();
        let canvas = OverlayCanvas::new(4, 4);

        assert!(t.on_gesture(Gesture::Analyze, &canvas).is_some());
        t.wait(LIMIT);
        assert!(t.on_gesture(Gesture::Analyze, &canvas).is_none());
        assert!(t.on_gesture(Gesture::Draw, &canvas).is_none());
        assert!(t.on_gesture(Gesture::Analyze, &canvas).is_some());
    }

    #[test]
    fn poll_without_request_is_quiet() {
        let mut t = AnalysisTrigger::new(Arc::new(Echo), LIMIT).unwrap();
        assert!(t.poll().is_none());
        assert!(t.latest().is_none());
    }
}
