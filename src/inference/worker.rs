//! Off-thread inference
//!
//! One worker thread owns the classifier. Requests reach it over a rendezvous
//! channel, so a request is handed over only while the worker is idle and
//! blocked in `recv`. Still images wait for the hand-over; live frames use
//! [`JobSender::offer`] and are dropped when the worker is busy.
//!
//! Each request carries its dispatch timestamp. The worker stamps completion
//! and sends a [`Completion`] back over a second channel with exactly one
//! consumer, which applies it on its own thread.
//!
//! The completion channel holds at most [`COMPLETION_CAPACITY`] entries. When
//! the consumer falls behind, live-frame completions that do not fit are
//! discarded; still-image completions wait for room, so the consumer must
//! drain the channel before submitting more stills than that.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, SendError, Sender, TrySendError};
use image::DynamicImage;
use tracing::{debug, info, warn};

use super::classifier::Classifier;
use super::fps::instantaneous_fps;
use super::predictor::ClassificationResult;
use crate::acquisition::ImageSource;
use crate::utils::error::{Result, VisionError};

/// Completions buffered for a consumer that has not drained yet
pub const COMPLETION_CAPACITY: usize = 16;

/// A classification request
pub struct InferenceJob {
    pub image: DynamicImage,
    pub source: ImageSource,
    pub dispatched_at: Instant,
}

/// Outcome of one request, delivered to the result consumer
#[derive(Debug)]
pub struct Completion {
    pub source: ImageSource,
    pub result: Result<ClassificationResult>,
    pub dispatched_at: Instant,
    pub completed_at: Instant,
}

impl Completion {
    /// Instantaneous FPS for this request
    pub fn fps(&self) -> Option<f64> {
        instantaneous_fps(self.dispatched_at, self.completed_at)
    }

    pub fn latency(&self) -> Duration {
        self.completed_at.saturating_duration_since(self.dispatched_at)
    }
}

/// Result of offering a live frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// The worker was idle and took the frame
    Accepted,
    /// The worker was busy; the frame was discarded
    Dropped,
}

/// Cloneable handle for sending requests to the worker
#[derive(Clone)]
pub struct JobSender {
    tx: Sender<InferenceJob>,
}

impl JobSender {
    /// Hand an image to the worker, waiting until it is idle
    pub fn submit(&self, image: DynamicImage, source: ImageSource) -> Result<()> {
        let job = InferenceJob {
            image,
            source,
            dispatched_at: Instant::now(),
        };
        self.tx.send(job).map_err(|SendError(job)| {
            VisionError::Inference(format!("inference worker stopped; {} not classified", job.source))
        })
    }

    /// Hand an image to the worker only if it is idle right now
    pub fn offer(&self, image: DynamicImage, source: ImageSource) -> Result<Offer> {
        let job = InferenceJob {
            image,
            source,
            dispatched_at: Instant::now(),
        };
        match self.tx.try_send(job) {
            Ok(()) => Ok(Offer::Accepted),
            Err(TrySendError::Full(_)) => Ok(Offer::Dropped),
            Err(TrySendError::Disconnected(_)) => {
                Err(VisionError::Inference("inference worker stopped".to_string()))
            }
        }
    }
}

/// Handle to the inference thread
///
/// Dropping the handle closes the request channel and joins the thread. Any
/// [`JobSender`] clones must be gone by then or the join waits for them.
pub struct InferenceWorker {
    jobs: Option<JobSender>,
    handle: Option<JoinHandle<()>>,
    processed: Arc<AtomicU64>,
    discarded: Arc<AtomicU64>,
    description: String,
}

impl InferenceWorker {
    /// Start the worker thread and return it with the completion receiver
    pub fn spawn<C>(classifier: C) -> Result<(Self, Receiver<Completion>)>
    where
        C: Classifier + 'static,
    {
        let (job_tx, job_rx) = bounded::<InferenceJob>(0);
        let (done_tx, done_rx) = bounded::<Completion>(COMPLETION_CAPACITY);
        let processed = Arc::new(AtomicU64::new(0));
        let discarded = Arc::new(AtomicU64::new(0));
        let description = classifier.describe();

        let counters = WorkerCounters {
            processed: processed.clone(),
            discarded: discarded.clone(),
        };
        let handle = thread::Builder::new()
            .name("inference-worker".to_string())
            .spawn(move || run_worker(classifier, job_rx, done_tx, counters))?;

        info!("Inference worker started ({})", description);

        Ok((
            Self {
                jobs: Some(JobSender { tx: job_tx }),
                handle: Some(handle),
                processed,
                discarded,
                description,
            },
            done_rx,
        ))
    }

    /// A sender for another thread, such as the capture loop
    pub fn sender(&self) -> Result<JobSender> {
        self.jobs
            .clone()
            .ok_or_else(|| VisionError::Inference("inference worker stopped".to_string()))
    }

    pub fn submit(&self, image: DynamicImage, source: ImageSource) -> Result<()> {
        self.sender()?.submit(image, source)
    }

    pub fn offer(&self, image: DynamicImage, source: ImageSource) -> Result<Offer> {
        self.sender()?.offer(image, source)
    }

    /// Requests the worker has finished, successful or not
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Live completions thrown away because the consumer was not draining
    pub fn discarded_completions(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    pub fn describe(&self) -> &str {
        &self.description
    }

    /// Close the request channel and wait for the thread to finish
    pub fn shutdown(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Inference worker panicked");
            }
            debug!("Inference worker stopped after {} requests", self.processed());
        }
    }
}

impl Drop for InferenceWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct WorkerCounters {
    processed: Arc<AtomicU64>,
    discarded: Arc<AtomicU64>,
}

fn run_worker<C: Classifier>(
    classifier: C,
    jobs: Receiver<InferenceJob>,
    completions: Sender<Completion>,
    counters: WorkerCounters,
) {
    for job in jobs.iter() {
        let result = classifier.classify(&job.image).map(|r| match &job.source {
            ImageSource::Library(path) => r.with_image_path(path.clone()),
            _ => r,
        });
        let completed_at = Instant::now();
        counters.processed.fetch_add(1, Ordering::Relaxed);

        if let Err(err) = &result {
            warn!("Classification of {} failed: {}", job.source, err);
        }

        let live = matches!(job.source, ImageSource::LiveFeed(_));
        let completion = Completion {
            source: job.source,
            result,
            dispatched_at: job.dispatched_at,
            completed_at,
        };

        let delivered = if live {
            match completions.try_send(completion) {
                Ok(()) => true,
                Err(TrySendError::Full(completion)) => {
                    counters.discarded.fetch_add(1, Ordering::Relaxed);
                    debug!("Completion queue full; discarding {}", completion.source);
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            }
        } else {
            completions.send(completion).is_ok()
        };

        if !delivered {
            debug!("Completion receiver dropped; inference worker exiting");
            break;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::inference::predictor::Observation;

    /// Classifier that sleeps for a fixed time and returns a fixed ranking
    pub(crate) struct SlowClassifier {
        pub delay: Duration,
    }

    impl Classifier for SlowClassifier {
        fn classify(&self, _image: &DynamicImage) -> Result<ClassificationResult> {
            thread::sleep(self.delay);
            ClassificationResult::from_ranked(
                vec![
                    Observation::new("tabby", 0.8734),
                    Observation::new("tiger cat", 0.1),
                    Observation::new("lynx", 0.0266),
                ],
                self.delay,
            )
        }

        fn describe(&self) -> String {
            format!("slow stub ({:?})", self.delay)
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn classify(&self, _image: &DynamicImage) -> Result<ClassificationResult> {
            Err(VisionError::Inference("unexpected output".to_string()))
        }
    }

    fn image() -> DynamicImage {
        DynamicImage::new_rgb8(4, 4)
    }

    #[test]
    fn test_submit_delivers_completion() {
        let (worker, completions) = InferenceWorker::spawn(SlowClassifier {
            delay: Duration::from_millis(5),
        })
        .unwrap();

        let path = PathBuf::from("cat.jpg");
        worker.submit(image(), ImageSource::Library(path.clone())).unwrap();

        let completion = completions.recv_timeout(Duration::from_secs(5)).unwrap();
        let result = completion.result.as_ref().unwrap();
        assert_eq!(result.top().unwrap().label, "tabby");
        assert_eq!(result.image_path.as_deref(), Some(path.as_path()));
        assert!(completion.latency() >= Duration::from_millis(5));
        assert!(completion.fps().unwrap() > 0.0);
        assert_eq!(worker.processed(), 1);
    }

    #[test]
    fn test_offer_while_busy_is_dropped() {
        let (worker, completions) = InferenceWorker::spawn(SlowClassifier {
            delay: Duration::from_millis(100),
        })
        .unwrap();

        // Returns once the worker has taken the job, so it is now busy
        worker.submit(image(), ImageSource::LiveFeed(1)).unwrap();
        assert_eq!(
            worker.offer(image(), ImageSource::LiveFeed(2)).unwrap(),
            Offer::Dropped
        );

        let first = completions.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.source, ImageSource::LiveFeed(1));

        // Once idle again the worker accepts a frame
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut accepted = false;
        while Instant::now() < deadline {
            if worker.offer(image(), ImageSource::LiveFeed(3)).unwrap() == Offer::Accepted {
                accepted = true;
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert!(accepted);

        let second = completions.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second.source, ImageSource::LiveFeed(3));
        assert!(completions.try_recv().is_err());
    }

    #[test]
    fn test_failure_is_delivered_not_fatal() {
        let (worker, completions) = InferenceWorker::spawn(FailingClassifier).unwrap();

        worker.submit(image(), ImageSource::Shutter).unwrap();
        let completion = completions.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(completion.result, Err(VisionError::Inference(_))));

        // The worker keeps serving after a failure
        worker.submit(image(), ImageSource::Shutter).unwrap();
        assert!(completions.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_shutdown_joins_and_rejects_requests() {
        let (mut worker, completions) = InferenceWorker::spawn(SlowClassifier {
            delay: Duration::from_millis(1),
        })
        .unwrap();
        worker.shutdown();

        assert!(worker.submit(image(), ImageSource::Shutter).is_err());
        assert!(completions.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_live_completions_beyond_capacity_are_discarded() {
        let (mut worker, completions) = InferenceWorker::spawn(SlowClassifier {
            delay: Duration::ZERO,
        })
        .unwrap();

        let frames = COMPLETION_CAPACITY as u64 + 10;
        for n in 1..=frames {
            worker.submit(image(), ImageSource::LiveFeed(n)).unwrap();
        }
        // Joining makes sure the last frame has been handled
        worker.shutdown();

        let buffered: Vec<Completion> = completions.try_iter().collect();
        assert_eq!(buffered.len(), COMPLETION_CAPACITY);
        assert_eq!(buffered[0].source, ImageSource::LiveFeed(1));
        assert_eq!(worker.processed(), frames);
        assert_eq!(worker.discarded_completions(), 10);
    }
}
