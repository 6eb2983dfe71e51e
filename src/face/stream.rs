//! Frame-sampling stream session
//!
//! A session pulls frames from its capture lease one at a time. Every
//! `interval`-th frame (starting with the first) goes through the expensive
//! path: a fresh localization/embedding call and a new set of labels. All
//! other frames reuse the last boxes and labels.

use serde::Serialize;

use super::capture::{CaptureDevice, CaptureLease, Frame, FrameSource};
use super::matcher::{label_for, FaceLabel, SessionMode};
use super::template::FaceTemplate;
use crate::error::{BiometricError, ErrorKind, Result};

/// Face bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaceBox {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

/// One localized face; the embedding may be missing if extraction failed
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: FaceBox,
    pub embedding: Option<FaceTemplate>,
}

/// Face localization and embedding (excluded collaborator)
pub trait FaceAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<Detection>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub bbox: FaceBox,
    pub label: FaceLabel,
}

/// Raw frame plus the overlay to draw on it
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    pub index: u64,
    pub frame: Frame,
    pub annotations: Vec<Annotation>,
    /// True when this frame went through fresh analysis
    pub refreshed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Active,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    AlreadyInactive,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Analyse every n-th frame (>= 1)
    pub interval: u32,
    pub tolerance: f64,
}

/// Per-connection stream state machine: `Idle -> Active -> Stopped`
pub struct StreamSession<S: FrameSource, A: FaceAnalyzer> {
    analyzer: A,
    mode: SessionMode,
    reference: Option<FaceTemplate>,
    interval: u64,
    tolerance: f64,
    state: SessionState,
    lease: Option<CaptureLease<S>>,
    frame_counter: u64,
    last_boxes: Vec<FaceBox>,
    last_labels: Vec<FaceLabel>,
    last_embeddings: Vec<Option<FaceTemplate>>,
    end_reason: Option<ErrorKind>,
}

impl<S: FrameSource, A: FaceAnalyzer> StreamSession<S, A> {
    pub fn new(
        analyzer: A,
        mode: SessionMode,
        reference: Option<FaceTemplate>,
        config: SessionConfig,
    ) -> Self {
        Self {
            analyzer,
            mode,
            reference,
            interval: u64::from(config.interval.max(1)),
            tolerance: config.tolerance,
            state: SessionState::Idle,
            lease: None,
            frame_counter: 0,
            last_boxes: Vec::new(),
            last_labels: Vec::new(),
            last_embeddings: Vec::new(),
            end_reason: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn frames_seen(&self) -> u64 {
        self.frame_counter
    }

    /// Why the stream ended on its own, if it did
    pub fn end_reason(&self) -> Option<ErrorKind> {
        self.end_reason
    }

    /// Acquire the capture device and move to `Active`.
    ///
    /// Starting an active session is a no-op; a stopped session cannot be
    /// restarted.
    pub fn start(&mut self, device: &CaptureDevice<S>) -> Result<()> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Stopped => Err(BiometricError::Device(
                "stream session already stopped".to_string(),
            )),
            SessionState::Idle => {
                self.lease = Some(device.acquire()?);
                self.state = SessionState::Active;
                log::info!(
                    "Stream session started (mode={:?}, interval={})",
                    self.mode,
                    self.interval
                );
                Ok(())
            }
        }
    }

    /// Stop the session and release the capture device
    pub fn stop(&mut self) -> StopOutcome {
        if self.state != SessionState::Active {
            self.state = SessionState::Stopped;
            log::debug!("Stop requested on inactive stream session");
            return StopOutcome::AlreadyInactive;
        }
        self.finish();
        StopOutcome::Stopped
    }

    fn finish(&mut self) {
        if let Some(mut lease) = self.lease.take() {
            lease.release();
        }
        self.state = SessionState::Stopped;
        log::info!(
            "Stream session stopped after {} frames",
            self.frame_counter
        );
    }

    /// Overall status for the current cycle
    pub fn status(&self) -> FaceLabel {
        if self.mode == SessionMode::Verify && self.reference.is_none() {
            return FaceLabel::NotRegistered;
        }
        match self.last_labels.first() {
            Some(label) => *label,
            None => FaceLabel::Detecting,
        }
    }

    /// Register mode: first embedding of the most recent analysis
    pub fn enrollment_candidate(&self) -> Option<FaceTemplate> {
        self.last_embeddings.iter().flatten().next().copied()
    }

    fn refresh(&mut self, frame: &Frame) {
        let detections = match self.analyzer.analyze(frame) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("Face analysis failed on frame {}: {}", self.frame_counter, e);
                self.last_boxes.clear();
                self.last_labels.clear();
                self.last_embeddings.clear();
                return;
            }
        };

        self.last_labels = detections
            .iter()
            .map(|d| {
                label_for(
                    self.mode,
                    self.reference.as_ref(),
                    d.embedding.as_ref(),
                    self.tolerance,
                )
            })
            .collect();
        self.last_boxes = detections.iter().map(|d| d.bbox).collect();
        self.last_embeddings = detections.into_iter().map(|d| d.embedding).collect();

        log::debug!(
            "Frame {}: {} face(s), labels {:?}",
            self.frame_counter,
            self.last_boxes.len(),
            self.last_labels
        );
    }

    fn annotations(&self) -> Vec<Annotation> {
        self.last_boxes
            .iter()
            .zip(&self.last_labels)
            .map(|(bbox, label)| Annotation {
                bbox: *bbox,
                label: *label,
            })
            .collect()
    }
}

impl<S: FrameSource, A: FaceAnalyzer> Iterator for StreamSession<S, A> {
    type Item = AnnotatedFrame;

    fn next(&mut self) -> Option<AnnotatedFrame> {
        if self.state != SessionState::Active {
            return None;
        }

        let read = self.lease.as_mut()?.read();
        let frame = match read {
            Ok(frame) => frame,
            Err(e) => {
                log::info!("Capture read failed, ending stream: {}", e);
                self.end_reason = Some(e.kind());
                self.finish();
                return None;
            }
        };

        let index = self.frame_counter;
        let refreshed = index % self.interval == 0;
        if refreshed {
            self.refresh(&frame);
        }
        self.frame_counter += 1;

        Some(AnnotatedFrame {
            index,
            frame,
            annotations: self.annotations(),
            refreshed,
        })
    }
}

impl<S: FrameSource, A: FaceAnalyzer> Drop for StreamSession<S, A> {
    fn drop(&mut self) {
        if self.state == SessionState::Active {
            self.finish();
        }
    }
}
