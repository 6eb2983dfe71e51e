//! Enrollment and verification for the single enrolled identity
//!
//! Ties the key manager, the template vault and the two matchers together.
//! Registration writes the key first, then the template. Verification checks
//! that a template exists before touching any key material.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::audio::{self, MfccExtractor};
use crate::config::AppConfig;
use crate::error::{BiometricError, ErrorKind, Result};
use crate::face::{
    label_for, CaptureDevice, FaceAnalyzer, FaceLabel, FaceTemplate, Frame, FrameSource,
    SessionConfig, SessionMode, StreamSession,
};
use crate::paths::AppPaths;
use crate::status::{run_status, StatusReport};
use crate::vault::{self, KeyManager, Modality, Template};
use crate::voice::{self, VoiceTemplate};

/// Outcome of a registration attempt that may legitimately find nothing to enroll
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationOutcome {
    pub success: bool,
    pub message: String,
}

impl RegistrationOutcome {
    fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }

    fn rejected(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
        }
    }
}

/// Voice verification result for the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct VoiceVerification {
    pub success: bool,
    pub message: String,
    /// Alignment cost, when a comparison took place
    pub cost: Option<f64>,
    pub threshold: f64,
    /// Error category when verification could not be carried out
    pub failure: Option<ErrorKind>,
}

impl VoiceVerification {
    fn failed(err: &BiometricError, threshold: f64) -> Self {
        let message = match err.kind() {
            ErrorKind::NotFound => "No registered voice found. Please register first.",
            ErrorKind::Integrity => "Stored voice template failed its integrity check.",
            ErrorKind::Format => "Audio or stored voice data has an invalid format.",
            ErrorKind::Processing => "Voice verification failed due to processing error.",
            _ => "Voice verification failed.",
        };
        Self {
            success: false,
            message: message.to_string(),
            cost: None,
            threshold,
            failure: Some(err.kind()),
        }
    }
}

/// Face and voice biometrics over one key/template slot per modality
pub struct Biometrics {
    paths: AppPaths,
    config: AppConfig,
    keys: KeyManager,
}

impl Biometrics {
    pub fn new(paths: AppPaths, config: AppConfig) -> Result<Self> {
        config.validate()?;
        let keys = KeyManager::new(paths.keys_dir());

        log::info!(
            "Biometrics initialized: face tolerance={:.2}, voice threshold={:.2} ({:?})",
            config.face.tolerance,
            config.voice.threshold,
            config.voice.cost_normalization
        );

        Ok(Self {
            paths,
            config,
            keys,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    fn template_path(&self, modality: Modality) -> PathBuf {
        self.paths.template_file(modality)
    }

    /// Both key and template present
    pub fn is_registered(&self, modality: Modality) -> bool {
        self.keys.exists(modality) && self.template_path(modality).exists()
    }

    fn enroll<T: Template>(&self, modality: Modality, template: &T) -> Result<()> {
        let path = self.template_path(modality);
        let key = self.keys.key_for_enrollment(modality, path.exists())?;
        vault::store(template, &key, &path)?;
        log::info!("{} registered", modality);
        Ok(())
    }

    /// Load the stored template. The template file is checked before any key
    /// material is read.
    fn load_template<T: Template>(&self, modality: Modality) -> Result<T> {
        let path = self.template_path(modality);
        if !path.exists() {
            return Err(BiometricError::NotFound(path));
        }
        let key = self.keys.load(modality)?;
        vault::load(&path, &key)
    }

    // ===== FACE =====

    pub fn register_face(&self, embedding: &FaceTemplate) -> Result<()> {
        self.enroll(Modality::Face, embedding)
    }

    /// Register the first face found in `frame`
    pub fn register_face_from_frame<A: FaceAnalyzer>(
        &self,
        frame: &Frame,
        analyzer: &mut A,
    ) -> Result<RegistrationOutcome> {
        let detections = analyzer.analyze(frame)?;
        if detections.is_empty() {
            return Ok(RegistrationOutcome::rejected("No face detected in the frame."));
        }

        match detections.iter().find_map(|d| d.embedding.as_ref()) {
            Some(embedding) => {
                self.register_face(embedding)?;
                Ok(RegistrationOutcome::ok(
                    "Face registered and encrypted successfully!",
                ))
            }
            None => Ok(RegistrationOutcome::rejected(
                "Face detected but no embedding could be extracted.",
            )),
        }
    }

    /// Grab one frame from the camera and register the first face in it
    pub fn register_face_from_capture<S: FrameSource, A: FaceAnalyzer>(
        &self,
        device: &CaptureDevice<S>,
        analyzer: &mut A,
    ) -> Result<RegistrationOutcome> {
        let frame = {
            let mut lease = device.acquire()?;
            match lease.read() {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Frame capture for registration failed: {}", e);
                    return Ok(RegistrationOutcome::rejected("Could not capture frame."));
                }
            }
        };
        self.register_face_from_frame(&frame, analyzer)
    }

    /// Enrolled face, or `None` when unregistered (nothing is decrypted then)
    pub fn face_reference(&self) -> Result<Option<FaceTemplate>> {
        if !self.is_registered(Modality::Face) {
            return Ok(None);
        }
        self.load_template(Modality::Face).map(Some)
    }

    /// One-shot face decision
    pub fn verify_face(&self, embedding: &FaceTemplate) -> Result<FaceLabel> {
        let reference = self.face_reference()?;
        let label = label_for(
            SessionMode::Verify,
            reference.as_ref(),
            Some(embedding),
            self.config.face.tolerance,
        );
        log::info!("Face verification: {:?}", label);
        Ok(label)
    }

    /// Start a live stream session on `device`
    pub fn open_stream<S: FrameSource, A: FaceAnalyzer>(
        &self,
        device: &CaptureDevice<S>,
        analyzer: A,
        mode: SessionMode,
    ) -> Result<StreamSession<S, A>> {
        let reference = match mode {
            SessionMode::Verify => self.face_reference()?,
            SessionMode::Register => None,
        };
        let config = SessionConfig {
            interval: self.config.face.sample_interval,
            tolerance: self.config.face.tolerance,
        };

        let mut session = StreamSession::new(analyzer, mode, reference, config);
        session.start(device)?;
        Ok(session)
    }

    // ===== VOICE =====

    pub fn register_voice(&self, template: &VoiceTemplate) -> Result<()> {
        log::info!("Registering voice template ({} frames)", template.len());
        self.enroll(Modality::Voice, template)
    }

    /// Decode a WAV payload, extract features and register them
    pub fn register_voice_from_wav<E: MfccExtractor>(
        &self,
        wav: &[u8],
        extractor: &E,
    ) -> Result<()> {
        let waveform = audio::decode_wav(wav)?;
        log::info!(
            "Registration audio: {} samples @ {} Hz ({} ms)",
            waveform.samples.len(),
            waveform.sample_rate,
            waveform.duration_ms()
        );

        if self.config.voice.keep_last_recording {
            let path = self.paths.last_recording();
            if let Err(e) = audio::write_wav(&path, &waveform) {
                log::warn!("Could not keep last recording: {}", e);
            }
        }

        let template = VoiceTemplate::from_raw(extractor.extract(&waveform)?)?;
        self.register_voice(&template)
    }

    /// Compare a live template against the enrolled voice. Never fails:
    /// problems are reported in the result.
    pub fn verify_voice(&self, live: &VoiceTemplate) -> VoiceVerification {
        let threshold = self.config.voice.threshold;
        let scored = self.load_template::<VoiceTemplate>(Modality::Voice).and_then(|reference| {
            voice::score(live, &reference, self.config.voice.cost_normalization)
        });

        match scored {
            Ok(cost) => {
                let success = voice::decide(cost, threshold);
                log::info!(
                    "Voice verification: cost={:.4}, threshold={:.4}, result={}",
                    cost,
                    threshold,
                    if success { "PASS" } else { "FAIL" }
                );
                VoiceVerification {
                    success,
                    message: if success {
                        "Voice verified.".to_string()
                    } else {
                        "Voice did not match.".to_string()
                    },
                    cost: Some(cost),
                    threshold,
                    failure: None,
                }
            }
            Err(e) => {
                log::warn!("Voice verification could not complete: {}", e);
                VoiceVerification::failed(&e, threshold)
            }
        }
    }

    /// Decode, extract and verify a WAV payload
    pub fn verify_voice_from_wav<E: MfccExtractor>(
        &self,
        wav: &[u8],
        extractor: &E,
    ) -> VoiceVerification {
        if !self.is_registered(Modality::Voice) {
            let err = BiometricError::NotFound(self.template_path(Modality::Voice));
            return VoiceVerification::failed(&err, self.config.voice.threshold);
        }

        let live = audio::decode_wav(wav)
            .and_then(|waveform| extractor.extract(&waveform))
            .and_then(VoiceTemplate::from_raw);

        match live {
            Ok(live) => self.verify_voice(&live),
            Err(e) => {
                log::warn!("Voice verification input rejected: {}", e);
                VoiceVerification::failed(&e, self.config.voice.threshold)
            }
        }
    }

    // ===== MAINTENANCE =====

    pub fn status(&self) -> StatusReport {
        run_status(&self.paths, &self.keys)
    }

    /// Decrypt a stored template to `out` in its canonical encoding
    pub fn export_template(&self, modality: Modality, out: &Path) -> Result<()> {
        let key = self.keys.load(modality)?;
        vault::load_to_file(&self.template_path(modality), &key, out)
    }

    /// Remove the template, then the key it was encrypted under
    pub fn reset(&self, modality: Modality) -> Result<()> {
        vault::store::remove(&self.template_path(modality))?;
        self.keys.remove(modality)?;
        log::info!("{} registration reset", modality);
        Ok(())
    }
}
