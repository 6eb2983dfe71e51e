//! End-to-end enrollment and verification against a temporary data root

use std::fs;

use biolock_lib::audio::{MfccExtractor, Waveform};
use biolock_lib::face::{
    CaptureDevice, Detection, FaceAnalyzer, FaceBox, FaceLabel, FaceTemplate, Frame, FrameSource,
    SessionMode, SessionState, FACE_EMBEDDING_DIM,
};
use biolock_lib::vault::{self, KeyManager, NumericArray, Template};
use biolock_lib::voice::{MfccFrame, VoiceTemplate, MFCC_COEFFS};
use biolock_lib::{AppConfig, AppPaths, Biometrics, ErrorKind, Modality};
use proptest::prelude::*;

fn setup() -> (tempfile::TempDir, Biometrics) {
    let dir = tempfile::tempdir().unwrap();
    let paths = AppPaths::at(dir.path());
    paths.ensure_directories().unwrap();
    let biometrics = Biometrics::new(paths, AppConfig::default()).unwrap();
    (dir, biometrics)
}

fn face(fill: f64) -> FaceTemplate {
    FaceTemplate::new([fill; FACE_EMBEDDING_DIM]).unwrap()
}

fn voice_frames(len: usize) -> Vec<MfccFrame> {
    (0..len)
        .map(|t| std::array::from_fn(|c| ((t * 3 + c) as f32 * 0.17).cos() * 20.0))
        .collect()
}

/// Camera that serves a fixed number of blank frames
struct Camera {
    remaining: usize,
}

impl FrameSource for Camera {
    fn open(&mut self) -> biolock_lib::Result<()> {
        Ok(())
    }

    fn read(&mut self) -> biolock_lib::Result<Frame> {
        if self.remaining == 0 {
            return Err(biolock_lib::BiometricError::Device("camera closed".to_string()));
        }
        self.remaining -= 1;
        Ok(Frame {
            width: 2,
            height: 2,
            pixels: vec![0; 4],
        })
    }

    fn release(&mut self) {}
}

/// Sees one face with a fixed embedding in every frame
struct OneFace(Option<FaceTemplate>);

impl FaceAnalyzer for OneFace {
    fn analyze(&mut self, _frame: &Frame) -> biolock_lib::Result<Vec<Detection>> {
        Ok(vec![Detection {
            bbox: FaceBox {
                top: 0,
                right: 1,
                bottom: 1,
                left: 0,
            },
            embedding: self.0,
        }])
    }
}

/// Sees nothing
struct NoFace;

impl FaceAnalyzer for NoFace {
    fn analyze(&mut self, _frame: &Frame) -> biolock_lib::Result<Vec<Detection>> {
        Ok(Vec::new())
    }
}

/// Emits one frame of coefficients per 160 samples
struct BlockExtractor;

impl MfccExtractor for BlockExtractor {
    fn extract(&self, waveform: &Waveform) -> biolock_lib::Result<Vec<MfccFrame>> {
        Ok(waveform
            .samples
            .chunks(160)
            .map(|block| {
                let energy: f32 = block.iter().map(|s| s * s).sum();
                std::array::from_fn(|c| energy * (c + 1) as f32)
            })
            .collect())
    }
}

fn wav(samples: &[f32]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[test]
fn face_happy_path_and_mismatch() {
    let (_dir, bio) = setup();
    let enrolled = face(0.1);
    bio.register_face(&enrolled).unwrap();

    let mut nudged = [0.1; FACE_EMBEDDING_DIM];
    nudged[0] += 0.05;
    assert_eq!(
        bio.verify_face(&FaceTemplate::new(nudged).unwrap()).unwrap(),
        FaceLabel::Valid
    );
    assert_eq!(bio.verify_face(&face(0.5)).unwrap(), FaceLabel::Invalid);
}

#[test]
fn face_unregistered_prompts_registration() {
    let (_dir, bio) = setup();
    assert_eq!(bio.face_reference().unwrap(), None);
    assert_eq!(bio.verify_face(&face(0.1)).unwrap(), FaceLabel::NotRegistered);
    assert_eq!(FaceLabel::NotRegistered.text(), "Register First");
}

#[test]
fn voice_identical_template_has_zero_cost() {
    let (_dir, bio) = setup();
    let template = VoiceTemplate::from_raw(voice_frames(60)).unwrap();
    bio.register_voice(&template).unwrap();

    let result = bio.verify_voice(&VoiceTemplate::from_raw(voice_frames(60)).unwrap());
    assert!(result.success);
    assert_eq!(result.cost, Some(0.0));
}

#[test]
fn voice_missing_registration_is_reported() {
    let (_dir, bio) = setup();
    let result = bio.verify_voice(&VoiceTemplate::from_raw(voice_frames(10)).unwrap());
    assert!(!result.success);
    assert_eq!(result.failure, Some(ErrorKind::NotFound));
    assert_eq!(result.message, "No registered voice found. Please register first.");
}

#[test]
fn truncated_voice_template_fails_integrity() {
    let (_dir, bio) = setup();
    bio.register_voice(&VoiceTemplate::from_raw(voice_frames(30)).unwrap())
        .unwrap();

    let path = bio.paths().template_file(Modality::Voice);
    let mut bytes = fs::read(&path).unwrap();
    bytes.pop();
    fs::write(&path, bytes).unwrap();

    let result = bio.verify_voice(&VoiceTemplate::from_raw(voice_frames(30)).unwrap());
    assert!(!result.success);
    assert_eq!(result.failure, Some(ErrorKind::Integrity));
}

#[test]
fn key_without_template_reads_as_not_registered() {
    let (_dir, bio) = setup();
    KeyManager::new(bio.paths().keys_dir())
        .generate(Modality::Face)
        .unwrap();

    assert!(!bio.is_registered(Modality::Face));
    assert_eq!(bio.face_reference().unwrap(), None);

    let status = bio.status();
    assert!(!status.item(Modality::Face).unwrap().registered);

    // Registration reuses the orphaned key
    bio.register_face(&face(0.2)).unwrap();
    assert_eq!(bio.face_reference().unwrap(), Some(face(0.2)));
}

#[test]
fn voice_from_wav_roundtrip() {
    let (_dir, bio) = setup();
    let samples: Vec<f32> = (0..16000).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();
    let payload = wav(&samples);

    bio.register_voice_from_wav(&payload, &BlockExtractor).unwrap();
    let result = bio.verify_voice_from_wav(&payload, &BlockExtractor);
    assert!(result.success);

    let garbage = bio.verify_voice_from_wav(b"not audio", &BlockExtractor);
    assert_eq!(garbage.failure, Some(ErrorKind::Format));
}

#[test]
fn register_from_capture_without_face() {
    let (_dir, bio) = setup();
    let device = CaptureDevice::new(Camera { remaining: 1 });

    let outcome = bio.register_face_from_capture(&device, &mut NoFace).unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, "No face detected in the frame.");
    assert!(!device.is_in_use());

    let outcome = bio
        .register_face_from_capture(&device, &mut OneFace(Some(face(0.3))))
        .unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, "Could not capture frame.");
}

#[test]
fn stream_verifies_against_enrolled_face() {
    let (_dir, bio) = setup();
    bio.register_face(&face(0.4)).unwrap();
    let device = CaptureDevice::new(Camera { remaining: 7 });

    let mut session = bio
        .open_stream(&device, OneFace(Some(face(0.4))), SessionMode::Verify)
        .unwrap();
    assert!(device.is_in_use());

    let frames: Vec<_> = session.by_ref().collect();
    assert_eq!(frames.len(), 7);
    assert!(frames.iter().all(|f| f.annotations[0].label == FaceLabel::Valid));
    assert_eq!(
        frames.iter().filter(|f| f.refreshed).count(),
        2,
        "frames 0 and 5 are analysed"
    );
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.end_reason(), Some(ErrorKind::Device));
    assert!(!device.is_in_use());
}

#[test]
fn second_stream_cannot_share_the_camera() {
    let (_dir, bio) = setup();
    let device = CaptureDevice::new(Camera { remaining: 100 });

    let mut first = bio
        .open_stream(&device, NoFace, SessionMode::Register)
        .unwrap();
    let second = bio.open_stream(&device, NoFace, SessionMode::Register);
    assert_eq!(second.err().map(|e| e.kind()), Some(ErrorKind::Device));

    first.stop();
    assert!(bio.open_stream(&device, NoFace, SessionMode::Register).is_ok());
}

#[test]
fn export_then_decode_matches_template() {
    let (dir, bio) = setup();
    let template = VoiceTemplate::from_raw(voice_frames(25)).unwrap();
    bio.register_voice(&template).unwrap();

    let out = dir.path().join("voice.export");
    bio.export_template(Modality::Voice, &out).unwrap();
    let array = NumericArray::decode(&fs::read(&out).unwrap()).unwrap();
    assert_eq!(VoiceTemplate::from_array(array).unwrap(), template);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn face_vectors_survive_storage(values in prop::array::uniform32(-10.0f64..10.0)) {
        let dir = tempfile::tempdir().unwrap();
        let keys = KeyManager::new(dir.path());
        let key = keys.generate(Modality::Face).unwrap();
        let path = dir.path().join("face.tpl.enc");

        let mut full = [0.0; FACE_EMBEDDING_DIM];
        for (i, slot) in full.iter_mut().enumerate() {
            *slot = values[i % values.len()] * (i + 1) as f64;
        }
        let template = FaceTemplate::new(full).unwrap();
        vault::store(&template, &key, &path).unwrap();
        prop_assert_eq!(vault::load::<FaceTemplate>(&path, &key).unwrap(), template);
    }

    #[test]
    fn voice_matrices_survive_storage(
        rows in prop::collection::vec(prop::array::uniform13(-50.0f32..50.0), 1..=500)
    ) {
        let dir = tempfile::tempdir().unwrap();
        let keys = KeyManager::new(dir.path());
        let key = keys.generate(Modality::Voice).unwrap();
        let path = dir.path().join("voice.tpl.enc");

        let template = VoiceTemplate::from_raw(rows).unwrap();
        vault::store(&template, &key, &path).unwrap();
        let restored = vault::load::<VoiceTemplate>(&path, &key).unwrap();
        prop_assert_eq!(restored.len(), template.len());
        prop_assert_eq!(restored.frames()[0].len(), MFCC_COEFFS);
        prop_assert_eq!(restored, template);
    }
}
