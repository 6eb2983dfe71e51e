// Library exports for the biolock binary and integration tests

pub mod audio;
pub mod biometrics;
pub mod config;
pub mod error;
pub mod face;
pub mod paths;
pub mod status;
pub mod validation;
pub mod vault;
pub mod voice;

pub use biometrics::{Biometrics, RegistrationOutcome, VoiceVerification};
pub use config::AppConfig;
pub use error::{BiometricError, ErrorKind, Result};
pub use paths::AppPaths;
pub use vault::Modality;
