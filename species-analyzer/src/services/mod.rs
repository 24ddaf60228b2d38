//! Upload → classify → store pipeline

pub mod analysis;
pub mod classifier;
pub mod intake;

pub use analysis::{analyze_upload, Analysis};
pub use classifier::{ClassifierConfig, ClassifyError, OpenAiClassifier, SpeciesClassifier};
pub use intake::{read_upload, EncodedImage, ImageUpload, IntakeError};
