#![doc = include_str!("../README.md")]

pub mod classifier;
pub mod config;
pub mod correlator;
pub mod error;
pub mod pipeline;
pub mod resume;
pub mod tailer;

// 주요 타입 재노출
pub use classifier::{ActivityEvent, Classification, Classifier, EventKind};
pub use config::{ActivityConfig, ActivityConfigBuilder};
pub use correlator::{Applied, SessionCorrelator};
pub use error::ActivityError;
pub use pipeline::{ActivityPipeline, ActivityPipelineBuilder};
pub use resume::ResumeFilter;
pub use tailer::{LogTailer, RawLine, TailerStatus};
