pub mod clear;
pub mod config;
pub mod edit;
pub mod export;
pub mod info;
pub mod session;
pub mod suggest;

use clap::ValueEnum;
use retouch_core::transform::QualityTier;

#[derive(Clone, Copy, ValueEnum)]
pub enum QualityArg {
    Low,
    Medium,
    High,
}

impl From<QualityArg> for QualityTier {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Low => QualityTier::Low,
            QualityArg::Medium => QualityTier::Medium,
            QualityArg::High => QualityTier::High,
        }
    }
}
