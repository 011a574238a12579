//! Audio preprocessing modules
//!
//! This module contains utilities for preparing audio for analysis:
//! - Channel mixing (interleaved multichannel to mono)
//! - Linear resampling to the analysis rate
//! - Music start detection

pub mod channel_mixer;
pub mod resample;
pub mod silence;
