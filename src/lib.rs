#![deny(missing_docs)]

//! `biquad-engine` is a crate for filtering multichannel audio with banks of biquad (second
//! order IIR) sections. The main entry point is [`BiquadFilter`].
//!
//! Audio is interleaved: a buffer holds frames, each frame holds one sample per channel, and
//! consecutive frames may be further apart than the channel count (the "stride"). Every
//! channel has its own delay state and either its own coefficients or a set shared with all
//! the other channels.
//!
//! Internally, each call picks a kernel specialized for which coefficients are nonzero (see
//! [`Shape`]) and filters channels in vector groups of 16, 8, and 4 before falling back to a
//! scalar loop for the rest. With the `simd` feature (on by default) the groups use the
//! vector types from the `wide` crate; without it they use plain arrays.
//!
//! [`BiquadFilter`]: struct.BiquadFilter.html

mod cascade;
mod coefs;
mod config;
mod driver;
mod filter;
mod kernel;
mod lanes;
pub mod occupancy;
mod sample;

pub use coefs::{is_stable, normalize, NUM_COEFS};
pub use config::{config, EngineConfig, REALIZATION_VAR, SCALAR_VAR};
pub use filter::{BiquadFilter, Builder, Realization};
pub use lanes::{Lanes, Pair};
pub use occupancy::Shape;
pub use sample::Sample;
