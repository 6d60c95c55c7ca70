use std::fmt;

use crate::cascade::{self, Cascade, CascadeFn};
use crate::coefs::{is_stable, normalize, NUM_COEFS};
use crate::driver::{self, fill_zero, Block, ChannelFn};
use crate::kernel::{DirectForm2Transposed, Kernel, StateSpace};
use crate::occupancy::{occupancy, Shape, NUMERATOR};
use crate::{config, Sample};

/// The two ways of arranging the biquad recurrence.
///
/// Both produce the same output (up to rounding) and keep the same delay state, so switching
/// between them never causes a discontinuity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Realization {
    /// The transposed direct form II.
    DirectForm2Transposed,
    /// The observable canonical state-space form. This accumulates less rounding error for
    /// poles near the unit circle, and filters a single channel two samples at a time.
    StateSpace,
}

/// A bank of biquad filters applied to interleaved multichannel audio.
///
/// Each channel has two values of delay state. The coefficients are either one set shared by
/// all channels or one set per channel; that choice, like the channel count, is fixed when the
/// filter is built.
///
/// Coefficients are given as `[b0, b1, b2, a1, a2]` (with an implicit `a0 = 1`) or as
/// `[b0, b1, b2, a0, a1, a2]`; see [`normalize`](crate::normalize). Setting coefficients never
/// fails: unstable coefficients are accepted, and the return value tells whether the result is
/// stable. Passing through unstable settings is a normal thing to do while interpolating
/// coefficients.
///
/// # Example
///
/// ```rust
/// # use biquad_engine::BiquadFilter;
/// // A stereo one-pole lowpass.
/// let mut filter = BiquadFilter::<f32>::with_coefficients(2, &[0.5, 0.0, 0.0, -0.5, 0.0], true);
/// assert!(filter.is_stable());
///
/// let input = [1.0, -1.0, 0.0, 0.0, 0.0, 0.0];
/// let mut output = [0.0; 6];
/// filter.process(&mut output, &input, 3);
/// assert_eq!(output, [0.5, -0.5, 0.25, -0.25, 0.125, -0.125]);
/// ```
#[derive(Clone)]
pub struct BiquadFilter<T: Sample> {
    channels: usize,
    shared: bool,
    realization: Realization,
    optimized: bool,
    /// Normalized coefficients, `NUM_COEFS` per set, exactly as they were set.
    coefs: Vec<T>,
    /// The same coefficients, converted to the form the realization's kernel expects.
    kernel_coefs: Vec<T>,
    /// Interleaved `[s1, s2]` for each channel.
    delays: Vec<T>,
    /// The union of the occupancy masks of all the kernel coefficient sets.
    occupancy: u8,
    process_channels: ChannelFn<T>,
    process_cascade: CascadeFn<T>,
}

/// Configures and creates a [`BiquadFilter`].
///
/// ```rust
/// # use biquad_engine::{BiquadFilter, Realization};
/// let filter = BiquadFilter::<f64>::builder(8)
///     .coefficients(&[0.2, 0.4, 0.2, -0.5, 0.3])
///     .per_channel()
///     .realization(Realization::DirectForm2Transposed)
///     .build();
/// assert!(!filter.same_coefficients());
/// ```
#[derive(Clone, Debug)]
pub struct Builder<T: Sample> {
    channels: usize,
    coefs: [T; NUM_COEFS],
    shared: bool,
    realization: Realization,
    optimized: bool,
}

impl<T: Sample> Builder<T> {
    /// Starts configuring a filter for `channels` channels.
    ///
    /// By default the coefficients are all zero and shared between channels, the realization
    /// comes from the process-wide [`EngineConfig`](crate::EngineConfig), and vector groups
    /// are allowed.
    pub fn new(channels: usize) -> Builder<T> {
        Builder {
            channels,
            coefs: [T::ZERO; NUM_COEFS],
            shared: true,
            realization: config().realization,
            optimized: true,
        }
    }

    /// The initial coefficients, in 5- or 6-term form. In per-channel mode, every channel
    /// starts with these.
    pub fn coefficients(mut self, coefs: &[T]) -> Self {
        self.coefs = normalize(coefs);
        self
    }

    /// Chooses whether all channels share a single coefficient set.
    pub fn same_coefficients(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    /// Gives every channel its own coefficient set.
    pub fn per_channel(self) -> Self {
        self.same_coefficients(false)
    }

    /// Chooses the realization of the recurrence.
    pub fn realization(mut self, realization: Realization) -> Self {
        self.realization = realization;
        self
    }

    /// If false, the filter only uses the scalar kernels.
    pub fn optimized(mut self, optimized: bool) -> Self {
        self.optimized = optimized;
        self
    }

    /// Creates the filter.
    ///
    /// # Panics
    ///
    /// Panics if the channel count is zero.
    pub fn build(self) -> BiquadFilter<T> {
        assert!(self.channels > 0, "a filter needs at least one channel");
        let sets = if self.shared { 1 } else { self.channels };
        let coefs: Vec<T> = (0..sets).flat_map(|_| self.coefs.iter().copied()).collect();
        let mut ret = BiquadFilter {
            channels: self.channels,
            shared: self.shared,
            realization: self.realization,
            optimized: self.optimized,
            kernel_coefs: coefs.clone(),
            coefs,
            delays: vec![T::ZERO; 2 * self.channels],
            occupancy: 0,
            process_channels: driver::select(self.realization, Shape::Full),
            process_cascade: cascade::select(self.realization, Shape::Full),
        };
        ret.update_all();
        ret
    }
}

impl<T: Sample> BiquadFilter<T> {
    /// Creates a filter for `channels` channels with all coefficients zero.
    pub fn new(channels: usize) -> BiquadFilter<T> {
        Builder::new(channels).build()
    }

    /// Creates a filter for `channels` channels.
    ///
    /// If `same_coefficients` is false, each channel gets its own copy of `coefs` which can
    /// later be changed with [`set_channel_coefficients`](Self::set_channel_coefficients).
    pub fn with_coefficients(channels: usize, coefs: &[T], same_coefficients: bool) -> Self {
        Builder::new(channels)
            .coefficients(coefs)
            .same_coefficients(same_coefficients)
            .build()
    }

    /// Starts configuring a filter for `channels` channels.
    pub fn builder(channels: usize) -> Builder<T> {
        Builder::new(channels)
    }

    /// The number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels
    }

    /// Whether all channels share one coefficient set.
    pub fn same_coefficients(&self) -> bool {
        self.shared
    }

    /// The realization used for processing.
    pub fn realization(&self) -> Realization {
        self.realization
    }

    /// Whether vector groups are in use. This is the `optimized` hint from the most recent
    /// coefficient change, unless the process-wide configuration forces scalar processing.
    pub fn is_optimized(&self) -> bool {
        self.optimized && !config().force_scalar
    }

    /// Switches to a different realization. The delay state carries over unchanged.
    pub fn set_realization(&mut self, realization: Realization) {
        self.realization = realization;
        self.update_all();
    }

    /// Sets the coefficients of every channel, returning whether the filter is stable.
    ///
    /// `coefs` has 5 or 6 terms (see [`normalize`](crate::normalize)). If `optimized` is
    /// false, processing sticks to the scalar kernels.
    ///
    /// # Panics
    ///
    /// Panics if `coefs` has the wrong length or describes a non-causal filter.
    pub fn set_coefficients(&mut self, coefs: &[T], optimized: bool) -> bool {
        let c = normalize(coefs);
        for set in self.coefs.chunks_exact_mut(NUM_COEFS) {
            set.copy_from_slice(&c);
        }
        self.optimized = optimized;
        self.update_all();
        is_stable(c[3], c[4])
    }

    /// Sets the coefficients of a single channel, returning whether that channel is stable.
    ///
    /// # Panics
    ///
    /// Panics if the filter shares one coefficient set between all channels, if `channel` is
    /// out of range, or if `coefs` is invalid as in [`set_coefficients`](Self::set_coefficients).
    pub fn set_channel_coefficients(
        &mut self,
        channel: usize,
        coefs: &[T],
        optimized: bool,
    ) -> bool {
        assert!(
            !self.shared,
            "per-channel coefficients on a filter with shared coefficients"
        );
        self.check_channel(channel);
        let c = normalize(coefs);
        let range = NUM_COEFS * channel..NUM_COEFS * (channel + 1);
        let prepared = self.prepare(&c);
        self.coefs[range.clone()].copy_from_slice(&c);
        self.kernel_coefs[range].copy_from_slice(&prepared);
        self.optimized = optimized;
        self.update_dispatch();
        is_stable(c[3], c[4])
    }

    /// The raw coefficient storage: one normalized `[b0, b1, b2, a1, a2]` set, or one per
    /// channel in channel order.
    pub fn coefficients(&self) -> &[T] {
        &self.coefs
    }

    /// The normalized coefficients that apply to `channel`.
    pub fn channel_coefficients(&self, channel: usize) -> [T; NUM_COEFS] {
        self.check_channel(channel);
        let set = &self.coefs[self.set_range(channel)];
        [set[0], set[1], set[2], set[3], set[4]]
    }

    /// Whether every channel is stable.
    pub fn is_stable(&self) -> bool {
        self.coefs
            .chunks_exact(NUM_COEFS)
            .all(|c| is_stable(c[3], c[4]))
    }

    /// Whether `channel` is stable.
    pub fn is_channel_stable(&self, channel: usize) -> bool {
        let c = self.channel_coefficients(channel);
        is_stable(c[3], c[4])
    }

    /// The shape that processing is specialized for, or `None` if every numerator is zero
    /// (in which case the output is always zero).
    pub fn shape(&self) -> Option<Shape> {
        if self.occupancy & NUMERATOR == 0 {
            None
        } else {
            Some(Shape::from_occupancy(self.occupancy))
        }
    }

    /// Filters `frames` frames of densely interleaved audio from `input` into `output`.
    ///
    /// This is [`process_strided`](Self::process_strided) with a stride equal to the channel
    /// count.
    pub fn process(&mut self, output: &mut [T], input: &[T], frames: usize) {
        self.process_strided(output, input, frames, self.channels)
    }

    /// Filters `frames` frames from `input` into `output`, with frame `f` starting at sample
    /// `f * stride` of each buffer.
    ///
    /// Samples between the last channel of a frame and the start of the next frame are
    /// neither read nor written.
    ///
    /// # Panics
    ///
    /// Panics if `stride` is less than the channel count or if either buffer is too short.
    pub fn process_strided(&mut self, output: &mut [T], input: &[T], frames: usize, stride: usize) {
        self.check_block("input", input.len(), frames, stride);
        self.check_block("output", output.len(), frames, stride);
        self.run(output, Some(input), frames, stride);
    }

    /// Filters `frames` frames of `buf` in place, with frame `f` starting at `f * stride`.
    ///
    /// # Panics
    ///
    /// Panics if `stride` is less than the channel count or if `buf` is too short.
    pub fn process_in_place(&mut self, buf: &mut [T], frames: usize, stride: usize) {
        self.check_block("buffer", buf.len(), frames, stride);
        self.run(buf, None, frames, stride);
    }

    /// Treats the coefficient sets as a chain of filters and runs the first `frames` samples
    /// of the single-channel stream `buf` through all of them, in place.
    ///
    /// With `N` channels this is a cascade of `N` biquads: the output of stage `i`, which
    /// uses the coefficients and delay state of channel `i`, is the input of stage `i + 1`.
    /// With shared coefficients the same section is applied `N` times.
    ///
    /// This is experimental.
    ///
    /// # Panics
    ///
    /// Panics if `buf` has fewer than `frames` samples.
    pub fn process_1d(&mut self, buf: &mut [T], frames: usize) {
        assert!(
            buf.len() >= frames,
            "buffer holds {} samples but {} frames were requested",
            buf.len(),
            frames
        );
        if self.occupancy & NUMERATOR == 0 {
            fill_zero(buf, frames, 1, 1);
            return;
        }
        let job = Cascade {
            frames,
            stages: self.channels,
            shared: self.shared,
            vectorize: self.is_optimized(),
        };
        (self.process_cascade)(buf, job, &self.kernel_coefs, &mut self.delays);
    }

    /// Resets the delay state of every channel to zero.
    pub fn clear(&mut self) {
        for d in &mut self.delays {
            *d = T::ZERO;
        }
    }

    /// The delay state: `s1` and `s2` of channel 0, then of channel 1, and so on.
    pub fn delays(&self) -> &[T] {
        &self.delays
    }

    /// Replaces the delay state, for example to carry it over to a filter with new
    /// coefficients.
    ///
    /// # Panics
    ///
    /// Panics unless `delays` has exactly two values per channel.
    pub fn set_delays(&mut self, delays: &[T]) {
        assert_eq!(
            delays.len(),
            self.delays.len(),
            "expected two delay values for each of {} channels",
            self.channels
        );
        self.delays.copy_from_slice(delays);
    }

    fn run(&mut self, output: &mut [T], input: Option<&[T]>, frames: usize, stride: usize) {
        if frames == 0 {
            return;
        }
        if self.occupancy & NUMERATOR == 0 {
            fill_zero(output, frames, stride, self.channels);
            return;
        }
        let block = Block {
            frames,
            stride,
            channels: self.channels,
            shared: self.shared,
            vectorize: self.is_optimized(),
        };
        (self.process_channels)(output, input, block, &self.kernel_coefs, &mut self.delays);
    }

    fn check_channel(&self, channel: usize) {
        assert!(
            channel < self.channels,
            "channel {} is out of range for a filter with {} channels",
            channel,
            self.channels
        );
    }

    fn check_block(&self, name: &str, len: usize, frames: usize, stride: usize) {
        assert!(
            stride >= self.channels,
            "stride {} is less than the channel count {}",
            stride,
            self.channels
        );
        if frames > 0 {
            let needed = (frames - 1) * stride + self.channels;
            assert!(
                len >= needed,
                "{} holds {} samples but {} are needed",
                name,
                len,
                needed
            );
        }
    }

    fn set_range(&self, channel: usize) -> std::ops::Range<usize> {
        let set = if self.shared { 0 } else { channel };
        NUM_COEFS * set..NUM_COEFS * (set + 1)
    }

    fn prepare(&self, coefs: &[T; NUM_COEFS]) -> [T; NUM_COEFS] {
        match self.realization {
            Realization::DirectForm2Transposed => DirectForm2Transposed::prepare(coefs),
            Realization::StateSpace => StateSpace::prepare(coefs),
        }
    }

    /// Recomputes all the kernel coefficients and the processors.
    fn update_all(&mut self) {
        for i in 0..self.coefs.len() / NUM_COEFS {
            let range = NUM_COEFS * i..NUM_COEFS * (i + 1);
            let c = &self.coefs[range.clone()];
            let c = self.prepare(&[c[0], c[1], c[2], c[3], c[4]]);
            self.kernel_coefs[range].copy_from_slice(&c);
        }
        self.update_dispatch();
    }

    /// Recomputes the occupancy and picks the matching processors.
    fn update_dispatch(&mut self) {
        self.occupancy = self
            .kernel_coefs
            .chunks_exact(NUM_COEFS)
            .map(|c| occupancy(&[c[0], c[1], c[2], c[3], c[4]]))
            .fold(0, |acc, occ| acc | occ);
        let shape = Shape::from_occupancy(self.occupancy);
        self.process_channels = driver::select(self.realization, shape);
        self.process_cascade = cascade::select(self.realization, shape);
    }
}

impl<T: Sample> fmt::Debug for BiquadFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BiquadFilter")
            .field("channels", &self.channels)
            .field("same_coefficients", &self.shared)
            .field("realization", &self.realization)
            .field("optimized", &self.optimized)
            .field("shape", &self.shape())
            .field("stable", &self.is_stable())
            .field("coefficients", &self.coefs)
            .field("delays", &self.delays)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern crate static_assertions as sa;

    sa::assert_impl_all!(BiquadFilter<f32>: Send, Sync, Clone);
    sa::assert_impl_all!(BiquadFilter<f64>: Send, Sync, Clone);

    #[test]
    fn storage_sizes() {
        let f = BiquadFilter::<f32>::with_coefficients(6, &[1.0, 0.0, 0.0, 0.0, 0.0], true);
        assert_eq!(f.coefficients().len(), 5);
        assert_eq!(f.delays().len(), 12);

        let f = BiquadFilter::<f32>::with_coefficients(6, &[1.0, 0.0, 0.0, 0.0, 0.0], false);
        assert_eq!(f.coefficients().len(), 30);
        assert_eq!(f.delays().len(), 12);
    }

    #[test]
    fn scenario_a() {
        let mut f = BiquadFilter::<f32>::with_coefficients(1, &[0.5, 0.0, 0.0, 0.0, 0.0], true);
        let mut out = [0.0; 4];
        f.process(&mut out, &[1.0; 4], 4);
        assert_eq!(out, [0.5; 4]);
        assert_eq!(f.delays(), &[0.0, 0.0]);
        assert_eq!(f.shape(), Some(Shape::Scale));
    }

    #[test]
    fn scenario_b() {
        for &r in &[Realization::DirectForm2Transposed, Realization::StateSpace] {
            let mut f = BiquadFilter::<f32>::builder(1)
                .coefficients(&[1.0, 0.0, 0.0, -0.5, 0.0])
                .realization(r)
                .build();
            let mut out = [0.0; 4];
            f.process(&mut out, &[1.0, 0.0, 0.0, 0.0], 4);
            for (y, e) in out.iter().zip(&[1.0, 0.5, 0.25, 0.125]) {
                assert!((y - e).abs() < 1e-6, "{:?}: {:?}", r, out);
            }
        }
    }

    #[test]
    fn unstable_coefficients_are_kept() {
        let mut f = BiquadFilter::<f64>::new(2);
        assert!(!f.set_coefficients(&[1.0, 0.0, 0.0, 2.0, 0.0], true));
        assert_eq!(f.channel_coefficients(1), [1.0, 0.0, 0.0, 2.0, 0.0]);
        assert!(!f.is_stable());
        assert!(f.set_coefficients(&[1.0, 0.0, 0.0, 0.5, 0.0], true));
        assert!(f.is_stable());
    }

    #[test]
    fn per_channel_stability() {
        let mut f = BiquadFilter::<f64>::with_coefficients(3, &[1.0, 0.0, 0.0, 0.0, 0.0], false);
        assert!(!f.set_channel_coefficients(1, &[1.0, 0.0, 0.0, 0.0, 1.5], true));
        assert!(f.is_channel_stable(0));
        assert!(!f.is_channel_stable(1));
        assert!(f.is_channel_stable(2));
        assert!(!f.is_stable());
    }

    #[test]
    #[should_panic(expected = "shared coefficients")]
    fn per_channel_on_shared() {
        let mut f = BiquadFilter::<f32>::new(2);
        f.set_channel_coefficients(0, &[1.0, 0.0, 0.0, 0.0, 0.0], true);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn channel_out_of_range() {
        let mut f = BiquadFilter::<f32>::with_coefficients(2, &[1.0, 0.0, 0.0, 0.0, 0.0], false);
        f.set_channel_coefficients(2, &[1.0, 0.0, 0.0, 0.0, 0.0], true);
    }

    #[test]
    #[should_panic(expected = "stride")]
    fn small_stride() {
        let mut f = BiquadFilter::<f32>::new(4);
        let mut out = [0.0; 12];
        f.process_strided(&mut out, &[0.0; 12], 4, 3);
    }

    #[test]
    #[should_panic(expected = "at least one channel")]
    fn no_channels() {
        BiquadFilter::<f32>::new(0);
    }

    #[test]
    fn shape_follows_kernel_form() {
        let c = [1.0f32, 0.0, 0.0, -0.5, 0.0];
        let f = BiquadFilter::builder(1)
            .coefficients(&c)
            .realization(Realization::DirectForm2Transposed)
            .build();
        assert_eq!(f.shape(), Some(Shape::SinglePole));
        // The state-space form moves b0 * a1 into its b1 term.
        let f = BiquadFilter::builder(1)
            .coefficients(&c)
            .realization(Realization::StateSpace)
            .build();
        assert_eq!(f.shape(), Some(Shape::FirstOrder));

        let f = BiquadFilter::<f32>::with_coefficients(1, &[0.0, 0.0, 0.0, 0.3, 0.1], true);
        assert_eq!(f.shape(), None);
    }

    #[test]
    fn switching_realization_keeps_state() {
        let c = [0.2, 0.3, 0.1, -1.1, 0.45];
        let input: Vec<f64> = (0..64).map(|i| (i as f64 * 0.37).sin()).collect();

        let mut reference = BiquadFilter::builder(1)
            .coefficients(&c)
            .realization(Realization::DirectForm2Transposed)
            .build();
        let mut expected = vec![0.0; 64];
        reference.process(&mut expected, &input, 64);

        let mut f = BiquadFilter::builder(1)
            .coefficients(&c)
            .realization(Realization::DirectForm2Transposed)
            .build();
        let mut out = vec![0.0; 64];
        f.process(&mut out[..32], &input[..32], 32);
        f.set_realization(Realization::StateSpace);
        f.process(&mut out[32..], &input[32..], 32);

        for (y, e) in out.iter().zip(&expected) {
            assert!((y - e).abs() < 1e-12);
        }
    }

    #[test]
    fn debug_output() {
        let f = BiquadFilter::<f32>::with_coefficients(2, &[1.0, 0.0, 0.0, 0.0, 0.0], true);
        let s = format!("{:?}", f);
        assert!(s.contains("channels: 2"));
        assert!(s.contains("Scale"));
    }
}
