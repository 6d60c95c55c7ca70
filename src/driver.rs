//! Running a kernel over interleaved channels.
//!
//! Channels are taken in groups of 16, then 8, then 4 for as long as enough of them remain,
//! and whatever is left goes through the one-lane (scalar) instantiation of the same kernel.

use crate::kernel::{DirectForm2Transposed, InPlace, Io, Kernel, LaneCoefs, Split, StateSpace};
use crate::occupancy::{Shape, A1, A2, B0, B1, B2};
use crate::{Lanes, Realization, Sample, NUM_COEFS};

/// The geometry of one processing call.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Block {
    pub frames: usize,
    /// The distance, in samples, between the starts of consecutive frames.
    pub stride: usize,
    pub channels: usize,
    /// If true, every channel uses the first coefficient set.
    pub shared: bool,
    /// If false, every channel goes through the scalar loop.
    pub vectorize: bool,
}

/// A fully specialized channel processor.
///
/// Arguments are the output buffer, the input buffer (or `None` to process the output buffer
/// in place), the block geometry, the kernel-form coefficients, and the delay state.
pub(crate) type ChannelFn<T> = fn(&mut [T], Option<&[T]>, Block, &[T], &mut [T]);

/// Picks the channel processor for a realization and shape.
pub(crate) fn select<T: Sample>(realization: Realization, shape: Shape) -> ChannelFn<T> {
    match realization {
        Realization::DirectForm2Transposed => select_kernel::<DirectForm2Transposed, T>(shape),
        Realization::StateSpace => select_kernel::<StateSpace, T>(shape),
    }
}

fn select_kernel<K: Kernel, T: Sample>(shape: Shape) -> ChannelFn<T> {
    match shape {
        Shape::Scale => process_channels::<K, T, B0>,
        Shape::SingleZero => process_channels::<K, T, { B0 | B1 }>,
        Shape::DoubleZero => process_channels::<K, T, { B0 | B1 | B2 }>,
        Shape::SinglePole => process_channels::<K, T, { B0 | A1 }>,
        Shape::FirstOrder => process_channels::<K, T, { B0 | B1 | A1 }>,
        Shape::DoublePoleZero => process_channels::<K, T, { B0 | B1 | A1 | A2 }>,
        Shape::Full => process_channels::<K, T, { B0 | B1 | B2 | A1 | A2 }>,
    }
}

fn process_channels<K: Kernel, T: Sample, const OCC: u8>(
    out: &mut [T],
    input: Option<&[T]>,
    block: Block,
    coefs: &[T],
    delays: &mut [T],
) {
    match input {
        Some(input) => run::<K, T, _, OCC>(&mut Split { out, input }, block, coefs, delays),
        None => run::<K, T, _, OCC>(&mut InPlace(out), block, coefs, delays),
    }
}

fn run<K: Kernel, T: Sample, B: Io<T>, const OCC: u8>(
    io: &mut B,
    block: Block,
    coefs: &[T],
    delays: &mut [T],
) {
    let mut channel = 0;
    if block.vectorize {
        if block.channels == 1 {
            let mut s = [delays[0], delays[1]];
            K::process_single::<T, B, OCC>(
                io,
                0,
                block.frames,
                block.stride,
                &coefs[..NUM_COEFS],
                &mut s,
            );
            delays[..2].copy_from_slice(&s);
            return;
        }
        channel = run_groups::<K, T, T::X16, B, OCC>(io, block, coefs, delays, channel);
        channel = run_groups::<K, T, T::X8, B, OCC>(io, block, coefs, delays, channel);
        channel = run_groups::<K, T, T::X4, B, OCC>(io, block, coefs, delays, channel);
    }
    run_groups::<K, T, T, B, OCC>(io, block, coefs, delays, channel);
}

/// Processes groups of `V::LANES` channels, starting at `channel`, for as long as there are
/// enough channels left. Returns the first unprocessed channel.
fn run_groups<K: Kernel, T: Sample, V: Lanes<Elem = T>, B: Io<T>, const OCC: u8>(
    io: &mut B,
    block: Block,
    coefs: &[T],
    delays: &mut [T],
    mut channel: usize,
) -> usize {
    while block.channels - channel >= V::LANES {
        let first = channel;
        let c = if block.shared {
            LaneCoefs::<V>::gather(move |_| &coefs[..NUM_COEFS])
        } else {
            LaneCoefs::<V>::gather(move |i| channel_set(coefs, first + i))
        };
        let mut s = load_state::<V, _>(delays, |i| first + i);
        let held = s;
        K::process::<T, V, B, OCC>(io, first, block.frames, block.stride, &c, &mut s);
        store_state(delays, &s, |i| first + i);
        if !block.shared {
            // A channel without a numerator is silent and keeps its state.
            for i in 0..V::LANES {
                let ch = first + i;
                if is_silent(channel_set(coefs, ch)) {
                    silence::<T, B>(io, block, ch);
                    delays[2 * ch] = held[0].lane(i);
                    delays[2 * ch + 1] = held[1].lane(i);
                }
            }
        }
        channel += V::LANES;
    }
    channel
}

/// The coefficient set of channel (or stage) `index`.
#[inline(always)]
pub(crate) fn channel_set<T>(coefs: &[T], index: usize) -> &[T] {
    &coefs[NUM_COEFS * index..NUM_COEFS * (index + 1)]
}

/// Whether a kernel-form coefficient set has an all-zero numerator. Both realizations keep
/// the numerator at zero when `b0`, `b1` and `b2` are zero.
#[inline(always)]
pub(crate) fn is_silent<T: Sample>(set: &[T]) -> bool {
    set[..3].iter().all(|&c| c == T::ZERO)
}

fn silence<T: Sample, B: Io<T>>(io: &mut B, block: Block, channel: usize) {
    for f in 0..block.frames {
        io.store::<T>(channel + f * block.stride, T::ZERO);
    }
}

/// Gathers the delay state of channel `which(i)` into lane `i`.
#[inline(always)]
pub(crate) fn load_state<V: Lanes, F: Fn(usize) -> usize>(delays: &[V::Elem], which: F) -> [V; 2] {
    [
        V::from_fn(|i| delays[2 * which(i)]),
        V::from_fn(|i| delays[2 * which(i) + 1]),
    ]
}

/// Scatters lane `i` of the state back to channel `which(i)`.
#[inline(always)]
pub(crate) fn store_state<V: Lanes, F: Fn(usize) -> usize>(
    delays: &mut [V::Elem],
    s: &[V; 2],
    which: F,
) {
    for i in 0..V::LANES {
        delays[2 * which(i)] = s[0].lane(i);
        delays[2 * which(i) + 1] = s[1].lane(i);
    }
}

/// Zeroes the samples of `channels` channels in each of `frames` frames.
pub(crate) fn fill_zero<T: Sample>(out: &mut [T], frames: usize, stride: usize, channels: usize) {
    for f in 0..frames {
        let start = f * stride;
        for x in &mut out[start..start + channels] {
            *x = T::ZERO;
        }
    }
}
