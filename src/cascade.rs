//! Running several coefficient sets one after another on a single stream.
//!
//! A cascade of `K` stages can use a `K`-lane kernel by pipelining: lane `i` runs stage
//! `K - 1 - i` on sample `w + i`, so a single contiguous load at `w` picks up exactly the
//! samples that each stage needs next, and the store at `w` hands each result to the
//! following stage for the next step. Getting the pipeline going and emptying it again is
//! done stage by stage with the scalar kernel:
//!
//! - prime: stage `j` (of the group) runs on samples `0..K - 1 - j`;
//! - steady: the `K`-lane window slides over samples `0..len`;
//! - drain: stage `j` runs on samples `len - j..len`.
//!
//! Longer cascades are split into groups the same way the channel driver splits channels,
//! and each group filters the whole stream before the next one starts.

use std::ops::Range;

use crate::driver::{channel_set, is_silent, load_state, store_state};
use crate::kernel::{DirectForm2Transposed, InPlace, Kernel, LaneCoefs, StateSpace};
use crate::occupancy::{Shape, A1, A2, B0, B1, B2};
use crate::{Lanes, Realization, Sample, NUM_COEFS};

/// The geometry of one cascade call.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Cascade {
    pub frames: usize,
    pub stages: usize,
    /// If true, every stage uses the first coefficient set.
    pub shared: bool,
    /// If false, every stage is a plain scalar sweep.
    pub vectorize: bool,
}

/// A fully specialized cascade processor: buffer, geometry, coefficients, delay state.
pub(crate) type CascadeFn<T> = fn(&mut [T], Cascade, &[T], &mut [T]);

/// Picks the cascade processor for a realization and shape.
pub(crate) fn select<T: Sample>(realization: Realization, shape: Shape) -> CascadeFn<T> {
    match realization {
        Realization::DirectForm2Transposed => select_kernel::<DirectForm2Transposed, T>(shape),
        Realization::StateSpace => select_kernel::<StateSpace, T>(shape),
    }
}

fn select_kernel<K: Kernel, T: Sample>(shape: Shape) -> CascadeFn<T> {
    match shape {
        Shape::Scale => process_cascade::<K, T, B0>,
        Shape::SingleZero => process_cascade::<K, T, { B0 | B1 }>,
        Shape::DoubleZero => process_cascade::<K, T, { B0 | B1 | B2 }>,
        Shape::SinglePole => process_cascade::<K, T, { B0 | A1 }>,
        Shape::FirstOrder => process_cascade::<K, T, { B0 | B1 | A1 }>,
        Shape::DoublePoleZero => process_cascade::<K, T, { B0 | B1 | A1 | A2 }>,
        Shape::Full => process_cascade::<K, T, { B0 | B1 | B2 | A1 | A2 }>,
    }
}

fn process_cascade<K: Kernel, T: Sample, const OCC: u8>(
    buf: &mut [T],
    job: Cascade,
    coefs: &[T],
    delays: &mut [T],
) {
    let buf = &mut buf[..job.frames];
    let mut stage = 0;
    // Chains with a silent stage run stage by stage.
    let silent = (0..job.stages).any(|st| is_silent(stage_set(coefs, job.shared, st)));
    if job.vectorize && !silent {
        stage = run_groups::<K, T, T::X16, OCC>(buf, job, coefs, delays, stage);
        stage = run_groups::<K, T, T::X8, OCC>(buf, job, coefs, delays, stage);
        stage = run_groups::<K, T, T::X4, OCC>(buf, job, coefs, delays, stage);
    }
    for stage in stage..job.stages {
        sweep::<K, T, OCC>(buf, job, stage, 0..job.frames, coefs, delays);
    }
}

fn stage_set<T>(coefs: &[T], shared: bool, stage: usize) -> &[T] {
    if shared {
        &coefs[..NUM_COEFS]
    } else {
        channel_set(coefs, stage)
    }
}

/// Runs a single stage over `range` of the buffer with the scalar kernel.
fn sweep<K: Kernel, T: Sample, const OCC: u8>(
    buf: &mut [T],
    job: Cascade,
    stage: usize,
    range: Range<usize>,
    coefs: &[T],
    delays: &mut [T],
) {
    let set = stage_set(coefs, job.shared, stage);
    if is_silent(set) {
        for x in &mut buf[range] {
            *x = T::ZERO;
        }
        return;
    }
    let c = LaneCoefs::<T>::gather(|_| set);
    let mut s = [delays[2 * stage], delays[2 * stage + 1]];
    K::process::<T, T, _, OCC>(&mut InPlace(buf), range.start, range.len(), 1, &c, &mut s);
    delays[2 * stage..2 * stage + 2].copy_from_slice(&s);
}

/// Processes groups of `V::LANES` stages, starting at `stage`, for as long as there are
/// enough stages left. Returns the first unprocessed stage.
fn run_groups<K: Kernel, T: Sample, V: Lanes<Elem = T>, const OCC: u8>(
    buf: &mut [T],
    job: Cascade,
    coefs: &[T],
    delays: &mut [T],
    mut stage: usize,
) -> usize {
    let k = V::LANES;
    while job.stages - stage >= k {
        if job.frames < 2 * k {
            // Too short for the pipeline to pay off.
            for s in stage..stage + k {
                sweep::<K, T, OCC>(buf, job, s, 0..job.frames, coefs, delays);
            }
        } else {
            pipeline::<K, T, V, OCC>(buf, job, stage, coefs, delays);
        }
        stage += k;
    }
    stage
}

/// Runs stages `first..first + V::LANES` over the whole buffer. Needs at least `V::LANES`
/// frames.
fn pipeline<K: Kernel, T: Sample, V: Lanes<Elem = T>, const OCC: u8>(
    buf: &mut [T],
    job: Cascade,
    first: usize,
    coefs: &[T],
    delays: &mut [T],
) {
    let k = V::LANES;
    let len = buf.len();
    debug_assert!(len >= k);

    for j in 0..k - 1 {
        sweep::<K, T, OCC>(buf, job, first + j, 0..k - 1 - j, coefs, delays);
    }

    let lane_stage = move |i: usize| first + k - 1 - i;
    let c = LaneCoefs::<V>::gather(move |i| stage_set(coefs, job.shared, lane_stage(i)));
    let mut s = load_state::<V, _>(delays, lane_stage);
    // Consecutive windows overlap, so this is exactly a one-channel block with stride 1.
    K::process::<T, V, _, OCC>(&mut InPlace(&mut *buf), 0, len - k + 1, 1, &c, &mut s);
    store_state(delays, &s, lane_stage);

    for j in 1..k {
        sweep::<K, T, OCC>(buf, job, first + j, len - j..len, coefs, delays);
    }
}
