//! The per-sample biquad updates.
//!
//! Both realizations keep the same two state values per channel, namely the `s1` and `s2` of
//! the transposed direct form, so delay state can be moved freely between them. They differ
//! in how the update is arranged: the state-space form pre-combines part of the numerator with
//! the denominator, which accumulates less rounding error when the poles are close to the unit
//! circle.
//!
//! Every update is specialized on an occupancy mask `OCC`; a multiply whose coefficient bit
//! is clear is skipped entirely.

use crate::occupancy::{A1, A2, B0, B1, B2};
use crate::{Lanes, Sample};

/// A coefficient set with one coefficient per lane, in the kernel's own form.
#[derive(Clone, Copy)]
pub(crate) struct LaneCoefs<V> {
    pub b0: V,
    pub b1: V,
    pub b2: V,
    pub a1: V,
    pub a2: V,
}

impl<V: Lanes> LaneCoefs<V> {
    /// Builds lane coefficients; lane `i` gets the set returned by `set(i)`.
    #[inline(always)]
    pub fn gather<'a, F>(mut set: F) -> LaneCoefs<V>
    where
        F: FnMut(usize) -> &'a [V::Elem],
        V::Elem: 'a,
    {
        LaneCoefs {
            b0: V::from_fn(|i| set(i)[0]),
            b1: V::from_fn(|i| set(i)[1]),
            b2: V::from_fn(|i| set(i)[2]),
            a1: V::from_fn(|i| set(i)[3]),
            a2: V::from_fn(|i| set(i)[4]),
        }
    }
}

/// Where a kernel reads its input from and writes its output to.
///
/// Positions are absolute sample indices; a vector load at `at` covers `at..at + LANES`.
pub(crate) trait Io<T: Sample> {
    fn load<V: Lanes<Elem = T>>(&self, at: usize) -> V;
    fn store<V: Lanes<Elem = T>>(&mut self, at: usize, v: V);
}

/// Separate input and output buffers.
pub(crate) struct Split<'a, T> {
    pub out: &'a mut [T],
    pub input: &'a [T],
}

impl<'a, T: Sample> Io<T> for Split<'a, T> {
    #[inline(always)]
    fn load<V: Lanes<Elem = T>>(&self, at: usize) -> V {
        V::load(&self.input[at..])
    }

    #[inline(always)]
    fn store<V: Lanes<Elem = T>>(&mut self, at: usize, v: V) {
        v.store(&mut self.out[at..]);
    }
}

/// A single buffer that is overwritten with its own filtered contents.
pub(crate) struct InPlace<'a, T>(pub &'a mut [T]);

impl<'a, T: Sample> Io<T> for InPlace<'a, T> {
    #[inline(always)]
    fn load<V: Lanes<Elem = T>>(&self, at: usize) -> V {
        V::load(&self.0[at..])
    }

    #[inline(always)]
    fn store<V: Lanes<Elem = T>>(&mut self, at: usize, v: V) {
        v.store(&mut self.0[at..]);
    }
}

pub(crate) trait Kernel {
    /// Converts a normalized `[b0, b1, b2, a1, a2]` set into the form `step` expects.
    fn prepare<T: Sample>(coefs: &[T; 5]) -> [T; 5];

    /// Filters one sample per lane, updating the state `s = [s1, s2]`.
    fn step<V: Lanes, const OCC: u8>(x: V, c: &LaneCoefs<V>, s: &mut [V; 2]) -> V;

    /// Filters `frames` frames of `V::LANES` channels starting at sample `base`, with `stride`
    /// samples between consecutive frames.
    #[inline(always)]
    fn process<T: Sample, V: Lanes<Elem = T>, B: Io<T>, const OCC: u8>(
        io: &mut B,
        base: usize,
        frames: usize,
        stride: usize,
        c: &LaneCoefs<V>,
        s: &mut [V; 2],
    ) {
        let mut at = base;
        for _ in 0..frames {
            let x: V = io.load(at);
            let y = Self::step::<V, OCC>(x, c, s);
            io.store(at, y);
            at += stride;
        }
    }

    /// Filters a single channel. Kernels with a faster path for one channel override this.
    #[inline(always)]
    fn process_single<T: Sample, B: Io<T>, const OCC: u8>(
        io: &mut B,
        base: usize,
        frames: usize,
        stride: usize,
        coefs: &[T],
        s: &mut [T; 2],
    ) {
        let c = LaneCoefs::<T>::gather(|_| coefs);
        Self::process::<T, T, B, OCC>(io, base, frames, stride, &c, s);
    }
}

/// The transposed direct form II:
/// ```text
/// y   = b0 * x + s1
/// s1' = s2 + b1 * x - a1 * y
/// s2' = b2 * x - a2 * y
/// ```
pub(crate) struct DirectForm2Transposed;

impl Kernel for DirectForm2Transposed {
    fn prepare<T: Sample>(coefs: &[T; 5]) -> [T; 5] {
        *coefs
    }

    #[inline(always)]
    fn step<V: Lanes, const OCC: u8>(x: V, c: &LaneCoefs<V>, s: &mut [V; 2]) -> V {
        let [s1, s2] = *s;
        let y = if OCC & B0 != 0 { c.b0.mul_add(x, s1) } else { s1 };

        let mut n1 = s2;
        if OCC & B1 != 0 {
            n1 = c.b1.mul_add(x, n1);
        }
        if OCC & A1 != 0 {
            n1 = c.a1.neg_mul_add(y, n1);
        }

        let mut n2 = V::zero();
        if OCC & B2 != 0 {
            n2 = c.b2.mul(x);
        }
        if OCC & A2 != 0 {
            n2 = c.a2.neg_mul_add(y, n2);
        }

        *s = [n1, n2];
        y
    }
}

/// The observable canonical state-space form:
/// ```text
/// y   = s1 + b0 * x
/// s1' = s2 + b1' * x - a1 * s1
/// s2' = b2' * x - a2 * s1
/// ```
/// where `b1' = b1 - b0 * a1` and `b2' = b2 - b0 * a2` are computed once by `prepare`.
///
/// Since the right-hand sides only depend on the old state, two steps can be fused into a
/// single 4x4 matrix product; see `process_single`.
pub(crate) struct StateSpace;

/// The occupancy bits that the fused two-sample path needs.
const FUSED: u8 = B0 | A1 | A2;

impl Kernel for StateSpace {
    fn prepare<T: Sample>(coefs: &[T; 5]) -> [T; 5] {
        let [b0, b1, b2, a1, a2] = *coefs;
        [b0, b1 - b0 * a1, b2 - b0 * a2, a1, a2]
    }

    #[inline(always)]
    fn step<V: Lanes, const OCC: u8>(x: V, c: &LaneCoefs<V>, s: &mut [V; 2]) -> V {
        let [s1, s2] = *s;
        let y = if OCC & B0 != 0 { c.b0.mul_add(x, s1) } else { s1 };

        let mut n1 = s2;
        if OCC & B1 != 0 {
            n1 = c.b1.mul_add(x, n1);
        }
        if OCC & A1 != 0 {
            n1 = c.a1.neg_mul_add(s1, n1);
        }

        let mut n2 = V::zero();
        if OCC & B2 != 0 {
            n2 = c.b2.mul(x);
        }
        if OCC & A2 != 0 {
            n2 = c.a2.neg_mul_add(s1, n2);
        }

        *s = [n1, n2];
        y
    }

    #[inline(always)]
    fn process_single<T: Sample, B: Io<T>, const OCC: u8>(
        io: &mut B,
        base: usize,
        frames: usize,
        stride: usize,
        coefs: &[T],
        s: &mut [T; 2],
    ) {
        if OCC & FUSED == FUSED {
            process_pairs::<T, B, OCC>(io, base, frames, stride, coefs, s);
        } else {
            let c = LaneCoefs::<T>::gather(|_| coefs);
            Self::process::<T, T, B, OCC>(io, base, frames, stride, &c, s);
        }
    }
}

/// The columns of the matrix taking `[x0, x1, s1, s2]` to `[y0, y1, s1'', s2'']`, where `''`
/// denotes the state after two state-space steps.
///
/// Coefficients are in state-space form. Terms whose coefficient bit is clear in `OCC` are
/// dropped, exactly as `StateSpace::step` would drop them.
fn pair_matrix<T: Sample, const OCC: u8>(coefs: &[T]) -> [[T; 4]; 4] {
    let keep = |bit: u8, c: T| if OCC & bit != 0 { c } else { T::ZERO };
    let b0 = keep(B0, coefs[0]);
    let b1 = keep(B1, coefs[1]);
    let b2 = keep(B2, coefs[2]);
    let a1 = keep(A1, coefs[3]);
    let a2 = keep(A2, coefs[4]);
    let zero = T::ZERO;
    let one = T::ONE;

    [
        [b0, b1, b2 - a1 * b1, -(a2 * b1)],
        [zero, b0, b1, b2],
        [one, -a1, a1 * a1 - a2, a1 * a2],
        [zero, one, -a1, -a2],
    ]
}

/// Runs the state-space recurrence on one channel, two samples at a time.
///
/// Each pair of samples costs one 4-lane multiply-accumulate per column of the matrix from
/// `pair_matrix`. An odd trailing frame goes through the plain single step.
#[inline(always)]
fn process_pairs<T: Sample, B: Io<T>, const OCC: u8>(
    io: &mut B,
    base: usize,
    frames: usize,
    stride: usize,
    coefs: &[T],
    s: &mut [T; 2],
) {
    let m = pair_matrix::<T, OCC>(coefs);
    let cols: [T::X4; 4] = [
        T::X4::from_fn(|i| m[0][i]),
        T::X4::from_fn(|i| m[1][i]),
        T::X4::from_fn(|i| m[2][i]),
        T::X4::from_fn(|i| m[3][i]),
    ];

    let mut at = base;
    let [mut s1, mut s2] = *s;
    for _ in 0..frames / 2 {
        let x0: T = io.load(at);
        let x1: T = io.load(at + stride);
        let acc = cols[0].mul(T::X4::splat(x0));
        let acc = cols[1].mul_add(T::X4::splat(x1), acc);
        let acc = cols[2].mul_add(T::X4::splat(s1), acc);
        let acc = cols[3].mul_add(T::X4::splat(s2), acc);
        io.store(at, acc.lane(0));
        io.store(at + stride, acc.lane(1));
        s1 = acc.lane(2);
        s2 = acc.lane(3);
        at += 2 * stride;
    }
    *s = [s1, s2];

    if frames % 2 == 1 {
        let c = LaneCoefs::<T>::gather(|_| coefs);
        StateSpace::process::<T, T, B, OCC>(io, at, 1, stride, &c, s);
    }
}
