//! A small fixed-width numeric vector abstraction.
//!
//! The filter kernels are written once against [`Lanes`] and then instantiated for every
//! group width the channel driver uses. A scalar is a vector with one lane, so the scalar
//! remainder loop runs exactly the same code as the vectorized groups.

use crate::Sample;

/// A vector of `LANES` samples supporting the handful of operations a biquad needs.
///
/// Every operation is lane-wise. There are three kinds of implementations: the scalar types
/// themselves (one lane), plain arrays `[T; K]` (the portable fallback), and, with the `simd`
/// feature, the hardware-backed types from the `wide` crate. [`Pair`] glues two narrower
/// vectors together.
pub trait Lanes: Copy {
    /// The scalar type of each lane.
    type Elem: Copy;

    /// The number of lanes.
    const LANES: usize;

    /// A vector with every lane set to `x`.
    fn splat(x: Self::Elem) -> Self;

    /// A vector of zeros.
    fn zero() -> Self;

    /// A vector whose lane `i` is `f(i)`.
    fn from_fn<F: FnMut(usize) -> Self::Elem>(f: F) -> Self;

    /// The value of lane `i`.
    fn lane(&self, i: usize) -> Self::Elem;

    /// Reads `LANES` contiguous values from the start of `src`.
    #[inline(always)]
    fn load(src: &[Self::Elem]) -> Self {
        let src = &src[..Self::LANES];
        Self::from_fn(|i| src[i])
    }

    /// Writes the lanes to the first `LANES` positions of `dst`.
    #[inline(always)]
    fn store(self, dst: &mut [Self::Elem]) {
        for (i, d) in dst[..Self::LANES].iter_mut().enumerate() {
            *d = self.lane(i);
        }
    }

    /// Lane-wise `self + other`.
    fn add(self, other: Self) -> Self;

    /// Lane-wise `self - other`.
    fn sub(self, other: Self) -> Self;

    /// Lane-wise `self * other`.
    fn mul(self, other: Self) -> Self;

    /// Lane-wise `self * m + a`.
    #[inline(always)]
    fn mul_add(self, m: Self, a: Self) -> Self {
        self.mul(m).add(a)
    }

    /// Lane-wise `a - self * m`.
    #[inline(always)]
    fn neg_mul_add(self, m: Self, a: Self) -> Self {
        a.sub(self.mul(m))
    }
}

macro_rules! impl_scalar_lanes {
    ( $($t:ty),* ) => {
    $( impl Lanes for $t {
        type Elem = $t;
        const LANES: usize = 1;
        #[inline(always)] fn splat(x: $t) -> Self { x }
        #[inline(always)] fn zero() -> Self { 0.0 }
        #[inline(always)] fn from_fn<F: FnMut(usize) -> $t>(mut f: F) -> Self { f(0) }
        #[inline(always)] fn lane(&self, _i: usize) -> $t { *self }
        #[inline(always)] fn load(src: &[$t]) -> Self { src[0] }
        #[inline(always)] fn store(self, dst: &mut [$t]) { dst[0] = self; }
        #[inline(always)] fn add(self, other: Self) -> Self { self + other }
        #[inline(always)] fn sub(self, other: Self) -> Self { self - other }
        #[inline(always)] fn mul(self, other: Self) -> Self { self * other }
    }) *
    }
}
impl_scalar_lanes! { f32, f64 }

impl<T: Sample, const K: usize> Lanes for [T; K] {
    type Elem = T;
    const LANES: usize = K;

    #[inline(always)]
    fn splat(x: T) -> Self {
        [x; K]
    }

    #[inline(always)]
    fn zero() -> Self {
        [T::ZERO; K]
    }

    #[inline(always)]
    fn from_fn<F: FnMut(usize) -> T>(f: F) -> Self {
        core::array::from_fn(f)
    }

    #[inline(always)]
    fn lane(&self, i: usize) -> T {
        self[i]
    }

    #[inline(always)]
    fn load(src: &[T]) -> Self {
        let mut ret = [T::ZERO; K];
        ret.copy_from_slice(&src[..K]);
        ret
    }

    #[inline(always)]
    fn store(self, dst: &mut [T]) {
        dst[..K].copy_from_slice(&self);
    }

    #[inline(always)]
    fn add(self, other: Self) -> Self {
        core::array::from_fn(|i| self[i] + other[i])
    }

    #[inline(always)]
    fn sub(self, other: Self) -> Self {
        core::array::from_fn(|i| self[i] - other[i])
    }

    #[inline(always)]
    fn mul(self, other: Self) -> Self {
        core::array::from_fn(|i| self[i] * other[i])
    }
}

/// Two vectors of the same type side by side, acting as one vector of twice the width.
///
/// Lanes `0..V::LANES` live in the first half and the rest in the second.
#[derive(Clone, Copy, Debug)]
pub struct Pair<V>(pub V, pub V);

impl<V: Lanes> Lanes for Pair<V> {
    type Elem = V::Elem;
    const LANES: usize = 2 * V::LANES;

    #[inline(always)]
    fn splat(x: V::Elem) -> Self {
        Pair(V::splat(x), V::splat(x))
    }

    #[inline(always)]
    fn zero() -> Self {
        Pair(V::zero(), V::zero())
    }

    #[inline(always)]
    fn from_fn<F: FnMut(usize) -> V::Elem>(mut f: F) -> Self {
        let lo = V::from_fn(&mut f);
        let hi = V::from_fn(|i| f(i + V::LANES));
        Pair(lo, hi)
    }

    #[inline(always)]
    fn lane(&self, i: usize) -> V::Elem {
        if i < V::LANES {
            self.0.lane(i)
        } else {
            self.1.lane(i - V::LANES)
        }
    }

    #[inline(always)]
    fn load(src: &[V::Elem]) -> Self {
        Pair(V::load(src), V::load(&src[V::LANES..]))
    }

    #[inline(always)]
    fn store(self, dst: &mut [V::Elem]) {
        self.0.store(dst);
        self.1.store(&mut dst[V::LANES..]);
    }

    #[inline(always)]
    fn add(self, other: Self) -> Self {
        Pair(self.0.add(other.0), self.1.add(other.1))
    }

    #[inline(always)]
    fn sub(self, other: Self) -> Self {
        Pair(self.0.sub(other.0), self.1.sub(other.1))
    }

    #[inline(always)]
    fn mul(self, other: Self) -> Self {
        Pair(self.0.mul(other.0), self.1.mul(other.1))
    }

    #[inline(always)]
    fn mul_add(self, m: Self, a: Self) -> Self {
        Pair(self.0.mul_add(m.0, a.0), self.1.mul_add(m.1, a.1))
    }

    #[inline(always)]
    fn neg_mul_add(self, m: Self, a: Self) -> Self {
        Pair(self.0.neg_mul_add(m.0, a.0), self.1.neg_mul_add(m.1, a.1))
    }
}

#[cfg(feature = "simd")]
macro_rules! impl_wide_lanes {
    ( $( ($v:ident, $t:ty, $n:expr) ),* ) => {
    $( impl Lanes for wide::$v {
        type Elem = $t;
        const LANES: usize = $n;

        #[inline(always)]
        fn splat(x: $t) -> Self {
            wide::$v::splat(x)
        }

        #[inline(always)]
        fn zero() -> Self {
            wide::$v::splat(0.0)
        }

        #[inline(always)]
        fn from_fn<F: FnMut(usize) -> $t>(f: F) -> Self {
            wide::$v::new(core::array::from_fn::<$t, $n, F>(f))
        }

        #[inline(always)]
        fn lane(&self, i: usize) -> $t {
            self.to_array()[i]
        }

        #[inline(always)]
        fn load(src: &[$t]) -> Self {
            let mut lanes = [0.0; $n];
            lanes.copy_from_slice(&src[..$n]);
            wide::$v::new(lanes)
        }

        #[inline(always)]
        fn store(self, dst: &mut [$t]) {
            dst[..$n].copy_from_slice(&self.to_array());
        }

        #[inline(always)]
        fn add(self, other: Self) -> Self {
            self + other
        }

        #[inline(always)]
        fn sub(self, other: Self) -> Self {
            self - other
        }

        #[inline(always)]
        fn mul(self, other: Self) -> Self {
            self * other
        }

        #[inline(always)]
        fn mul_add(self, m: Self, a: Self) -> Self {
            wide::$v::mul_add(self, m, a)
        }
    }) *
    }
}

#[cfg(feature = "simd")]
impl_wide_lanes! { (f32x4, f32, 4), (f32x8, f32, 8), (f64x4, f64, 4) }
