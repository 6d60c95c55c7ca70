use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::Lanes;

/// A floating-point sample type that the filters can process.
///
/// This is implemented for `f32` and `f64`. Besides the usual arithmetic, each sample type
/// names the vector types used to process 4, 8, and 16 channels at a time. With the `simd`
/// feature these are backed by the `wide` crate where it has a matching type; otherwise they
/// are plain arrays.
pub trait Sample:
    Lanes<Elem = Self>
    + Debug
    + Default
    + PartialEq
    + PartialOrd
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// Zero.
    const ZERO: Self;
    /// One.
    const ONE: Self;

    /// A vector of 4 samples.
    type X4: Lanes<Elem = Self>;
    /// A vector of 8 samples.
    type X8: Lanes<Elem = Self>;
    /// A vector of 16 samples.
    type X16: Lanes<Elem = Self>;

    /// The absolute value.
    fn abs(self) -> Self;
}

macro_rules! impl_sample {
    ( $t:ty, $x4:ty, $x8:ty, $x16:ty ) => {
        impl Sample for $t {
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;

            type X4 = $x4;
            type X8 = $x8;
            type X16 = $x16;

            #[inline(always)]
            fn abs(self) -> Self {
                <$t>::abs(self)
            }
        }
    };
}

#[cfg(feature = "simd")]
mod simd {
    use super::Sample;
    use crate::Pair;
    use wide::{f32x4, f32x8, f64x4};

    impl_sample!(f32, f32x4, f32x8, Pair<f32x8>);
    impl_sample!(f64, f64x4, Pair<f64x4>, Pair<Pair<f64x4>>);
}

#[cfg(not(feature = "simd"))]
mod portable {
    use super::Sample;

    impl_sample!(f32, [f32; 4], [f32; 8], [f32; 16]);
    impl_sample!(f64, [f64; 4], [f64; 8], [f64; 16]);
}
