//! Classifying coefficient sets by which terms are nonzero.
//!
//! Bit `i` of an occupancy mask is set when coefficient `i` of `[b0, b1, b2, a1, a2]` is
//! nonzero. Kernels are specialized on a mask, and every mask is rounded up to one of the
//! seven [`Shape`]s so that only seven specializations are needed.

use crate::Sample;

/// Occupancy bit for `b0`.
pub const B0: u8 = 1 << 0;
/// Occupancy bit for `b1`.
pub const B1: u8 = 1 << 1;
/// Occupancy bit for `b2`.
pub const B2: u8 = 1 << 2;
/// Occupancy bit for `a1`.
pub const A1: u8 = 1 << 3;
/// Occupancy bit for `a2`.
pub const A2: u8 = 1 << 4;

/// The bits of the numerator coefficients.
pub const NUMERATOR: u8 = B0 | B1 | B2;

/// Computes the occupancy mask of a single coefficient set.
pub fn occupancy<T: Sample>(coefs: &[T; 5]) -> u8 {
    coefs
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c != T::ZERO)
        .fold(0, |mask, (i, _)| mask | (1u8 << i))
}

/// The canonical filter shapes that kernels get specialized for.
///
/// The discriminant of each shape is its occupancy mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// `y = b0 * x`.
    Scale = B0 as isize,
    /// A single zero: `b0`, `b1`.
    SingleZero = (B0 | B1) as isize,
    /// Two zeros: all of the numerator.
    DoubleZero = (B0 | B1 | B2) as isize,
    /// A single pole: `b0`, `a1`.
    SinglePole = (B0 | A1) as isize,
    /// A general first-order section: `b0`, `b1`, `a1`.
    FirstOrder = (B0 | B1 | A1) as isize,
    /// Two poles and one zero: `b0`, `b1`, `a1`, `a2`.
    DoublePoleZero = (B0 | B1 | A1 | A2) as isize,
    /// A full biquad.
    Full = (B0 | B1 | B2 | A1 | A2) as isize,
}

impl Shape {
    /// All shapes, ordered so that the first superset of a mask is also the smallest one.
    pub const ALL: [Shape; 7] = [
        Shape::Scale,
        Shape::SingleZero,
        Shape::DoubleZero,
        Shape::SinglePole,
        Shape::FirstOrder,
        Shape::DoublePoleZero,
        Shape::Full,
    ];

    /// The occupancy mask of this shape.
    pub fn occupancy(self) -> u8 {
        self as u8
    }

    /// Rounds an occupancy mask up to the smallest shape containing every set bit.
    ///
    /// Only the low five bits of `occupancy` are meaningful.
    pub fn from_occupancy(occupancy: u8) -> Shape {
        let occupancy = occupancy & Shape::Full.occupancy();
        Shape::ALL
            .iter()
            .copied()
            .find(|s| occupancy & !s.occupancy() == 0)
            .unwrap_or(Shape::Full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupancy_bits() {
        assert_eq!(occupancy(&[0.0f32; 5]), 0);
        assert_eq!(occupancy(&[1.0f32, 0.0, 0.0, 0.0, 0.0]), B0);
        assert_eq!(occupancy(&[0.5f64, 0.0, -0.1, 0.0, 0.2]), B0 | B2 | A2);
        assert_eq!(occupancy(&[1.0f32, 2.0, 3.0, 4.0, 5.0]), 31);
    }

    #[test]
    fn canonical_shapes_are_fixed_points() {
        for &s in Shape::ALL.iter() {
            assert_eq!(Shape::from_occupancy(s.occupancy()), s);
        }
    }

    #[test]
    fn rounding_never_drops_a_term() {
        for mask in 0u8..32 {
            let shape = Shape::from_occupancy(mask);
            assert_eq!(mask & !shape.occupancy(), 0, "mask {:#b}", mask);
            // No smaller canonical shape would have worked.
            for &s in Shape::ALL.iter() {
                if mask & !s.occupancy() == 0 {
                    assert!(s.occupancy().count_ones() >= shape.occupancy().count_ones());
                }
            }
        }
    }

    #[test]
    fn rounding_examples() {
        assert_eq!(Shape::from_occupancy(0), Shape::Scale);
        assert_eq!(Shape::from_occupancy(B1), Shape::SingleZero);
        assert_eq!(Shape::from_occupancy(B0 | B2), Shape::DoubleZero);
        assert_eq!(Shape::from_occupancy(A1), Shape::SinglePole);
        assert_eq!(Shape::from_occupancy(B1 | A1), Shape::FirstOrder);
        assert_eq!(Shape::from_occupancy(B0 | A2), Shape::DoublePoleZero);
        assert_eq!(Shape::from_occupancy(B2 | A1), Shape::Full);
    }
}
