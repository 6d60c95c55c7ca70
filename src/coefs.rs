use crate::Sample;

/// The number of coefficients in a normalized biquad section: `[b0, b1, b2, a1, a2]`.
pub const NUM_COEFS: usize = 5;

/// Reduces a coefficient container to the normalized form `[b0, b1, b2, a1, a2]`.
///
/// `coefs` has either five elements, in which case it is already normalized and has an
/// implicit leading denominator term of 1, or six elements `[b0, b1, b2, a0, a1, a2]`. The
/// transfer function is
/// ```text
///        b0 + b1 z^-1 + b2 z^-2
/// H(z) = ----------------------
///        a0 + a1 z^-1 + a2 z^-2
/// ```
/// and the denominator coefficients are stored as they appear here (not negated).
///
/// For the six-element form, up to two common factors of `z^-1` (that is, matching leading
/// zeros in both the numerator and the denominator) are cancelled before dividing everything
/// by the leading denominator term.
///
/// # Panics
///
/// Panics if `coefs` has a length other than 5 or 6, or if the leading denominator term is
/// zero after cancellation (which would describe a non-causal filter).
pub fn normalize<T: Sample>(coefs: &[T]) -> [T; NUM_COEFS] {
    match *coefs {
        [b0, b1, b2, a1, a2] => [b0, b1, b2, a1, a2],
        [b0, b1, b2, a0, a1, a2] => {
            let b = [b0, b1, b2];
            let a = [a0, a1, a2];
            let mut skip = 0;
            while skip < 2 && b[skip] == T::ZERO && a[skip] == T::ZERO {
                skip += 1;
            }
            let lead = a[skip];
            assert!(
                lead != T::ZERO,
                "leading denominator coefficient is zero; the filter is not causal"
            );

            let term = |c: &[T; 3], i: usize| c.get(skip + i).map_or(T::ZERO, |&x| x / lead);
            [
                term(&b, 0),
                term(&b, 1),
                term(&b, 2),
                term(&a, 1),
                term(&a, 2),
            ]
        }
        _ => panic!(
            "a biquad needs 5 or 6 coefficients, but {} were given",
            coefs.len()
        ),
    }
}

/// Tests whether a section with feedback coefficients `a1` and `a2` is stable.
///
/// The poles are inside the unit circle exactly when `|a2| < 1` and `|a1| < 1 + a2`.
pub fn is_stable<T: Sample>(a1: T, a2: T) -> bool {
    a2.abs() < T::ONE && a1.abs() < T::ONE + a2
}
