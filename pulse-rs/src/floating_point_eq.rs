//! Equality for the floating-point attributes of native instructions.
//!
//! Instructions compare equal field by field, so their float-valued fields need an equality that
//! is reflexive: all NaNs are indistinguishable and equal only to each other. That makes it lawful
//! to implement [`Eq`] on instructions.

/// [`f64`] utilities.
pub(crate) mod f64 {
    /// Compares two [`f64`]s for equality such that all `NaN`s are considered equal.
    #[inline]
    pub(crate) fn eq(left: f64, right: f64) -> bool {
        left == right || left.is_nan() && right.is_nan()
    }

}

/// [`Complex64`](num_complex::Complex64) utilities.
pub(crate) mod complex64 {
    use num_complex::Complex64;

    /// Compares two [`Complex64`]s component-wise with [`super::f64::eq`].
    #[inline]
    pub(crate) fn eq(left: Complex64, right: Complex64) -> bool {
        super::f64::eq(left.re, right.re) && super::f64::eq(left.im, right.im)
    }

}
