/// Suggest a search range around an original value: one decade each way,
/// keeping the sign.
///
/// Zero and non-finite values have no meaningful decade and return `None`;
/// such parameters need explicit bounds.
pub fn suggest_bounds(value: f64) -> Option<(f64, f64)> {
    if !value.is_finite() || value == 0.0 {
        return None;
    }
    if value > 0.0 {
        Some((0.1 * value, 10.0 * value))
    } else {
        let m = value.abs();
        Some((-10.0 * m, -0.1 * m))
    }
}
