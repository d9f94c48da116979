//! Small helpers shared by the SDKs built on this crate.

use rust_decimal::Decimal;

/// Parse a decimal amount as sent by the API, e.g. `"0.00125"` or `"1.5e3"`.
///
/// Plain decimals are parsed exactly; digits that do not fit are an error,
/// never rounded.
pub fn str_to_num(value: &str) -> Result<Decimal, rust_decimal::Error> {
    if value.contains(|c: char| c == 'e' || c == 'E') {
        Decimal::from_scientific(value)
    } else {
        Decimal::from_str_exact(value)
    }
}

/// Elements of `b` that do not appear in `a`, in `b`'s order.
///
/// Matching is exact and case-sensitive. O(n*m).
pub fn slice_diff<'a, T: AsRef<str>>(a: &[T], b: &'a [T]) -> Vec<&'a str> {
    b.iter()
        .map(|item| item.as_ref())
        .filter(|candidate| !a.iter().any(|existing| existing.as_ref() == *candidate))
        .collect()
}
