/// Cuts `[start, end)` out of a circular sequence.
///
/// Positions may be negative or run past the end; they wrap around the origin.
///
/// ```
/// use defrag::libs::seq::circular_slice;
///
/// assert_eq!(circular_slice("ACGTTT", 4, 8), "TTAC");
/// assert_eq!(circular_slice("ACGTTT", -2, 1), "TTA");
/// ```
pub fn circular_slice(seq: &str, start: isize, end: isize) -> String {
    let bytes = seq.as_bytes();
    if bytes.is_empty() || end <= start {
        return String::new();
    }

    let len = bytes.len() as isize;
    (start..end)
        .map(|pos| bytes[pos.rem_euclid(len) as usize] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_slice() {
        let seq = "ACGTACGGTT";
        assert_eq!(circular_slice(seq, 0, 4), "ACGT");
        assert_eq!(circular_slice(seq, 8, 12), "TTAC");
        // a whole turn and a bit
        assert_eq!(circular_slice(seq, 0, 11), "ACGTACGGTTA");
        // positions on later copies of the target
        assert_eq!(circular_slice(seq, 20, 22), "AC");
        assert_eq!(circular_slice(seq, 5, 5), "");
        assert_eq!(circular_slice("", 0, 3), "");
    }
}
