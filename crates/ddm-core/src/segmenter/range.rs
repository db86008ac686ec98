//! Part planning: turn a resolved size and desired part count into a `Part`
//! table with contiguous, non-overlapping byte ranges.

use crate::session::Part;

/// Builds the Part table for a resource of `content_length` bytes with the
/// given `accept_ranges` token and `desired_count` parts.
///
/// - When `accept_ranges` isn't `"bytes"`, the count is forced to 1.
/// - When the (possibly forced) count is `<= 1`, or `content_length <= 0`,
///   produces a single open-ended part (`Stop = 0`, meaning unknown).
/// - Otherwise partitions `[0, content_length)` into `desired_count` nearly
///   equal contiguous ranges; the last part absorbs the remainder.
pub fn plan_parts(
    content_length: i64,
    accept_ranges: &str,
    desired_count: usize,
    suggested_file_name: &str,
) -> Vec<Part> {
    let ranges_supported = accept_ranges.eq_ignore_ascii_case("bytes");
    let count = if ranges_supported { desired_count } else { 1 };

    if count <= 1 || content_length <= 0 {
        return vec![Part::new(0, suggested_file_name, 0, 0)];
    }

    let total = content_length as u64;
    let count_u64 = count as u64;
    let base = total / count_u64;
    let remainder = total % count_u64;

    let mut parts = Vec::with_capacity(count);
    let mut start = 0u64;
    for i in 0..count_u64 {
        let is_last = i == count_u64 - 1;
        let len = if is_last { base + remainder } else { base };
        let stop = start + len - 1;
        parts.push(Part::new(i as usize, suggested_file_name, start as i64, stop as i64));
        start = stop + 1;
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_split() {
        let parts = plan_parts(1000, "bytes", 4, "f.bin");
        assert_eq!(parts.len(), 4);
        assert_eq!((parts[0].start, parts[0].stop), (0, 249));
        assert_eq!((parts[1].start, parts[1].stop), (250, 499));
        assert_eq!((parts[2].start, parts[2].stop), (500, 749));
        assert_eq!((parts[3].start, parts[3].stop), (750, 999));
        assert_eq!(parts[3].file_name, "f.bin.part3");
    }

    #[test]
    fn remainder_goes_to_the_last_part() {
        let parts = plan_parts(10, "bytes", 4, "f.bin");
        assert_eq!(parts.len(), 4);
        assert_eq!((parts[0].start, parts[0].stop), (0, 1));
        assert_eq!((parts[1].start, parts[1].stop), (2, 3));
        assert_eq!((parts[2].start, parts[2].stop), (4, 5));
        assert_eq!((parts[3].start, parts[3].stop), (6, 9));
    }

    #[test]
    fn parts_are_contiguous_and_cover_the_whole_length() {
        let parts = plan_parts(997, "bytes", 6, "f.bin");
        assert_eq!(parts[0].start, 0);
        for w in parts.windows(2) {
            assert_eq!(w[1].start, w[0].stop + 1);
        }
        assert_eq!(parts.last().unwrap().stop, 996);
        let sum: i64 = parts.iter().map(|p| p.stop - p.start + 1).sum();
        assert_eq!(sum, 997);
    }

    #[test]
    fn no_range_support_forces_single_part() {
        let parts = plan_parts(1000, "none", 4, "f.bin");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].start, 0);
        assert_eq!(parts[0].stop, 0);
    }

    #[test]
    fn unknown_length_produces_single_open_ended_part() {
        let parts = plan_parts(-1, "bytes", 4, "f.bin");
        assert_eq!(parts.len(), 1);
        assert_eq!((parts[0].start, parts[0].stop), (0, 0));
    }

    #[test]
    fn count_of_one_or_zero_collapses() {
        assert_eq!(plan_parts(1000, "bytes", 1, "f.bin").len(), 1);
        assert_eq!(plan_parts(1000, "bytes", 0, "f.bin").len(), 1);
    }
}
