use crate::error::{PipelineError, Result};

/// Tiles `[0, duration)` with offsets spaced `segment_length` apart. The
/// final tile may cover less than a full segment; the extraction stops at
/// end of stream, so no tail special-casing happens here.
#[allow(clippy::as_conversions)]
#[allow(clippy::cast_possible_truncation)]
pub fn plan(duration: u64, segment_length: u64) -> Result<Vec<u64>> {
    if segment_length == 0 {
        return Err(PipelineError::InvalidSegmentSize);
    }

    Ok((0..duration).step_by(segment_length as usize).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evenly_divisible_duration() {
        assert_eq!(plan(10, 5).unwrap(), vec![0, 5]);
    }

    #[test]
    fn trailing_partial_segment_still_gets_an_offset() {
        assert_eq!(plan(9, 4).unwrap(), vec![0, 4, 8]);
        assert_eq!(plan(10, 3).unwrap(), vec![0, 3, 6, 9]);
    }

    #[test]
    fn offset_count_is_ceiling_of_duration_over_length() {
        for duration in 1..50 {
            for length in 1..20 {
                let offsets = plan(duration, length).unwrap();
                let expected = usize::try_from(duration.div_ceil(length)).unwrap();
                assert_eq!(offsets.len(), expected);
                assert!(*offsets.last().unwrap() < duration);
                assert_eq!(offsets[0], 0);

                for pair in offsets.windows(2) {
                    assert_eq!(pair[1] - pair[0], length);
                }
            }
        }
    }

    #[test]
    fn zero_duration_yields_no_segments() {
        assert!(plan(0, 5).unwrap().is_empty());
    }

    #[test]
    fn zero_segment_length_is_rejected() {
        assert!(matches!(
            plan(10, 0),
            Err(PipelineError::InvalidSegmentSize)
        ));
    }
}
