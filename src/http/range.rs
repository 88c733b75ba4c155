//! Single byte-range resolution for partial content delivery.
//!
//! Accepts `bytes=<start>-<end>` with either side optional:
//! - `bytes=500-`   → from 500 to the last byte
//! - `bytes=-500`   → the last 500 bytes
//! - `bytes=10-20`  → bytes 10 through 20 inclusive
//!
//! Multi-range and syntactically invalid headers are ignored and the whole
//! file is delivered. Satisfiability requires `start <= end < size`.

/// How a `range` header applies to a file of a given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No usable range: deliver the whole file with 200.
    Full,
    /// Deliver the inclusive window `start..=end` with 206.
    Partial { start: u64, end: u64 },
    /// Reply 416 with `content-range: bytes */size`.
    Unsatisfiable,
}

impl RangeOutcome {
    /// Resolve an optional `range` header against a file size.
    pub fn resolve(header: Option<&str>, size: u64) -> Self {
        let Some(bounds) = header.and_then(parse_bounds) else {
            return Self::Full;
        };

        let (start, end) = match bounds {
            (Some(start), Some(end)) => (start, end),
            (Some(start), None) => (start, size.saturating_sub(1)),
            // Suffix length: the last `n` bytes, the whole file if `n` exceeds it.
            (None, Some(suffix)) => (size.saturating_sub(suffix), size.saturating_sub(1)),
            (None, None) => return Self::Full,
        };

        if size == 0 || start >= size || end >= size || start > end {
            return Self::Unsatisfiable;
        }
        Self::Partial { start, end }
    }

    /// Value of the `content-range` header for this outcome, if any.
    pub fn content_range(&self, size: u64) -> Option<String> {
        match self {
            Self::Full => None,
            Self::Partial { start, end } => Some(format!("bytes {start}-{end}/{size}")),
            Self::Unsatisfiable => Some(format!("bytes */{size}")),
        }
    }
}

/// Split `bytes=<start>-<end>` into its optional bounds.
///
/// Returns `None` for anything that is not a single well-formed range.
fn parse_bounds(header: &str) -> Option<(Option<u64>, Option<u64>)> {
    let ranges = header.trim().strip_prefix("bytes=")?;
    if ranges.contains(',') {
        return None;
    }
    let (start, end) = ranges.split_once('-')?;
    Some((parse_bound(start)?, parse_bound(end)?))
}

/// `Some(None)` for an empty bound, `None` for a malformed one.
fn parse_bound(bound: &str) -> Option<Option<u64>> {
    let bound = bound.trim();
    if bound.is_empty() {
        return Some(None);
    }
    bound.parse().ok().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_header_is_full() {
        assert_eq!(RangeOutcome::resolve(None, 1000), RangeOutcome::Full);
    }

    #[test]
    fn test_explicit_range() {
        assert_eq!(
            RangeOutcome::resolve(Some("bytes=10-20"), 1000),
            RangeOutcome::Partial { start: 10, end: 20 }
        );
    }

    #[test]
    fn test_open_ended_range() {
        let outcome = RangeOutcome::resolve(Some("bytes=500-"), 1000);
        assert_eq!(outcome, RangeOutcome::Partial { start: 500, end: 999 });
        assert_eq!(
            outcome.content_range(1000).as_deref(),
            Some("bytes 500-999/1000")
        );
    }

    #[test]
    fn test_suffix_range() {
        assert_eq!(
            RangeOutcome::resolve(Some("bytes=-100"), 1000),
            RangeOutcome::Partial { start: 900, end: 999 }
        );
        assert_eq!(
            RangeOutcome::resolve(Some("bytes=-5000"), 1000),
            RangeOutcome::Partial { start: 0, end: 999 }
        );
    }

    #[test]
    fn test_out_of_bounds_is_unsatisfiable() {
        for header in ["bytes=1000-", "bytes=0-1000", "bytes=2000-3000", "bytes=20-10", "bytes=-0"] {
            let outcome = RangeOutcome::resolve(Some(header), 1000);
            assert_eq!(outcome, RangeOutcome::Unsatisfiable, "{header}");
            assert_eq!(outcome.content_range(1000).as_deref(), Some("bytes */1000"));
        }
    }

    #[test]
    fn test_empty_file_is_unsatisfiable() {
        assert_eq!(
            RangeOutcome::resolve(Some("bytes=0-"), 0),
            RangeOutcome::Unsatisfiable
        );
    }

    #[test]
    fn test_ignored_headers() {
        for header in ["bytes=0-10,20-30", "items=0-10", "bytes=a-b", "bytes=-", "bytes=5"] {
            assert_eq!(RangeOutcome::resolve(Some(header), 1000), RangeOutcome::Full, "{header}");
        }
    }

    #[test]
    fn test_every_valid_window_is_partial() {
        let size = 16;
        for start in 0..size {
            for end in start..size {
                let header = format!("bytes={start}-{end}");
                assert_eq!(
                    RangeOutcome::resolve(Some(&header), size),
                    RangeOutcome::Partial { start, end }
                );
            }
        }
    }
}
