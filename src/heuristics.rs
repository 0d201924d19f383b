//! Best-effort signals that are not backed by the container structure.
//!
//! * [`has_trophy_marker`] looks for trophy file markers anywhere in the
//!   raw bytes. The PFS body is normally encrypted, so a real trophy bundle
//!   can be missed, and unrelated data that happens to contain a marker
//!   produces a false positive.
//! * [`backport_hinted`] only looks at the file name.

use memchr::memmem;

/// Lowercase byte sequences that suggest a trophy bundle (`TROPHY.TRP` and
/// friends). Matching ignores ASCII case.
pub const TROPHY_MARKERS: &[&[u8]] = &[b"trophy", b".trp"];

/// Bytes lowercased per step of the trophy scan.
const SCAN_CHUNK: usize = 1 << 20;

/// Whether any [`TROPHY_MARKERS`] sequence occurs in `data`, in any ASCII
/// case.
///
/// When `limit` is set only the first `limit` bytes are searched.
///
/// ```
/// use pkgscan::heuristics::has_trophy_marker;
/// assert!(has_trophy_marker(b"..Trophy00.Trp..", None));
/// assert!(!has_trophy_marker(b"..Trophy..", Some(4)));
/// ```
pub fn has_trophy_marker(data: &[u8], limit: Option<usize>) -> bool {
    let haystack = match limit {
        Some(limit) => &data[..data.len().min(limit)],
        None => data,
    };
    let finders: Vec<_> = TROPHY_MARKERS.iter().map(memmem::Finder::new).collect();
    // Consecutive chunks share this many bytes so no marker is split.
    let overlap = TROPHY_MARKERS
        .iter()
        .map(|m| m.len())
        .max()
        .unwrap_or(1)
        .saturating_sub(1);

    let mut lower = Vec::with_capacity(haystack.len().min(SCAN_CHUNK));
    let mut start = 0;
    while start < haystack.len() {
        let end = haystack.len().min(start + SCAN_CHUNK);
        lower.clear();
        lower.extend(haystack[start..end].iter().map(u8::to_ascii_lowercase));
        if finders.iter().any(|f| f.find(&lower).is_some()) {
            return true;
        }
        if end == haystack.len() {
            break;
        }
        start = end - overlap;
    }
    false
}

/// Whether the file name mentions a backport (case-insensitive).
///
/// ```
/// use pkgscan::heuristics::backport_hinted;
/// assert!(backport_hinted("Game_Backported.pkg"));
/// assert!(!backport_hinted("Game.pkg"));
/// ```
pub fn backport_hinted(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().contains("backport")
}
