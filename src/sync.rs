//! Video-follow scrolling: which line is current at a playback time.

use crate::ast::SyncPoint;

/// Line index of the last sync point at or before `time_sec`.
///
/// `None` before the first point or for an empty map. Points are expected in
/// ascending `time_sec`; the scan is from the end, so for an unsorted map the
/// latest-listed qualifying point wins.
pub fn line_at_time(scroll_map: &[SyncPoint], time_sec: f64) -> Option<usize> {
    scroll_map
        .iter()
        .rev()
        .find(|point| time_sec >= point.time_sec)
        .map(|point| point.line_index)
}

/// `true` if `scroll_map` is ordered by time
pub fn is_monotonic(scroll_map: &[SyncPoint]) -> bool {
    scroll_map
        .windows(2)
        .all(|pair| pair[0].time_sec <= pair[1].time_sec)
}
