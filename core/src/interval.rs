use crate::errors::ChronoSieveErrors;
use std::fmt;

/// [`Interval`] is an inclusive pair of UTC millisecond timestamps, it is the sole output
/// currency of the evaluator: every block evaluation produces a sorted list of these. Both
/// endpoints belong to the interval, so a full UTC day is `[midnight, midnight + 86_399_999]`
///
/// # Constructor(s)
/// When constructing an [`Interval`], one can do so via [`Interval::new`] which rejects pairs
/// whose start exceeds their end with a [`ChronoSieveErrors::ValidationError`]
///
/// # Trait Implementation(s)
/// [`Interval`] implements the [`Debug`], [`Clone`], [`Copy`], [`PartialEq`], [`Eq`],
/// [`Hash`], [`PartialOrd`] and [`Ord`] traits, ordering is lexicographic on `(start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
}

impl Interval {
    /// Constructs / Creates a new [`Interval`] from two inclusive millisecond endpoints
    ///
    /// # Argument(s)
    /// This method accepts the inclusive ``start`` and ``end`` of the interval, both
    /// expressed as UTC milliseconds since the Unix epoch
    ///
    /// # Returns
    /// The newly constructed [`Interval`], or a [`ChronoSieveErrors::ValidationError`]
    /// when ``start`` exceeds ``end``
    pub fn new(start: i64, end: i64) -> Result<Self, ChronoSieveErrors> {
        if start > end {
            return Err(ChronoSieveErrors::ValidationError(
                format!("[{start}, {end}]"),
                "an interval whose start does not exceed its end".to_owned(),
            ));
        }
        Ok(Self { start, end })
    }

    pub(crate) fn raw(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Returns whether the timestamp ``t`` lies within the interval, both ends inclusive
    pub fn contains(&self, t: i64) -> bool {
        self.start <= t && t <= self.end
    }

    /// Clips the interval to `[start, end]`, returning ``None`` when nothing remains
    pub fn clip(&self, start: i64, end: i64) -> Option<Interval> {
        let clipped_start = self.start.max(start);
        let clipped_end = self.end.min(end);
        (clipped_start <= clipped_end).then_some(Interval {
            start: clipped_start,
            end: clipped_end,
        })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Appends ``interval`` to ``out``, coalescing with the previous interval when ``merge``
/// is on and the two touch or overlap (`interval.start <= previous.end + 1`). Callers must
/// append in ascending start order
pub(crate) fn push_merged(out: &mut Vec<Interval>, interval: Interval, merge: bool) {
    if merge {
        if let Some(last) = out.last_mut() {
            if interval.start <= last.end.saturating_add(1) {
                if interval.end > last.end {
                    last.end = interval.end;
                }
                return;
            }
        }
    }
    out.push(interval);
}

/// Sweep-line union of any number of interval lists. Open/close events are processed in
/// ascending time order with opens first, so intervals sharing a boundary millisecond fuse
/// into one. With ``merge`` on, outputs separated by a gap of zero (`next.start == prev.end + 1`)
/// coalesce as well
pub fn union(lists: &[Vec<Interval>], merge: bool) -> Vec<Interval> {
    let total: usize = lists.iter().map(Vec::len).sum();
    if total == 0 {
        return Vec::new();
    }
    let mut events: Vec<(i64, u8)> = Vec::with_capacity(total * 2);
    for list in lists {
        for interval in list {
            events.push((interval.start, 0));
            events.push((interval.end, 1));
        }
    }
    events.sort_unstable();

    let mut out = Vec::new();
    let mut active = 0u32;
    let mut open_at = 0i64;
    for (time, kind) in events {
        if kind == 0 {
            if active == 0 {
                open_at = time;
            }
            active += 1;
        } else {
            active -= 1;
            if active == 0 {
                push_merged(&mut out, Interval::raw(open_at, time), merge);
            }
        }
    }
    out
}

/// Sweep-line intersection of any number of interval lists: an output interval is open
/// exactly while every input list has at least one interval active. Start events order
/// before end events at equal times so zero-width overlaps at a shared boundary are kept
pub fn intersection(lists: &[Vec<Interval>], merge: bool) -> Vec<Interval> {
    if lists.is_empty() || lists.iter().any(Vec::is_empty) {
        return Vec::new();
    }
    let needed = lists.len();
    let total: usize = lists.iter().map(Vec::len).sum();
    let mut events: Vec<(i64, u8, usize)> = Vec::with_capacity(total * 2);
    for (index, list) in lists.iter().enumerate() {
        for interval in list {
            events.push((interval.start, 0, index));
            events.push((interval.end, 1, index));
        }
    }
    events.sort_unstable();

    let mut per_list = vec![0u32; needed];
    let mut lists_active = 0usize;
    let mut open_at: Option<i64> = None;
    let mut out = Vec::new();
    for (time, kind, index) in events {
        if kind == 0 {
            if per_list[index] == 0 {
                lists_active += 1;
            }
            per_list[index] += 1;
            if lists_active == needed && open_at.is_none() {
                open_at = Some(time);
            }
        } else {
            per_list[index] -= 1;
            if per_list[index] == 0 {
                if let Some(start) = open_at.take() {
                    push_merged(&mut out, Interval::raw(start, time), merge);
                }
                lists_active -= 1;
            }
        }
    }
    out
}

/// Complement of an interval list against the inclusive domain `[domain_start, domain_end]`.
/// Gaps are emitted with `end + 1` / `start - 1` adjustments since intervals are inclusive
/// on both ends. The input need not be sorted or disjoint
pub fn complement(
    list: &[Interval],
    domain_start: i64,
    domain_end: i64,
    merge: bool,
) -> Vec<Interval> {
    if domain_start > domain_end {
        return Vec::new();
    }
    let mut sorted = list.to_vec();
    sorted.sort_unstable();

    let mut out = Vec::new();
    let mut cursor = domain_start;
    for interval in sorted {
        if interval.end < domain_start {
            continue;
        }
        if interval.start > domain_end {
            break;
        }
        if interval.start > cursor {
            push_merged(&mut out, Interval::raw(cursor, interval.start - 1), merge);
        }
        cursor = cursor.max(interval.end.saturating_add(1));
        if cursor > domain_end {
            return out;
        }
    }
    push_merged(&mut out, Interval::raw(cursor, domain_end), merge);
    out
}
