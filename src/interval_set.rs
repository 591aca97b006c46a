//! Sets of token types stored as sorted, disjoint, non-adjacent closed intervals.

use std::cmp::{max, min};
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

use crate::token::{TOKEN_EOF, TOKEN_EPSILON};
use crate::vocabulary::Vocabulary;

/// A closed range `start..=stop` of symbols.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    pub start: isize,
    pub stop: isize,
}

impl Interval {
    pub const fn new(start: isize, stop: isize) -> Self {
        Self { start, stop }
    }

    /// The number of symbols in the interval; `0` if `stop < start`.
    ///
    /// Saturates at `usize::MAX` for an interval spanning every `isize`.
    pub fn len(&self) -> usize {
        if self.stop < self.start {
            0
        } else {
            self.stop.abs_diff(self.start).saturating_add(1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stop < self.start
    }

    pub fn contains(&self, value: isize) -> bool {
        self.start <= value && value <= self.stop
    }

    /// Returns `true` if the two intervals neither overlap nor touch.
    fn is_separated_from(&self, other: &Interval) -> bool {
        self.stop.saturating_add(1) < other.start || other.stop.saturating_add(1) < self.start
    }

    fn hull(&self, other: &Interval) -> Interval {
        Interval::new(min(self.start, other.start), max(self.stop, other.stop))
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.stop {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..{}", self.start, self.stop)
        }
    }
}

/// An ordered set of symbols.
///
/// Intervals are kept sorted and coalesced on every insertion, so two sets holding the same
/// symbols are equal no matter how they were built.
///
/// A set can be frozen with [`set_readonly`](Self::set_readonly). Mutating a frozen set is a bug
/// in the caller, and every mutating method panics if the set is frozen.
#[derive(Debug, Clone, Default)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
    readonly: bool,
}

impl IntervalSet {
    /// Creates an empty, mutable set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set containing a single symbol.
    pub fn of(value: isize) -> Self {
        Self::of_range(value, value)
    }

    /// Creates a set containing the symbols `start..=stop`.
    pub fn of_range(start: isize, stop: isize) -> Self {
        let mut set = Self::new();
        set.add_range(start, stop);

        set
    }

    #[track_caller]
    fn assert_mutable(&self) {
        if self.readonly {
            panic!("attempted to modify a read-only interval set");
        }
    }

    /// Adds a single symbol.
    ///
    /// # Panics
    /// Panics if the set is read-only.
    #[track_caller]
    pub fn add(&mut self, value: isize) {
        self.add_range(value, value);
    }

    /// Adds the symbols `start..=stop`. An empty range (`stop < start`) is ignored.
    ///
    /// # Panics
    /// Panics if the set is read-only.
    #[track_caller]
    pub fn add_range(&mut self, start: isize, stop: isize) {
        self.add_interval(Interval::new(start, stop));
    }

    /// Adds every symbol of `interval`.
    ///
    /// # Panics
    /// Panics if the set is read-only.
    #[track_caller]
    pub fn add_interval(&mut self, interval: Interval) {
        self.assert_mutable();

        if interval.is_empty() {
            return;
        }

        // the first interval that overlaps or touches the new one.
        let first = self
            .intervals
            .partition_point(|iv| iv.stop.saturating_add(1) < interval.start);
        let mut merged = interval;
        let mut last = first;

        while last < self.intervals.len() && !self.intervals[last].is_separated_from(&merged) {
            merged = merged.hull(&self.intervals[last]);
            last += 1;
        }

        self.intervals.splice(first..last, [merged]);
    }

    /// Adds every symbol of `other`.
    ///
    /// # Panics
    /// Panics if the set is read-only.
    #[track_caller]
    pub fn add_all(&mut self, other: &IntervalSet) {
        self.assert_mutable();

        for &interval in &other.intervals {
            self.add_interval(interval);
        }
    }

    /// Removes a single symbol, splitting the interval containing it if needed.
    ///
    /// # Panics
    /// Panics if the set is read-only.
    #[track_caller]
    pub fn remove(&mut self, value: isize) {
        self.assert_mutable();

        let idx = self.intervals.partition_point(|iv| iv.stop < value);

        let Some(&interval) = self.intervals.get(idx) else {
            return;
        };

        if !interval.contains(value) {
            return;
        }

        if interval.start == interval.stop {
            self.intervals.remove(idx);
        } else if interval.start == value {
            self.intervals[idx].start += 1;
        } else if interval.stop == value {
            self.intervals[idx].stop -= 1;
        } else {
            self.intervals[idx].stop = value - 1;
            self.intervals
                .insert(idx + 1, Interval::new(value + 1, interval.stop));
        }
    }

    /// Checks whether `value` is in the set.
    pub fn contains(&self, value: isize) -> bool {
        let idx = self.intervals.partition_point(|iv| iv.stop < value);

        self.intervals
            .get(idx)
            .is_some_and(|interval| interval.start <= value)
    }

    /// Freezes or thaws the set.
    ///
    /// # Panics
    /// Panics when asked to thaw a frozen set: once frozen, a set may be shared on the assumption
    /// it never changes.
    #[track_caller]
    pub fn set_readonly(&mut self, readonly: bool) {
        if self.readonly && !readonly {
            panic!("cannot make a read-only interval set mutable again");
        }

        self.readonly = readonly;
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// The intervals of the set in ascending order.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// The number of symbols in the set, saturating at `usize::MAX`.
    pub fn len(&self) -> usize {
        self.intervals
            .iter()
            .fold(0, |len: usize, iv| len.saturating_add(iv.len()))
    }

    /// Returns `true` if the set has more than one symbol.
    fn has_many(&self) -> bool {
        match self.intervals.as_slice() {
            [] => false,
            [single] => single.start != single.stop,
            _ => true,
        }
    }

    pub fn min_element(&self) -> Option<isize> {
        self.intervals.first().map(|iv| iv.start)
    }

    pub fn max_element(&self) -> Option<isize> {
        self.intervals.last().map(|iv| iv.stop)
    }

    /// Iterates over the symbols in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = isize> + '_ {
        self.intervals.iter().flat_map(|iv| iv.start..=iv.stop)
    }

    /// Returns a mutable set with the same symbols.
    pub fn to_mutable(&self) -> IntervalSet {
        IntervalSet {
            intervals: self.intervals.clone(),
            readonly: false,
        }
    }

    /// The union of `self` and `other`.
    pub fn or(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = self.to_mutable();
        result.add_all(other);

        result
    }

    /// The intersection of `self` and `other`.
    pub fn and(&self, other: &IntervalSet) -> IntervalSet {
        let (lhs, rhs) = (&self.intervals, &other.intervals);
        let mut intervals = vec![];
        let (mut i, mut j) = (0, 0);

        while i < lhs.len() && j < rhs.len() {
            let start = max(lhs[i].start, rhs[j].start);
            let stop = min(lhs[i].stop, rhs[j].stop);

            if start <= stop {
                intervals.push(Interval::new(start, stop));
            }

            if lhs[i].stop < rhs[j].stop {
                i += 1;
            } else {
                j += 1;
            }
        }

        IntervalSet {
            intervals,
            readonly: false,
        }
    }

    /// The symbols of `self` that are not in `other`.
    pub fn subtract(&self, other: &IntervalSet) -> IntervalSet {
        let rhs = &other.intervals;
        let mut intervals = vec![];
        let mut j = 0;

        for &interval in &self.intervals {
            while j < rhs.len() && rhs[j].stop < interval.start {
                j += 1;
            }

            let mut rest = Some(interval);

            for removed in rhs[j..].iter().take_while(|iv| iv.start <= interval.stop) {
                let Some(current) = rest else { break };

                if removed.start > current.start {
                    intervals.push(Interval::new(current.start, removed.start - 1));
                }

                rest = (removed.stop < current.stop)
                    .then(|| Interval::new(removed.stop + 1, current.stop));
            }

            intervals.extend(rest);
        }

        IntervalSet {
            intervals,
            readonly: false,
        }
    }

    /// The symbols of `min..=max` that are not in `self`.
    pub fn complement(&self, min: isize, max: isize) -> IntervalSet {
        IntervalSet::of_range(min, max).subtract(self)
    }

    /// Renders the set with symbol names taken from `vocabulary`.
    pub fn display_with<'a>(&'a self, vocabulary: &'a Vocabulary) -> impl Display + 'a {
        VocabularyDisplay {
            set: self,
            vocabulary,
        }
    }
}

impl PartialEq for IntervalSet {
    fn eq(&self, other: &Self) -> bool {
        self.intervals == other.intervals
    }
}

impl Eq for IntervalSet {}

impl Hash for IntervalSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.intervals.hash(state);
    }
}

impl FromIterator<isize> for IntervalSet {
    fn from_iter<T: IntoIterator<Item = isize>>(iter: T) -> Self {
        let mut set = IntervalSet::new();

        for value in iter {
            set.add(value);
        }

        set
    }
}

impl From<Interval> for IntervalSet {
    fn from(interval: Interval) -> Self {
        let mut set = IntervalSet::new();
        set.add_interval(interval);

        set
    }
}

fn write_symbol(f: &mut fmt::Formatter<'_>, value: isize) -> fmt::Result {
    match value {
        TOKEN_EOF => f.write_str("<EOF>"),
        TOKEN_EPSILON => f.write_str("<EPSILON>"),
        _ => write!(f, "{value}"),
    }
}

impl Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("{}");
        }

        let braced = self.has_many();

        if braced {
            f.write_str("{")?;
        }

        for (idx, interval) in self.intervals.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }

            write_symbol(f, interval.start)?;

            if interval.start != interval.stop {
                f.write_str("..")?;
                write_symbol(f, interval.stop)?;
            }
        }

        if braced {
            f.write_str("}")?;
        }

        Ok(())
    }
}

struct VocabularyDisplay<'a> {
    set: &'a IntervalSet,
    vocabulary: &'a Vocabulary,
}

impl Display for VocabularyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.set.is_empty() {
            return f.write_str("{}");
        }

        let braced = self.set.has_many();

        if braced {
            f.write_str("{")?;
        }

        for (idx, value) in self.set.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }

            match value {
                TOKEN_EOF => f.write_str("<EOF>")?,
                TOKEN_EPSILON => f.write_str("<EPSILON>")?,
                _ => f.write_str(&self.vocabulary.display_name(value))?,
            }
        }

        if braced {
            f.write_str("}")?;
        }

        Ok(())
    }
}
