//! Assembly of the instances of one year-sized chunk: DTSTART, rule
//! occurrences and RDATEs, minus EXRULE occurrences and EXDATEs.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use super::driver::CancelFlag;
use super::error::ExpansionError;
use super::generator::expand_recurrence;
use super::rule::RecurrenceRule;
use super::time::{Granularity, TimePoint};
use crate::rfc::ical::core::RecurringComponent;

/// An RDATE as a wall-clock start in the expansion zone, with its own end
/// when the value was a PERIOD.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LiteralDate {
    pub start: TimePoint,
    pub end: Option<TimePoint>,
}

/// What the driver should do after a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChunkStatus {
    /// Later chunks may still hold instances.
    More,
    /// Every source of instances ended within this chunk.
    Finished,
    /// The callback asked to stop.
    Stopped,
}

/// Everything needed to expand one component, resolved once and reused for
/// every chunk.
#[derive(Debug)]
pub(crate) struct Expansion<'a> {
    pub component: &'a RecurringComponent,
    pub zone: Tz,
    pub event_start: TimePoint,
    pub dtstart: DateTime<Utc>,
    /// Instances must end after this instant to be reported.
    pub range_start: Option<DateTime<Utc>>,
    /// Default instance length as whole days plus seconds.
    pub duration: (i64, i64),
    pub rules: Vec<RecurrenceRule>,
    pub exrules: Vec<RecurrenceRule>,
    pub rdates: Vec<LiteralDate>,
    /// EXDATEs; `flag` marks a DATE value that excludes its whole day.
    pub exdates: Vec<TimePoint>,
    /// Expanding a single rule alone, without DTSTART or other properties.
    pub single_rule: bool,
    pub cancel: &'a CancelFlag,
}

impl Expansion<'_> {
    /// ## Summary
    /// Reports every instance starting within `[chunk_start, chunk_end]`.
    ///
    /// ## Errors
    /// Returns `ExpansionError::Cancelled` if the cancel flag is raised, or
    /// `ExpansionError::OutOfRange` if an instance cannot be converted to UTC.
    pub(crate) fn assemble_chunk<F>(
        &self,
        chunk_start: &TimePoint,
        chunk_end: &TimePoint,
        callback: &mut F,
    ) -> Result<ChunkStatus, ExpansionError>
    where
        F: FnMut(&RecurringComponent, DateTime<Utc>, DateTime<Utc>) -> bool,
    {
        let mut occs = Vec::new();
        let mut ex_occs = Vec::new();
        let mut finished = true;

        if !self.single_rule {
            if self.event_start >= *chunk_end {
                finished = false;
            } else if self.event_start >= *chunk_start {
                occs.push(self.event_start);
            } else {
                // DTSTART lies in an earlier chunk.
            }
        }

        for rule in &self.rules {
            let (found, rule_finished) =
                expand_recurrence(&self.event_start, self.zone, rule, chunk_start, chunk_end);
            finished &= rule_finished;
            occs.extend(found);
        }

        for rdate in &self.rdates {
            if rdate.start >= *chunk_end {
                finished = false;
                continue;
            }
            occs.push(rdate.start.with_flag(rdate.end.is_some()));
        }

        for rule in &self.exrules {
            let (found, _) =
                expand_recurrence(&self.event_start, self.zone, rule, chunk_start, chunk_end);
            ex_occs.extend(found);
        }
        ex_occs.extend(self.exdates.iter().copied());

        occs.sort();
        ex_occs.sort();
        let occs = remove_exceptions(occs, &ex_occs);

        for occ in occs {
            let start = occ.to_instant(self.zone)?;

            if start < self.dtstart || occ < *chunk_start || occ > *chunk_end {
                continue;
            }

            let end_point = if occ.flag {
                self.rdate_end(&occ)
            } else {
                None
            }
            .unwrap_or_else(|| self.default_end(&occ));
            let end = end_point.to_instant(self.zone)?;

            if self.range_start.is_some_and(|range_start| end <= range_start) {
                continue;
            }

            if self.cancel.is_cancelled() {
                return Err(ExpansionError::Cancelled);
            }
            if !callback(self.component, start, end) {
                return Ok(ChunkStatus::Stopped);
            }
        }

        Ok(if finished {
            ChunkStatus::Finished
        } else {
            ChunkStatus::More
        })
    }

    fn default_end(&self, occ: &TimePoint) -> TimePoint {
        let (days, seconds) = self.duration;
        let mut end = occ.with_flag(false);
        end.add_days(days);
        end.add_seconds(seconds);
        end
    }

    /// The explicit end of the RDATE period starting at `occ`, if any.
    fn rdate_end(&self, occ: &TimePoint) -> Option<TimePoint> {
        self.rdates
            .iter()
            .find(|rdate| rdate.end.is_some() && rdate.start == *occ)
            .and_then(|rdate| rdate.end)
    }
}

/// ## Summary
/// Drops duplicates and excluded times from sorted `occs`.
///
/// A DATE exception (`flag` set) removes every occurrence on its day. When
/// duplicates collapse, an RDATE period flag on any of them is kept.
fn remove_exceptions(occs: Vec<TimePoint>, ex_occs: &[TimePoint]) -> Vec<TimePoint> {
    let mut kept: Vec<TimePoint> = Vec::with_capacity(occs.len());
    let mut previous: Option<TimePoint> = None;
    let mut previous_excluded = false;
    let mut next_ex = 0;

    for occ in occs {
        if previous.is_some_and(|prev| prev == occ) {
            if occ.flag
                && !previous_excluded
                && let Some(last) = kept.last_mut()
            {
                last.flag = true;
            }
            continue;
        }

        previous = Some(occ);
        previous_excluded = false;

        while let Some(ex) = ex_occs.get(next_ex) {
            let order = if ex.flag {
                ex.compare(&occ, Granularity::Day)
            } else {
                ex.cmp(&occ)
            };

            match order {
                Ordering::Less => next_ex += 1,
                Ordering::Equal => {
                    // A whole-day exception may still match later times that day.
                    if !ex.flag {
                        next_ex += 1;
                    }
                    previous_excluded = true;
                    break;
                }
                Ordering::Greater => break,
            }
        }

        if !previous_excluded {
            kept.push(occ);
        }
    }

    kept
}
