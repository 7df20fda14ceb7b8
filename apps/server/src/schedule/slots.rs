use crate::models::Slot;

use super::exclusions::{DayExclusions, MinuteSpan};
use super::shift::{format_hhmm, ShiftWindow};

/// Candidate slots start on this grid regardless of service duration:
/// a 90-minute service is still offered at 30-minute increments.
pub const SLOT_GRANULARITY_MIN: u32 = 30;

fn blocked(start: u32, end: u32, excl: &DayExclusions) -> bool {
    if excl.hold_starts.contains(&start) {
        return true;
    }
    let candidate = MinuteSpan { start, end };
    excl.intervals.iter().any(|iv| iv.overlaps(&candidate))
}

fn optimal(start: u32, end: u32, shift: ShiftWindow, excl: &DayExclusions) -> bool {
    start == shift.start_min
        || end == shift.end_min
        || excl.booking_ends.contains(&start)
        || excl.booking_starts.contains(&end)
}

/// Walk the shift at the slot granularity and emit every start time where
/// a service of `duration_min` fits. `lead_cutoff_min` is set only when the
/// queried date is "today": starts before it are skipped.
///
/// A slot is flagged optimal when it opens or closes the shift cleanly, or
/// butts up against an existing booking, leaving no unusable gap behind.
/// Optimality is advisory; non-optimal slots are still returned.
pub fn generate_slots(
    shift: ShiftWindow,
    excl: &DayExclusions,
    duration_min: u32,
    lead_cutoff_min: Option<u32>,
) -> Vec<Slot> {
    let mut slots = Vec::new();
    if duration_min == 0 {
        return slots;
    }
    let mut t = shift.start_min;
    while t + duration_min <= shift.end_min {
        let end = t + duration_min;
        let too_soon = lead_cutoff_min.is_some_and(|cutoff| t < cutoff);
        if !too_soon && !blocked(t, end, excl) {
            slots.push(Slot {
                time: format_hhmm(t),
                is_optimal: optimal(t, end, shift, excl),
            });
        }
        t += SLOT_GRANULARITY_MIN;
    }
    slots
}

/// Same walk as `generate_slots`, stopping at the first bookable start.
/// The month aggregator calls this per staff/day, where one hit is enough.
pub fn has_free_slot(
    shift: ShiftWindow,
    excl: &DayExclusions,
    duration_min: u32,
    lead_cutoff_min: Option<u32>,
) -> bool {
    if duration_min == 0 {
        return false;
    }
    let mut t = shift.start_min;
    while t + duration_min <= shift.end_min {
        let too_soon = lead_cutoff_min.is_some_and(|cutoff| t < cutoff);
        if !too_soon && !blocked(t, t + duration_min, excl) {
            return true;
        }
        t += SLOT_GRANULARITY_MIN;
    }
    false
}

// ── Tests ──
