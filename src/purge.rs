//! Conflict purging over a completed analysis.
//!
//! Conflict queries run per change, so the raw lists can contain entries
//! that are not real conflicts for the user: the appointment being
//! changed itself, its own series master, or appointments that another
//! change in the same analysis updates away or deletes. This pass
//! removes those, leaving only genuine conflicts.

use tracing::debug;

use crate::analysis::{Analysis, Change, ChangeKind};
use crate::event::Appointment;

/// Remove self-referential and in-batch-resolved conflicts from every
/// change of the analysis. Idempotent.
pub fn purge_conflicts(analysis: &mut Analysis) {
    // Snapshot the change shapes needed for cross-change checks before
    // editing any conflict list.
    let others: Vec<(ChangeKind, Option<Appointment>, Option<Appointment>)> = analysis
        .changes
        .iter()
        .map(|c| {
            (
                c.kind,
                c.current_appointment.clone(),
                c.new_appointment.clone(),
            )
        })
        .collect();

    for (index, change) in analysis.changes.iter_mut().enumerate() {
        if change.conflicts.is_empty() {
            continue;
        }
        let before = change.conflicts.len();

        let conflicts = std::mem::take(&mut change.conflicts);
        let kept: Vec<Appointment> = conflicts
            .into_iter()
            .filter(|conflict| !is_self_conflict(change, conflict))
            .filter(|conflict| !resolved_in_batch(change, conflict, &others, index))
            .collect();
        change.conflicts = kept;

        if change.conflicts.len() != before {
            debug!(
                removed = before - change.conflicts.len(),
                remaining = change.conflicts.len(),
                "purged conflicts from change"
            );
        }
    }
}

/// An appointment never conflicts with itself or its own series.
fn is_self_conflict(change: &Change, conflict: &Appointment) -> bool {
    let same_current = change
        .current_appointment
        .as_ref()
        .is_some_and(|c| c.same_object(conflict));
    let same_master = change
        .master_appointment
        .as_ref()
        .is_some_and(|m| m.same_object(conflict));
    same_current || same_master
}

/// Whether another change in the same batch makes this conflict moot:
/// it deletes the conflicting appointment, or it updates it to a time
/// range that no longer overlaps this change's new range.
fn resolved_in_batch(
    change: &Change,
    conflict: &Appointment,
    others: &[(ChangeKind, Option<Appointment>, Option<Appointment>)],
    own_index: usize,
) -> bool {
    let Some(new) = change.new_appointment.as_ref() else {
        return false;
    };

    others
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != own_index)
        .any(|(_, (kind, current, other_new))| {
            let touches_conflict = current.as_ref().is_some_and(|c| c.same_object(conflict));
            if !touches_conflict {
                return false;
            }
            match kind {
                ChangeKind::Delete | ChangeKind::CreateDeleteException => true,
                ChangeKind::Update => other_new
                    .as_ref()
                    .is_some_and(|updated| !updated.overlaps(new)),
                ChangeKind::Create => false,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Appointment;
    use chrono::{TimeZone, Utc};

    fn stored(id: &str, uid: &str, start_h: u32, end_h: u32) -> Appointment {
        let mut a = Appointment::new(uid, "Meeting");
        a.object_id = Some(id.to_string());
        a.start = Some(Utc.with_ymd_and_hms(2025, 3, 20, start_h, 0, 0).unwrap());
        a.end = Some(Utc.with_ymd_and_hms(2025, 3, 20, end_h, 0, 0).unwrap());
        a
    }

    fn update_change(current: Appointment, new: Appointment) -> Change {
        let mut c = Change::new(ChangeKind::Update);
        c.current_appointment = Some(current);
        c.new_appointment = Some(new);
        c
    }

    #[test]
    fn test_own_appointment_is_purged_from_conflicts() {
        let current = stored("1", "uid-1", 9, 10);
        let mut change = update_change(current.clone(), stored("1", "uid-1", 9, 11));
        change.conflicts = vec![current, stored("2", "uid-2", 9, 10)];

        let mut analysis = Analysis::new();
        analysis.push_change(change);
        purge_conflicts(&mut analysis);

        let conflicts = &analysis.changes[0].conflicts;
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].object_id.as_deref(), Some("2"));
    }

    #[test]
    fn test_conflict_deleted_elsewhere_in_batch_is_purged() {
        let blocker = stored("2", "uid-2", 9, 10);

        let mut change = update_change(stored("1", "uid-1", 9, 10), stored("1", "uid-1", 9, 10));
        change.conflicts = vec![blocker.clone()];

        let mut delete = Change::new(ChangeKind::Delete);
        delete.current_appointment = Some(blocker.clone());
        delete.deleted_appointment = Some(blocker);

        let mut analysis = Analysis::new();
        analysis.push_change(change);
        analysis.push_change(delete);
        purge_conflicts(&mut analysis);

        assert!(analysis.changes[0].conflicts.is_empty());
    }

    #[test]
    fn test_conflict_moved_away_in_batch_is_purged() {
        let blocker = stored("2", "uid-2", 9, 10);

        let mut change = update_change(stored("1", "uid-1", 9, 10), stored("1", "uid-1", 9, 10));
        change.conflicts = vec![blocker.clone()];

        // The same batch moves the blocker to the afternoon.
        let moved = update_change(blocker, stored("2", "uid-2", 14, 15));

        let mut analysis = Analysis::new();
        analysis.push_change(change);
        analysis.push_change(moved);
        purge_conflicts(&mut analysis);

        assert!(analysis.changes[0].conflicts.is_empty());
    }

    #[test]
    fn test_still_overlapping_conflict_survives() {
        let blocker = stored("2", "uid-2", 9, 10);

        let mut change = update_change(stored("1", "uid-1", 9, 10), stored("1", "uid-1", 9, 10));
        change.conflicts = vec![blocker.clone()];

        // The batch touches the blocker but it still overlaps.
        let nudged = update_change(blocker, stored("2", "uid-2", 9, 11));

        let mut analysis = Analysis::new();
        analysis.push_change(change);
        analysis.push_change(nudged);
        purge_conflicts(&mut analysis);

        assert_eq!(analysis.changes[0].conflicts.len(), 1);
    }

    #[test]
    fn test_purge_is_idempotent() {
        let current = stored("1", "uid-1", 9, 10);
        let mut change = update_change(current.clone(), stored("1", "uid-1", 9, 11));
        change.conflicts = vec![current, stored("2", "uid-2", 9, 10)];

        let mut analysis = Analysis::new();
        analysis.push_change(change);
        purge_conflicts(&mut analysis);
        let once: Vec<_> = analysis.changes[0]
            .conflicts
            .iter()
            .map(|c| c.object_id.clone())
            .collect();

        purge_conflicts(&mut analysis);
        let twice: Vec<_> = analysis.changes[0]
            .conflicts
            .iter()
            .map(|c| c.object_id.clone())
            .collect();

        assert_eq!(once, twice);
    }
}
