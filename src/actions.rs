//! Action recommendation.
//!
//! Derives the set of user-offerable actions from the shape of a
//! completed analysis: change kinds, remaining conflicts, the diff, and
//! staleness. Annotation-only action sets (ignore, refresh, ...) are
//! inserted by the analyzers themselves; this pass only adds per-change
//! actions on top, or overrides everything for a stale message.

use crate::analysis::{Action, Analysis, Change, ChangeKind};
use crate::diff;
use crate::message::ItipMethod;

/// Derive and union the recommended actions for every change of the
/// analysis. Must run after conflict purging, since the conflict-aware
/// rows only apply to conflicts that survived the purge.
pub fn recommend_actions(analysis: &mut Analysis, method: ItipMethod) {
    if analysis.stale {
        // A stale message is only ever offered to be ignored, whatever
        // changes were recorded for display purposes.
        analysis.actions.clear();
        analysis.recommend(Action::Ignore);
        return;
    }

    let per_change: Vec<Action> = analysis
        .changes
        .iter()
        .flat_map(|change| actions_for_change(change, method))
        .collect();
    for action in per_change {
        analysis.recommend(action);
    }
}

fn actions_for_change(change: &Change, method: ItipMethod) -> Vec<Action> {
    match change.kind {
        ChangeKind::Delete | ChangeKind::CreateDeleteException => vec![Action::Delete],

        ChangeKind::Create | ChangeKind::Update => match method {
            ItipMethod::Reply => reply_actions(change),
            ItipMethod::Counter => vec![Action::Update, Action::DeclineCounter],
            ItipMethod::Add if change.kind == ChangeKind::Update => {
                // The added exception collides with an existing one; this
                // is a conflict of intent, not a scheduling conflict.
                vec![Action::Ignore, Action::AcceptAndReplace]
            }
            _ => invitation_actions(change),
        },
    }
}

fn reply_actions(change: &Change) -> Vec<Action> {
    let party_crasher = change
        .participant_change
        .as_ref()
        .is_some_and(|pc| pc.party_crasher);
    if party_crasher {
        vec![Action::AcceptPartyCrasher]
    } else {
        vec![Action::Update]
    }
}

/// REQUEST/PUBLISH/ADD create-or-update rows of the recommendation table.
fn invitation_actions(change: &Change) -> Vec<Action> {
    // An update that does not reschedule anything (including the empty
    // diff of an unmodified re-sent exception) is applied silently.
    if change.kind == ChangeKind::Update {
        if let Some(d) = &change.diff {
            if !diff::reschedules(d) {
                return vec![Action::Update];
            }
        }
    }

    if change.conflicts.is_empty() {
        vec![
            Action::Accept,
            Action::Decline,
            Action::Tentative,
            Action::Delegate,
            Action::Counter,
        ]
    } else {
        vec![
            Action::AcceptAndIgnoreConflicts,
            Action::Decline,
            Action::Tentative,
            Action::Delegate,
            Action::Counter,
        ]
    }
}
