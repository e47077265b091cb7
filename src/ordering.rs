//! Fractional-indexing planner for subtask reordering.
//!
//! Sibling order is kept in float `position` keys so a move usually rewrites
//! one row: boundary moves take `first - 1` / `last + 1`, middle moves take
//! the midpoint of the two neighbors around the target slot. Midpoints halve
//! the available gap, so once the gap under the target slot drops below
//! [`MIN_POSITION_GAP`] the planner falls back to renumbering the whole
//! sibling list to integer positions in the new display order.

use crate::types::Subtask;

/// Below this gap a midpoint is no longer trustworthy.
pub const MIN_POSITION_GAP: f64 = 1e-4;

/// Outcome of planning a move against the current ordered sibling list.
#[derive(Debug, Clone, PartialEq)]
pub enum ReorderPlan {
    /// Nothing to write: out-of-range target, unknown id, singleton list, or
    /// a move to the subtask's current slot.
    Unchanged,
    /// Rewrite one position for the moved subtask.
    Move { position: f64 },
    /// Precision exhausted: rewrite every sibling to integer positions
    /// `0..n-1` over the new arrangement (moved subtask at the target index).
    Renumber { positions: Vec<(String, f64)> },
}

/// Plan moving `subtask_id` to `target_index` within `ordered`, the current
/// sibling list in ascending position order.
///
/// Out-of-range targets are tolerated as no-ops rather than errors so a stale
/// move (racing a concurrent add or delete) cannot fail loudly.
pub fn plan_move(ordered: &[Subtask], subtask_id: &str, target_index: usize) -> ReorderPlan {
    let n = ordered.len();
    if n < 2 || target_index >= n {
        return ReorderPlan::Unchanged;
    }
    let Some(current_index) = ordered.iter().position(|s| s.id == subtask_id) else {
        return ReorderPlan::Unchanged;
    };
    if current_index == target_index {
        return ReorderPlan::Unchanged;
    }

    if target_index == 0 {
        return ReorderPlan::Move {
            position: ordered[0].position - 1.0,
        };
    }
    if target_index == n - 1 {
        return ReorderPlan::Move {
            position: ordered[n - 1].position + 1.0,
        };
    }

    // Middle slot: neighbors are the current occupants around the target.
    let prev = ordered[target_index - 1].position;
    let next = ordered[target_index].position;
    if next - prev < MIN_POSITION_GAP {
        return ReorderPlan::Renumber {
            positions: renumbered(ordered, current_index, target_index),
        };
    }
    ReorderPlan::Move {
        position: (prev + next) / 2.0,
    }
}

/// Integer positions `0..n-1` over the new arrangement: the moved subtask is
/// pulled out of its current slot and reinserted at the target index, then
/// every sibling gets its arrangement index as position. Keeps all positions
/// distinct, and the moved subtask's position equals the target index.
fn renumbered(ordered: &[Subtask], current_index: usize, target_index: usize) -> Vec<(String, f64)> {
    let mut arranged: Vec<&Subtask> = ordered.iter().collect();
    let moved = arranged.remove(current_index);
    arranged.insert(target_index, moved);
    arranged
        .iter()
        .enumerate()
        .map(|(index, subtask)| (subtask.id.clone(), index as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn subtask(id: &str, position: f64) -> Subtask {
        Subtask {
            id: id.to_string(),
            task_id: "task".to_string(),
            title: id.to_string(),
            is_completed: false,
            completed_at: None,
            position,
            created_at: Utc::now(),
        }
    }

    fn siblings(positions: &[f64]) -> Vec<Subtask> {
        positions
            .iter()
            .enumerate()
            .map(|(i, &p)| subtask(&format!("s{i}"), p))
            .collect()
    }

    /// Apply a plan the way the store would, then restore ascending order.
    fn apply(ordered: &mut Vec<Subtask>, id: &str, plan: ReorderPlan) {
        match plan {
            ReorderPlan::Unchanged => {}
            ReorderPlan::Move { position } => {
                if let Some(s) = ordered.iter_mut().find(|s| s.id == id) {
                    s.position = position;
                }
            }
            ReorderPlan::Renumber { positions } => {
                for (sid, position) in positions {
                    if let Some(s) = ordered.iter_mut().find(|s| s.id == sid) {
                        s.position = position;
                    }
                }
            }
        }
        ordered.sort_by(|a, b| a.position.total_cmp(&b.position));
    }

    #[test]
    fn test_move_to_current_index_is_noop() {
        let list = siblings(&[0.0, 1.0, 2.0]);
        assert_eq!(plan_move(&list, "s1", 1), ReorderPlan::Unchanged);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let list = siblings(&[0.0, 1.0]);
        assert_eq!(plan_move(&list, "missing", 0), ReorderPlan::Unchanged);
    }

    #[test]
    fn test_out_of_bounds_target_is_noop() {
        let list = siblings(&[0.0, 1.0, 2.0]);
        assert_eq!(plan_move(&list, "s0", 3), ReorderPlan::Unchanged);
    }

    #[test]
    fn test_singleton_list_is_noop() {
        let list = siblings(&[5.0]);
        assert_eq!(plan_move(&list, "s0", 0), ReorderPlan::Unchanged);
    }

    #[test]
    fn test_move_to_front_goes_below_prior_minimum() {
        let list = siblings(&[0.0, 1.0, 2.0]);
        match plan_move(&list, "s2", 0) {
            ReorderPlan::Move { position } => assert!(position < 0.0),
            other => panic!("expected single move, got {other:?}"),
        }
    }

    #[test]
    fn test_move_to_back_goes_above_prior_maximum() {
        let list = siblings(&[0.0, 1.0, 2.0]);
        match plan_move(&list, "s0", 2) {
            ReorderPlan::Move { position } => assert!(position > 2.0),
            other => panic!("expected single move, got {other:?}"),
        }
    }

    #[test]
    fn test_middle_move_takes_neighbor_midpoint() {
        let list = siblings(&[0.0, 1.0, 2.0]);
        match plan_move(&list, "s2", 1) {
            ReorderPlan::Move { position } => assert_eq!(position, 0.5),
            other => panic!("expected single move, got {other:?}"),
        }
    }

    #[test]
    fn test_tight_gap_triggers_integer_renumber() {
        let list = siblings(&[0.0, 0.00005, 1.0]);
        match plan_move(&list, "s2", 1) {
            ReorderPlan::Renumber { positions } => {
                // New arrangement: s0, s2, s1.
                assert_eq!(
                    positions,
                    vec![
                        ("s0".to_string(), 0.0),
                        ("s2".to_string(), 1.0),
                        ("s1".to_string(), 2.0),
                    ]
                );
            }
            other => panic!("expected renumber, got {other:?}"),
        }
    }

    #[test]
    fn test_repeated_moves_converge_then_renumber() {
        let mut list = siblings(&[0.0, 1.0, 2.0]);

        // Each round moves the last subtask into the middle slot, halving the
        // gap under it, until the midpoint floor forces a renumber.
        let mut rounds = 0;
        loop {
            assert!(rounds < 20, "gap never dropped below the floor");
            let id = list[2].id.clone();
            let plan = plan_move(&list, &id, 1);
            let renumbered = matches!(plan, ReorderPlan::Renumber { .. });
            apply(&mut list, &id, plan);
            rounds += 1;
            if renumbered {
                break;
            }
        }
        assert!(rounds > 5, "renumber fired too early (round {rounds})");

        // After the renumber the positions are exact integers in display order.
        let positions: Vec<f64> = list.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0.0, 1.0, 2.0]);
    }
}
