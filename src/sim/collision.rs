//! Cursor-vs-bubble hit testing and scoring
//!
//! All bubbles inside the cursor's reach on a tick are collected first,
//! then removed together and scored as one batch. Collecting before
//! mutating avoids the artifacts of popping while iterating; a removed id
//! can never match again because ids are unique within the round.

use glam::Vec2;

use super::state::{Bubble, RoundState};

/// Ids of every live bubble the cursor is currently inside
pub fn collect_hits(cursor: Vec2, bubbles: &[Bubble]) -> Vec<u32> {
    bubbles
        .iter()
        .filter(|b| b.contains(cursor))
        .map(|b| b.id)
        .collect()
}

/// Pop everything under the cursor; returns the number of bubbles burst
///
/// Removal and the score increment happen atomically: one tick with N
/// overlapping bubbles scores N, not one.
pub fn burst_at(round: &mut RoundState, cursor: Vec2) -> u32 {
    let hits = collect_hits(cursor, &round.bubbles);
    if hits.is_empty() {
        return 0;
    }

    round.bubbles.retain(|b| !hits.contains(&b.id));
    let count = hits.len() as u32;
    round.score += count;
    log::debug!("burst {} bubble(s), score {}", count, round.score);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bubble(id: u32, x: f32, y: f32, size: f32) -> Bubble {
        Bubble {
            id,
            pos: Vec2::new(x, y),
            size,
            speed: 1.0,
        }
    }

    #[test]
    fn test_single_hit_scores_one() {
        let mut round = RoundState::new(30);
        round.bubbles.push(bubble(1, 100.0, 100.0, 80.0));
        round.bubbles.push(bubble(2, 500.0, 500.0, 80.0));

        let popped = burst_at(&mut round, Vec2::new(110.0, 100.0));
        assert_eq!(popped, 1);
        assert_eq!(round.score, 1);
        assert_eq!(round.bubbles.len(), 1);
        assert_eq!(round.bubbles[0].id, 2);
    }

    #[test]
    fn test_overlapping_bubbles_all_pop_in_one_tick() {
        let mut round = RoundState::new(30);
        // Three bubbles stacked on the same spot
        round.bubbles.push(bubble(1, 200.0, 200.0, 100.0));
        round.bubbles.push(bubble(2, 210.0, 200.0, 100.0));
        round.bubbles.push(bubble(3, 200.0, 210.0, 100.0));

        let popped = burst_at(&mut round, Vec2::new(205.0, 205.0));
        assert_eq!(popped, 3);
        assert_eq!(round.score, 3);
        assert!(round.bubbles.is_empty());
    }

    #[test]
    fn test_rim_contact_is_a_miss() {
        let mut round = RoundState::new(30);
        round.bubbles.push(bubble(1, 100.0, 100.0, 80.0));

        // Exactly radius away
        let popped = burst_at(&mut round, Vec2::new(140.0, 100.0));
        assert_eq!(popped, 0);
        assert_eq!(round.score, 0);
        assert_eq!(round.bubbles.len(), 1);
    }

    #[test]
    fn test_no_double_count_across_ticks() {
        let mut round = RoundState::new(30);
        round.bubbles.push(bubble(1, 100.0, 100.0, 80.0));

        let cursor = Vec2::new(100.0, 100.0);
        assert_eq!(burst_at(&mut round, cursor), 1);
        // Same cursor next tick: the id is gone, nothing to hit
        assert_eq!(burst_at(&mut round, cursor), 0);
        assert_eq!(round.score, 1);
    }

    proptest! {
        #[test]
        fn prop_score_delta_equals_removed_count(
            xs in proptest::collection::vec((0.0f32..1000.0, 0.0f32..1000.0, 20.0f32..200.0), 0..40),
            cx in 0.0f32..1000.0,
            cy in 0.0f32..1000.0,
        ) {
            let mut round = RoundState::new(30);
            for (x, y, size) in xs {
                let id = round.next_entity_id();
                round.bubbles.push(bubble(id, x, y, size));
            }
            let before_len = round.bubbles.len();
            let before_score = round.score;

            let popped = burst_at(&mut round, Vec2::new(cx, cy));

            prop_assert_eq!(round.score - before_score, popped);
            prop_assert_eq!(before_len - round.bubbles.len(), popped as usize);
            // Nothing left under the cursor after the burst
            prop_assert!(collect_hits(Vec2::new(cx, cy), &round.bubbles).is_empty());
        }
    }
}
