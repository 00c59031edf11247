//! # Prize Draw
//!
//! One uniform sample in `[0, 100)` walked against the running sum of prize weights.
//!
//! ## Rules
//! - First prize whose inclusive cumulative weight reaches the sample wins, so list order breaks ties.
//! - Weights under 100 leave a residual "no win" chance of `(100 - total) / 100`.
//! - Weights past the 100 mark can never be reached.
//! - An empty list never wins.
use rand::Rng;
use records::models::Prize;

pub const DRAW_SCALE: f64 = 100.0;

/// Absorbs float drift in weights such as 33.3 + 33.3 + 33.4.
const CUMULATIVE_SLACK: f64 = 1e-9;

pub fn draw<'a, R: Rng>(prizes: &'a [Prize], rng: &mut R) -> Option<&'a Prize> {
    if prizes.is_empty() {
        return None;
    }

    let lucky = rng.random_range(0.0..DRAW_SCALE);
    pick(prizes, lucky)
}

/// Deterministic half of [`draw`].
pub fn pick(prizes: &[Prize], lucky: f64) -> Option<&Prize> {
    let mut cumulative = 0.0;

    prizes.iter().find(|prize| {
        cumulative += prize.probability;
        lucky <= cumulative + CUMULATIVE_SLACK
    })
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use uuid::Uuid;

    use super::*;

    fn prizes(weights: &[f64]) -> Vec<Prize> {
        weights
            .iter()
            .enumerate()
            .map(|(i, &probability)| Prize {
                id: Uuid::new_v4(),
                name: format!("prize-{i}"),
                probability,
            })
            .collect()
    }

    #[test]
    fn test_pick_walks_cumulative_sum() {
        let list = prizes(&[10.0, 30.0, 60.0]);

        assert_eq!(pick(&list, 5.0).unwrap().name, "prize-0");
        assert_eq!(pick(&list, 10.0).unwrap().name, "prize-0");
        assert_eq!(pick(&list, 10.5).unwrap().name, "prize-1");
        assert_eq!(pick(&list, 99.9).unwrap().name, "prize-2");
    }

    #[test]
    fn test_pick_order_breaks_ties() {
        let list = prizes(&[0.0, 0.0, 50.0]);
        assert_eq!(pick(&list, 0.0).unwrap().name, "prize-0");

        let list = prizes(&[20.0, 0.0, 30.0]);
        assert_eq!(pick(&list, 20.0).unwrap().name, "prize-0");
        assert_eq!(pick(&list, 20.1).unwrap().name, "prize-2");
    }

    #[test]
    fn test_pick_past_total_is_no_win() {
        let list = prizes(&[30.0, 20.0]);
        assert!(pick(&list, 50.5).is_none());
    }

    #[test]
    fn test_oversubscribed_tail_is_unreachable() {
        let list = prizes(&[80.0, 40.0, 10.0]);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..5_000 {
            let won = draw(&list, &mut rng).unwrap();
            assert_ne!(won.name, "prize-2");
        }
    }

    #[test]
    fn test_empty_list_never_wins() {
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..1_000 {
            assert!(draw(&[], &mut rng).is_none());
        }
    }

    #[test]
    fn test_full_weight_always_wins() {
        let mut rng = StdRng::seed_from_u64(7);

        let cases: [&[f64]; 3] = [&[100.0], &[50.0, 30.0, 20.0], &[33.3, 33.3, 33.4]];

        for weights in cases {
            let list = prizes(weights);
            for _ in 0..10_000 {
                assert!(draw(&list, &mut rng).is_some());
            }
        }
    }

    #[test]
    fn test_no_win_rate_tracks_missing_weight() {
        let list = prizes(&[30.0, 20.0]);
        let mut rng = StdRng::seed_from_u64(42);
        let rounds = 20_000;

        let misses = (0..rounds)
            .filter(|_| draw(&list, &mut rng).is_none())
            .count();
        let rate = misses as f64 / rounds as f64;

        assert!((rate - 0.5).abs() < 0.02, "no-win rate {rate}");
    }

    #[test]
    fn test_win_shares_follow_weights() {
        let list = prizes(&[10.0, 40.0]);
        let mut rng = StdRng::seed_from_u64(3);
        let rounds = 20_000;
        let mut wins = [0usize; 2];

        for _ in 0..rounds {
            if let Some(prize) = draw(&list, &mut rng) {
                wins[if prize.name == "prize-0" { 0 } else { 1 }] += 1;
            }
        }

        let first = wins[0] as f64 / rounds as f64;
        let second = wins[1] as f64 / rounds as f64;
        assert!((first - 0.1).abs() < 0.015, "first share {first}");
        assert!((second - 0.4).abs() < 0.02, "second share {second}");
    }
}
