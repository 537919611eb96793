use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use prompt_bench_core::domain::{CandidateId, Direction, Ranking};
use prompt_bench_metrics::agreement::RankAgreement;
use proptest::prelude::*;
use rstest::rstest;

fn ranking(ids: &[&str]) -> Ranking {
    Ranking::from_strs(ids).unwrap()
}

/// Rankings of 2 to 10 distinct ids, in random order.
fn arb_ranking() -> impl Strategy<Value = Ranking> {
    (2usize..10)
        .prop_flat_map(|n| Just((0..n).map(|i| format!("c{}", i)).collect::<Vec<_>>()).prop_shuffle())
        .prop_map(|ids| Ranking::from_strs(&ids).unwrap())
}

#[test]
fn test_ai_vs_human_scenario() {
    let ai = ranking(&["x", "y", "z"]);
    let human = ranking(&["y", "x", "z"]);

    let result = RankAgreement::compare(&ai, &human, 3);

    assert_relative_eq!(result.kendall_tau, 1.0 / 3.0, epsilon = 1e-12);
    assert_eq!(result.top_k_overlap, 3);
    assert_eq!(result.exact_position_matches, 1);
    assert_relative_eq!(result.agreement_percentage, 100.0 / 3.0, epsilon = 1e-9);
}

#[rstest]
#[case(&["a", "b", "c", "d"], &["a", "b", "c", "d"], 1.0)]
#[case(&["a", "b", "c", "d"], &["d", "c", "b", "a"], -1.0)]
#[case(&["a", "b", "c", "d"], &["b", "a", "c", "d"], 4.0 / 6.0)]
#[case(&["a", "b", "c", "d"], &["a", "b", "d", "c"], 4.0 / 6.0)]
#[case(&["a", "b"], &["c", "d"], 0.0)]
fn test_kendall_tau_cases(#[case] reference: &[&str], #[case] compared: &[&str], #[case] expected: f64) {
    let tau = RankAgreement::kendall_tau(&ranking(reference), &ranking(compared));
    assert_relative_eq!(tau, expected, epsilon = 1e-12);
}

#[rstest]
#[case(1, 0)]
#[case(2, 2)]
#[case(3, 2)]
#[case(10, 4)]
fn test_top_k_overlap_varies_with_k(#[case] k: usize, #[case] expected: usize) {
    let reference = ranking(&["a", "b", "c", "d"]);
    let compared = ranking(&["b", "a", "d", "c"]);
    assert_eq!(RankAgreement::top_k_overlap(&reference, &compared, k), expected);
}

#[test]
fn test_changes_follow_reference_order() {
    let ai = ranking(&["a", "b", "c", "d"]);
    let human = ranking(&["d", "a", "b", "c"]);

    let changes = RankAgreement::position_changes(&ai, &human);
    let moved: Vec<(&str, usize, usize, Direction, usize)> = changes
        .iter()
        .map(|c| (c.candidate_id.as_str(), c.from_rank, c.to_rank, c.direction, c.magnitude))
        .collect();

    assert_eq!(
        moved,
        vec![
            ("a", 1, 2, Direction::Down, 1),
            ("b", 2, 3, Direction::Down, 1),
            ("c", 3, 4, Direction::Down, 1),
            ("d", 4, 1, Direction::Up, 3),
        ]
    );
}

#[test]
fn test_missing_candidate_is_reported_not_ignored() {
    let ai = ranking(&["a", "b", "c"]);
    let human = ranking(&["a", "b"]);

    let result = RankAgreement::compare(&ai, &human, 3);
    assert_eq!(result.only_in_reference, vec![CandidateId::new("c")]);
    assert!(result.only_in_compared.is_empty());
    assert_eq!(result.common_items, 2);
    assert_relative_eq!(result.kendall_tau, 1.0);
}

proptest! {
    #[test]
    fn prop_identity(r in arb_ranking()) {
        let result = RankAgreement::compare(&r, &r, 3);
        prop_assert!((result.kendall_tau - 1.0).abs() < 1e-12);
        prop_assert_eq!(result.top_k_overlap, 3.min(r.len()));
        prop_assert_eq!(result.exact_position_matches, r.len());
        prop_assert!(result.changes.is_empty());
    }

    #[test]
    fn prop_reversal(r in arb_ranking()) {
        let result = RankAgreement::compare(&r, &r.reversed(), 3);
        prop_assert!((result.kendall_tau + 1.0).abs() < 1e-12);
    }

    #[test]
    fn prop_swap_preserves_tau_and_flips_directions(r in arb_ranking(), seed in any::<u64>()) {
        let mut ids = r.ids().to_vec();
        let len = ids.len();
        ids.rotate_left((seed as usize) % len);
        let other = Ranking::new(ids).unwrap();

        let forward = RankAgreement::compare(&r, &other, 3);
        let backward = RankAgreement::compare(&other, &r, 3);

        prop_assert!((forward.kendall_tau - backward.kendall_tau).abs() < 1e-12);
        prop_assert_eq!(forward.changes.len(), backward.changes.len());
        for change in &forward.changes {
            let mirror = backward
                .changes
                .iter()
                .find(|c| c.candidate_id == change.candidate_id)
                .unwrap();
            prop_assert_ne!(mirror.direction, change.direction);
            prop_assert_eq!(mirror.magnitude, change.magnitude);
        }
    }

    #[test]
    fn prop_tau_bounded(a in arb_ranking(), b in arb_ranking()) {
        let tau = RankAgreement::kendall_tau(&a, &b);
        prop_assert!((-1.0..=1.0).contains(&tau));
    }
}
