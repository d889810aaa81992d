//! Property tests for winner resolution.

use bench_browser::models::SystemInfo;
use bench_browser::results::{resolve_winners, Cell, TiePolicy};
use proptest::prelude::*;
use std::sync::Arc;

fn cell(env: &str, mean: f64, std: f64) -> Cell {
    Cell {
        env: env.to_string(),
        run_id: "1_1700000000".to_string(),
        mean: Some(mean),
        std: Some(std),
        error: false,
        error_type: None,
        run_timestamp: Some(1_700_000_000),
        fa: false,
        file_size_gib: None,
        toolbox: None,
        model_id: None,
        system_info: Arc::new(SystemInfo::default()),
    }
}

const ENVS: [&str; 6] = ["rocm", "vulkan_radv", "vulkan_amdvlk", "cuda", "metal", "cpu"];

fn stats() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((0.0f64..500.0, 0.0f64..10.0), 1..ENVS.len())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn best_is_always_a_winner(stats in stats()) {
        let cells: Vec<Cell> = stats
            .iter()
            .enumerate()
            .map(|(i, (mean, std))| cell(ENVS[i], *mean, *std))
            .collect();
        let columns: Vec<(&str, Option<&Cell>)> =
            cells.iter().map(|c| (c.env.as_str(), Some(c))).collect();

        let winners = resolve_winners(&columns, &TiePolicy::default());
        let best = stats.iter().map(|(m, _)| *m).fold(f64::MIN, f64::max);

        prop_assert!(!winners.is_empty());
        let best_env = cells.iter().find(|c| c.mean == Some(best)).unwrap().env.as_str();
        prop_assert!(winners.contains(&best_env));
        for env in &winners {
            let mean = cells.iter().find(|c| c.env == *env).unwrap().mean.unwrap();
            prop_assert!(mean <= best);
        }
    }

    #[test]
    fn zero_std_uses_floor(stats in prop::collection::vec(0.0f64..5.0, 1..ENVS.len())) {
        let cells: Vec<Cell> = stats
            .iter()
            .enumerate()
            .map(|(i, mean)| cell(ENVS[i], *mean, 0.0))
            .collect();
        let columns: Vec<(&str, Option<&Cell>)> =
            cells.iter().map(|c| (c.env.as_str(), Some(c))).collect();

        let winners = resolve_winners(&columns, &TiePolicy::default());
        let best = stats.iter().copied().fold(f64::MIN, f64::max);

        for c in &cells {
            let expected = best - c.mean.unwrap() <= 0.25;
            prop_assert_eq!(winners.contains(&c.env.as_str()), expected);
        }
    }

    #[test]
    fn missing_cells_never_win(stats in stats(), gap in 0usize..ENVS.len()) {
        let cells: Vec<Cell> = stats
            .iter()
            .enumerate()
            .map(|(i, (mean, std))| cell(ENVS[i], *mean, *std))
            .collect();
        let mut columns: Vec<(&str, Option<&Cell>)> =
            cells.iter().map(|c| (c.env.as_str(), Some(c))).collect();
        let absent = ENVS[gap];
        if !columns.iter().any(|(env, _)| *env == absent) {
            columns.push((absent, None));
        }

        let winners = resolve_winners(&columns, &TiePolicy::default());
        prop_assert!(winners.iter().all(|env| cells.iter().any(|c| c.env == *env)));
    }
}

#[test]
fn no_usable_cells_means_no_winner() {
    let mut errored = cell("rocm", 100.0, 1.0);
    errored.error = true;
    let columns = [("rocm", Some(&errored)), ("vulkan", None)];
    assert!(resolve_winners(&columns, &TiePolicy::default()).is_empty());
}

#[test]
fn stricter_policy_narrows_ties() {
    let rocm = cell("rocm", 120.0, 2.0);
    let vulkan = cell("vulkan", 118.0, 1.0);
    let columns = [("rocm", Some(&rocm)), ("vulkan", Some(&vulkan))];

    let strict = TiePolicy {
        floor: 0.0,
        sigma_multiplier: 0.5,
    };
    assert_eq!(resolve_winners(&columns, &strict), vec!["rocm"]);
    assert_eq!(
        resolve_winners(&columns, &TiePolicy::default()),
        vec!["rocm", "vulkan"]
    );
}
