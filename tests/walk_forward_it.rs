mod common;

use anyhow::Result;
use qfold::prelude::*;

use crate::common::{fixture_dataset, fixture_dir, fixture_env};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Deterministic stand-in for an agent: buy, hold twice, sell, repeat.
fn scripted_action(step: usize) -> Action {
    match step % 4 {
        0 => Action::Buy,
        3 => Action::Sell,
        _ => Action::Hold,
    }
}

fn close_at(env: &Environment, row: usize) -> f64 {
    env.frame()
        .column(CanonicalCol::Close.as_str())
        .unwrap()
        .f64()
        .unwrap()
        .get(row)
        .unwrap()
}

#[test]
fn composite_dataset_merges_fixture_symbols() -> Result<()> {
    init_tracing();
    let dataset = fixture_dataset(&DatasetConfig::default());

    assert_eq!(dataset.n_rows(), 48);
    assert_eq!(
        dataset.symbols(),
        &[Symbol("aapl".to_string()), Symbol("msft".to_string())]
    );

    // Primary symbol keeps canonical names, the secondary one is prefixed.
    let names = dataset.frame().get_column_names();
    assert!(names.iter().any(|n| n.as_str() == "close"));
    assert!(names.iter().any(|n| n.as_str() == "msft_close"));
    // timestamp + 5 columns per symbol
    assert_eq!(dataset.frame().width(), 11);
    Ok(())
}

#[test]
fn indicators_shorten_the_series_by_their_warmup() -> Result<()> {
    init_tracing();
    let cfg = DatasetConfig::default().with_indicator_names(&["mom"])?;
    let dataset = CompositeDataset::from_csv(&fixture_dir().join("aapl.csv"), &cfg)?;

    // A 10-row momentum drops the first 10 rows of the 48-row fixture.
    assert_eq!(dataset.n_rows(), 38);
    assert_eq!(dataset.indicators().len(), 1);
    assert!(
        dataset
            .frame()
            .get_column_names()
            .iter()
            .any(|n| n.as_str() == "mom_10")
    );
    Ok(())
}

#[test]
fn replay_seeding_lands_on_fold_zero() -> Result<()> {
    init_tracing();
    let mut env = fixture_env();

    let memories = env.replay_memories().collect::<QfoldResult<Vec<_>>>()?;
    assert_eq!(memories.len(), 6);
    assert_eq!(memories[0].len(), env.n_state_factors());
    // Factor order follows the frame columns; close is the fourth factor.
    assert_eq!(memories[0][3], close_at(&env, 0));

    let fold_zero = env.fold_plan().folds().next().unwrap();
    assert_eq!(env.current_row(), fold_zero.train.start);
    // Seeding observes only; no orders, no position.
    assert_eq!(env.position(), Position::Flat);
    assert!(env.ledger().is_empty());
    Ok(())
}

#[test]
fn epoch_replay_reproduces_identical_reward_streams() -> Result<()> {
    init_tracing();
    let mut env = fixture_env();
    env.replay_memories().for_each(drop);

    let folds: Vec<Fold> = env.fold_plan().folds().collect();
    assert_eq!(folds.len(), 2);

    let mut streams: Vec<Vec<f64>> = Vec::new();
    for pair in folds[0].epochs(2) {
        env.rewind_to(pair.train.start)?;
        let mut rewards = Vec::with_capacity(pair.train.len());
        for step in 0..pair.train.len() {
            rewards.push(env.step(scripted_action(step), false)?.0);
        }
        assert_eq!(env.current_row(), pair.train.end);
        streams.push(rewards);
    }

    assert_eq!(streams[0], streams[1]);
    Ok(())
}

#[test]
fn walk_forward_covers_every_fold_without_running_out() -> Result<()> {
    init_tracing();
    let mut env = fixture_env();
    env.replay_memories().for_each(drop);

    let folds: Vec<Fold> = env.fold_plan().folds().collect();
    let mut total_rewards = 0;
    for fold in &folds {
        env.rewind_to(fold.train.start)?;
        for step in 0..fold.train.len() + fold.validation.len() {
            env.step(scripted_action(step), false)?;
            total_rewards += 1;
        }
        assert_eq!(env.current_row(), fold.validation.end);
    }

    let plan = env.fold_plan();
    let expected =
        plan.n_folds() * (plan.fold_train_length() + plan.fold_validation_length());
    assert_eq!(total_rewards, expected);
    Ok(())
}

#[test]
fn evaluation_pass_records_one_round_trip() -> Result<()> {
    init_tracing();
    let mut env = fixture_env();
    env.replay_memories().for_each(drop);

    let fold = env.fold_plan().folds().next().unwrap();
    env.rewind_to(fold.validation.start)?;

    // Buy on the first validation step, hold through, sell on the last.
    let steps = fold.validation.len();
    for step in 0..steps {
        let action = match step {
            0 => Action::Buy,
            s if s == steps - 1 => Action::Sell,
            _ => Action::Hold,
        };
        env.step(action, true)?;
    }

    let returns = env.order_returns();
    assert_eq!(returns.len(), 1);

    // Buy fills at the close the first step lands on, sell at the close the
    // last step leaves behind.
    let buy = close_at(&env, fold.validation.start + 1);
    let sell = close_at(&env, fold.validation.end - 1);
    assert!((returns[0] - (sell / buy - 1.0)).abs() < 1e-12);

    let orders = env.ledger().as_df()?;
    assert_eq!(orders.height(), 1);
    Ok(())
}
