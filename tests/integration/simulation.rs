//! Full pipeline: outcome string through strategy, detector and stats.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use trainer::config::AppConfig;
use trainer::engine::{parse_events, Simulation, Stats};
use trainer::strategy::StrategyRegistry;
use trainer::types::{Channel, PerChannel};

use crate::{fixed_odds, seeded_config, HISTORY};

#[test]
fn test_scenario_f_x_l_f() {
    let config = AppConfig::default();
    let registry = StrategyRegistry::new(&config);
    let strategy = registry.get("xlDrop").unwrap();

    // Newest first on input, so this plays F, X, L, F.
    let events = parse_events("F/L/X/F").unwrap();
    assert_eq!(events, vec![Channel::F, Channel::X, Channel::L, Channel::F]);

    let records = Simulation::new(&config, strategy)
        .run(&events, &fixed_odds(4))
        .unwrap();

    let first = &records[0];
    assert_eq!(first.stakes, PerChannel::new(dec!(10000), dec!(4000), dec!(3350)));
    assert_eq!(first.streaks, PerChannel::new(0, 1, 1));

    let second = &records[1];
    assert_eq!(second.streaks, PerChannel::new(1, 0, 2));
    assert_eq!(second.total - first.total, config.stake.base_amount);

    assert_eq!(records[3].carries, PerChannel::new(dec!(0), dec!(23100), dec!(54000)));
    assert_eq!(records[3].total, dec!(40000));
}

#[test]
fn test_every_strategy_runs_the_history() {
    let config = seeded_config(7);
    let registry = StrategyRegistry::new(&config);
    let events = parse_events(HISTORY).unwrap();

    for strategy in registry.iter() {
        let records = Simulation::new(&config, strategy).run(&events, &[]).unwrap();
        assert_eq!(records.len(), events.len(), "{}", strategy.name());
        let stats = Stats::from_records(&records);
        assert_eq!(
            stats.outcome_counts.f + stats.outcome_counts.x + stats.outcome_counts.l,
            events.len()
        );
        assert_eq!(stats.final_total, records.last().unwrap().total);
    }
}

#[test]
fn test_total_conservation() {
    let config = seeded_config(11);
    let registry = StrategyRegistry::new(&config);
    let events = parse_events(HISTORY).unwrap();
    let n = Decimal::from(events.len());

    for name in ["xlDrop", "xlWithSupport"] {
        let strategy = registry.get(name).unwrap();
        let records = Simulation::new(&config, strategy).run(&events, &[]).unwrap();

        let written_off: Decimal = records.iter().map(|r| r.ledger.written_off).sum();
        let credited: Decimal = records.iter().map(|r| r.ledger.credited).sum();
        let last = records.last().unwrap();

        assert_eq!(
            last.total + written_off + credited,
            n * config.stake.base_amount,
            "{name}"
        );
    }
}

#[test]
fn test_deferrals_are_credited_once_channel_wins() {
    // Long X drought pushes X past its ceiling, then X wins last.
    let mut config = AppConfig::default();
    config.detector.small_multiple = dec!(1000);
    config.detector.big_multiple = dec!(1000);
    let registry = StrategyRegistry::new(&config);
    let strategy = registry.get("xlDrop").unwrap();

    let mut events = vec![Channel::F, Channel::L, Channel::F, Channel::F, Channel::L, Channel::F, Channel::F];
    events.push(Channel::X);
    events.push(Channel::L);
    let records = Simulation::new(&config, strategy)
        .run(&events, &fixed_odds(events.len()))
        .unwrap();

    let deferred_before_x = records[6].ledger.deferred.x;
    assert!(deferred_before_x > Decimal::ZERO);
    assert!(records[7].ledger.credited >= deferred_before_x);
    assert_eq!(records[7].ledger.deferred.x, Decimal::ZERO);
}

#[test]
fn test_hockey_swaps_generated_ranges() {
    let mut config = seeded_config(3);
    config.odds.swap_channels = true;
    let registry = StrategyRegistry::new(&config);
    let strategy = registry.get("xlDrop").unwrap();

    let events = parse_events(HISTORY).unwrap();
    let records = Simulation::new(&config, strategy).run(&events, &[]).unwrap();

    for r in &records {
        // X now draws from the L range and vice versa.
        assert!(r.odds.x >= dec!(4.0) && r.odds.x <= dec!(5.0), "{}", r.odds.x);
        assert!(r.odds.l >= dec!(3.3) && r.odds.l <= dec!(3.9), "{}", r.odds.l);
    }
}
