//! Win evaluation and outcome generation tests.

use bonk_core::{
    bonus::BonusKind,
    config::GameConfig,
    error::SimError,
    evaluator::WinEvaluator,
    reels::{DrawSpec, OutcomeGenerator, OutcomeSource, ReelSet},
    rng::SimRng,
    symbol::{pair_win, Symbol, ValueContext},
};

fn board(a: &str, b: &str) -> [Symbol; 2] {
    [Symbol::new(a), Symbol::new(b)]
}

#[test]
fn one_one_pays_zero_in_every_context() {
    let config = GameConfig::default_test();
    let eval = WinEvaluator::new(&config.symbols);
    for ctx in [ValueContext::Base, ValueContext::Bonk, ValueContext::SuperBonk] {
        assert_eq!(eval.evaluate(&board("1", "1"), ctx).win, 0, "{ctx:?}");
        assert_eq!(eval.evaluate(&board("1", "2"), ctx).win, 2, "{ctx:?}");
        assert_eq!(eval.evaluate(&board("2", "3"), ctx).win, 6, "{ctx:?}");
    }
    assert_eq!(pair_win(1, 1), 0);
    assert_eq!(pair_win(1, 7), 7);
}

#[test]
fn unrecognized_token_resolves_to_zero() {
    let config = GameConfig::default_test();
    let eval = WinEvaluator::new(&config.symbols);
    assert_eq!(config.symbols.value(&Symbol::new("Wild Owl"), ValueContext::Bonk), 0);
    let result = eval.evaluate(&board("Wild Owl", "25"), ValueContext::Base);
    assert_eq!(result.win, 0);
    assert!(result.trigger.is_none());
}

#[test]
fn specials_resolve_per_context() {
    let config = GameConfig::default_test();
    let t = &config.symbols;
    let bat = Symbol::new("Bat");
    let golden = Symbol::new("Golden Bat");
    assert_eq!(t.value(&bat, ValueContext::Base), 1);
    assert_eq!(t.value(&golden, ValueContext::Base), 1);
    assert_eq!(t.value(&bat, ValueContext::Bonk), 50);
    assert_eq!(t.value(&golden, ValueContext::Bonk), 10);
    assert_eq!(t.value(&bat, ValueContext::SuperBonk), 0);
    assert_eq!(t.value(&golden, ValueContext::SuperBonk), 10);
}

#[test]
fn base_game_detects_triggers() {
    let config = GameConfig::default_test();
    let eval = WinEvaluator::new(&config.symbols);

    let bonk = eval.evaluate(&board("Bat", "5"), ValueContext::Base);
    assert_eq!(bonk.win, 5);
    let trigger = bonk.trigger.expect("bonk trigger");
    assert_eq!(trigger.kind, BonusKind::Bonk);
    assert!(!trigger.double);

    let sb = eval.evaluate(&board("3", "Golden Bat"), ValueContext::Base).trigger.expect("trigger");
    assert_eq!(sb.kind, BonusKind::SuperBonk);
    assert!(!sb.double);

    let both = eval
        .evaluate(&board("Golden Bat", "Bat"), ValueContext::Base)
        .trigger
        .expect("trigger");
    assert_eq!(both.kind, BonusKind::SuperBonk);
    assert!(both.double);
    assert_eq!(config.bonus.allotment(both), 20);
}

#[test]
fn boards_without_specials_never_trigger() {
    let config = GameConfig::default_test();
    let eval = WinEvaluator::new(&config.symbols);
    assert!(!config.symbols.specials.is_special(&Symbol::new("50")));
    assert!(config.symbols.specials.is_special(&Symbol::new("Golden Bat")));
    for (a, b) in [("1", "1"), ("50", "50"), ("Wild Owl", "3"), ("bat", "BAT")] {
        assert!(eval.evaluate(&board(a, b), ValueContext::Base).trigger.is_none(), "{a}/{b}");
    }
}

#[test]
fn bonus_contexts_never_trigger() {
    let config = GameConfig::default_test();
    let eval = WinEvaluator::new(&config.symbols);
    assert!(eval.evaluate(&board("Bat", "2"), ValueContext::Bonk).trigger.is_none());
    assert!(eval.evaluate(&board("Golden Bat", "2"), ValueContext::SuperBonk).trigger.is_none());
}

#[test]
fn bonus_kind_parses_known_names_only() {
    assert_eq!("BONK".parse::<BonusKind>().ok(), Some(BonusKind::Bonk));
    assert_eq!("SUPER_BONK_SPINS".parse::<BonusKind>().ok(), Some(BonusKind::SuperBonk));
    assert!(matches!(
        "MEGA_BONK".parse::<BonusKind>(),
        Err(SimError::UnknownBonusKind { .. })
    ));
}

// ── Outcome generator ────────────────────────────────────────────────

#[test]
fn unknown_reel_set_is_fatal() {
    let config = GameConfig::default_test();
    let mut gen = OutcomeGenerator::new(&config, SimRng::for_sim(1, 0));
    let err = gen.draw(&DrawSpec::Standard { reel_set: "BR9" }).unwrap_err();
    assert!(matches!(err, SimError::UnknownReelSet { ref id } if id == "BR9"));
}

#[test]
fn empty_reel_is_fatal() {
    let mut config = GameConfig::default_test();
    config.reel_sets.insert("HOLLOW".into(), ReelSet::from_tokens(&["1"], &[]));
    let mut gen = OutcomeGenerator::new(&config, SimRng::for_sim(1, 0));
    let err = gen.draw(&DrawSpec::Standard { reel_set: "HOLLOW" }).unwrap_err();
    assert!(matches!(err, SimError::EmptyReel { reel: 1, .. }));
}

#[test]
fn fixed_reel_always_draws_its_only_symbol() {
    let config = GameConfig::default_test();
    let mut gen = OutcomeGenerator::new(&config, SimRng::for_sim(3, 0));
    for _ in 0..50 {
        let b = gen.draw(&DrawSpec::Standard { reel_set: "Horny_Jail" }).expect("draw");
        assert_eq!(b[0], Symbol::new("1000"));
    }
}

#[test]
fn sticky_reel_draws_from_numeric_set() {
    let config = GameConfig::default_test();
    let mut gen = OutcomeGenerator::new(&config, SimRng::for_sim(5, 0));
    let spec = DrawSpec::Sticky { stick: "BON2_stick", run: "BON2_run", sticky_reel: 1 };
    for _ in 0..200 {
        let b = gen.draw(&spec).expect("draw");
        assert!(b[1].face_value().is_some(), "sticky reel drew {}", b[1]);
    }
}

#[test]
fn same_stream_draws_same_boards() {
    let config = GameConfig::default_test();
    let mut a = OutcomeGenerator::new(&config, SimRng::for_sim(11, 42));
    let mut b = OutcomeGenerator::new(&config, SimRng::for_sim(11, 42));
    for _ in 0..100 {
        let spec = DrawSpec::Standard { reel_set: "BR0" };
        assert_eq!(a.draw(&spec).expect("a"), b.draw(&spec).expect("b"));
    }
}
