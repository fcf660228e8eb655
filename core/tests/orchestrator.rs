//! Simulation orchestrator tests.
//!
//! Every outcome is scripted so the hand-computed book can be checked
//! event by event: base game, BONK, SUPER_BONK sticky play, upgrades,
//! the max-win ceiling and every accept/repeat rule.

use bonk_core::{
    book::{Book, BookEvent},
    config::GameConfig,
    error::{SimError, SimResult},
    gamestate::GameState,
    reels::{Board, DrawSpec, OutcomeSource},
    symbol::Symbol,
};
use std::collections::{BTreeMap, VecDeque};

/// Replays fixed boards and records which reels each draw asked for.
struct Scripted {
    boards: VecDeque<Board>,
    labels: Vec<String>,
}

impl Scripted {
    fn new(boards: Vec<Board>) -> Self {
        Self { boards: boards.into(), labels: Vec::new() }
    }
}

impl OutcomeSource for Scripted {
    fn pick_reel_set<'w>(&mut self, weights: &'w BTreeMap<String, u64>) -> Option<&'w str> {
        weights.keys().next().map(String::as_str)
    }

    fn draw(&mut self, spec: &DrawSpec<'_>) -> SimResult<Board> {
        self.labels.push(spec.label());
        self.boards.pop_front().ok_or_else(|| SimError::InvalidConfig {
            reason: "script exhausted".into(),
        })
    }
}

fn board(a: &str, b: &str) -> Board {
    [Symbol::new(a), Symbol::new(b)]
}

fn repeat_board(a: &str, b: &str, n: usize) -> Vec<Board> {
    (0..n).map(|_| board(a, b)).collect()
}

fn run_scripted(
    config: &GameConfig,
    mode: &str,
    criteria: &str,
    boards: Vec<Board>,
) -> (Book, Scripted) {
    let mut state = GameState::new(config, mode, 7).expect("game state");
    let mut source = Scripted::new(boards);
    let book = state
        .run_sim_with(0, criteria, &mut source)
        .expect("simulation")
        .clone();
    (book, source)
}

fn spins(book: &Book) -> Vec<&BookEvent> {
    book.events()
        .iter()
        .map(|e| &e.event)
        .filter(|e| matches!(e, BookEvent::BonusSpin { .. }))
        .collect()
}

fn spin_wins(book: &Book) -> Vec<u64> {
    spins(book)
        .into_iter()
        .map(|e| match e {
            BookEvent::BonusSpin { spin_win, .. } => *spin_win,
            _ => unreachable!(),
        })
        .collect()
}

// ── Base game ────────────────────────────────────────────────────────

#[test]
fn one_one_base_draw_pays_nothing() {
    let config = GameConfig::default_test();
    let (book, _) = run_scripted(&config, "base", "0", vec![board("1", "1")]);

    assert_eq!(book.id(), 1);
    assert_eq!(book.events().len(), 2);
    assert!(matches!(book.events()[0].event, BookEvent::Reveal { .. }));
    match &book.events()[1].event {
        BookEvent::FinalWin { payout_multiplier, base_game_wins, free_game_wins } => {
            assert_eq!(*payout_multiplier, 0.0);
            assert_eq!(*base_game_wins, 0.0);
            assert_eq!(*free_game_wins, 0.0);
        }
        other => panic!("expected FINAL_WIN, got {other:?}"),
    }
}

#[test]
fn base_win_lands_in_base_bucket() {
    let config = GameConfig::default_test();
    let (book, _) = run_scripted(&config, "base", "0", vec![board("5", "10")]);
    assert_eq!(book.payout_multiplier(), 50.0);
    assert_eq!(book.base_game_wins(), 50.0);
    assert_eq!(book.free_game_wins(), 0.0);
    assert_eq!(book.count_of("BONUS_TRIGGER"), 0);
}

#[test]
fn reveal_reports_board_and_reel_set() {
    let config = GameConfig::default_test();
    let (book, source) = run_scripted(&config, "base", "0", vec![board("2", "3")]);
    match &book.events()[0].event {
        BookEvent::Reveal { board: b, reel_set, .. } => {
            assert_eq!(b, &vec![Symbol::new("2"), Symbol::new("3")]);
            assert_eq!(reel_set, "BR0");
        }
        other => panic!("expected REVEAL, got {other:?}"),
    }
    assert_eq!(source.labels, vec!["BR0".to_string()]);
}

// ── BONK ─────────────────────────────────────────────────────────────

#[test]
fn bonk_round_pays_plain_products() {
    let config = GameConfig::default_test();
    let mut boards = vec![board("Bat", "1")];
    boards.push(board("2", "3")); // 6
    boards.push(board("1", "1")); // 0
    boards.push(board("5", "2")); // 10
    boards.extend(repeat_board("1", "2", 7)); // 7 x 2

    let (book, source) = run_scripted(&config, "base", "0", boards);

    assert_eq!(book.base_game_wins(), 0.0);
    assert_eq!(book.free_game_wins(), 30.0);
    assert_eq!(book.payout_multiplier(), 30.0);
    assert_eq!(book.count_of("BONUS_TRIGGER"), 1);
    assert_eq!(book.count_of("BONUS_SPIN"), 10);
    assert_eq!(book.count_of("BONUS_COMPLETE"), 1);
    assert_eq!(spin_wins(&book), vec![6, 0, 10, 2, 2, 2, 2, 2, 2, 2]);
    assert!(source.labels[1..].iter().all(|l| l == "BON1"));
    assert!(source.boards.is_empty());
}

#[test]
fn weaker_special_inside_bonk_pays_and_extends() {
    let config = GameConfig::default_test();
    let mut boards = vec![board("Bat", "1"), board("Bat", "2")];
    boards.extend(repeat_board("1", "1", 11));

    let (book, source) = run_scripted(&config, "base", "0", boards);

    assert_eq!(book.count_of("BONUS_SPIN"), 12);
    assert_eq!(book.free_game_wins(), 100.0);
    match spins(&book)[0] {
        BookEvent::BonusSpin { extra_spins, spins_left, spin_win, .. } => {
            assert_eq!(*extra_spins, 2);
            assert_eq!(*spins_left, 11);
            assert_eq!(*spin_win, 100);
        }
        _ => unreachable!(),
    }
    assert!(source.boards.is_empty());
}

#[test]
fn trigger_event_carries_allotment_and_session() {
    let config = GameConfig::default_test();
    let mut boards = vec![board("Bat", "Golden Bat")];
    boards.extend(repeat_board("1", "1", 20));

    let (book, _) = run_scripted(&config, "base", "0", boards);
    match &book.events()[1].event {
        BookEvent::BonusTrigger { bonus_type, session_id, spins_received, reel_set, .. } => {
            assert_eq!(bonus_type.name(), "SUPER_BONK");
            assert_eq!(*spins_received, 20);
            assert_eq!(reel_set, "BON2");
            assert_eq!(session_id, "bonus_1_BON2");
        }
        other => panic!("expected BONUS_TRIGGER, got {other:?}"),
    }
    assert_eq!(book.count_of("BONUS_SPIN"), 20);

    let sessions: Vec<&str> = book
        .events()
        .iter()
        .filter_map(|e| match &e.event {
            BookEvent::BonusSpin { session_id, .. }
            | BookEvent::BonusComplete { session_id, .. } => Some(session_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(sessions.len(), 21);
    assert!(sessions.iter().all(|s| *s == "bonus_1_BON2"));
}

// ── SUPER_BONK sticky play ───────────────────────────────────────────

#[test]
fn super_bonk_sticky_arithmetic() {
    let config = GameConfig::default_test();
    let mut boards = vec![board("Golden Bat", "1")];
    boards.push(board("3", "5")); // locks reel 1 at 5: 5*3*2 = 30
    boards.push(board("2", "1")); // 5*2*2 = 20
    boards.push(board("1", "10")); // raises to 10: 10*1*2 = 20
    boards.push(board("1", "1")); // 10*1*2 = 20
    boards.extend(repeat_board("1", "1", 11)); // 11 x 20

    let (book, source) = run_scripted(&config, "base", "0", boards);

    assert_eq!(book.base_game_wins(), 0.0);
    assert_eq!(book.free_game_wins(), 310.0);
    assert_eq!(book.count_of("BONUS_SPIN"), 15);
    let wins = spin_wins(&book);
    assert_eq!(&wins[..4], &[30, 20, 20, 20]);

    assert_eq!(source.labels[1], "BON2");
    assert!(source.labels[2..].iter().all(|l| l == "BON2_run+BON2_stick"));

    let stickies: Vec<_> = spins(&book)
        .into_iter()
        .map(|e| match e {
            BookEvent::BonusSpin { sticky, .. } => sticky.map(|s| (s.reel, s.value)),
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(stickies[0], Some((1, 5)));
    assert_eq!(stickies[1], Some((1, 5)));
    assert_eq!(stickies[2], Some((1, 10)));
    assert!(stickies[3..].iter().all(|s| *s == Some((1, 10))));
}

// ── Upgrade ──────────────────────────────────────────────────────────

#[test]
fn bonk_upgrades_after_stronger_special_on_spin_three() {
    let config = GameConfig::default_test();
    let mut boards = vec![board("Bat", "1")];
    boards.push(board("2", "3")); // 6
    boards.push(board("2", "3")); // 6
    boards.push(board("Golden Bat", "2")); // 10*2 = 20, +5 spins, upgrade
    boards.push(board("3", "2")); // SUPER_BONK: locks reel 0 at 3, 3*2*2 = 12
    boards.extend(repeat_board("1", "1", 11)); // 3*1*2 = 6 each

    let (book, source) = run_scripted(&config, "base", "0", boards);

    assert_eq!(book.count_of("BONUS_SPIN"), 15);
    assert_eq!(book.free_game_wins(), 110.0);
    assert_eq!(&spin_wins(&book)[..5], &[6, 6, 20, 12, 6]);

    let kinds: Vec<(&str, u64, bool)> = spins(&book)
        .into_iter()
        .map(|e| match e {
            BookEvent::BonusSpin { bonus_type, multiplier, upgraded, .. } => {
                (bonus_type.name(), *multiplier, *upgraded)
            }
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(kinds[0], ("BONK", 1, false));
    assert_eq!(kinds[2], ("BONK", 1, true));
    assert!(kinds[3..].iter().all(|k| *k == ("SUPER_BONK", 2, false)));

    assert_eq!(&source.labels[1..4], &["BON1", "BON1", "BON1"]);
    assert_eq!(source.labels[4], "BON2");
    assert!(source.labels[5..].iter().all(|l| l == "BON2_stick+BON2_run"));

    match &book.events().last().map(|e| &e.event) {
        Some(BookEvent::FinalWin { .. }) => {}
        other => panic!("expected FINAL_WIN last, got {other:?}"),
    }
    let complete = book
        .events()
        .iter()
        .find_map(|e| match &e.event {
            BookEvent::BonusComplete {
                upgraded_from_bonk,
                final_multiplier,
                spins_completed,
                ..
            } => {
                Some((*upgraded_from_bonk, *final_multiplier, *spins_completed))
            }
            _ => None,
        })
        .expect("BONUS_COMPLETE");
    assert_eq!(complete, (true, 2, 15));
}

// ── Max win ──────────────────────────────────────────────────────────

#[test]
fn max_win_ceiling_stops_the_round() {
    let mut config = GameConfig::default_test();
    config.bonus.max_win_ceiling = 100;

    let mut boards = vec![board("Bat", "1")];
    boards.push(board("2", "3")); // 6
    boards.push(board("5", "25")); // 125, clamped to 94
    boards.extend(repeat_board("2", "2", 3));

    let (book, source) = run_scripted(&config, "base", "0", boards);

    assert_eq!(book.count_of("BONUS_SPIN"), 2);
    assert_eq!(book.count_of("MAXWIN"), 1);
    assert_eq!(spin_wins(&book), vec![6, 94]);
    assert_eq!(book.free_game_wins(), 100.0);
    assert_eq!(source.boards.len(), 3);

    let maxwin_at = book.events().iter().position(|e| e.event.type_name() == "MAXWIN");
    let last_spin_at = book.events().iter().rposition(|e| e.event.type_name() == "BONUS_SPIN");
    assert!(maxwin_at > last_spin_at);
}

#[test]
fn bonus_window_excludes_the_triggering_base_win() {
    let config = GameConfig::default_test();
    let mut boards = vec![board("Bat", "5")]; // base 5, triggers BONK
    boards.push(board("2", "3")); // 6
    boards.extend(repeat_board("1", "1", 9));

    let mut state = GameState::new(&config, "base", 7).expect("game state");
    let mut source = Scripted::new(boards);
    let book = state.run_sim_with(0, "0", &mut source).expect("simulation").clone();

    assert_eq!(book.base_game_wins(), 5.0);
    assert_eq!(book.free_game_wins(), 6.0);
    assert_eq!(book.payout_multiplier(), 11.0);
    assert_eq!(state.ledger.spin_win, 6.0);
    assert_eq!(state.ledger.running_bet_win, 11.0);
}

// ── Accept / repeat ──────────────────────────────────────────────────

#[test]
fn forced_freegame_repeats_until_a_trigger() {
    let config = GameConfig::default_test();
    let mut boards = vec![board("1", "2"), board("3", "3")];
    boards.push(board("Bat", "1"));
    boards.extend(repeat_board("1", "1", 10));

    let mut state = GameState::new(&config, "buy_bonk_spins", 7).expect("game state");
    let mut source = Scripted::new(boards);
    let book = state
        .run_sim_with(4, "buy_bonk_spins", &mut source)
        .expect("simulation")
        .clone();

    assert_eq!(book.id(), 5);
    assert_eq!(book.count_of("REVEAL"), 1);
    assert_eq!(book.count_of("BONUS_TRIGGER"), 1);
    assert_eq!(state.stats.repeats, 2);
    assert_eq!(state.library.len(), 1);
    assert_eq!(state.ledger.total_cumulative_wins, 0.0);

    let entries = state.force.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].search.get("kind").map(String::as_str), Some("BONK"));
    assert_eq!(entries[0].book_ids, vec![5]);
}

#[test]
fn win_criteria_repeats_until_exact_match() {
    let mut config = GameConfig::default_test();
    config.bet_modes[0].distributions[0].win_criteria = Some(0.0);

    let boards = vec![board("2", "3"), board("5", "5"), board("1", "1")];
    let mut state = GameState::new(&config, "base", 7).expect("game state");
    let mut source = Scripted::new(boards);
    let book = state.run_sim_with(0, "0", &mut source).expect("simulation").clone();

    assert_eq!(book.payout_multiplier(), 0.0);
    assert_eq!(state.stats.repeats, 2);
    // Rejected attempts never reach the batch counters.
    assert_eq!(state.ledger.total_cumulative_wins, 0.0);
}

#[test]
fn repeat_warnings_fire_on_every_multiple_of_the_threshold() {
    let mut config = GameConfig::default_test();
    config.bet_modes[0].distributions[0].win_criteria = Some(0.0);

    let mut boards = repeat_board("2", "3", 4);
    boards.push(board("1", "1"));
    let mut state = GameState::new(&config, "base", 7)
        .expect("game state")
        .with_repeat_warning(2);
    let mut source = Scripted::new(boards);
    let book = state.run_sim_with(0, "0", &mut source).expect("simulation").clone();

    assert_eq!(book.payout_multiplier(), 0.0);
    assert_eq!(state.stats.repeats, 4);
    // Five attempts in total: warnings at the second and fourth.
    assert_eq!(state.stats.repeat_warnings, 2);
}

#[test]
fn forced_wincap_repeats_until_cap_and_clamps_payout() {
    let mut config = GameConfig::default_test();
    config.bet_modes[0].win_cap = 5.0;
    config.bet_modes[0].distributions[0].force_wincap = true;

    let boards = vec![board("1", "2"), board("2", "3")];
    let (book, source) = run_scripted(&config, "base", "0", boards);

    assert_eq!(book.payout_multiplier(), 5.0);
    assert_eq!(book.base_game_wins(), 5.0);
    assert!(source.boards.is_empty());
}

#[test]
fn unknown_criteria_is_an_error() {
    let config = GameConfig::default_test();
    let mut state = GameState::new(&config, "base", 7).expect("game state");
    let mut source = Scripted::new(vec![board("1", "1")]);
    let err = state.run_sim_with(0, "nope", &mut source).unwrap_err();
    assert!(matches!(err, SimError::UnknownCriteria { .. }));
}

#[test]
fn unknown_bet_mode_is_an_error() {
    let config = GameConfig::default_test();
    assert!(matches!(
        GameState::new(&config, "turbo", 7),
        Err(SimError::UnknownBetMode { .. })
    ));
}

#[test]
fn seeded_runs_are_reproducible() {
    let config = GameConfig::default_test();
    let mut a = GameState::new(&config, "base", 99).expect("game state");
    let mut b = GameState::new(&config, "base", 99).expect("game state");
    for sim in 0..50 {
        let ja = a.run_sim(sim, "0").expect("run a").to_json().expect("json a");
        let jb = b.run_sim(sim, "0").expect("run b").to_json().expect("json b");
        assert_eq!(ja, jb, "sim {sim} diverged");
    }
}
