//! Typeahead behavior as a user experiences it through a routed menu.
//!
//! The session runs on a `TickClock` so the idle timeout is exercised
//! without sleeping.

use std::time::{Duration, Instant};

use keyfence::prelude::*;
use keyfence::{BackspaceOutcome, TickClock, TypeaheadSearch, rank_matches, select_next, select_previous};

const MENU: &str = "menu.materials";

fn labels() -> Vec<String> {
    ["Wall", "Wood", "5 wood (debris)", "Granite", "Steel bars (metal)"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn routed(clock: &TickClock) -> (EventRouter, Session<RecordingSpeech>) {
    let mut session = Session::with_speech(RecordingSpeech::new(), KeyfenceConfig::default())
        .with_clock(clock.clone());
    session.register(ListMenu::new(MENU, "Materials", labels())).unwrap();
    let mut router = EventRouter::builder()
        .guard(Guard::surface("materials", Tier::DomainSurface, MENU))
        .build()
        .unwrap();
    router.open(&mut session, &SurfaceId::new(MENU)).unwrap();
    (router, session)
}

fn type_char(router: &mut EventRouter, session: &mut Session<RecordingSpeech>, ch: char) {
    assert!(router.dispatch(session, &mut KeyEvent::char(ch)));
}

fn selected(session: &Session<RecordingSpeech>) -> Option<&str> {
    session
        .surface::<ListMenu>(&SurfaceId::new(MENU))
        .and_then(ListMenu::selected_label)
}

fn buffer(session: &Session<RecordingSpeech>) -> String {
    session
        .surface::<ListMenu>(&SurfaceId::new(MENU))
        .map(|m| m.search().buffer().to_owned())
        .unwrap_or_default()
}

#[test]
fn leading_word_matches_rank_first() {
    let ranked = rank_matches("w", &["Wall", "Wood", "5 wood (debris)"]);
    assert_eq!(ranked, vec![0, 1, 2]);

    let ranked = rank_matches("m", &labels());
    assert_eq!(ranked, vec![4], "annotation-only match still found");
}

#[test]
fn typing_through_the_router_selects_and_announces() {
    let clock = TickClock::at_100ms();
    let (mut router, mut session) = routed(&clock);

    type_char(&mut router, &mut session, 'w');
    assert_eq!(selected(&session), Some("Wall"));
    assert_eq!(session.speech().last_text(), Some("Wall, 3 matches"));

    clock.tick();
    type_char(&mut router, &mut session, 'o');
    assert_eq!(selected(&session), Some("Wood"));
    assert_eq!(session.speech().last_text(), Some("Wood, 2 matches"));

    router.dispatch(&mut session, &mut KeyEvent::plain(KeyCode::Down));
    assert_eq!(selected(&session), Some("5 wood (debris)"));
    assert_eq!(session.speech().last_text(), Some("5 wood (debris), match 2 of 2"));
}

#[test]
fn failed_sequence_clears_and_is_reported_once() {
    let clock = TickClock::at_100ms();
    let (mut router, mut session) = routed(&clock);

    type_char(&mut router, &mut session, 'g');
    type_char(&mut router, &mut session, 'x');
    assert_eq!(buffer(&session), "");
    assert_eq!(session.speech().last_text(), Some("No matches for gx."));
    assert_eq!(selected(&session), Some("Granite"));

    // The next character starts over instead of extending "gx".
    type_char(&mut router, &mut session, 's');
    assert_eq!(buffer(&session), "s");
    assert_eq!(selected(&session), Some("Steel bars (metal)"));
}

#[test]
fn idle_timeout_restarts_the_buffer() {
    let clock = TickClock::at_100ms();
    let (mut router, mut session) = routed(&clock);

    type_char(&mut router, &mut session, 'w');
    clock.tick_n(30);
    type_char(&mut router, &mut session, 'o');
    assert_eq!(buffer(&session), "wo", "exactly the timeout is not expiry");

    clock.advance(Duration::from_millis(3_001));
    type_char(&mut router, &mut session, 'g');
    assert_eq!(buffer(&session), "g");
    assert_eq!(selected(&session), Some("Granite"));
}

#[test]
fn backspace_reranks_then_clears() {
    let clock = TickClock::at_100ms();
    let (mut router, mut session) = routed(&clock);

    type_char(&mut router, &mut session, 'w');
    type_char(&mut router, &mut session, 'o');
    router.dispatch(&mut session, &mut KeyEvent::plain(KeyCode::Backspace));
    assert_eq!(buffer(&session), "w");
    assert_eq!(selected(&session), Some("Wall"));

    router.dispatch(&mut session, &mut KeyEvent::plain(KeyCode::Backspace));
    assert_eq!(session.speech().last_text(), Some("Search cleared"));

    // Backspace on an empty buffer is ignored by the menu and absorbed.
    assert!(router.dispatch(&mut session, &mut KeyEvent::plain(KeyCode::Backspace)));
    assert_eq!(
        router.last_trace().and_then(|t| t.guard.as_deref()),
        Some("catch_all")
    );
}

#[test]
fn cyclic_match_navigation() {
    let names = ["b", "c", "ax", "d", "e", "ay", "f", "g", "h", "az"];
    let mut search = TypeaheadSearch::new();
    search.process_char('a', &names, Instant::now());
    assert_eq!(search.match_indices(), &[2, 5, 9]);

    assert_eq!(search.next_match(9), Some(2));
    assert_eq!(search.previous_match(9), Some(5));
    // From a non-match, jump to the nearest match in that direction.
    assert_eq!(search.next_match(3), Some(5));
    assert_eq!(search.previous_match(1), Some(9));
}

#[test]
fn clear_and_empty_backspace_are_idempotent() {
    let mut search = TypeaheadSearch::new();
    let now = Instant::now();
    search.process_char('w', &labels(), now);
    search.clear();
    assert!(!search.has_active_search());
    assert_eq!(search.process_backspace(&labels(), now), BackspaceOutcome::Unchanged);
    assert!(!search.process_backspace(&labels(), now).is_changed());
}

#[test]
fn list_navigation_does_not_wrap() {
    assert_eq!(select_next(4, 5), 4);
    assert_eq!(select_previous(0, 5), 0);
    assert_eq!(select_next(0, 0), 0);
}
