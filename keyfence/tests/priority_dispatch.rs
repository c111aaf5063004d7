//! End-to-end routing through the full tier stack.
//!
//! One host wires every reference surface into a single guard table, the
//! way an application would, and drives it with key events:
//!
//! 1. Text capture owns typed keys and swallows navigation
//! 2. A blocking dialog swallows hotkeys and blocks lower opens
//! 3. The catch-all absorbs what an open surface ignores
//! 4. Ambient hotkeys respect host state and surface activity
//! 5. Handler failures are spoken and never break later dispatch

use keyfence::prelude::*;
use keyfence::{DispatchOutcome, HostState, KeyfenceError};

const TEXT: &str = "text.name";
const PROMPT: &str = "prompt.quit";
const TREE: &str = "tree.stockpiles";
const MENU: &str = "menu.materials";

// ═══════════════════════════════════════════════════════════════════════════
// Host fixture
// ═══════════════════════════════════════════════════════════════════════════

fn id(raw: &str) -> SurfaceId {
    SurfaceId::new(raw)
}

fn host() -> (EventRouter, Session<RecordingSpeech>) {
    let mut session = Session::with_speech(RecordingSpeech::new(), KeyfenceConfig::default());
    session.register(TextEntry::new(TEXT, "Name")).unwrap();
    session
        .register(ConfirmPrompt::yes_no(PROMPT, "Quit", "Abandon this fortress?"))
        .unwrap();
    session
        .register(TreeMenu::new(
            TREE,
            "Stockpiles",
            vec![
                TreeItem::new("Stone", 0),
                TreeItem::new("Granite", 1),
                TreeItem::new("Wood", 0),
            ],
        ))
        .unwrap();
    session
        .register(ListMenu::new(
            MENU,
            "Materials",
            ["Wall", "Wood", "5 wood (debris)", "Granite"]
                .into_iter()
                .map(String::from)
                .collect(),
        ))
        .unwrap();

    let router = EventRouter::builder()
        .guard(Guard::surface("name_entry", Tier::TextCapture, TEXT))
        .guard(Guard::surface("quit_prompt", Tier::DialogBlocking, PROMPT))
        .guard(Guard::surface("stockpile_tree", Tier::WorldOverlay, TREE).excluding(PROMPT))
        .guard(Guard::surface("materials", Tier::DomainSurface, MENU))
        .guard(Guard::hotkey(
            "open_materials",
            "ctrl+m".parse().unwrap(),
            AmbientAction::Open(id(MENU)),
        ))
        .guard(Guard::hotkey(
            "toggle_pause",
            "ctrl+p".parse().unwrap(),
            AmbientAction::ToggleMode("Pause".to_owned()),
        ))
        .guard(Guard::hotkey(
            "report",
            "F1".parse().unwrap(),
            AmbientAction::invoke(|ctx| {
                ctx.announce("All quiet");
                Ok(())
            }),
        ))
        .guard(Guard::hotkey(
            "broken",
            "F2".parse().unwrap(),
            AmbientAction::invoke(|_| Err(KeyfenceError::UnknownSurface { id: "gone".to_owned() })),
        ))
        .build()
        .unwrap();

    (router, session)
}

fn press(router: &mut EventRouter, session: &mut Session<RecordingSpeech>, code: KeyCode) -> bool {
    router.dispatch(session, &mut KeyEvent::plain(code))
}

fn chord(router: &mut EventRouter, session: &mut Session<RecordingSpeech>, text: &str) -> bool {
    let key: keyfence::KeyChord = text.parse().unwrap();
    router.dispatch(session, &mut KeyEvent::from(key))
}

fn type_text(router: &mut EventRouter, session: &mut Session<RecordingSpeech>, text: &str) {
    for ch in text.chars() {
        assert!(router.dispatch(session, &mut KeyEvent::char(ch)));
    }
}

fn menu(session: &Session<RecordingSpeech>) -> &ListMenu {
    session.surface::<ListMenu>(&id(MENU)).unwrap()
}

fn last_guard(router: &EventRouter) -> Option<&str> {
    router.last_trace().and_then(|t| t.guard.as_deref())
}

fn last_outcome(router: &EventRouter) -> Option<DispatchOutcome> {
    router.last_trace().map(|t| t.outcome)
}

// ═══════════════════════════════════════════════════════════════════════════
// 1. Text capture
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn text_capture_swallows_arrows_and_takes_typed_keys() {
    let (mut router, mut session) = host();
    router.open(&mut session, &id(MENU)).unwrap();
    router.open(&mut session, &id(TEXT)).unwrap();
    assert_eq!(router.active_surface(&session), Some(&id(TEXT)));

    assert!(press(&mut router, &mut session, KeyCode::Down));
    assert_eq!(last_guard(&router), Some("name_entry"));
    assert_eq!(last_outcome(&router), Some(DispatchOutcome::Absorbed));
    assert_eq!(menu(&session).selected(), Some(0));

    type_text(&mut router, &mut session, "Kib");
    assert!(!menu(&session).search().has_active_search());
    assert_eq!(
        session.surface::<TextEntry>(&id(TEXT)).unwrap().text(),
        "Kib"
    );

    assert!(press(&mut router, &mut session, KeyCode::Enter));
    assert_eq!(
        session.next_outcome(),
        Some(SurfaceOutcome::TextCommitted {
            surface: id(TEXT),
            text: "Kib".to_owned(),
        })
    );
    assert!(!session.is_active(&id(TEXT)));

    // With the field gone the menu owns arrows again.
    assert!(press(&mut router, &mut session, KeyCode::Down));
    assert_eq!(last_guard(&router), Some("materials"));
    assert_eq!(menu(&session).selected(), Some(1));
}

#[test]
fn text_capture_forwards_delete_keys() {
    let (mut router, mut session) = host();
    router.open(&mut session, &id(TEXT)).unwrap();
    type_text(&mut router, &mut session, "Urist");
    press(&mut router, &mut session, KeyCode::Backspace);
    press(&mut router, &mut session, KeyCode::Home);
    assert_eq!(last_outcome(&router), Some(DispatchOutcome::Absorbed));
    press(&mut router, &mut session, KeyCode::Esc);
    assert_eq!(session.surface::<TextEntry>(&id(TEXT)).unwrap().text(), "");
    assert!(session.speech().contains("Changes discarded"));
}

#[test]
fn widened_text_filter_moves_the_caret() {
    use keyfence::{KeyAction, KeyFilter};

    let mut session = Session::with_speech(RecordingSpeech::new(), KeyfenceConfig::default());
    session
        .register(TextEntry::new(TEXT, "Name").with_text("Urist"))
        .unwrap();
    let filter = KeyFilter::only(
        [
            KeyAction::Confirm,
            KeyAction::Cancel,
            KeyAction::DeleteBack,
            KeyAction::DeleteForward,
            KeyAction::Left,
            KeyAction::Right,
            KeyAction::Home,
            KeyAction::End,
        ],
        true,
    );
    let mut router = EventRouter::builder()
        .guard(Guard::surface("name_entry", Tier::TextCapture, TEXT).with_filter(filter))
        .build()
        .unwrap();
    router.open(&mut session, &id(TEXT)).unwrap();

    assert!(press(&mut router, &mut session, KeyCode::Home));
    assert_eq!(last_outcome(&router), Some(DispatchOutcome::Handled));
    assert!(press(&mut router, &mut session, KeyCode::Right));
    assert_eq!(session.speech().last_text(), Some("r"));
    assert_eq!(session.surface::<TextEntry>(&id(TEXT)).unwrap().caret(), 1);

    // Keys outside the widened filter are still absorbed.
    assert!(press(&mut router, &mut session, KeyCode::Down));
    assert_eq!(last_outcome(&router), Some(DispatchOutcome::Absorbed));
}

// ═══════════════════════════════════════════════════════════════════════════
// 2. Dialog blocking
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn dialog_swallows_hotkeys_and_letters() {
    let (mut router, mut session) = host();
    router.open(&mut session, &id(PROMPT)).unwrap();

    assert!(chord(&mut router, &mut session, "ctrl+m"));
    assert_eq!(last_guard(&router), Some("quit_prompt"));
    assert_eq!(last_outcome(&router), Some(DispatchOutcome::Absorbed));
    assert!(!session.is_active(&id(MENU)));

    assert!(press(&mut router, &mut session, KeyCode::Char('y')));
    assert_eq!(session.pending_outcomes(), 0);

    press(&mut router, &mut session, KeyCode::Right);
    press(&mut router, &mut session, KeyCode::Enter);
    assert_eq!(
        session.next_outcome(),
        Some(SurfaceOutcome::Confirmed {
            surface: id(PROMPT),
            option: 1,
            label: "No".to_owned(),
        })
    );
    assert!(!session.any_active());

    assert!(chord(&mut router, &mut session, "ctrl+m"));
    assert!(session.is_active(&id(MENU)));
}

#[test]
fn dialog_blocks_lower_tier_opens() {
    let (mut router, mut session) = host();
    router.open(&mut session, &id(PROMPT)).unwrap();
    let err = router.open(&mut session, &id(MENU)).unwrap_err();
    assert!(matches!(err, KeyfenceError::BlockedByHigherPriority { .. }));
    assert!(err.is_expected());
    assert!(!session.is_active(&id(MENU)));

    // Higher tiers still open over it.
    router.open(&mut session, &id(TEXT)).unwrap();
    assert_eq!(router.active_surface(&session), Some(&id(TEXT)));
}

// ═══════════════════════════════════════════════════════════════════════════
// 3. Catch-all
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn catch_all_absorbs_keys_the_menu_ignores() {
    let (mut router, mut session) = host();
    router.open(&mut session, &id(MENU)).unwrap();

    assert!(press(&mut router, &mut session, KeyCode::F(5)));
    assert_eq!(last_guard(&router), Some("catch_all"));
    assert_eq!(last_outcome(&router), Some(DispatchOutcome::Absorbed));

    // Ambient hotkeys stay dead while the menu is open.
    assert!(chord(&mut router, &mut session, "ctrl+p"));
    assert!(!session.mode_on("Pause"));
    assert!(press(&mut router, &mut session, KeyCode::F(1)));
    assert!(!session.speech().contains("All quiet"));
}

#[test]
fn nothing_open_leaves_keys_to_the_host() {
    let (mut router, mut session) = host();
    assert!(!press(&mut router, &mut session, KeyCode::Down));
    assert!(!press(&mut router, &mut session, KeyCode::Char('w')));
    assert_eq!(last_outcome(&router), Some(DispatchOutcome::Unhandled));
    assert_eq!(last_guard(&router), None);
}

#[test]
fn tree_overlay_sits_above_menu_until_closed() {
    let (mut router, mut session) = host();
    router.open(&mut session, &id(MENU)).unwrap();
    router.open(&mut session, &id(TREE)).unwrap();

    press(&mut router, &mut session, KeyCode::Right);
    assert_eq!(last_guard(&router), Some("stockpile_tree"));
    assert!(session.speech().contains("Stone, expanded"));
    assert_eq!(menu(&session).selected(), Some(0));

    press(&mut router, &mut session, KeyCode::Esc);
    assert!(!session.is_active(&id(TREE)));
    assert_eq!(session.levels().last_depth(TREE), None);

    press(&mut router, &mut session, KeyCode::Down);
    assert_eq!(last_guard(&router), Some("materials"));
}

// ═══════════════════════════════════════════════════════════════════════════
// 4. Ambient hotkeys
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn ambient_hotkeys_need_an_interactive_host() {
    let (mut router, mut session) = host();
    session.set_host_state(HostState::Menu);
    assert!(!chord(&mut router, &mut session, "ctrl+m"));
    assert!(!session.is_active(&id(MENU)));

    session.set_host_state(HostState::Interactive);
    assert!(chord(&mut router, &mut session, "ctrl+m"));
    assert_eq!(last_guard(&router), Some("open_materials"));
    assert!(session.speech().contains("Materials"));
}

#[test]
fn toggle_mode_persists_and_announces() {
    let (mut router, mut session) = host();
    assert!(chord(&mut router, &mut session, "ctrl+p"));
    assert!(session.mode_on("Pause"));
    assert_eq!(session.speech().last_text(), Some("Pause on"));
    chord(&mut router, &mut session, "ctrl+p");
    assert!(!session.mode_on("Pause"));
    assert_eq!(session.speech().last_text(), Some("Pause off"));
}

// ═══════════════════════════════════════════════════════════════════════════
// 5. Failure semantics
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn expected_failure_is_spoken_and_consumed() {
    let (mut router, mut session) = host();
    router.open(&mut session, &id(MENU)).unwrap();
    assert!(press(&mut router, &mut session, KeyCode::Char('q')));
    assert_eq!(last_outcome(&router), Some(DispatchOutcome::Handled));
    let current = session.speech().current().unwrap();
    assert_eq!(current.text, "No matches for q.");
    assert_eq!(current.priority, SpeechPriority::High);
}

#[test]
fn faulting_hotkey_does_not_break_later_dispatch() {
    let (mut router, mut session) = host();
    assert!(press(&mut router, &mut session, KeyCode::F(2)));
    assert_eq!(last_outcome(&router), Some(DispatchOutcome::Faulted));
    let current = session.speech().current().unwrap();
    assert_eq!(current.text, "Action failed");
    assert_eq!(current.priority, SpeechPriority::High);

    assert!(press(&mut router, &mut session, KeyCode::F(1)));
    assert_eq!(last_outcome(&router), Some(DispatchOutcome::Handled));
    assert!(session.speech().contains("All quiet"));
}
