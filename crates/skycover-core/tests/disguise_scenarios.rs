//! End-to-end scenarios over the recording environment.

use core::time::Duration;

use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use skycover_core::effects::{EffectCall, FailurePlan};
use skycover_core::exit::NavigationOutcome;
use skycover_core::input::{DoubleClickInput, InputEvent, KeyCode, KeyInput};
use skycover_core::key_sequence::{KeySequenceBuffer, SecretCode};
use skycover_core::panel::{LinkChoice, LinkResolution, PanelTab, Section};
use skycover_core::{
    DisguiseConfig, DisguiseSession, DisguiseState, RecordingEnvironment, StorageArea, Transition,
};

fn session(env: RecordingEnvironment) -> DisguiseSession<RecordingEnvironment> {
    let mut rng = StdRng::seed_from_u64(42);
    DisguiseSession::new(DisguiseConfig::default(), env, &mut rng).expect("session")
}

fn press(s: &mut DisguiseSession<RecordingEnvironment>, c: char) -> Transition {
    s.handle(
        &InputEvent::Key(KeyInput::down(KeyCode::Char(c))),
        Duration::ZERO,
    )
}

#[test]
fn weather_buffer_fires_once() {
    let mut buf = KeySequenceBuffer::new(SecretCode::new("weather"));
    let fired = ["w", "e", "a", "t", "h", "e", "r"]
        .iter()
        .filter(|k| buf.push(k))
        .count();
    assert_eq!(fired, 1);
}

#[test]
fn weathex_buffer_never_fires() {
    let mut buf = KeySequenceBuffer::new(SecretCode::new("weather"));
    let fired = ["w", "e", "a", "t", "h", "e", "x"]
        .iter()
        .filter(|k| buf.push(k))
        .count();
    assert_eq!(fired, 0);
}

#[test]
fn double_click_on_untagged_element_never_reveals() {
    let mut s = session(RecordingEnvironment::default());
    for class_name in ["", "card", "trigger", "trigger-words", "Trigger-Word"] {
        let t = s.handle(
            &InputEvent::DoubleClick(DoubleClickInput {
                class_name: class_name.into(),
            }),
            Duration::ZERO,
        );
        assert_eq!(t, Transition::None, "class {class_name:?}");
    }
    assert_eq!(s.state(), DisguiseState::Weather);
}

#[test]
fn quick_exit_with_throwing_storage_still_navigates_once() {
    let env = RecordingEnvironment::default()
        .with_item(StorageArea::Local, "hasVisitedBefore", "true")
        .with_failures(FailurePlan::storage_always_throws());
    let mut s = session(env);
    let report = s.quick_exit().expect("exit");
    assert_eq!(report.navigation, NavigationOutcome::Replaced);
    assert_eq!(s.env().navigation_count(), 1);
    let navigations = s
        .env()
        .calls()
        .iter()
        .filter(|c| c.is_navigation())
        .count();
    assert_eq!(navigations, 1);
}

#[test]
fn storage_is_empty_when_navigation_is_issued() {
    // Bulk clear() throws; item-by-item removal still empties storage.
    let env = RecordingEnvironment::default()
        .with_item(StorageArea::Local, "a", "1")
        .with_item(StorageArea::Local, "b", "2")
        .with_item(StorageArea::Session, "c", "3")
        .with_cookie("sid", "x")
        .with_failures(FailurePlan {
            storage_clear: true,
            ..FailurePlan::default()
        });
    let mut s = session(env);
    s.reveal();
    s.quick_exit();
    let seen = s.env().navigation_snapshot().expect("navigated");
    assert_eq!(seen.local_items, 0);
    assert_eq!(seen.session_items, 0);
    assert_eq!(seen.cookies, 0);
}

#[test]
fn back_button_lands_on_base_path_after_exit() {
    let mut s = session(RecordingEnvironment::new("/?city=Seattle"));
    s.reveal();
    s.quick_exit();
    let history = s.env().history();
    let (last, earlier) = history.split_last().expect("history");
    assert!(last.starts_with("https://"));
    assert_eq!(earlier.last().map(String::as_str), Some("/"));
    assert!(earlier.iter().skip(1).all(|entry| entry == "/"));
}

#[test]
fn full_visit_reveal_browse_close() {
    let env = RecordingEnvironment::new("/?q=forecast").with_cookie("_ga", "1");
    let mut s = session(env);

    for c in "weather".chars() {
        press(&mut s, c);
    }
    assert!(s.is_revealed());

    s.panel_mut().select_tab(PanelTab::Emergency);
    s.panel_mut().toggle_section(Section::Phone);
    s.panel_mut().request_link("https://www.thehotline.org/");
    assert_eq!(
        s.resolve_link(LinkChoice::Continue),
        LinkResolution::Open("https://www.thehotline.org/".to_string())
    );
    s.mark_copied(Duration::from_secs(1));
    let snap = s.snapshot(Duration::from_secs(2));
    let panel = snap.panel.expect("panel shown");
    assert_eq!(panel.tab, PanelTab::Emergency);
    assert!(panel.copied);

    s.env_mut().clear_calls();
    assert!(s.close().expect("closed").all_succeeded());
    assert_eq!(s.env().title(), "Weather Forecast");
    assert_eq!(s.env().location(), "/");
    assert_eq!(s.env().cookie_count(), 0);
    assert!(
        s.env()
            .calls()
            .contains(&EffectCall::ReplaceHistory("/".to_string()))
    );
    assert!(s.snapshot(Duration::from_secs(2)).panel.is_none());
}

#[test]
fn custom_code_and_marker_from_json() {
    let config = DisguiseConfig::from_json_str(
        r#"{"secret_code":"Sunny","trigger_marker":"help-word","exit_targets":["https://weather.gov"]}"#,
    )
    .expect("config");
    let mut rng = StdRng::seed_from_u64(0);
    let mut s =
        DisguiseSession::new(config, RecordingEnvironment::default(), &mut rng).expect("session");
    assert_eq!(s.exit_target().url(), "https://weather.gov");

    let t = s.handle(
        &InputEvent::DoubleClick(DoubleClickInput {
            class_name: "help-word".into(),
        }),
        Duration::ZERO,
    );
    assert_eq!(t, Transition::Revealed);
    s.hide();

    let last = "sunny"
        .chars()
        .map(|c| press(&mut s, c))
        .last()
        .expect("typed");
    assert_eq!(last, Transition::Revealed);
}
