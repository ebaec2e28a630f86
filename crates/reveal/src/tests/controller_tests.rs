use super::*;
use crate::{contact::MessagingLinkBuilder, decline::DISCOURAGEMENTS};
use chrono::Utc;
use shared::domain::{ProposalContent, ProposalId, Theme};

fn record() -> ProposalRecord {
    ProposalRecord::new(
        ProposalId::shared(),
        ProposalContent {
            sender_name: "Ada".into(),
            recipient_name: "Grace".into(),
            contact_handle: "+15551234567".into(),
            message: "Hi".into(),
            theme: Theme::Romantic,
        },
        Utc::now(),
    )
}

fn start() -> (RevealController, mpsc::UnboundedReceiver<RevealEffect>) {
    RevealController::start_with_policy(
        record(),
        RevealTimings::default(),
        Arc::new(MessagingLinkBuilder::default()),
        EvasionPolicy::with_seed(7),
    )
}

async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

async fn reach_question(controller: &RevealController) {
    advance_ms(2_500 + 3_500 + 1).await;
    assert_eq!(controller.stage(), Stage::Question);
}

#[tokio::test(start_paused = true)]
async fn intro_and_message_auto_advance_on_their_timers() {
    let (controller, _effects) = start();
    assert_eq!(controller.stage(), Stage::Intro);

    advance_ms(2_499).await;
    assert_eq!(controller.stage(), Stage::Intro);
    advance_ms(2).await;
    assert_eq!(controller.stage(), Stage::Message);

    advance_ms(3_498).await;
    assert_eq!(controller.stage(), Stage::Message);
    advance_ms(2).await;
    assert_eq!(controller.stage(), Stage::Question);
}

#[tokio::test(start_paused = true)]
async fn question_waits_for_input_indefinitely() {
    let (controller, _effects) = start();
    reach_question(&controller).await;
    advance_ms(60_000).await;
    assert_eq!(controller.stage(), Stage::Question);
}

#[tokio::test(start_paused = true)]
async fn accept_celebrates_then_reaches_contact() {
    let (controller, mut effects) = start();
    reach_question(&controller).await;

    assert!(controller.accept());
    assert_eq!(controller.stage(), Stage::Celebration);
    assert_eq!(effects.try_recv().expect("effect"), RevealEffect::Celebrate);
    assert!(controller.contact_action().is_none());

    advance_ms(2_999).await;
    assert_eq!(controller.stage(), Stage::Celebration);
    advance_ms(2).await;
    assert_eq!(controller.stage(), Stage::Contact);

    let link = controller.contact_action().expect("contact link");
    assert!(link.contains("15551234567"));
    assert!(link.contains("Ada"));

    advance_ms(60_000).await;
    assert_eq!(controller.stage(), Stage::Contact);
}

#[tokio::test(start_paused = true)]
async fn decisions_before_question_are_ignored() {
    let (controller, mut effects) = start();
    assert!(!controller.accept());
    assert!(controller.decline().is_none());
    assert!(!controller.hover_decline());
    assert_eq!(controller.snapshot().reject_count, 0);
    assert!(effects.try_recv().is_err());

    advance_ms(2_501).await;
    assert!(!controller.accept());
    assert_eq!(controller.stage(), Stage::Message);
}

#[tokio::test(start_paused = true)]
async fn declines_rotate_discouragements_and_stay_in_question() {
    let (controller, mut effects) = start();
    reach_question(&controller).await;

    let n = DISCOURAGEMENTS.len();
    for k in 1..=(2 * n + 3) {
        let shown = controller.decline().expect("decline accepted");
        assert_eq!(shown, DISCOURAGEMENTS[(k - 1) % n], "decline #{k}");
        assert_eq!(effects.try_recv().expect("effect"), RevealEffect::Discourage(shown));

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Question);
        assert_eq!(snapshot.reject_count as usize, k);
        assert_eq!(snapshot.discouragement, Some(shown));
        assert!(snapshot.reject_offset.within_bounds());
    }
}

#[tokio::test(start_paused = true)]
async fn hover_relocates_without_counting() {
    let (controller, mut effects) = start();
    reach_question(&controller).await;

    let mut offsets = Vec::new();
    for _ in 0..5 {
        assert!(controller.hover_decline());
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.reject_count, 0);
        assert!(snapshot.discouragement.is_none());
        assert!(snapshot.reject_offset.within_bounds());
        offsets.push(snapshot.reject_offset);
    }
    assert!(offsets.windows(2).any(|pair| pair[0] != pair[1]));
    assert!(effects.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn accepting_clears_discouragement() {
    let (controller, _effects) = start();
    reach_question(&controller).await;
    controller.decline().expect("decline");
    assert!(controller.accept());

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.stage, Stage::Celebration);
    assert_eq!(snapshot.reject_count, 1);
    assert!(snapshot.discouragement.is_none());
}

#[tokio::test(start_paused = true)]
async fn teardown_before_timers_prevents_any_transition() {
    let (controller, _effects) = start();
    let mut updates = controller.subscribe();
    advance_ms(1_000).await;

    controller.teardown();
    assert!(controller.is_closed());
    assert!(updates.has_changed().expect("sender alive"));
    let _ = updates.borrow_and_update();

    advance_ms(2_500 + 3_500 + 3_000 + 10_000).await;
    assert_eq!(controller.stage(), Stage::Intro);
    assert!(!updates.has_changed().expect("sender alive"));
}

#[tokio::test(start_paused = true)]
async fn teardown_during_celebration_never_reaches_contact() {
    let (controller, _effects) = start();
    reach_question(&controller).await;
    assert!(controller.accept());

    controller.teardown();
    advance_ms(10_000).await;
    assert_eq!(controller.stage(), Stage::Celebration);
    assert!(!controller.accept());
    assert!(controller.contact_action().is_none());
}

#[tokio::test(start_paused = true)]
async fn dropping_controller_cancels_timers() {
    let (controller, _effects) = start();
    let updates = controller.subscribe();
    drop(controller);

    advance_ms(20_000).await;
    let last = updates.borrow().clone();
    assert!(last.closed);
    assert_eq!(last.stage, Stage::Intro);
}

#[tokio::test(start_paused = true)]
async fn subscribers_observe_every_stage_in_order() {
    let (controller, _effects) = start();
    let mut updates = controller.subscribe();
    let mut seen = vec![updates.borrow_and_update().stage];

    let watcher = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let stage = updates.borrow_and_update().stage;
            if seen.last() != Some(&stage) {
                seen.push(stage);
            }
            if stage == Stage::Contact {
                break;
            }
        }
        seen
    });

    reach_question(&controller).await;
    controller.accept();
    advance_ms(3_001).await;

    let seen = watcher.await.expect("watcher");
    assert_eq!(
        seen,
        vec![
            Stage::Intro,
            Stage::Message,
            Stage::Question,
            Stage::Celebration,
            Stage::Contact
        ]
    );
}

#[test]
fn seeded_policies_are_reproducible() {
    let mut a = EvasionPolicy::with_seed(42);
    let mut b = EvasionPolicy::with_seed(42);
    for _ in 0..16 {
        let offset = a.next_offset();
        assert_eq!(offset, b.next_offset());
        assert!(offset.within_bounds());
    }
}

#[test]
fn default_timings_match_design_values() {
    let timings = RevealTimings::default();
    assert_eq!(timings.delay_for(Stage::Intro), Some(Duration::from_millis(2_500)));
    assert_eq!(timings.delay_for(Stage::Message), Some(Duration::from_millis(3_500)));
    assert_eq!(timings.delay_for(Stage::Question), None);
    assert_eq!(
        timings.delay_for(Stage::Celebration),
        Some(Duration::from_secs(3))
    );
    assert_eq!(timings.scaled(0.5).intro, Duration::from_millis(1_250));
}

#[test]
fn scaling_never_panics_on_out_of_range_factors() {
    let timings = RevealTimings::default();
    let huge = timings.scaled(1e30);
    assert_eq!(huge.intro, Duration::MAX);
    assert_eq!(huge.message, Duration::MAX);
    assert_eq!(huge.celebration, Duration::MAX);

    assert_eq!(timings.scaled(f32::MAX), huge);
    assert_eq!(timings.scaled(-1.0), timings);
    assert_eq!(timings.scaled(f32::NAN), timings);
    assert_eq!(timings.scaled(f32::INFINITY), timings);
    assert_eq!(timings.scaled(0.0).intro, Duration::ZERO);
}

#[test]
fn decline_count_saturates() {
    let mut session = Session {
        stage: Stage::Question,
        reject_offset: Offset::default(),
        reject_count: u32::MAX,
        discouragement: None,
        closed: false,
        pending: None,
        evasion: EvasionPolicy::with_seed(3),
    };
    let message = session.record_decline();
    assert_eq!(session.reject_count, u32::MAX);
    assert_eq!(session.discouragement, Some(message));
    assert!(session.reject_offset.within_bounds());
}
