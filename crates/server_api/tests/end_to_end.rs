use std::{sync::Arc, time::Duration};

use chrono::Utc;
use reveal::{MessagingLinkBuilder, RevealController, RevealEffect, RevealTimings, Stage};
use server_api::resolve::{resolve, ResolutionSource};
use shared::domain::{ProposalContent, ProposalId, ProposalRecord, Theme};
use storage::Storage;

fn ada() -> ProposalRecord {
    ProposalRecord::new(
        ProposalId::generate(),
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

#[tokio::test(start_paused = true)]
async fn shared_link_plays_through_to_contact() {
    let original = ada();
    let token = codec::encode(&original);

    let decoded = codec::decode(&token).expect("token decodes");
    assert_eq!(decoded.content(), original.content());
    assert_eq!(decoded.id().as_str(), ProposalId::SHARED);

    let (controller, mut effects) = RevealController::start(
        decoded,
        RevealTimings::default(),
        Arc::new(MessagingLinkBuilder::default()),
    );
    assert_eq!(controller.stage(), Stage::Intro);

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(controller.stage(), Stage::Question);

    assert!(controller.accept());
    assert_eq!(controller.stage(), Stage::Celebration);
    assert_eq!(effects.recv().await, Some(RevealEffect::Celebrate));

    tokio::time::sleep(Duration::from_millis(3_001)).await;
    assert_eq!(controller.stage(), Stage::Contact);
    let link = controller.contact_action().expect("contact action");
    assert!(link.contains("Ada"));
}

#[tokio::test]
async fn stored_proposal_resolves_by_id_when_fragment_is_absent() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let record = ada();
    storage::ProposalStore::save(&storage, &record)
        .await
        .expect("save");

    let resolved = resolve(&storage, None, Some(record.id().as_str()))
        .await
        .expect("resolve");
    assert_eq!(resolved.source, ResolutionSource::Storage);
    assert_eq!(resolved.record.id(), record.id());
}
