use crate::actions::*;
use crate::assertions::*;
use crate::data::*;
use crate::fixtures::builder::FakeBuilder;
use crate::fixtures::server::IsolatedServer;
use crate::fixtures::*;
use crate::setup::*;
use chrono::{Duration, Utc};
use pocketd_common::api::v1::{
    ListPublishedQuery, OverrideRequest, Pocket, PublicationKind, PublicationRef,
    PublishingRestApi, PublishingStatus,
};
use rstest::rstest;

#[rstest]
#[tokio::test]
pub async fn returns_no_result_for_empty_database(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    assert_error_kind(
        client.get_publication(PublicationRef::source(1)).await,
        "not-found",
    );
    assert_error_kind(client.publish(PublicationRef::binary(1)).await, "not-found");
}

#[rstest]
#[tokio::test]
pub async fn upload_starts_pending(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let (world, created) = setup_single_upload(&client).await;
    let record = client
        .get_publication(PublicationRef::source(created.publication_id.unwrap()))
        .await
        .unwrap();

    assert_eq!(record.kind, PublicationKind::Source);
    assert_eq!(record.status, PublishingStatus::Pending);
    assert_eq!(record.release_id, created.source_release_id);
    assert_eq!(record.component, DUMMY_COMPONENT);
    assert_eq!(record.published_at, None);

    let published = client
        .get_published(&ListPublishedQuery {
            archive_id: world.archive.id,
            distro_series_id: world.series.id,
            pocket: Pocket::Release,
        })
        .await
        .unwrap();
    assert!(published.is_empty());
}

#[rstest]
#[tokio::test]
pub async fn record_is_published_once(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let (_, created) = setup_single_upload(&client).await;
    let record = PublicationRef::source(created.publication_id.unwrap());

    let published = publish(&client, record).await;
    assert_eq!(published.status, PublishingStatus::Published);
    assert!(published.published_at.is_some());

    assert_error_kind(client.publish(record).await, "invalid-transition");
}

#[rstest]
#[tokio::test]
pub async fn published_record_is_withdrawn_not_removed(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let (_, created) = setup_single_upload(&client).await;
    let record = PublicationRef::source(created.publication_id.unwrap());
    publish(&client, record).await;

    let deletion_date = Utc::now().naive_utc() + Duration::days(7);
    assert_error_kind(
        client.schedule_removal(record, &removal_at(deletion_date)).await,
        "invalid-transition",
    );

    let withdrawn = client.withdraw(record, &removal_at(deletion_date)).await.unwrap();
    assert_eq!(withdrawn.status, PublishingStatus::PendingRemoval);
    assert!(withdrawn.made_pending_at.is_some());

    // not due yet, a publisher pass leaves it alone
    let summary = isolated_server.state.publisher.pass().await.unwrap();
    assert_eq!(summary.removed, 0);
    let record = client.get_publication(record).await.unwrap();
    assert_eq!(record.status, PublishingStatus::PendingRemoval);
}

#[rstest]
#[tokio::test]
pub async fn pending_record_can_be_scheduled_for_removal(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let (_, created) = setup_single_upload(&client).await;
    let record = PublicationRef::source(created.publication_id.unwrap());

    let deletion_date = Utc::now().naive_utc() + Duration::days(1);
    let scheduled = client.schedule_removal(record, &removal_at(deletion_date)).await.unwrap();
    assert_eq!(scheduled.status, PublishingStatus::PendingRemoval);

    assert_error_kind(client.withdraw(record, &removal_at(deletion_date)).await, "invalid-transition");
    assert_error_kind(client.publish(record).await, "invalid-transition");
}

#[rstest]
#[tokio::test]
pub async fn record_can_be_overridden(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let (_, created) = setup_single_upload(&client).await;
    let record = PublicationRef::source(created.publication_id.unwrap());
    publish(&client, record).await;

    let overridden = client
        .override_publication(
            record,
            &OverrideRequest {
                component: "universe".to_string(),
                section: "devel".to_string(),
                priority: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(overridden.component, "universe");
    assert_eq!(overridden.section, "devel");
    assert_eq!(overridden.status, PublishingStatus::Published);

    let result = client
        .override_publication(
            record,
            &OverrideRequest {
                component: "main".to_string(),
                section: "devel".to_string(),
                priority: Some("optional".to_string()),
            },
        )
        .await;
    assert_error_kind(result, "invalid-input");
}

#[rstest]
#[tokio::test]
pub async fn binary_publications_follow_build(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = isolated_server.client;

    let (world, build) = setup_single_successful_build(&client, &fake_builder).await;

    // the only binary of the only build
    let record = PublicationRef::binary(1);
    let pending = client.get_publication(record).await.unwrap();
    assert_eq!(pending.status, PublishingStatus::Pending);
    assert_eq!(pending.name, DUMMY_SOURCE_PACKAGE);
    assert_eq!(pending.distro_arch_series_id, Some(world.amd64.id));

    let published = publish(&client, record).await;
    assert_eq!(published.status, PublishingStatus::Published);

    let binaries = client
        .get_published(&ListPublishedQuery {
            archive_id: world.archive.id,
            distro_series_id: world.series.id,
            pocket: Pocket::Release,
        })
        .await
        .unwrap();
    assert_eq!(binaries.len(), 1);
    assert_eq!(binaries[0].kind, PublicationKind::Binary);
    assert_eq!(binaries[0].version, build.version);
}
