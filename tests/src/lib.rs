#![cfg(test)]

use crate::actions::*;
use crate::assertions::*;
use crate::data::*;
use crate::fixtures::builder::FakeBuilder;
use crate::fixtures::server::IsolatedServer;
use crate::fixtures::*;
use crate::setup::*;
use chrono::{Duration, Utc};
use pocketd_common::api::builder::BinaryReport;
use pocketd_common::api::v1::{
    BuildRestApi, BuildState, BuilderRestApi, ListPublishedQuery, Pocket, PublicationKind,
    PublicationRef, PublishingRestApi, PublishingStatus, QueueRestApi,
};
use rstest::rstest;

mod actions;
mod api;
mod assertions;
mod data;
pub(crate) mod fixtures;
pub mod setup;

fn published_query(world: &World) -> ListPublishedQuery {
    ListPublishedQuery {
        archive_id: world.archive.id,
        distro_series_id: world.series.id,
        pocket: Pocket::Release,
    }
}

#[rstest]
#[tokio::test]
pub async fn upload_is_built_and_published(
    auto_publishing_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = &auto_publishing_server.client;

    let builder = register_builder(client, DUMMY_BUILDER, &fake_builder).await;
    let world = setup_world(client).await;
    let upload = source_upload(&world, DUMMY_VERSION);
    let created = upload_source(client, &upload).await;
    assert!(created.created);
    assert_eq!(created.build_ids.len(), 1);

    let build = get_build(client, created.build_ids[0]).await;
    assert_eq!(build.state, BuildState::NeedsBuild);
    assert_build_matches_upload(&upload, &world, &build);

    run_scheduler(client).await;

    let build = get_build(client, build.id).await;
    assert_eq!(build.state, BuildState::Building);
    assert_eq!(build.builder_id, Some(builder.id));
    let request = fake_builder.current();
    assert_request_matches_build(&request, &build);
    assert_eq!(request.chroot, dummy_chroot(DUMMY_ARCHITECTURE));
    assert_eq!(request.files, upload.files);
    assert_eq!(request.build_depends, upload.build_depends);

    fake_builder.finish(successful_result(&request));
    run_scheduler(client).await;

    let build = get_build(client, build.id).await;
    assert_eq!(build.state, BuildState::FullyBuilt);
    assert!(build.finished_at.is_some());
    assert!(client.get_queue().await.unwrap().is_empty());
    let builder = client.get_builder(builder.id).await.unwrap();
    assert_eq!(builder.current_build, None);

    let summary = auto_publishing_server.state.publisher.pass().await.unwrap();
    assert_eq!(summary.published, 2);

    let published = client.get_published(&published_query(&world)).await.unwrap();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].kind, PublicationKind::Source);
    assert_eq!(published[0].version, DUMMY_VERSION);
    assert_eq!(published[1].kind, PublicationKind::Binary);
    assert_eq!(published[1].architecture_tag.as_deref(), Some(DUMMY_ARCHITECTURE));
    assert_eq!(published[1].component, DUMMY_COMPONENT);
    assert_eq!(published[1].priority.as_deref(), Some("optional"));
}

#[rstest]
#[tokio::test]
pub async fn newer_upload_supersedes_older_version(auto_publishing_server: IsolatedServer) {
    let client = &auto_publishing_server.client;
    let publisher = &auto_publishing_server.state.publisher;

    let world = setup_world(client).await;
    let old = upload_source(client, &source_upload(&world, DUMMY_VERSION)).await;
    publisher.pass().await.unwrap();

    let new = upload_source(client, &source_upload(&world, DUMMY_NEWER_VERSION)).await;
    // the old build never ran and is moot now
    let old_build = get_build(client, old.build_ids[0]).await;
    assert_eq!(old_build.state, BuildState::Superseded);
    assert_eq!(client.get_queue().await.unwrap().len(), 1);

    publisher.pass().await.unwrap();

    let old_pub = client
        .get_publication(PublicationRef::source(old.publication_id.unwrap()))
        .await
        .unwrap();
    assert_eq!(old_pub.status, PublishingStatus::Superseded);
    assert_eq!(old_pub.superseded_by, Some(new.source_release_id));
    assert!(old_pub.superseded_at.is_some());

    let published = client.get_published(&published_query(&world)).await.unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].version, DUMMY_NEWER_VERSION);
}

#[rstest]
#[tokio::test]
pub async fn embargoed_upload_stays_hidden_until_lifted(auto_publishing_server: IsolatedServer) {
    let client = &auto_publishing_server.client;
    let publisher = &auto_publishing_server.state.publisher;

    let world = setup_world(client).await;
    upload_source(client, &source_upload(&world, DUMMY_VERSION)).await;
    publisher.pass().await.unwrap();

    let mut upload = source_upload(&world, DUMMY_NEWER_VERSION);
    upload.embargo = true;
    let created = upload_source(client, &upload).await;
    publisher.pass().await.unwrap();

    let record = PublicationRef::source(created.publication_id.unwrap());
    let embargoed = client.get_publication(record).await.unwrap();
    assert_eq!(embargoed.status, PublishingStatus::Published);
    assert!(embargoed.embargo);

    // the public still sees the old version
    let published = client.get_published(&published_query(&world)).await.unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].version, DUMMY_VERSION);

    let lifted = client.lift_embargo(record).await.unwrap();
    assert!(!lifted.embargo);
    assert!(lifted.embargo_lifted_at.is_some());

    let published = client.get_published(&published_query(&world)).await.unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].version, DUMMY_NEWER_VERSION);

    let err = client.lift_embargo(record).await;
    assert_error_kind(err, "invalid-transition");
}

#[rstest]
#[tokio::test]
pub async fn withdrawn_source_is_removed_by_publisher(auto_publishing_server: IsolatedServer) {
    let client = &auto_publishing_server.client;
    let publisher = &auto_publishing_server.state.publisher;

    let (world, created) = setup_single_upload(client).await;
    publisher.pass().await.unwrap();

    let record = PublicationRef::source(created.publication_id.unwrap());
    let deletion_date = Utc::now().naive_utc() - Duration::hours(1);
    let withdrawn = client.withdraw(record, &removal_at(deletion_date)).await.unwrap();
    assert_eq!(withdrawn.status, PublishingStatus::PendingRemoval);
    assert!(withdrawn.scheduled_deletion_at.is_some());
    assert!(client.get_published(&published_query(&world)).await.unwrap().is_empty());

    let summary = publisher.pass().await.unwrap();
    assert_eq!(summary.removed, 1);

    let removed = client.get_publication(record).await.unwrap();
    assert_eq!(removed.status, PublishingStatus::Removed);
    assert!(removed.removed_at.is_some());
}

#[rstest]
#[tokio::test]
pub async fn lost_build_is_requeued(isolated_server: IsolatedServer, fake_builder: FakeBuilder) {
    let client = &isolated_server.client;

    let (_, build) = setup_single_build_in_progress(client, &fake_builder).await;
    assert_eq!(build.state, BuildState::Building);

    // the agent restarted and no longer knows the build
    fake_builder.forget();
    run_scheduler(client).await;

    let build = get_build(client, build.id).await;
    assert_eq!(build.retries, 1);
    assert!(build.failure_note.is_some());

    // the agent itself answered, so it stays healthy and gets the build again
    run_scheduler(client).await;
    let build = get_build(client, build.id).await;
    assert_eq!(build.state, BuildState::Building);
    assert_eq!(fake_builder.dispatched().len(), 2);
    let builders = client.get_builders().await.unwrap();
    assert!(builders[0].builder_ok);
}

#[rstest]
#[tokio::test]
pub async fn unreachable_builder_is_marked_unhealthy(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = &isolated_server.client;

    let (_, build) = setup_single_build_in_progress(client, &fake_builder).await;
    fake_builder.stop().await;
    run_scheduler(client).await;

    let build = get_build(client, build.id).await;
    assert_eq!(build.state, BuildState::NeedsBuild);
    assert_eq!(build.retries, 1);
    assert_eq!(build.builder_id, None);

    let builders = client.get_builders().await.unwrap();
    assert!(!builders[0].builder_ok);
    assert!(builders[0].fail_notes.is_some());
    assert_eq!(builders[0].current_build, None);
}

#[rstest]
#[tokio::test]
pub async fn cancelled_build_is_aborted_on_builder(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = &isolated_server.client;

    let (_, build) = setup_single_build_in_progress(client, &fake_builder).await;
    let cancelled = client.cancel_build(build.id).await.unwrap();
    assert_eq!(cancelled.state, BuildState::Cancelled);
    assert!(client.get_queue().await.unwrap().is_empty());

    // the abort is sent in the background
    for _ in 0..50 {
        if fake_builder.aborted().contains(&build.id) {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    panic!("builder never received the abort for build {}", build.id);
}

#[rstest]
#[tokio::test]
pub async fn dependency_wait_is_released_by_published_binary(
    auto_publishing_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = &auto_publishing_server.client;
    let publisher = &auto_publishing_server.state.publisher;

    let (world, build) = setup_single_build_in_progress(client, &fake_builder).await;
    fake_builder.finish(dependency_wait_result(
        &fake_builder.current(),
        "libfoo-dev (>= 1.0)",
    ));
    run_scheduler(client).await;

    let build = get_build(client, build.id).await;
    assert_eq!(build.state, BuildState::DependencyWait);
    assert_eq!(build.dependencies.as_deref(), Some("libfoo-dev (>= 1.0)"));

    let mut upload = source_upload(&world, "1.2-1");
    upload.name = "libfoo".to_string();
    let libfoo = upload_source(client, &upload).await;
    run_scheduler(client).await;

    let request = fake_builder.current();
    assert_eq!(request.build_id, libfoo.build_ids[0]);
    let mut result = successful_result(&request);
    result.binaries = vec![BinaryReport {
        name: "libfoo-dev".to_string(),
        version: "1.2-1".to_string(),
        architecture_specific: true,
        depends: String::new(),
        conflicts: String::new(),
        provides: String::new(),
        component: None,
        section: Some("libdevel".to_string()),
        priority: None,
        files: vec![dummy_file("libfoo-dev_1.2-1_amd64.deb", 77)],
    }];
    fake_builder.finish(result);
    run_scheduler(client).await;

    // still waiting, the binary is built but not published yet
    let waiting = get_build(client, build.id).await;
    assert_eq!(waiting.state, BuildState::DependencyWait);

    publisher.pass().await.unwrap();

    let released = get_build(client, build.id).await;
    assert_eq!(released.state, BuildState::NeedsBuild);
    assert_eq!(released.dependencies, None);
    let queue = client.get_queue().await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].build_id, build.id);
}
