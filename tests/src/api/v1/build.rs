use crate::actions::*;
use crate::assertions::*;
use crate::data::*;
use crate::fixtures::builder::FakeBuilder;
use crate::fixtures::server::IsolatedServer;
use crate::fixtures::*;
use crate::setup::*;
use pocketd_common::api::v1::{
    BuildFilter, BuildRestApi, BuildState, BuilderRestApi, DispatchManualRequest,
    QueueRestApi, RescoreRequest, SetFlagRequest, SetManualRequest,
};
use rstest::rstest;

#[rstest]
#[tokio::test]
pub async fn returns_no_result_for_empty_database(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    assert!(client.get_builds(&BuildFilter::default()).await.unwrap().is_empty());
    assert_error_kind(client.get_build(1).await, "not-found");
    assert_error_kind(client.get_build_log(1).await, "not-found");
}

#[rstest]
#[tokio::test]
pub async fn builds_can_be_filtered(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let world = setup_world(&client).await;
    let mut upload = source_upload(&world, DUMMY_VERSION);
    upload.architecture_hint = "any".to_string();
    upload_source(&client, &upload).await;

    let all = client.get_builds(&BuildFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);

    let waiting = client
        .get_builds(&BuildFilter {
            state: Some(BuildState::NeedsBuild),
            archive_id: Some(world.archive.id),
            name: Some(DUMMY_SOURCE_PACKAGE.to_string()),
        })
        .await
        .unwrap();
    assert_eq!(waiting.len(), 2);

    let built = client
        .get_builds(&BuildFilter {
            state: Some(BuildState::FullyBuilt),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(built.is_empty());
}

#[rstest]
#[tokio::test]
pub async fn successful_build_has_log_and_binaries(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = isolated_server.client;

    let (_, build) = setup_single_successful_build(&client, &fake_builder).await;
    assert_eq!(build.state, BuildState::FullyBuilt);
    assert!(build.log.is_some());

    let log = client.get_build_log(build.id).await.unwrap();
    assert_eq!(log, DUMMY_BUILD_LOG);

    let binaries = client.get_build_binaries(build.id).await.unwrap();
    assert_eq!(binaries.len(), 1);
    assert_eq!(binaries[0].name, DUMMY_SOURCE_PACKAGE);
    assert_eq!(binaries[0].version, DUMMY_VERSION);
    // unset fields are inherited from the source
    assert_eq!(binaries[0].component, DUMMY_COMPONENT);
    assert_eq!(binaries[0].section, DUMMY_SECTION);
    assert_eq!(binaries[0].files.len(), 1);
}

#[rstest]
#[tokio::test]
pub async fn running_build_reports_progress(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = isolated_server.client;

    let (_, build) = setup_single_build_in_progress(&client, &fake_builder).await;
    fake_builder.report_progress("unpacking chroot\n");
    run_scheduler(&client).await;

    let queue = client.get_queue().await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].build_id, build.id);
    assert_eq!(queue[0].log_tail.as_deref(), Some("unpacking chroot\n"));
    assert!(queue[0].last_ping.is_some());

    let log = client.get_build_log(build.id).await.unwrap();
    assert_eq!(log, "unpacking chroot\n");
}

#[rstest]
#[tokio::test]
pub async fn failed_build_can_be_requeued(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = isolated_server.client;

    let (_, build) = setup_single_failed_build(&client, &fake_builder).await;
    assert_eq!(build.state, BuildState::FailedToBuild);
    assert!(client.get_build_binaries(build.id).await.unwrap().is_empty());
    assert!(client.get_queue().await.unwrap().is_empty());

    let requeued = client.requeue_build(build.id).await.unwrap();
    assert_eq!(requeued.state, BuildState::NeedsBuild);
    assert_eq!(requeued.retries, 0);
    assert_eq!(requeued.finished_at, None);
    assert_eq!(client.get_queue().await.unwrap().len(), 1);
}

#[rstest]
#[tokio::test]
pub async fn successful_build_can_not_be_requeued(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = isolated_server.client;

    let (_, build) = setup_single_successful_build(&client, &fake_builder).await;

    assert_error_kind(client.requeue_build(build.id).await, "invalid-transition");
    assert_error_kind(client.cancel_build(build.id).await, "invalid-transition");
}

#[rstest]
#[tokio::test]
pub async fn waiting_build_can_be_cancelled(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let (_, created) = setup_single_upload(&client).await;
    let cancelled = client.cancel_build(created.build_ids[0]).await.unwrap();

    assert_eq!(cancelled.state, BuildState::Cancelled);
    assert!(client.get_queue().await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
pub async fn rescore_pins_score(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let (_, created) = setup_single_upload(&client).await;
    let build_id = created.build_ids[0];

    let queued = client
        .rescore_build(build_id, &RescoreRequest { score: 5000 })
        .await
        .unwrap();
    assert_eq!(queued.score, 5000);
    assert!(!queued.manual);
    assert!(queued.pinned);

    run_scheduler(&client).await;
    let queue = client.get_queue().await.unwrap();
    assert_eq!(queue[0].score, 5000);
}

#[rstest]
#[tokio::test]
pub async fn manual_build_is_only_dispatched_explicitly(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = isolated_server.client;

    let builder = register_builder(&client, DUMMY_BUILDER, &fake_builder).await;
    let (_, created) = setup_single_upload(&client).await;
    let build_id = created.build_ids[0];

    let queued = client
        .set_build_manual(build_id, &SetManualRequest { manual: true })
        .await
        .unwrap();
    assert!(queued.manual);
    assert_eq!(queued.score, 0);

    run_scheduler(&client).await;
    assert!(fake_builder.dispatched().is_empty());
    assert_eq!(get_build(&client, build_id).await.state, BuildState::NeedsBuild);

    let build = client
        .dispatch_build(
            build_id,
            &DispatchManualRequest {
                builder_id: builder.id,
            },
        )
        .await
        .unwrap();
    assert_eq!(build.state, BuildState::Building);
    assert_eq!(build.builder_id, Some(builder.id));
    assert_eq!(fake_builder.current().build_id, build_id);
}

#[rstest]
#[tokio::test]
pub async fn manual_dispatch_checks_builder(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = isolated_server.client;

    let builder = register_builder(&client, DUMMY_BUILDER, &fake_builder).await;
    let world = setup_world(&client).await;
    let mut upload = source_upload(&world, DUMMY_VERSION);
    upload.architecture_hint = DUMMY_OTHER_ARCHITECTURE.to_string();
    let created = upload_source(&client, &upload).await;
    let build_id = created.build_ids[0];
    let request = DispatchManualRequest {
        builder_id: builder.id,
    };

    // an x86_64 builder can't build arm64
    assert_error_kind(client.dispatch_build(build_id, &request).await, "invalid-input");

    let mut upload = source_upload(&world, DUMMY_VERSION);
    upload.name = "other".to_string();
    let created = upload_source(&client, &upload).await;
    client
        .set_builder_manual(builder.id, &SetFlagRequest { value: true })
        .await
        .unwrap();
    client
        .dispatch_build(created.build_ids[0], &request)
        .await
        .unwrap();

    // the builder is busy now
    let mut upload = source_upload(&world, DUMMY_VERSION);
    upload.name = "third".to_string();
    let created = upload_source(&client, &upload).await;
    assert_error_kind(
        client.dispatch_build(created.build_ids[0], &request).await,
        "conflict",
    );
}
