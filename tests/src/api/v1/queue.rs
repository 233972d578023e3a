use crate::actions::*;
use crate::data::*;
use crate::fixtures::builder::FakeBuilder;
use crate::fixtures::server::IsolatedServer;
use crate::fixtures::*;
use crate::setup::*;
use pocketd_common::api::v1::{BuildState, QueueRestApi, Urgency};
use rstest::rstest;

#[rstest]
#[tokio::test]
pub async fn new_database_has_empty_queue(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    assert!(client.get_queue().await.unwrap().is_empty());
    // a pass over nothing is fine
    run_scheduler(&client).await;
}

#[rstest]
#[tokio::test]
pub async fn waiting_build_stays_queued_without_builders(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let (_, created) = setup_single_upload(&client).await;
    run_scheduler(&client).await;

    let queue = client.get_queue().await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].build_id, created.build_ids[0]);
    assert_eq!(queue[0].state, BuildState::NeedsBuild);
    assert_eq!(queue[0].builder_id, None);
    assert_eq!(queue[0].name, DUMMY_SOURCE_PACKAGE);
    assert_eq!(queue[0].architecture_tag, DUMMY_ARCHITECTURE);
}

#[rstest]
#[tokio::test]
pub async fn urgent_build_is_dispatched_first(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = isolated_server.client;

    let world = setup_world(&client).await;
    let mut low = source_upload(&world, DUMMY_VERSION);
    low.name = "low".to_string();
    low.urgency = Urgency::Low;
    upload_source(&client, &low).await;

    let mut urgent = source_upload(&world, DUMMY_VERSION);
    urgent.name = "urgent".to_string();
    urgent.urgency = Urgency::Critical;
    let created = upload_source(&client, &urgent).await;

    let queue = client.get_queue().await.unwrap();
    assert_eq!(queue.len(), 2);
    assert!(queue.iter().any(|q| q.name == "urgent"));

    register_builder(&client, DUMMY_BUILDER, &fake_builder).await;
    run_scheduler(&client).await;

    assert_eq!(fake_builder.dispatched().len(), 1);
    assert_eq!(fake_builder.current().build_id, created.build_ids[0]);
}

#[rstest]
#[tokio::test]
pub async fn busy_builder_returns_build_to_queue(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = isolated_server.client;

    // the agent is running something the daemon doesn't know about
    fake_builder.occupy(999);
    register_builder(&client, DUMMY_BUILDER, &fake_builder).await;
    let (_, created) = setup_single_upload(&client).await;
    run_scheduler(&client).await;

    let build = get_build(&client, created.build_ids[0]).await;
    assert_eq!(build.state, BuildState::NeedsBuild);
    assert_eq!(build.retries, 0);
    assert_eq!(build.builder_id, None);

    let queue = client.get_queue().await.unwrap();
    assert_eq!(queue[0].builder_id, None);
    assert_eq!(queue[0].not_before, None);
}
