use crate::actions::*;
use crate::assertions::*;
use crate::data::*;
use crate::fixtures::builder::FakeBuilder;
use crate::fixtures::server::IsolatedServer;
use crate::fixtures::*;
use crate::setup::*;
use pocketd_common::api::v1::{
    BuildState, BuilderRestApi, Pocket, RegisterBuilderRequest, SetFlagRequest,
};
use rstest::rstest;

#[rstest]
#[tokio::test]
pub async fn returns_no_result_for_empty_database(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    assert!(client.get_builders().await.unwrap().is_empty());
    assert_error_kind(client.get_builder(1).await, "not-found");
    assert_error_kind(client.reset_builder(1).await, "not-found");
    assert_error_kind(
        client
            .set_builder_trusted(1, &SetFlagRequest { value: true })
            .await,
        "not-found",
    );
}

#[rstest]
#[tokio::test]
pub async fn registered_builder_is_healthy(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = isolated_server.client;

    let builder = register_builder(&client, DUMMY_BUILDER, &fake_builder).await;

    assert_eq!(builder.name, DUMMY_BUILDER);
    assert_eq!(builder.url, fake_builder.url);
    assert_eq!(builder.processor_family, DUMMY_PROCESSOR_FAMILY);
    assert!(builder.builder_ok);
    assert!(!builder.trusted);
    assert!(!builder.manual);
    assert_eq!(builder.current_build, None);
}

#[rstest]
#[tokio::test]
pub async fn registering_again_updates_builder(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = isolated_server.client;

    let first = register_builder(&client, DUMMY_BUILDER, &fake_builder).await;
    let second = client
        .register_builder(&RegisterBuilderRequest {
            name: DUMMY_BUILDER.to_string(),
            url: "http://10.0.0.7:8485/".to_string(),
            processor_family: DUMMY_PROCESSOR_FAMILY.to_string(),
            trusted: true,
        })
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.url, "http://10.0.0.7:8485/");
    assert!(second.trusted);
    assert_eq!(client.get_builders().await.unwrap().len(), 1);
}

#[rstest]
#[tokio::test]
pub async fn invalid_registration_is_rejected(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let mut request = RegisterBuilderRequest {
        name: DUMMY_BUILDER.to_string(),
        url: "not a url".to_string(),
        processor_family: DUMMY_PROCESSOR_FAMILY.to_string(),
        trusted: false,
    };
    assert_error_kind(client.register_builder(&request).await, "invalid-input");

    request.url = "http://10.0.0.7:8485/".to_string();
    request.processor_family = String::new();
    assert_error_kind(client.register_builder(&request).await, "invalid-input");
}

#[rstest]
#[tokio::test]
pub async fn busy_builder_reports_current_build(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = isolated_server.client;

    let (_, build) = setup_single_build_in_progress(&client, &fake_builder).await;

    let builders = client.get_builders().await.unwrap();
    assert_eq!(builders[0].current_build, Some(build.id));
    assert!(builders[0].last_seen.is_some());
}

#[rstest]
#[tokio::test]
pub async fn manual_builder_gets_no_work(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = isolated_server.client;

    let builder = register_builder(&client, DUMMY_BUILDER, &fake_builder).await;
    let builder = client
        .set_builder_manual(builder.id, &SetFlagRequest { value: true })
        .await
        .unwrap();
    assert!(builder.manual);

    let (_, created) = setup_single_upload(&client).await;
    run_scheduler(&client).await;
    assert!(fake_builder.dispatched().is_empty());

    client
        .set_builder_manual(builder.id, &SetFlagRequest { value: false })
        .await
        .unwrap();
    run_scheduler(&client).await;
    assert_eq!(fake_builder.current().build_id, created.build_ids[0]);
}

#[rstest]
#[tokio::test]
pub async fn security_builds_need_trusted_builder(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = isolated_server.client;

    let builder = register_builder(&client, DUMMY_BUILDER, &fake_builder).await;
    let world = setup_world(&client).await;
    let mut upload = source_upload(&world, DUMMY_VERSION);
    upload.pocket = Pocket::Security;
    let created = upload_source(&client, &upload).await;
    let build_id = created.build_ids[0];

    run_scheduler(&client).await;
    assert!(fake_builder.dispatched().is_empty());
    assert_eq!(get_build(&client, build_id).await.state, BuildState::NeedsBuild);

    client
        .set_builder_trusted(builder.id, &SetFlagRequest { value: true })
        .await
        .unwrap();
    run_scheduler(&client).await;

    let build = get_build(&client, build_id).await;
    assert_eq!(build.state, BuildState::Building);
    assert_eq!(fake_builder.current().pocket, Pocket::Security);
}

#[rstest]
#[tokio::test]
pub async fn reset_brings_builder_back(
    isolated_server: IsolatedServer,
    fake_builder: FakeBuilder,
) {
    let client = isolated_server.client;

    setup_single_build_in_progress(&client, &fake_builder).await;
    fake_builder.stop().await;
    run_scheduler(&client).await;

    let builder = client.get_builders().await.unwrap().remove(0);
    assert!(!builder.builder_ok);

    let builder = client.reset_builder(builder.id).await.unwrap();
    assert!(builder.builder_ok);
    assert_eq!(builder.fail_notes, None);
}
