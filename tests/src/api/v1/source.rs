use crate::actions::*;
use crate::assertions::*;
use crate::data::*;
use crate::fixtures::server::IsolatedServer;
use crate::fixtures::*;
use crate::setup::*;
use pocketd_common::api::v1::{BuildState, SourceRestApi};
use rstest::rstest;

#[rstest]
#[tokio::test]
pub async fn returns_no_result_for_empty_database(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    assert_error_kind(client.get_source_release(1).await, "not-found");
}

#[rstest]
#[tokio::test]
pub async fn upload_creates_build_per_architecture(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let world = setup_world(&client).await;
    let mut upload = source_upload(&world, DUMMY_VERSION);
    upload.architecture_hint = "any".to_string();
    let created = upload_source(&client, &upload).await;

    assert!(created.created);
    assert_eq!(created.build_ids.len(), 2);
    assert!(created.publication_id.is_some());

    let amd64 = get_build(&client, created.build_ids[0]).await;
    let arm64 = get_build(&client, created.build_ids[1]).await;
    assert_eq!(amd64.architecture_tag, DUMMY_ARCHITECTURE);
    assert_eq!(arm64.architecture_tag, DUMMY_OTHER_ARCHITECTURE);
    assert_eq!(amd64.state, BuildState::NeedsBuild);
    assert_eq!(arm64.state, BuildState::NeedsBuild);

    let release = client
        .get_source_release(created.source_release_id)
        .await
        .unwrap();
    assert_eq!(release.name, DUMMY_SOURCE_PACKAGE);
    assert_eq!(release.files, upload.files);
}

#[rstest]
#[tokio::test]
pub async fn identical_reupload_changes_nothing(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let (world, created) = setup_single_upload(&client).await;
    let again = upload_source(&client, &source_upload(&world, DUMMY_VERSION)).await;

    assert!(!again.created);
    assert_eq!(again.source_release_id, created.source_release_id);
    assert_eq!(again.build_ids, created.build_ids);
    assert_eq!(again.publication_id, created.publication_id);
}

#[rstest]
#[tokio::test]
pub async fn reupload_with_other_content_is_rejected(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let (world, _) = setup_single_upload(&client).await;
    let mut upload = source_upload(&world, DUMMY_VERSION);
    upload.files = vec![dummy_file("hello_2.10-3.dsc", 99)];

    assert_error_kind(client.create_source_release(&upload).await, "duplicate-version");
}

#[rstest]
#[tokio::test]
pub async fn invalid_version_is_rejected(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let world = setup_world(&client).await;
    let upload = source_upload(&world, "not a version");

    assert_error_kind(client.create_source_release(&upload).await, "invalid-input");
}

#[rstest]
#[tokio::test]
pub async fn unknown_architecture_hint_creates_no_builds(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let world = setup_world(&client).await;
    let mut upload = source_upload(&world, DUMMY_VERSION);
    upload.architecture_hint = "hurd-i386".to_string();
    let created = upload_source(&client, &upload).await;

    assert!(created.created);
    assert!(created.build_ids.is_empty());
}
