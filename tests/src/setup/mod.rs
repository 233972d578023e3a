use crate::actions::*;
use crate::data::*;
use crate::fixtures::builder::FakeBuilder;
use pocketd_common::api::v1::{Build, SourceReleaseCreated};
use pocketd_common::api::Client;

pub async fn setup_world(client: &Client) -> World {
    create_world(client).await
}

pub async fn setup_single_upload(client: &Client) -> (World, SourceReleaseCreated) {
    let world = create_world(client).await;
    let created = upload_source(client, &source_upload(&world, DUMMY_VERSION)).await;
    (world, created)
}

pub async fn setup_single_build_in_progress(client: &Client, builder: &FakeBuilder) -> (World, Build) {
    register_builder(client, DUMMY_BUILDER, builder).await;
    let (world, created) = setup_single_upload(client).await;
    run_scheduler(client).await;

    let build = get_build(client, created.build_ids[0]).await;
    (world, build)
}

pub async fn setup_single_successful_build(client: &Client, builder: &FakeBuilder) -> (World, Build) {
    let (world, build) = setup_single_build_in_progress(client, builder).await;
    builder.finish(successful_result(&builder.current()));
    run_scheduler(client).await;

    let build = get_build(client, build.id).await;
    (world, build)
}

pub async fn setup_single_failed_build(client: &Client, builder: &FakeBuilder) -> (World, Build) {
    let (world, build) = setup_single_build_in_progress(client, builder).await;
    builder.finish(failed_result(&builder.current()));
    run_scheduler(client).await;

    let build = get_build(client, build.id).await;
    (world, build)
}
