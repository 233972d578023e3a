use crate::data::*;
use crate::fixtures::builder::FakeBuilder;
use pocketd_common::api::v1::{
    ArchiveRestApi, Build, BuildRestApi, Builder, BuilderRestApi, CreateDistributionRequest,
    CreateDistroArchSeriesRequest, CreateDistroSeriesRequest, CreateSourceReleaseRequest,
    DistroArchSeries, DistroSeries, Publication, PublicationRef, PublishingRestApi, QueueRestApi,
    RegisterBuilderRequest, SourceReleaseCreated, SourceRestApi,
};
use pocketd_common::api::Client;

pub async fn create_arch_series(
    client: &Client,
    series: &DistroSeries,
    architecture_tag: &str,
    processor_family: &str,
) -> DistroArchSeries {
    client
        .create_arch_series(&CreateDistroArchSeriesRequest {
            distro_series_id: series.id,
            architecture_tag: architecture_tag.to_string(),
            processor_family: processor_family.to_string(),
            chroot: Some(dummy_chroot(architecture_tag)),
        })
        .await
        .unwrap()
}

pub async fn create_world(client: &Client) -> World {
    let distribution = client
        .create_distribution(&CreateDistributionRequest {
            name: DUMMY_DISTRIBUTION.to_string(),
        })
        .await
        .unwrap();
    let archive = client
        .get_archive(distribution.main_archive_id.unwrap())
        .await
        .unwrap();
    let series = client
        .create_series(&CreateDistroSeriesRequest {
            distribution_id: distribution.id,
            name: DUMMY_SERIES.to_string(),
            version: DUMMY_SERIES_VERSION.to_string(),
        })
        .await
        .unwrap();
    let amd64 = create_arch_series(client, &series, DUMMY_ARCHITECTURE, DUMMY_PROCESSOR_FAMILY).await;
    let arm64 = create_arch_series(
        client,
        &series,
        DUMMY_OTHER_ARCHITECTURE,
        DUMMY_OTHER_PROCESSOR_FAMILY,
    )
    .await;

    World {
        distribution,
        archive,
        series,
        amd64,
        arm64,
    }
}

pub async fn upload_source(client: &Client, request: &CreateSourceReleaseRequest) -> SourceReleaseCreated {
    client.create_source_release(request).await.unwrap()
}

pub async fn register_builder(client: &Client, name: &str, builder: &FakeBuilder) -> Builder {
    client
        .register_builder(&RegisterBuilderRequest {
            name: name.to_string(),
            url: builder.url.clone(),
            processor_family: DUMMY_PROCESSOR_FAMILY.to_string(),
            trusted: false,
        })
        .await
        .unwrap()
}

pub async fn run_scheduler(client: &Client) {
    client.run_scheduler().await.unwrap();
}

pub async fn get_build(client: &Client, id: i32) -> Build {
    client.get_build(id).await.unwrap()
}

pub async fn publish(client: &Client, record: PublicationRef) -> Publication {
    client.publish(record).await.unwrap()
}
