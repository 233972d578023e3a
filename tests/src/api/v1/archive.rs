use crate::actions::*;
use crate::assertions::*;
use crate::data::*;
use crate::fixtures::server::IsolatedServer;
use crate::fixtures::*;
use crate::setup::*;
use pocketd_common::api::v1::{
    ArchivePurpose, ArchiveRestApi, CreateArchiveRequest, CreateDistributionRequest,
    CreateDistroArchSeriesRequest, SetChrootRequest,
};
use rstest::rstest;

#[rstest]
#[tokio::test]
pub async fn new_database_has_no_distributions(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    assert!(client.get_distributions().await.unwrap().is_empty());
    assert!(client.get_archives().await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
pub async fn distribution_comes_with_main_archive(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let world = setup_world(&client).await;

    assert_eq!(world.distribution.main_archive_id, Some(world.archive.id));
    assert_eq!(world.archive.purpose, ArchivePurpose::Main);
    assert_eq!(world.archive.owner, None);
    assert_eq!(client.get_archives().await.unwrap(), vec![world.archive]);
}

#[rstest]
#[tokio::test]
pub async fn duplicate_distribution_is_a_conflict(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    setup_world(&client).await;
    let result = client
        .create_distribution(&CreateDistributionRequest {
            name: DUMMY_DISTRIBUTION.to_string(),
        })
        .await;

    assert_error_kind(result, "conflict");
}

#[rstest]
#[tokio::test]
pub async fn personal_archive_is_created(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let world = setup_world(&client).await;
    let ppa = client
        .create_archive(&CreateArchiveRequest {
            distribution_id: world.distribution.id,
            owner: "alice".to_string(),
            name: "ppa".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(ppa.purpose, ArchivePurpose::Personal);
    assert_eq!(ppa.owner.as_deref(), Some("alice"));
    assert_eq!(client.get_archives().await.unwrap().len(), 2);
}

#[rstest]
#[tokio::test]
pub async fn archive_of_missing_distribution_is_not_found(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let result = client
        .create_archive(&CreateArchiveRequest {
            distribution_id: 42,
            owner: "alice".to_string(),
            name: "ppa".to_string(),
        })
        .await;
    assert_error_kind(result, "not-found");

    assert_error_kind(client.get_archive(1).await, "not-found");
}

#[rstest]
#[tokio::test]
pub async fn arch_series_without_processor_family_is_rejected(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let world = setup_world(&client).await;
    let result = client
        .create_arch_series(&CreateDistroArchSeriesRequest {
            distro_series_id: world.series.id,
            architecture_tag: "riscv64".to_string(),
            processor_family: String::new(),
            chroot: None,
        })
        .await;

    assert_error_kind(result, "invalid-input");
}

#[rstest]
#[tokio::test]
pub async fn chroot_can_be_replaced(isolated_server: IsolatedServer) {
    let client = isolated_server.client;

    let world = setup_world(&client).await;
    let riscv = create_arch_series(&client, &world.series, "riscv64", "riscv64").await;
    let chroot = dummy_file("chroot-trixie-riscv64-v2.tar.zst", 201);
    let updated = client
        .set_chroot(
            riscv.id,
            &SetChrootRequest {
                chroot: chroot.clone(),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.chroot, Some(chroot));
    let arch_series = client.get_arch_series().await.unwrap();
    assert_eq!(arch_series.len(), 3);
}
