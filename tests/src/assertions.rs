use crate::data::World;
use pocketd_common::api::builder::DispatchRequest;
use pocketd_common::api::v1::{Build, CreateSourceReleaseRequest};
use pocketd_common::errors::*;
use std::fmt::Debug;

pub fn assert_build_matches_upload(upload: &CreateSourceReleaseRequest, world: &World, build: &Build) {
    assert_eq!(upload.name, build.name);
    assert_eq!(upload.version, build.version);
    assert_eq!(upload.pocket, build.pocket);
    assert_eq!(world.archive.id, build.archive_id);
    assert_eq!(world.amd64.id, build.distro_arch_series_id);
    assert_eq!(world.amd64.architecture_tag, build.architecture_tag);
}

pub fn assert_request_matches_build(request: &DispatchRequest, build: &Build) {
    assert_eq!(request.build_id, build.id);
    assert_eq!(request.name, build.name);
    assert_eq!(request.version, build.version);
    assert_eq!(request.architecture_tag, build.architecture_tag);
    assert_eq!(request.pocket, build.pocket);
}

/// Expects an error of the given api kind, e.g. `not-found`
pub fn assert_error_kind<T: Debug>(result: Result<T>, kind: &str) {
    let err = result.expect_err("expected the request to fail");
    let actual = ArchiveError::of(&err).map(|err| err.kind());
    assert_eq!(actual, Some(kind), "unexpected error: {err:#}");
}
