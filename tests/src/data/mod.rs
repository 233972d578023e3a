use pocketd_common::api::builder::{BinaryReport, BuildOutcome, BuildResult, DispatchRequest};
use chrono::NaiveDateTime;
use pocketd_common::api::v1::{
    Archive, CreateSourceReleaseRequest, Distribution, DistroArchSeries, DistroSeries, FileRef,
    Pocket, ScheduleRemovalRequest, Urgency,
};

pub const DUMMY_DISTRIBUTION: &str = "debian";
pub const DUMMY_SERIES: &str = "trixie";
pub const DUMMY_SERIES_VERSION: &str = "13";
pub const DUMMY_ARCHITECTURE: &str = "amd64";
pub const DUMMY_PROCESSOR_FAMILY: &str = "x86_64";
pub const DUMMY_OTHER_ARCHITECTURE: &str = "arm64";
pub const DUMMY_OTHER_PROCESSOR_FAMILY: &str = "aarch64";
pub const DUMMY_COMPONENT: &str = "main";
pub const DUMMY_SECTION: &str = "misc";
pub const DUMMY_SOURCE_PACKAGE: &str = "hello";
pub const DUMMY_VERSION: &str = "2.10-3";
pub const DUMMY_NEWER_VERSION: &str = "2.10-4";
pub const DUMMY_BUILDER: &str = "builder";
pub const DUMMY_OTHER_BUILDER: &str = "other-builder";
pub const DUMMY_BUILD_LOG: &str = "dpkg-buildpackage -b\ndpkg-deb: building package 'hello'\n";

/// What [`crate::actions::create_world`] sets up
#[derive(Debug, Clone)]
pub struct World {
    pub distribution: Distribution,
    pub archive: Archive,
    pub series: DistroSeries,
    pub amd64: DistroArchSeries,
    pub arm64: DistroArchSeries,
}

pub fn dummy_file(filename: &str, seed: u8) -> FileRef {
    FileRef {
        filename: filename.to_string(),
        sha256: format!("{:02x}", seed).repeat(32),
        size: 1024 + seed as i64,
    }
}

pub fn dummy_chroot(architecture: &str) -> FileRef {
    dummy_file(&format!("chroot-{DUMMY_SERIES}-{architecture}.tar.zst"), 200)
}

pub fn source_upload(world: &World, version: &str) -> CreateSourceReleaseRequest {
    CreateSourceReleaseRequest {
        archive_id: world.archive.id,
        distro_series_id: world.series.id,
        name: DUMMY_SOURCE_PACKAGE.to_string(),
        version: version.to_string(),
        build_depends: "debhelper-compat (= 13)".to_string(),
        component: DUMMY_COMPONENT.to_string(),
        section: DUMMY_SECTION.to_string(),
        urgency: Urgency::Medium,
        architecture_hint: DUMMY_ARCHITECTURE.to_string(),
        pocket: Pocket::Release,
        embargo: false,
        files: vec![dummy_file(
            &format!("{DUMMY_SOURCE_PACKAGE}_{version}.dsc"),
            version.len() as u8,
        )],
    }
}

pub fn removal_at(deletion_date: NaiveDateTime) -> ScheduleRemovalRequest {
    ScheduleRemovalRequest { deletion_date }
}

pub fn successful_result(request: &DispatchRequest) -> BuildResult {
    let deb = format!(
        "{}_{}_{}.deb",
        request.name, request.version, request.architecture_tag
    );
    BuildResult {
        build_id: request.build_id,
        outcome: BuildOutcome::Success,
        binaries: vec![BinaryReport {
            name: request.name.clone(),
            version: request.version.clone(),
            architecture_specific: true,
            depends: "libc6 (>= 2.34)".to_string(),
            conflicts: String::new(),
            provides: String::new(),
            component: None,
            section: None,
            priority: Some("optional".to_string()),
            files: vec![dummy_file(&deb, 42)],
        }],
        log: Some(dummy_file(&format!("build-{}.log", request.build_id), 43)),
        log_tail: DUMMY_BUILD_LOG.to_string(),
        dependencies: None,
    }
}

pub fn failed_result(request: &DispatchRequest) -> BuildResult {
    BuildResult {
        build_id: request.build_id,
        outcome: BuildOutcome::Failed,
        binaries: vec![],
        log: None,
        log_tail: "error: compiler exploded\n".to_string(),
        dependencies: None,
    }
}

pub fn dependency_wait_result(request: &DispatchRequest, dependencies: &str) -> BuildResult {
    BuildResult {
        build_id: request.build_id,
        outcome: BuildOutcome::DependencyWait,
        binaries: vec![],
        log: None,
        log_tail: String::new(),
        dependencies: Some(dependencies.to_string()),
    }
}
