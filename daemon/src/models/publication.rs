use crate::models::{BinaryPackageRelease, DistroArchSeries, SourcePackageRelease};
use crate::schema::*;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use pocketd_common::api::v1 as api;
use pocketd_common::api::v1::{Pocket, PublicationKind, PublicationRef, PublishingStatus};
use pocketd_common::errors::*;

#[derive(Identifiable, Queryable, Clone, PartialEq, Eq, Debug)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(table_name = source_publications)]
pub struct SourcePublication {
    pub id: i32,
    pub source_package_release_id: i32,
    pub name: String,
    pub archive_id: i32,
    pub distro_series_id: i32,
    pub pocket: Pocket,
    pub component: String,
    pub section: String,
    pub status: PublishingStatus,
    pub created_at: NaiveDateTime,
    pub published_at: Option<NaiveDateTime>,
    pub superseded_at: Option<NaiveDateTime>,
    pub superseded_by: Option<i32>,
    pub made_pending_at: Option<NaiveDateTime>,
    pub scheduled_deletion_at: Option<NaiveDateTime>,
    pub removed_at: Option<NaiveDateTime>,
    pub embargo: bool,
    pub embargo_lifted_at: Option<NaiveDateTime>,
}

#[derive(Insertable, PartialEq, Eq, Debug, Clone)]
#[diesel(table_name = source_publications)]
pub struct NewSourcePublication {
    pub source_package_release_id: i32,
    pub name: String,
    pub archive_id: i32,
    pub distro_series_id: i32,
    pub pocket: Pocket,
    pub component: String,
    pub section: String,
    pub status: PublishingStatus,
    pub created_at: NaiveDateTime,
    pub embargo: bool,
}

#[derive(Identifiable, Queryable, Clone, PartialEq, Eq, Debug)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(table_name = binary_publications)]
pub struct BinaryPublication {
    pub id: i32,
    pub binary_package_release_id: i32,
    pub name: String,
    pub archive_id: i32,
    pub distro_arch_series_id: i32,
    pub pocket: Pocket,
    pub component: String,
    pub section: String,
    pub priority: String,
    pub status: PublishingStatus,
    pub created_at: NaiveDateTime,
    pub published_at: Option<NaiveDateTime>,
    pub superseded_at: Option<NaiveDateTime>,
    pub superseded_by: Option<i32>,
    pub made_pending_at: Option<NaiveDateTime>,
    pub scheduled_deletion_at: Option<NaiveDateTime>,
    pub removed_at: Option<NaiveDateTime>,
    pub embargo: bool,
    pub embargo_lifted_at: Option<NaiveDateTime>,
}

#[derive(Insertable, PartialEq, Eq, Debug, Clone)]
#[diesel(table_name = binary_publications)]
pub struct NewBinaryPublication {
    pub binary_package_release_id: i32,
    pub name: String,
    pub archive_id: i32,
    pub distro_arch_series_id: i32,
    pub pocket: Pocket,
    pub component: String,
    pub section: String,
    pub priority: String,
    pub status: PublishingStatus,
    pub created_at: NaiveDateTime,
    pub embargo: bool,
}

/// Columns written by one publishing step. Timestamps are only ever set,
/// never cleared, so `None` always means "leave as is".
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct PublicationChange {
    pub status: Option<PublishingStatus>,
    pub published_at: Option<NaiveDateTime>,
    pub superseded_at: Option<NaiveDateTime>,
    pub superseded_by: Option<i32>,
    pub made_pending_at: Option<NaiveDateTime>,
    pub scheduled_deletion_at: Option<NaiveDateTime>,
    pub removed_at: Option<NaiveDateTime>,
    pub embargo: Option<bool>,
    pub embargo_lifted_at: Option<NaiveDateTime>,
    pub component: Option<String>,
    pub section: Option<String>,
    pub priority: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = source_publications)]
struct SourceChangeset<'a> {
    status: Option<PublishingStatus>,
    published_at: Option<NaiveDateTime>,
    superseded_at: Option<NaiveDateTime>,
    superseded_by: Option<i32>,
    made_pending_at: Option<NaiveDateTime>,
    scheduled_deletion_at: Option<NaiveDateTime>,
    removed_at: Option<NaiveDateTime>,
    embargo: Option<bool>,
    embargo_lifted_at: Option<NaiveDateTime>,
    component: Option<&'a str>,
    section: Option<&'a str>,
}

impl<'a> From<&'a PublicationChange> for SourceChangeset<'a> {
    fn from(c: &'a PublicationChange) -> Self {
        SourceChangeset {
            status: c.status,
            published_at: c.published_at,
            superseded_at: c.superseded_at,
            superseded_by: c.superseded_by,
            made_pending_at: c.made_pending_at,
            scheduled_deletion_at: c.scheduled_deletion_at,
            removed_at: c.removed_at,
            embargo: c.embargo,
            embargo_lifted_at: c.embargo_lifted_at,
            component: c.component.as_deref(),
            section: c.section.as_deref(),
        }
    }
}

#[derive(AsChangeset)]
#[diesel(table_name = binary_publications)]
struct BinaryChangeset<'a> {
    status: Option<PublishingStatus>,
    published_at: Option<NaiveDateTime>,
    superseded_at: Option<NaiveDateTime>,
    superseded_by: Option<i32>,
    made_pending_at: Option<NaiveDateTime>,
    scheduled_deletion_at: Option<NaiveDateTime>,
    removed_at: Option<NaiveDateTime>,
    embargo: Option<bool>,
    embargo_lifted_at: Option<NaiveDateTime>,
    component: Option<&'a str>,
    section: Option<&'a str>,
    priority: Option<&'a str>,
}

impl<'a> From<&'a PublicationChange> for BinaryChangeset<'a> {
    fn from(c: &'a PublicationChange) -> Self {
        BinaryChangeset {
            status: c.status,
            published_at: c.published_at,
            superseded_at: c.superseded_at,
            superseded_by: c.superseded_by,
            made_pending_at: c.made_pending_at,
            scheduled_deletion_at: c.scheduled_deletion_at,
            removed_at: c.removed_at,
            embargo: c.embargo,
            embargo_lifted_at: c.embargo_lifted_at,
            component: c.component.as_deref(),
            section: c.section.as_deref(),
            priority: c.priority.as_deref(),
        }
    }
}

/// What the publishing engine needs from either family of records.
///
/// A domination group is (archive, target, pocket, component, name), where
/// the target is the distro series for sources and the distro arch series
/// for binaries.
pub trait PublicationRecord: Sized {
    const KIND: PublicationKind;

    fn get_id(id: i32, connection: &mut SqliteConnection) -> Result<Self>;

    fn id(&self) -> i32;

    /// The source or binary release this record publishes
    fn release_id(&self) -> i32;

    fn status(&self) -> PublishingStatus;

    fn embargo(&self) -> bool;

    fn component(&self) -> &str;

    fn scheduled_deletion_at(&self) -> Option<NaiveDateTime>;

    fn reference(&self) -> PublicationRef {
        PublicationRef {
            kind: Self::KIND,
            id: self.id(),
        }
    }

    /// Writes `change` if the row still has the status and embargo flag this
    /// value was read with, otherwise fails with Conflict.
    fn apply(&self, change: &PublicationChange, connection: &mut SqliteConnection)
        -> Result<()>;

    /// Visible PUBLISHED records of this record's group, with `component`
    /// standing in for the record's own.
    fn visible_rivals(
        &self,
        component: &str,
        connection: &mut SqliteConnection,
    ) -> Result<Vec<Self>>;

    /// PENDING, non-embargoed records in creation order
    fn pending_visible(connection: &mut SqliteConnection) -> Result<Vec<Self>>;

    /// PENDINGREMOVAL records whose deletion date has passed
    fn due_for_removal(now: NaiveDateTime, connection: &mut SqliteConnection)
        -> Result<Vec<Self>>;

    /// Content hashes of the files of the published release
    fn file_hashes(&self, connection: &mut SqliteConnection) -> Result<Vec<String>>;

    fn into_api(self, connection: &mut SqliteConnection) -> Result<api::Publication>;
}

macro_rules! publication_record {
    ($model:ident, $table:ident, $changeset:ident, $kind:expr, $release:ident, $target:ident, $files:ident, $files_release:ident) => {
        impl PublicationRecord for $model {
            const KIND: PublicationKind = $kind;

            fn get_id(my_id: i32, connection: &mut SqliteConnection) -> Result<Self> {
                $table::table
                    .filter($table::id.eq(my_id))
                    .first::<$model>(connection)
                    .optional()?
                    .ok_or_else(|| {
                        ArchiveError::not_found(format!(
                            "{}",
                            PublicationRef {
                                kind: $kind,
                                id: my_id
                            }
                        ))
                    })
            }

            fn id(&self) -> i32 {
                self.id
            }

            fn release_id(&self) -> i32 {
                self.$release
            }

            fn status(&self) -> PublishingStatus {
                self.status
            }

            fn embargo(&self) -> bool {
                self.embargo
            }

            fn component(&self) -> &str {
                &self.component
            }

            fn scheduled_deletion_at(&self) -> Option<NaiveDateTime> {
                self.scheduled_deletion_at
            }

            fn apply(
                &self,
                change: &PublicationChange,
                connection: &mut SqliteConnection,
            ) -> Result<()> {
                let n = diesel::update(
                    $table::table
                        .filter($table::id.eq(self.id))
                        .filter($table::status.eq(self.status))
                        .filter($table::embargo.eq(self.embargo)),
                )
                .set($changeset::from(change))
                .execute(connection)?;

                if n == 0 {
                    return Err(ArchiveError::conflict(format!(
                        "{} changed while it was being updated",
                        self.reference()
                    )));
                }
                Ok(())
            }

            fn visible_rivals(
                &self,
                my_component: &str,
                connection: &mut SqliteConnection,
            ) -> Result<Vec<Self>> {
                let records = $table::table
                    .filter($table::archive_id.eq(self.archive_id))
                    .filter($table::$target.eq(self.$target))
                    .filter($table::pocket.eq(self.pocket))
                    .filter($table::component.eq(my_component))
                    .filter($table::name.eq(&self.name))
                    .filter($table::status.eq(PublishingStatus::Published))
                    .filter($table::embargo.eq(false))
                    .filter($table::id.ne(self.id))
                    .order_by($table::id)
                    .load::<$model>(connection)?;
                Ok(records)
            }

            fn pending_visible(connection: &mut SqliteConnection) -> Result<Vec<Self>> {
                let records = $table::table
                    .filter($table::status.eq(PublishingStatus::Pending))
                    .filter($table::embargo.eq(false))
                    .order_by(($table::created_at, $table::id))
                    .load::<$model>(connection)?;
                Ok(records)
            }

            fn due_for_removal(
                now: NaiveDateTime,
                connection: &mut SqliteConnection,
            ) -> Result<Vec<Self>> {
                let records = $table::table
                    .filter($table::status.eq(PublishingStatus::PendingRemoval))
                    .filter($table::scheduled_deletion_at.le(now))
                    .order_by($table::id)
                    .load::<$model>(connection)?;
                Ok(records)
            }

            fn file_hashes(&self, connection: &mut SqliteConnection) -> Result<Vec<String>> {
                let hashes = $files::table
                    .inner_join(library_files::table)
                    .filter($files::$files_release.eq(self.$release))
                    .select(library_files::sha256)
                    .distinct()
                    .load::<String>(connection)?;
                Ok(hashes)
            }

            fn into_api(self, connection: &mut SqliteConnection) -> Result<api::Publication> {
                self.api_view(connection)
            }
        }
    };
}

publication_record!(
    SourcePublication,
    source_publications,
    SourceChangeset,
    PublicationKind::Source,
    source_package_release_id,
    distro_series_id,
    source_package_release_files,
    source_package_release_id
);

publication_record!(
    BinaryPublication,
    binary_publications,
    BinaryChangeset,
    PublicationKind::Binary,
    binary_package_release_id,
    distro_arch_series_id,
    binary_package_release_files,
    binary_package_release_id
);

impl SourcePublication {
    /// The record publishing a release into the given archive and pocket
    pub fn find_for_release(
        my_release_id: i32,
        my_archive_id: i32,
        my_pocket: Pocket,
        connection: &mut SqliteConnection,
    ) -> Result<Option<SourcePublication>> {
        let record = source_publications::table
            .filter(source_publications::source_package_release_id.eq(my_release_id))
            .filter(source_publications::archive_id.eq(my_archive_id))
            .filter(source_publications::pocket.eq(my_pocket))
            .order_by(source_publications::id.desc())
            .first::<SourcePublication>(connection)
            .optional()?;
        Ok(record)
    }

    pub fn list_published(
        my_archive_id: i32,
        my_series_id: i32,
        my_pocket: Pocket,
        connection: &mut SqliteConnection,
    ) -> Result<Vec<SourcePublication>> {
        let records = source_publications::table
            .filter(source_publications::archive_id.eq(my_archive_id))
            .filter(source_publications::distro_series_id.eq(my_series_id))
            .filter(source_publications::pocket.eq(my_pocket))
            .filter(source_publications::status.eq(PublishingStatus::Published))
            .filter(source_publications::embargo.eq(false))
            .load::<SourcePublication>(connection)?;
        Ok(records)
    }

    fn api_view(self, connection: &mut SqliteConnection) -> Result<api::Publication> {
        let release = SourcePackageRelease::get_id(self.source_package_release_id, connection)?;
        Ok(api::Publication {
            id: self.id,
            kind: PublicationKind::Source,
            name: self.name,
            version: release.version,
            release_id: self.source_package_release_id,
            archive_id: self.archive_id,
            distro_series_id: self.distro_series_id,
            distro_arch_series_id: None,
            architecture_tag: None,
            pocket: self.pocket,
            component: self.component,
            section: self.section,
            priority: None,
            status: self.status,
            created_at: self.created_at,
            published_at: self.published_at,
            superseded_at: self.superseded_at,
            superseded_by: self.superseded_by,
            made_pending_at: self.made_pending_at,
            scheduled_deletion_at: self.scheduled_deletion_at,
            removed_at: self.removed_at,
            embargo: self.embargo,
            embargo_lifted_at: self.embargo_lifted_at,
        })
    }
}

impl BinaryPublication {
    pub fn list_for_release(
        my_release_id: i32,
        connection: &mut SqliteConnection,
    ) -> Result<Vec<BinaryPublication>> {
        let records = binary_publications::table
            .filter(binary_publications::binary_package_release_id.eq(my_release_id))
            .order_by(binary_publications::id)
            .load::<BinaryPublication>(connection)?;
        Ok(records)
    }

    pub fn list_published(
        my_archive_id: i32,
        my_series_id: i32,
        my_pocket: Pocket,
        connection: &mut SqliteConnection,
    ) -> Result<Vec<BinaryPublication>> {
        let records = binary_publications::table
            .inner_join(distro_arch_series::table)
            .filter(binary_publications::archive_id.eq(my_archive_id))
            .filter(distro_arch_series::distro_series_id.eq(my_series_id))
            .filter(binary_publications::pocket.eq(my_pocket))
            .filter(binary_publications::status.eq(PublishingStatus::Published))
            .filter(binary_publications::embargo.eq(false))
            .select(binary_publications::all_columns)
            .load::<BinaryPublication>(connection)?;
        Ok(records)
    }

    /// Binaries a build may resolve its dependencies against: visible and
    /// PUBLISHED in one of `archives`, in one of `pockets`, for the arch series.
    pub fn visible_binaries(
        archives: &[i32],
        my_arch_series_id: i32,
        pockets: &[Pocket],
        connection: &mut SqliteConnection,
    ) -> Result<Vec<BinaryPackageRelease>> {
        let records = binary_publications::table
            .inner_join(binary_package_releases::table)
            .filter(binary_publications::archive_id.eq_any(archives))
            .filter(binary_publications::distro_arch_series_id.eq(my_arch_series_id))
            .filter(binary_publications::pocket.eq_any(pockets))
            .filter(binary_publications::status.eq(PublishingStatus::Published))
            .filter(binary_publications::embargo.eq(false))
            .select(binary_package_releases::all_columns)
            .load::<BinaryPackageRelease>(connection)?;
        Ok(records)
    }

    fn api_view(self, connection: &mut SqliteConnection) -> Result<api::Publication> {
        let release = BinaryPackageRelease::get_id(self.binary_package_release_id, connection)?;
        let arch_series = DistroArchSeries::get_id(self.distro_arch_series_id, connection)?;
        Ok(api::Publication {
            id: self.id,
            kind: PublicationKind::Binary,
            name: self.name,
            version: release.version,
            release_id: self.binary_package_release_id,
            archive_id: self.archive_id,
            distro_series_id: arch_series.distro_series_id,
            distro_arch_series_id: Some(self.distro_arch_series_id),
            architecture_tag: Some(arch_series.architecture_tag),
            pocket: self.pocket,
            component: self.component,
            section: self.section,
            priority: Some(self.priority),
            status: self.status,
            created_at: self.created_at,
            published_at: self.published_at,
            superseded_at: self.superseded_at,
            superseded_by: self.superseded_by,
            made_pending_at: self.made_pending_at,
            scheduled_deletion_at: self.scheduled_deletion_at,
            removed_at: self.removed_at,
            embargo: self.embargo,
            embargo_lifted_at: self.embargo_lifted_at,
        })
    }
}

impl NewSourcePublication {
    pub fn insert(&self, connection: &mut SqliteConnection) -> Result<i32> {
        let id = diesel::insert_into(source_publications::table)
            .values(self)
            .returning(source_publications::id)
            .get_result::<i32>(connection)?;
        Ok(id)
    }
}

impl NewBinaryPublication {
    pub fn insert(&self, connection: &mut SqliteConnection) -> Result<i32> {
        let id = diesel::insert_into(binary_publications::table)
            .values(self)
            .returning(binary_publications::id)
            .get_result::<i32>(connection)?;
        Ok(id)
    }
}

/// Whether anything other than `exclude` still needs a file with this content.
///
/// Counts publishing records of either family that are not REMOVED, and
/// chroots of arch series.
pub fn sha256_in_use(
    my_sha256: &str,
    exclude: PublicationRef,
    connection: &mut SqliteConnection,
) -> Result<bool> {
    let mut sources = source_publications::table
        .inner_join(
            source_package_release_files::table.on(
                source_package_release_files::source_package_release_id
                    .eq(source_publications::source_package_release_id),
            ),
        )
        .inner_join(
            library_files::table
                .on(library_files::id.eq(source_package_release_files::library_file_id)),
        )
        .filter(library_files::sha256.eq(my_sha256))
        .filter(source_publications::status.ne(PublishingStatus::Removed))
        .select(source_publications::id)
        .into_boxed();
    if exclude.kind == PublicationKind::Source {
        sources = sources.filter(source_publications::id.ne(exclude.id));
    }
    if sources.first::<i32>(connection).optional()?.is_some() {
        return Ok(true);
    }

    let mut binaries = binary_publications::table
        .inner_join(
            binary_package_release_files::table.on(
                binary_package_release_files::binary_package_release_id
                    .eq(binary_publications::binary_package_release_id),
            ),
        )
        .inner_join(
            library_files::table
                .on(library_files::id.eq(binary_package_release_files::library_file_id)),
        )
        .filter(library_files::sha256.eq(my_sha256))
        .filter(binary_publications::status.ne(PublishingStatus::Removed))
        .select(binary_publications::id)
        .into_boxed();
    if exclude.kind == PublicationKind::Binary {
        binaries = binaries.filter(binary_publications::id.ne(exclude.id));
    }
    if binaries.first::<i32>(connection).optional()?.is_some() {
        return Ok(true);
    }

    let chroots = distro_arch_series::table
        .inner_join(
            library_files::table
                .on(distro_arch_series::chroot_file_id.eq(library_files::id.nullable())),
        )
        .filter(library_files::sha256.eq(my_sha256))
        .select(distro_arch_series::id)
        .first::<i32>(connection)
        .optional()?;
    Ok(chroots.is_some())
}
