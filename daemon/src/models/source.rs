use crate::models::LibraryFile;
use crate::schema::*;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use pocketd_common::api::v1 as api;
use pocketd_common::api::v1::{FileRef, Pocket, Urgency};
use pocketd_common::errors::*;

#[derive(Identifiable, Queryable, Clone, PartialEq, Eq, Debug)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(table_name = source_package_releases)]
pub struct SourcePackageRelease {
    pub id: i32,
    pub archive_id: i32,
    pub distro_series_id: i32,
    pub name: String,
    pub version: String,
    pub build_depends: String,
    pub component: String,
    pub section: String,
    pub urgency: Urgency,
    pub architecture_hint: String,
    pub pocket: Pocket,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, PartialEq, Eq, Debug, Clone)]
#[diesel(table_name = source_package_releases)]
pub struct NewSourcePackageRelease {
    pub archive_id: i32,
    pub distro_series_id: i32,
    pub name: String,
    pub version: String,
    pub build_depends: String,
    pub component: String,
    pub section: String,
    pub urgency: Urgency,
    pub architecture_hint: String,
    pub pocket: Pocket,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, PartialEq, Eq, Debug, Clone)]
#[diesel(table_name = source_package_release_files)]
pub struct NewSourcePackageReleaseFile {
    pub source_package_release_id: i32,
    pub library_file_id: i32,
}

impl SourcePackageRelease {
    pub fn get_id(my_id: i32, connection: &mut SqliteConnection) -> Result<SourcePackageRelease> {
        source_package_releases::table
            .filter(source_package_releases::id.eq(my_id))
            .first::<SourcePackageRelease>(connection)
            .optional()?
            .ok_or_else(|| ArchiveError::not_found(format!("source release {my_id}")))
    }

    pub fn find(
        my_archive_id: i32,
        my_series_id: i32,
        my_name: &str,
        my_version: &str,
        connection: &mut SqliteConnection,
    ) -> Result<Option<SourcePackageRelease>> {
        let release = source_package_releases::table
            .filter(source_package_releases::archive_id.eq(my_archive_id))
            .filter(source_package_releases::distro_series_id.eq(my_series_id))
            .filter(source_package_releases::name.eq(my_name))
            .filter(source_package_releases::version.eq(my_version))
            .first::<SourcePackageRelease>(connection)
            .optional()?;
        Ok(release)
    }

    pub fn files(&self, connection: &mut SqliteConnection) -> Result<Vec<FileRef>> {
        let files = source_package_release_files::table
            .inner_join(library_files::table)
            .filter(source_package_release_files::source_package_release_id.eq(self.id))
            .order_by(source_package_release_files::id)
            .select((
                library_files::id,
                library_files::filename,
                library_files::sha256,
                library_files::size,
                library_files::created_at,
                library_files::deleted_at,
            ))
            .load::<LibraryFile>(connection)?;
        Ok(files.iter().map(LibraryFile::to_ref).collect())
    }

    pub fn into_api(self, connection: &mut SqliteConnection) -> Result<api::SourceRelease> {
        let files = self.files(connection)?;
        Ok(api::SourceRelease {
            id: self.id,
            archive_id: self.archive_id,
            distro_series_id: self.distro_series_id,
            name: self.name,
            version: self.version,
            build_depends: self.build_depends,
            component: self.component,
            section: self.section,
            urgency: self.urgency,
            architecture_hint: self.architecture_hint,
            pocket: self.pocket,
            created_at: self.created_at,
            files,
        })
    }
}

impl NewSourcePackageRelease {
    pub fn insert(&self, connection: &mut SqliteConnection) -> Result<i32> {
        let id = diesel::insert_into(source_package_releases::table)
            .values(self)
            .returning(source_package_releases::id)
            .get_result::<i32>(connection)?;
        Ok(id)
    }
}

impl NewSourcePackageReleaseFile {
    pub fn insert_batch(
        files: &[NewSourcePackageReleaseFile],
        connection: &mut SqliteConnection,
    ) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }
        diesel::insert_into(source_package_release_files::table)
            .values(files)
            .execute(connection)?;
        Ok(())
    }
}
