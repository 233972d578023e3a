use crate::models::LibraryFile;
use crate::schema::*;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use pocketd_common::api::v1 as api;
use pocketd_common::api::v1::FileRef;
use pocketd_common::errors::*;

#[derive(Identifiable, Queryable, Clone, PartialEq, Eq, Debug)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(table_name = binary_package_releases)]
pub struct BinaryPackageRelease {
    pub id: i32,
    pub build_id: i32,
    pub name: String,
    pub version: String,
    pub architecture_specific: bool,
    pub depends: String,
    pub conflicts: String,
    pub provides: String,
    pub component: String,
    pub section: String,
    pub priority: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, PartialEq, Eq, Debug, Clone)]
#[diesel(table_name = binary_package_releases)]
pub struct NewBinaryPackageRelease {
    pub build_id: i32,
    pub name: String,
    pub version: String,
    pub architecture_specific: bool,
    pub depends: String,
    pub conflicts: String,
    pub provides: String,
    pub component: String,
    pub section: String,
    pub priority: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, PartialEq, Eq, Debug, Clone)]
#[diesel(table_name = binary_package_release_files)]
pub struct NewBinaryPackageReleaseFile {
    pub binary_package_release_id: i32,
    pub library_file_id: i32,
}

impl BinaryPackageRelease {
    pub fn get_id(my_id: i32, connection: &mut SqliteConnection) -> Result<BinaryPackageRelease> {
        binary_package_releases::table
            .filter(binary_package_releases::id.eq(my_id))
            .first::<BinaryPackageRelease>(connection)
            .optional()?
            .ok_or_else(|| ArchiveError::not_found(format!("binary release {my_id}")))
    }

    pub fn find(
        my_build_id: i32,
        my_name: &str,
        connection: &mut SqliteConnection,
    ) -> Result<Option<BinaryPackageRelease>> {
        let release = binary_package_releases::table
            .filter(binary_package_releases::build_id.eq(my_build_id))
            .filter(binary_package_releases::name.eq(my_name))
            .first::<BinaryPackageRelease>(connection)
            .optional()?;
        Ok(release)
    }

    pub fn list_for_build(
        my_build_id: i32,
        connection: &mut SqliteConnection,
    ) -> Result<Vec<BinaryPackageRelease>> {
        let records = binary_package_releases::table
            .filter(binary_package_releases::build_id.eq(my_build_id))
            .order_by(binary_package_releases::id)
            .load::<BinaryPackageRelease>(connection)?;
        Ok(records)
    }

    pub fn files(&self, connection: &mut SqliteConnection) -> Result<Vec<FileRef>> {
        let files = binary_package_release_files::table
            .inner_join(library_files::table)
            .filter(binary_package_release_files::binary_package_release_id.eq(self.id))
            .order_by(binary_package_release_files::id)
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

    pub fn into_api(self, connection: &mut SqliteConnection) -> Result<api::BinaryRelease> {
        let files = self.files(connection)?;
        Ok(api::BinaryRelease {
            id: self.id,
            build_id: self.build_id,
            name: self.name,
            version: self.version,
            architecture_specific: self.architecture_specific,
            depends: self.depends,
            conflicts: self.conflicts,
            provides: self.provides,
            component: self.component,
            section: self.section,
            priority: self.priority,
            created_at: self.created_at,
            files,
        })
    }
}

impl NewBinaryPackageRelease {
    pub fn insert(&self, connection: &mut SqliteConnection) -> Result<i32> {
        let id = diesel::insert_into(binary_package_releases::table)
            .values(self)
            .returning(binary_package_releases::id)
            .get_result::<i32>(connection)?;
        Ok(id)
    }
}

impl NewBinaryPackageReleaseFile {
    pub fn insert_batch(
        files: &[NewBinaryPackageReleaseFile],
        connection: &mut SqliteConnection,
    ) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }
        diesel::insert_into(binary_package_release_files::table)
            .values(files)
            .execute(connection)?;
        Ok(())
    }
}
