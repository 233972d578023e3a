use crate::models::LibraryFile;
use crate::schema::*;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use pocketd_common::api::v1 as api;
use pocketd_common::api::v1::ArchivePurpose;
use pocketd_common::errors::*;

#[derive(Identifiable, Queryable, Clone, PartialEq, Eq, Debug)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(table_name = distributions)]
pub struct Distribution {
    pub id: i32,
    pub name: String,
}

#[derive(Insertable, PartialEq, Eq, Debug, Clone)]
#[diesel(table_name = distributions)]
pub struct NewDistribution {
    pub name: String,
}

impl Distribution {
    pub fn get_id(my_id: i32, connection: &mut SqliteConnection) -> Result<Distribution> {
        distributions::table
            .filter(distributions::id.eq(my_id))
            .first::<Distribution>(connection)
            .optional()?
            .ok_or_else(|| ArchiveError::not_found(format!("distribution {my_id}")))
    }

    pub fn list(connection: &mut SqliteConnection) -> Result<Vec<Distribution>> {
        let records = distributions::table
            .order_by(distributions::id)
            .load::<Distribution>(connection)?;
        Ok(records)
    }

    pub fn into_api(self, connection: &mut SqliteConnection) -> Result<api::Distribution> {
        let main_archive_id = Archive::main_for(self.id, connection)?.map(|a| a.id);
        Ok(api::Distribution {
            id: self.id,
            name: self.name,
            main_archive_id,
        })
    }
}

impl NewDistribution {
    pub fn insert(&self, connection: &mut SqliteConnection) -> Result<i32> {
        let id = diesel::insert_into(distributions::table)
            .values(self)
            .returning(distributions::id)
            .get_result::<i32>(connection)?;
        Ok(id)
    }
}

#[derive(Identifiable, Queryable, Clone, PartialEq, Eq, Debug)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(table_name = archives)]
pub struct Archive {
    pub id: i32,
    pub distribution_id: i32,
    pub owner: Option<String>,
    pub name: String,
    pub purpose: ArchivePurpose,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, PartialEq, Eq, Debug, Clone)]
#[diesel(table_name = archives)]
pub struct NewArchive {
    pub distribution_id: i32,
    pub owner: Option<String>,
    pub name: String,
    pub purpose: ArchivePurpose,
    pub created_at: NaiveDateTime,
}

impl Archive {
    pub fn get_id(my_id: i32, connection: &mut SqliteConnection) -> Result<Archive> {
        archives::table
            .filter(archives::id.eq(my_id))
            .first::<Archive>(connection)
            .optional()?
            .ok_or_else(|| ArchiveError::not_found(format!("archive {my_id}")))
    }

    pub fn list(connection: &mut SqliteConnection) -> Result<Vec<Archive>> {
        let records = archives::table
            .order_by(archives::id)
            .load::<Archive>(connection)?;
        Ok(records)
    }

    pub fn main_for(
        my_distribution_id: i32,
        connection: &mut SqliteConnection,
    ) -> Result<Option<Archive>> {
        let archive = archives::table
            .filter(archives::distribution_id.eq(my_distribution_id))
            .filter(archives::purpose.eq(ArchivePurpose::Main))
            .first::<Archive>(connection)
            .optional()?;
        Ok(archive)
    }

    /// Archives whose published binaries satisfy build dependencies of this one
    pub fn dependency_archives(&self, connection: &mut SqliteConnection) -> Result<Vec<i32>> {
        let mut ids = vec![self.id];
        if self.purpose == ArchivePurpose::Personal {
            if let Some(main) = Self::main_for(self.distribution_id, connection)? {
                ids.push(main.id);
            }
        }
        Ok(ids)
    }
}

impl From<Archive> for api::Archive {
    fn from(archive: Archive) -> api::Archive {
        api::Archive {
            id: archive.id,
            distribution_id: archive.distribution_id,
            owner: archive.owner,
            name: archive.name,
            purpose: archive.purpose,
            created_at: archive.created_at,
        }
    }
}

impl NewArchive {
    pub fn insert(&self, connection: &mut SqliteConnection) -> Result<i32> {
        let id = diesel::insert_into(archives::table)
            .values(self)
            .returning(archives::id)
            .get_result::<i32>(connection)?;
        Ok(id)
    }
}

#[derive(Identifiable, Queryable, Clone, PartialEq, Eq, Debug)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(table_name = distro_series)]
pub struct DistroSeries {
    pub id: i32,
    pub distribution_id: i32,
    pub name: String,
    pub version: String,
}

#[derive(Insertable, PartialEq, Eq, Debug, Clone)]
#[diesel(table_name = distro_series)]
pub struct NewDistroSeries {
    pub distribution_id: i32,
    pub name: String,
    pub version: String,
}

impl DistroSeries {
    pub fn get_id(my_id: i32, connection: &mut SqliteConnection) -> Result<DistroSeries> {
        distro_series::table
            .filter(distro_series::id.eq(my_id))
            .first::<DistroSeries>(connection)
            .optional()?
            .ok_or_else(|| ArchiveError::not_found(format!("distro series {my_id}")))
    }

    pub fn list(connection: &mut SqliteConnection) -> Result<Vec<DistroSeries>> {
        let records = distro_series::table
            .order_by(distro_series::id)
            .load::<DistroSeries>(connection)?;
        Ok(records)
    }
}

impl From<DistroSeries> for api::DistroSeries {
    fn from(series: DistroSeries) -> api::DistroSeries {
        api::DistroSeries {
            id: series.id,
            distribution_id: series.distribution_id,
            name: series.name,
            version: series.version,
        }
    }
}

impl NewDistroSeries {
    pub fn insert(&self, connection: &mut SqliteConnection) -> Result<i32> {
        let id = diesel::insert_into(distro_series::table)
            .values(self)
            .returning(distro_series::id)
            .get_result::<i32>(connection)?;
        Ok(id)
    }
}

#[derive(Identifiable, Queryable, Clone, PartialEq, Eq, Debug)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(table_name = distro_arch_series)]
pub struct DistroArchSeries {
    pub id: i32,
    pub distro_series_id: i32,
    pub architecture_tag: String,
    pub processor_family: String,
    pub chroot_file_id: Option<i32>,
}

#[derive(Insertable, PartialEq, Eq, Debug, Clone)]
#[diesel(table_name = distro_arch_series)]
pub struct NewDistroArchSeries {
    pub distro_series_id: i32,
    pub architecture_tag: String,
    pub processor_family: String,
    pub chroot_file_id: Option<i32>,
}

impl DistroArchSeries {
    pub fn get_id(my_id: i32, connection: &mut SqliteConnection) -> Result<DistroArchSeries> {
        distro_arch_series::table
            .filter(distro_arch_series::id.eq(my_id))
            .first::<DistroArchSeries>(connection)
            .optional()?
            .ok_or_else(|| ArchiveError::not_found(format!("distro arch series {my_id}")))
    }

    pub fn list(connection: &mut SqliteConnection) -> Result<Vec<DistroArchSeries>> {
        let records = distro_arch_series::table
            .order_by(distro_arch_series::id)
            .load::<DistroArchSeries>(connection)?;
        Ok(records)
    }

    /// All arch series of a series, the first one builds architecture independent packages
    pub fn list_for_series(
        my_series_id: i32,
        connection: &mut SqliteConnection,
    ) -> Result<Vec<DistroArchSeries>> {
        let records = distro_arch_series::table
            .filter(distro_arch_series::distro_series_id.eq(my_series_id))
            .order_by(distro_arch_series::id)
            .load::<DistroArchSeries>(connection)?;
        Ok(records)
    }

    pub fn set_chroot(&self, file_id: i32, connection: &mut SqliteConnection) -> Result<()> {
        diesel::update(distro_arch_series::table.filter(distro_arch_series::id.eq(self.id)))
            .set(distro_arch_series::chroot_file_id.eq(Some(file_id)))
            .execute(connection)?;
        Ok(())
    }

    pub fn into_api(self, connection: &mut SqliteConnection) -> Result<api::DistroArchSeries> {
        let chroot = LibraryFile::load_ref(self.chroot_file_id, connection)?;
        Ok(api::DistroArchSeries {
            id: self.id,
            distro_series_id: self.distro_series_id,
            architecture_tag: self.architecture_tag,
            processor_family: self.processor_family,
            chroot,
        })
    }
}

impl NewDistroArchSeries {
    pub fn insert(&self, connection: &mut SqliteConnection) -> Result<i32> {
        let id = diesel::insert_into(distro_arch_series::table)
            .values(self)
            .returning(distro_arch_series::id)
            .get_result::<i32>(connection)?;
        Ok(id)
    }
}
