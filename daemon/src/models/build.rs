use crate::models::{DistroArchSeries, LibraryFile, SourcePackageRelease};
use crate::schema::*;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use pocketd_common::api::v1 as api;
use pocketd_common::api::v1::{BuildFilter, BuildState, Pocket};
use pocketd_common::errors::*;

#[derive(Identifiable, Queryable, Clone, PartialEq, Eq, Debug)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(table_name = builds)]
pub struct Build {
    pub id: i32,
    pub source_package_release_id: i32,
    pub archive_id: i32,
    pub distro_arch_series_id: i32,
    pub pocket: Pocket,
    pub state: BuildState,
    pub created_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub builder_id: Option<i32>,
    pub dependencies: Option<String>,
    pub log_file_id: Option<i32>,
    pub log_tail: Option<String>,
    pub retries: i32,
    pub manual_attention: bool,
    pub failure_note: Option<String>,
}

#[derive(Insertable, PartialEq, Eq, Debug, Clone)]
#[diesel(table_name = builds)]
pub struct NewBuild {
    pub source_package_release_id: i32,
    pub archive_id: i32,
    pub distro_arch_series_id: i32,
    pub pocket: Pocket,
    pub state: BuildState,
    pub created_at: NaiveDateTime,
}

/// Fields written together with a state change, `None` leaves a column untouched.
#[derive(AsChangeset, Default, Debug, Clone)]
#[diesel(table_name = builds)]
pub struct BuildUpdate {
    pub state: Option<BuildState>,
    pub started_at: Option<Option<NaiveDateTime>>,
    pub finished_at: Option<Option<NaiveDateTime>>,
    pub builder_id: Option<Option<i32>>,
    pub dependencies: Option<Option<String>>,
    pub log_file_id: Option<Option<i32>>,
    pub log_tail: Option<Option<String>>,
    pub retries: Option<i32>,
    pub manual_attention: Option<bool>,
    pub failure_note: Option<Option<String>>,
}

impl Build {
    pub fn get_id(my_id: i32, connection: &mut SqliteConnection) -> Result<Build> {
        builds::table
            .filter(builds::id.eq(my_id))
            .first::<Build>(connection)
            .optional()?
            .ok_or_else(|| ArchiveError::not_found(format!("build {my_id}")))
    }

    pub fn list(filter: &BuildFilter, connection: &mut SqliteConnection) -> Result<Vec<Build>> {
        let mut query = builds::table
            .inner_join(source_package_releases::table)
            .select(builds::all_columns)
            .order_by(builds::id)
            .into_boxed();

        if let Some(state) = filter.state {
            query = query.filter(builds::state.eq(state));
        }
        if let Some(archive_id) = filter.archive_id {
            query = query.filter(builds::archive_id.eq(archive_id));
        }
        if let Some(name) = &filter.name {
            query = query.filter(source_package_releases::name.eq(name.clone()));
        }

        let records = query.load::<Build>(connection)?;
        Ok(records)
    }

    pub fn list_by_state(
        my_state: BuildState,
        connection: &mut SqliteConnection,
    ) -> Result<Vec<Build>> {
        let records = builds::table
            .filter(builds::state.eq(my_state))
            .order_by(builds::id)
            .load::<Build>(connection)?;
        Ok(records)
    }

    pub fn list_for_source(
        my_source_id: i32,
        connection: &mut SqliteConnection,
    ) -> Result<Vec<Build>> {
        let records = builds::table
            .filter(builds::source_package_release_id.eq(my_source_id))
            .order_by(builds::id)
            .load::<Build>(connection)?;
        Ok(records)
    }

    /// Builds of the same package in an archive and arch series, along with their versions
    pub fn list_for_package(
        my_archive_id: i32,
        my_arch_series_id: i32,
        my_name: &str,
        connection: &mut SqliteConnection,
    ) -> Result<Vec<(Build, String)>> {
        let records = builds::table
            .inner_join(source_package_releases::table)
            .filter(builds::archive_id.eq(my_archive_id))
            .filter(builds::distro_arch_series_id.eq(my_arch_series_id))
            .filter(source_package_releases::name.eq(my_name))
            .select((builds::all_columns, source_package_releases::version))
            .order_by(builds::id)
            .load::<(Build, String)>(connection)?;
        Ok(records)
    }

    /// Moves the build to `to`, writing `update` in the same statement.
    ///
    /// The row is only touched if it is still in the state this value was read
    /// in, losing that race is a Conflict.
    pub fn transition(
        &self,
        to: BuildState,
        mut update: BuildUpdate,
        connection: &mut SqliteConnection,
    ) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(ArchiveError::invalid_transition(format!(
                "build {}: {} -> {}",
                self.id, self.state, to
            )));
        }

        update.state = Some(to);
        let n = diesel::update(
            builds::table
                .filter(builds::id.eq(self.id))
                .filter(builds::state.eq(self.state)),
        )
        .set(&update)
        .execute(connection)?;

        if n == 0 {
            return Err(ArchiveError::conflict(format!(
                "build {} is no longer {}",
                self.id, self.state
            )));
        }

        info!("Build {}: {} -> {}", self.id, self.state, to);
        Ok(())
    }

    pub fn set_log_tail(
        my_id: i32,
        tail: &str,
        connection: &mut SqliteConnection,
    ) -> Result<()> {
        diesel::update(builds::table.filter(builds::id.eq(my_id)))
            .set(builds::log_tail.eq(Some(tail)))
            .execute(connection)?;
        Ok(())
    }

    pub fn into_api(self, connection: &mut SqliteConnection) -> Result<api::Build> {
        let source = SourcePackageRelease::get_id(self.source_package_release_id, connection)?;
        let arch_series = DistroArchSeries::get_id(self.distro_arch_series_id, connection)?;
        let log = LibraryFile::load_ref(self.log_file_id, connection)?;

        Ok(api::Build {
            id: self.id,
            source_release_id: self.source_package_release_id,
            archive_id: self.archive_id,
            distro_arch_series_id: self.distro_arch_series_id,
            architecture_tag: arch_series.architecture_tag,
            pocket: self.pocket,
            name: source.name,
            version: source.version,
            state: self.state,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            builder_id: self.builder_id,
            dependencies: self.dependencies,
            log,
            log_tail: self.log_tail,
            retries: self.retries,
            manual_attention: self.manual_attention,
            failure_note: self.failure_note,
        })
    }
}

impl NewBuild {
    pub fn insert(&self, connection: &mut SqliteConnection) -> Result<i32> {
        let id = diesel::insert_into(builds::table)
            .values(self)
            .returning(builds::id)
            .get_result::<i32>(connection)?;
        Ok(id)
    }
}
