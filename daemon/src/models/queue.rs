use crate::models::{Build, SourcePackageRelease};
use crate::schema::*;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use pocketd_common::api::v1 as api;
use pocketd_common::errors::*;

/// A row of the build queue, one per build in NEEDSBUILD or BUILDING.
#[derive(Identifiable, Queryable, Clone, PartialEq, Eq, Debug)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(table_name = build_queue)]
pub struct Ticket {
    pub id: i32,
    pub build_id: i32,
    pub builder_id: Option<i32>,
    pub score: i32,
    pub manual: bool,
    /// Score was set by an operator, scheduler passes leave it alone
    pub pinned: bool,
    pub log_tail: Option<String>,
    pub created_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub last_ping: Option<NaiveDateTime>,
    pub not_before: Option<NaiveDateTime>,
}

#[derive(Insertable, PartialEq, Eq, Debug, Clone)]
#[diesel(table_name = build_queue)]
pub struct NewTicket {
    pub build_id: i32,
    pub score: i32,
    pub manual: bool,
    pub created_at: NaiveDateTime,
    pub not_before: Option<NaiveDateTime>,
}

impl Ticket {
    pub fn get_for_build(
        my_build_id: i32,
        connection: &mut SqliteConnection,
    ) -> Result<Option<Ticket>> {
        let ticket = build_queue::table
            .filter(build_queue::build_id.eq(my_build_id))
            .first::<Ticket>(connection)
            .optional()?;
        Ok(ticket)
    }

    pub fn get_for_builder(
        my_builder_id: i32,
        connection: &mut SqliteConnection,
    ) -> Result<Option<Ticket>> {
        let ticket = build_queue::table
            .filter(build_queue::builder_id.eq(my_builder_id))
            .first::<Ticket>(connection)
            .optional()?;
        Ok(ticket)
    }

    /// The whole queue in dispatch order
    pub fn list(connection: &mut SqliteConnection) -> Result<Vec<Ticket>> {
        let records = build_queue::table
            .order_by((
                build_queue::score.desc(),
                build_queue::created_at,
                build_queue::id,
            ))
            .load::<Ticket>(connection)?;
        Ok(records)
    }

    pub fn list_waiting(connection: &mut SqliteConnection) -> Result<Vec<Ticket>> {
        let records = build_queue::table
            .filter(build_queue::builder_id.is_null())
            .order_by((
                build_queue::score.desc(),
                build_queue::created_at,
                build_queue::id,
            ))
            .load::<Ticket>(connection)?;
        Ok(records)
    }

    pub fn list_assigned(connection: &mut SqliteConnection) -> Result<Vec<Ticket>> {
        let records = build_queue::table
            .filter(build_queue::builder_id.is_not_null())
            .order_by(build_queue::id)
            .load::<Ticket>(connection)?;
        Ok(records)
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.not_before.map_or(true, |t| t <= now)
    }

    /// Hands the ticket to a builder.
    ///
    /// Only succeeds while the ticket is unassigned, the unique index on
    /// `builder_id` refuses a second ticket for the same builder. Returns false
    /// if either side was taken in the meantime.
    pub fn assign(
        my_id: i32,
        my_builder_id: i32,
        now: NaiveDateTime,
        connection: &mut SqliteConnection,
    ) -> Result<bool> {
        let result = diesel::update(
            build_queue::table
                .filter(build_queue::id.eq(my_id))
                .filter(build_queue::builder_id.is_null()),
        )
        .set((
            build_queue::builder_id.eq(Some(my_builder_id)),
            build_queue::started_at.eq(Some(now)),
            build_queue::last_ping.eq(Some(now)),
        ))
        .execute(connection);

        match result {
            Ok(n) => Ok(n == 1),
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the ticket to the waiting pool
    pub fn unassign(
        my_id: i32,
        not_before: Option<NaiveDateTime>,
        connection: &mut SqliteConnection,
    ) -> Result<()> {
        diesel::update(build_queue::table.filter(build_queue::id.eq(my_id)))
            .set((
                build_queue::builder_id.eq(Option::<i32>::None),
                build_queue::started_at.eq(Option::<NaiveDateTime>::None),
                build_queue::last_ping.eq(Option::<NaiveDateTime>::None),
                build_queue::not_before.eq(not_before),
            ))
            .execute(connection)?;
        Ok(())
    }

    pub fn set_score(my_id: i32, my_score: i32, connection: &mut SqliteConnection) -> Result<()> {
        diesel::update(build_queue::table.filter(build_queue::id.eq(my_id)))
            .set(build_queue::score.eq(my_score))
            .execute(connection)?;
        Ok(())
    }

    pub fn set_manual(
        my_id: i32,
        my_manual: bool,
        connection: &mut SqliteConnection,
    ) -> Result<()> {
        diesel::update(build_queue::table.filter(build_queue::id.eq(my_id)))
            .set(build_queue::manual.eq(my_manual))
            .execute(connection)?;
        Ok(())
    }

    pub fn pin_score(my_id: i32, my_score: i32, connection: &mut SqliteConnection) -> Result<()> {
        diesel::update(build_queue::table.filter(build_queue::id.eq(my_id)))
            .set((
                build_queue::score.eq(my_score),
                build_queue::manual.eq(false),
                build_queue::pinned.eq(true),
            ))
            .execute(connection)?;
        Ok(())
    }

    pub fn ping(
        my_id: i32,
        tail: Option<&str>,
        now: NaiveDateTime,
        connection: &mut SqliteConnection,
    ) -> Result<()> {
        match tail {
            Some(tail) => diesel::update(build_queue::table.filter(build_queue::id.eq(my_id)))
                .set((
                    build_queue::last_ping.eq(Some(now)),
                    build_queue::log_tail.eq(Some(tail)),
                ))
                .execute(connection)?,
            None => diesel::update(build_queue::table.filter(build_queue::id.eq(my_id)))
                .set(build_queue::last_ping.eq(Some(now)))
                .execute(connection)?,
        };
        Ok(())
    }

    pub fn delete_for_build(my_build_id: i32, connection: &mut SqliteConnection) -> Result<()> {
        diesel::delete(build_queue::table.filter(build_queue::build_id.eq(my_build_id)))
            .execute(connection)?;
        Ok(())
    }

    pub fn into_api(self, connection: &mut SqliteConnection) -> Result<api::QueuedBuild> {
        let build = Build::get_id(self.build_id, connection)?;
        let source = SourcePackageRelease::get_id(build.source_package_release_id, connection)?;
        let architecture_tag = distro_arch_series::table
            .filter(distro_arch_series::id.eq(build.distro_arch_series_id))
            .select(distro_arch_series::architecture_tag)
            .first::<String>(connection)?;

        Ok(api::QueuedBuild {
            id: self.id,
            build_id: self.build_id,
            name: source.name,
            version: source.version,
            architecture_tag,
            pocket: build.pocket,
            state: build.state,
            builder_id: self.builder_id,
            score: self.score,
            manual: self.manual,
            pinned: self.pinned,
            log_tail: self.log_tail,
            created_at: self.created_at,
            started_at: self.started_at,
            last_ping: self.last_ping,
            not_before: self.not_before,
        })
    }
}

impl NewTicket {
    pub fn insert(&self, connection: &mut SqliteConnection) -> Result<i32> {
        let id = diesel::insert_into(build_queue::table)
            .values(self)
            .returning(build_queue::id)
            .get_result::<i32>(connection)?;
        Ok(id)
    }
}
