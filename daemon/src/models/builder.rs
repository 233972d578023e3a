use crate::models::Ticket;
use crate::schema::*;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use pocketd_common::api::v1 as api;
use pocketd_common::errors::*;

#[derive(Identifiable, Queryable, Clone, PartialEq, Eq, Debug)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(table_name = builders)]
pub struct Builder {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub processor_family: String,
    pub trusted: bool,
    pub builder_ok: bool,
    pub fail_notes: Option<String>,
    pub manual: bool,
    pub last_seen: Option<NaiveDateTime>,
}

#[derive(Insertable, PartialEq, Eq, Debug, Clone)]
#[diesel(table_name = builders)]
pub struct NewBuilder {
    pub name: String,
    pub url: String,
    pub processor_family: String,
    pub trusted: bool,
}

impl Builder {
    pub fn get_id(my_id: i32, connection: &mut SqliteConnection) -> Result<Builder> {
        builders::table
            .filter(builders::id.eq(my_id))
            .first::<Builder>(connection)
            .optional()?
            .ok_or_else(|| ArchiveError::not_found(format!("builder {my_id}")))
    }

    pub fn get_by_name(my_name: &str, connection: &mut SqliteConnection) -> Result<Option<Builder>> {
        let builder = builders::table
            .filter(builders::name.eq(my_name))
            .first::<Builder>(connection)
            .optional()?;
        Ok(builder)
    }

    pub fn list(connection: &mut SqliteConnection) -> Result<Vec<Builder>> {
        let records = builders::table
            .order_by(builders::id)
            .load::<Builder>(connection)?;
        Ok(records)
    }

    /// Healthy, automatic builders without a ticket
    pub fn list_available(connection: &mut SqliteConnection) -> Result<Vec<Builder>> {
        let busy = build_queue::table
            .filter(build_queue::builder_id.is_not_null())
            .select(build_queue::builder_id.assume_not_null());

        let records = builders::table
            .filter(builders::builder_ok.eq(true))
            .filter(builders::manual.eq(false))
            .filter(builders::id.ne_all(busy))
            .order_by(builders::id)
            .load::<Builder>(connection)?;
        Ok(records)
    }

    pub fn mark_unhealthy(
        my_id: i32,
        note: &str,
        connection: &mut SqliteConnection,
    ) -> Result<()> {
        diesel::update(builders::table.filter(builders::id.eq(my_id)))
            .set((
                builders::builder_ok.eq(false),
                builders::fail_notes.eq(Some(note)),
            ))
            .execute(connection)?;
        warn!("Builder {my_id} marked unhealthy: {note}");
        Ok(())
    }

    pub fn reset(my_id: i32, connection: &mut SqliteConnection) -> Result<()> {
        diesel::update(builders::table.filter(builders::id.eq(my_id)))
            .set((
                builders::builder_ok.eq(true),
                builders::fail_notes.eq(Option::<String>::None),
            ))
            .execute(connection)?;
        info!("Builder {my_id} reset to healthy");
        Ok(())
    }

    pub fn set_manual(my_id: i32, value: bool, connection: &mut SqliteConnection) -> Result<()> {
        diesel::update(builders::table.filter(builders::id.eq(my_id)))
            .set(builders::manual.eq(value))
            .execute(connection)?;
        Ok(())
    }

    pub fn set_trusted(my_id: i32, value: bool, connection: &mut SqliteConnection) -> Result<()> {
        diesel::update(builders::table.filter(builders::id.eq(my_id)))
            .set(builders::trusted.eq(value))
            .execute(connection)?;
        Ok(())
    }

    pub fn seen(my_id: i32, now: NaiveDateTime, connection: &mut SqliteConnection) -> Result<()> {
        diesel::update(builders::table.filter(builders::id.eq(my_id)))
            .set(builders::last_seen.eq(Some(now)))
            .execute(connection)?;
        Ok(())
    }

    pub fn into_api(self, connection: &mut SqliteConnection) -> Result<api::Builder> {
        let current_build = Ticket::get_for_builder(self.id, connection)?.map(|t| t.build_id);
        Ok(api::Builder {
            id: self.id,
            name: self.name,
            url: self.url,
            processor_family: self.processor_family,
            trusted: self.trusted,
            builder_ok: self.builder_ok,
            fail_notes: self.fail_notes,
            manual: self.manual,
            last_seen: self.last_seen,
            current_build,
        })
    }
}

impl NewBuilder {
    /// Registers a builder, or updates the one with the same name
    pub fn upsert(&self, connection: &mut SqliteConnection) -> Result<i32> {
        if let Some(builder) = Builder::get_by_name(&self.name, connection)? {
            diesel::update(builders::table.filter(builders::id.eq(builder.id)))
                .set((
                    builders::url.eq(&self.url),
                    builders::processor_family.eq(&self.processor_family),
                    builders::trusted.eq(self.trusted),
                ))
                .execute(connection)?;
            return Ok(builder.id);
        }

        let id = diesel::insert_into(builders::table)
            .values(self)
            .returning(builders::id)
            .get_result::<i32>(connection)?;
        Ok(id)
    }
}
