use crate::schema::*;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use pocketd_common::api::v1::FileRef;
use pocketd_common::errors::*;

#[derive(Identifiable, Queryable, Clone, PartialEq, Eq, Debug)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(table_name = library_files)]
pub struct LibraryFile {
    pub id: i32,
    pub filename: String,
    pub sha256: String,
    pub size: i64,
    pub created_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable, PartialEq, Eq, Debug, Clone)]
#[diesel(table_name = library_files)]
pub struct NewLibraryFile {
    pub filename: String,
    pub sha256: String,
    pub size: i64,
    pub created_at: NaiveDateTime,
}

/// Rejects references the librarian could never have produced
pub fn validate_file_ref(file: &FileRef) -> Result<()> {
    if file.filename.is_empty() || file.filename.contains('/') {
        return Err(ArchiveError::invalid_input(format!(
            "invalid filename: {:?}",
            file.filename
        )));
    }
    if file.sha256.len() != 64
        || !file
            .sha256
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return Err(ArchiveError::invalid_input(format!(
            "invalid sha256 for {:?}: {:?}",
            file.filename, file.sha256
        )));
    }
    if file.size < 0 {
        return Err(ArchiveError::invalid_input(format!(
            "negative size for {:?}",
            file.filename
        )));
    }
    Ok(())
}

impl LibraryFile {
    pub fn get_id(my_id: i32, connection: &mut SqliteConnection) -> Result<LibraryFile> {
        let file = library_files::table
            .filter(library_files::id.eq(my_id))
            .first::<LibraryFile>(connection)?;
        Ok(file)
    }

    /// Returns the alias for this reference, creating it if needed
    pub fn intern(
        file: &FileRef,
        now: NaiveDateTime,
        connection: &mut SqliteConnection,
    ) -> Result<i32> {
        validate_file_ref(file)?;

        let existing = library_files::table
            .filter(library_files::sha256.eq(&file.sha256))
            .filter(library_files::filename.eq(&file.filename))
            .filter(library_files::size.eq(file.size))
            .filter(library_files::deleted_at.is_null())
            .select(library_files::id)
            .first::<i32>(connection)
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let id = diesel::insert_into(library_files::table)
            .values(NewLibraryFile {
                filename: file.filename.clone(),
                sha256: file.sha256.clone(),
                size: file.size,
                created_at: now,
            })
            .returning(library_files::id)
            .get_result::<i32>(connection)?;
        Ok(id)
    }

    pub fn to_ref(&self) -> FileRef {
        FileRef {
            filename: self.filename.clone(),
            sha256: self.sha256.clone(),
            size: self.size,
        }
    }

    pub fn load_ref(
        my_id: Option<i32>,
        connection: &mut SqliteConnection,
    ) -> Result<Option<FileRef>> {
        match my_id {
            Some(my_id) => Ok(Some(Self::get_id(my_id, connection)?.to_ref())),
            None => Ok(None),
        }
    }

    pub fn mark_deleted(
        my_sha256: &str,
        now: NaiveDateTime,
        connection: &mut SqliteConnection,
    ) -> Result<()> {
        diesel::update(
            library_files::table
                .filter(library_files::sha256.eq(my_sha256))
                .filter(library_files::deleted_at.is_null()),
        )
        .set(library_files::deleted_at.eq(Some(now)))
        .execute(connection)?;
        Ok(())
    }
}
