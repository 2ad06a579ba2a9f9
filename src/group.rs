//! Minimal group and membership records.
//!
//! Group management (creation forms, invite codes, member administration) is
//! outside this crate; the ledger stores just enough to scope debts to a
//! group, join display details onto balance summaries, and give callers a
//! stable member ordering for equal splits.

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{
    Error,
    database_id::{GroupId, UserId},
};

/// A group within which expenses are shared and debts are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    /// The group's ID.
    pub id: GroupId,
    /// The group's display name.
    pub name: String,
    /// An emoji or image URL used as the group's icon.
    pub icon: Option<String>,
}

/// Insert a group record.
pub fn insert_group(group: &Group, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO \"group\" (id, name, icon) VALUES (?1, ?2, ?3)",
        (&group.id, &group.name, &group.icon),
    )?;

    Ok(())
}

/// Retrieve a single group by ID.
pub fn get_group(group_id: &str, connection: &Connection) -> Result<Group, Error> {
    connection
        .prepare("SELECT id, name, icon FROM \"group\" WHERE id = :id")?
        .query_one(&[(":id", &group_id)], map_group_row)
        .map_err(|error| error.into())
}

/// Record that a user is a member of a group.
pub fn add_group_member(group_id: &str, user_id: &str, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO group_member (group_id, user_id) VALUES (?1, ?2)",
        (group_id, user_id),
    )?;

    Ok(())
}

/// List the members of a group in the order they joined.
///
/// Join order is stable across reads, which makes it the canonical debtor
/// ordering for [crate::equal_split]'s remainder distribution.
pub fn list_group_members(group_id: &str, connection: &Connection) -> Result<Vec<UserId>, Error> {
    connection
        .prepare("SELECT user_id FROM group_member WHERE group_id = :group_id ORDER BY rowid ASC")?
        .query_map(&[(":group_id", &group_id)], |row| row.get(0))?
        .map(|maybe_id| maybe_id.map_err(|error| error.into()))
        .collect()
}

/// Create the group and group membership tables in the database.
pub fn create_group_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"group\" (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            icon TEXT
        );

        CREATE TABLE IF NOT EXISTS group_member (
            group_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            PRIMARY KEY (group_id, user_id),
            FOREIGN KEY (group_id) REFERENCES \"group\"(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_group_member_user ON group_member(user_id);",
    )?;

    Ok(())
}

/// Map a database row to a [Group], starting at column `offset`.
pub fn map_group_row_with_offset(row: &Row, offset: usize) -> Result<Group, rusqlite::Error> {
    Ok(Group {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        icon: row.get(offset + 2)?,
    })
}

fn map_group_row(row: &Row) -> Result<Group, rusqlite::Error> {
    map_group_row_with_offset(row, 0)
}
