//! Minimal user records.
//!
//! Authentication and profile management live outside this crate; the ledger
//! only stores the display details that balance summaries are joined with.

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{Error, database_id::UserId};

/// A user as the ledger sees them: an opaque ID plus display details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// The user's ID, supplied by the identity layer.
    pub id: UserId,
    /// The user's display name, if they have set one.
    pub name: Option<String>,
    /// A URL to the user's avatar image.
    pub image: Option<String>,
}

/// Insert a user record.
pub fn insert_user(user: &User, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO user (id, name, image) VALUES (?1, ?2, ?3)",
        (&user.id, &user.name, &user.image),
    )?;

    Ok(())
}

/// Retrieve a single user by ID.
pub fn get_user(user_id: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, name, image FROM user WHERE id = :id")?
        .query_one(&[(":id", &user_id)], map_user_row)
        .map_err(|error| error.into())
}

/// Create the user table in the database.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
            id TEXT PRIMARY KEY,
            name TEXT,
            image TEXT
        )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [User], starting at column `offset`.
///
/// Used by queries that join users onto other tables.
pub fn map_user_row_with_offset(row: &Row, offset: usize) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        image: row.get(offset + 2)?,
    })
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    map_user_row_with_offset(row, 0)
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize};

    use super::{User, get_user, insert_user};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn insert_and_get_round_trips() {
        let connection = get_test_connection();
        let user = User {
            id: "user_1".to_owned(),
            name: Some("Alice".to_owned()),
            image: None,
        };

        insert_user(&user, &connection).expect("Could not insert user");

        assert_eq!(get_user("user_1", &connection), Ok(user));
    }

    #[test]
    fn get_missing_user_returns_not_found() {
        let connection = get_test_connection();

        assert_eq!(get_user("nobody", &connection), Err(Error::NotFound));
    }
}
