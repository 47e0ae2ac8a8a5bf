use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Result, Row, params};

use crate::game::{Field, FieldValue, GameRecord, NewGame};

const SELECT_GAMES: &str =
    "SELECT id, name, release_date, metacritic_score, category, image_path FROM games";

/// The games table. Holds one connection for the lifetime of the value.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Failed to create {}: {}", parent.display(), e);
            }
        }
        let conn = Connection::open(db_path)?;
        let catalog = Catalog { conn };
        catalog.init_schema()?;
        Ok(catalog)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let catalog = Catalog {
            conn: Connection::open_in_memory()?,
        };
        catalog.init_schema()?;
        Ok(catalog)
    }

    /// Creates the games table if it is missing. Safe to call on every start.
    fn init_schema(&self) -> Result<()> {
        // AUTOINCREMENT keeps ids of deleted games from being handed out again.
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                release_date TEXT NOT NULL,
                metacritic_score INTEGER NOT NULL,
                category TEXT NOT NULL,
                image_path TEXT NOT NULL
            );",
        )
    }

    /// All games in insertion order.
    pub fn list_all(&self) -> Result<Vec<GameRecord>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{SELECT_GAMES} ORDER BY id"))?;
        let rows = stmt.query_map([], game_from_row)?;
        rows.collect()
    }

    #[cfg(test)]
    pub fn get(&self, id: i64) -> Result<Option<GameRecord>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{SELECT_GAMES} WHERE id = ?1"))?;
        stmt.query_row(params![id], game_from_row).optional()
    }

    #[cfg(test)]
    pub fn count(&self) -> Result<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))
    }

    /// Insert a game and return the id the database assigned to it.
    pub fn insert(&self, game: &NewGame) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO games (name, release_date, metacritic_score, category, image_path)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                game.name,
                game.release_date,
                game.metacritic_score,
                game.category,
                game.image_path,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        log::debug!("Inserted game {} as id {}", game.name, id);
        Ok(id)
    }

    /// Returns whether a row was removed. A missing id is not an error.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM games WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Overwrite one editable column. The value is written as given; parsing
    /// and validation happen before this call.
    pub fn update_field(&self, id: i64, field: Field, value: &FieldValue) -> Result<bool> {
        // The column name comes from a closed enum, never from user text.
        let sql = format!("UPDATE games SET {} = ?1 WHERE id = ?2", field.column_name());
        let changed = self.conn.execute(&sql, params![value, id])?;
        Ok(changed > 0)
    }
}

fn game_from_row(row: &Row<'_>) -> Result<GameRecord> {
    Ok(GameRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        release_date: row.get(2)?,
        metacritic_score: row.get(3)?,
        category: row.get(4)?,
        image_path: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Category;

    fn doom() -> NewGame {
        NewGame {
            name: "Doom".to_string(),
            release_date: "1993-12-10".to_string(),
            metacritic_score: 85,
            category: Category::Action,
            image_path: "/img/doom.png".to_string(),
        }
    }

    fn dead_space() -> NewGame {
        NewGame {
            name: "Dead Space".to_string(),
            release_date: "2008-10-13".to_string(),
            metacritic_score: 89,
            category: Category::Horror,
            image_path: "/img/dead_space.jpg".to_string(),
        }
    }

    #[test]
    fn insert_list_delete_scenario() {
        let catalog = Catalog::open_in_memory().unwrap();
        let id = catalog.insert(&doom()).unwrap();
        assert_eq!(id, 1);
        assert_eq!(catalog.list_all().unwrap(), vec![doom().with_id(1)]);

        assert!(catalog.delete(1).unwrap());
        assert!(catalog.list_all().unwrap().is_empty());
    }

    #[test]
    fn insert_round_trips_all_fields() {
        let catalog = Catalog::open_in_memory().unwrap();
        let id = catalog.insert(&dead_space()).unwrap();
        let all = catalog.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], dead_space().with_id(id));
        assert_eq!(catalog.get(id).unwrap(), Some(dead_space().with_id(id)));
    }

    #[test]
    fn list_all_is_in_insertion_order() {
        let catalog = Catalog::open_in_memory().unwrap();
        let a = catalog.insert(&doom()).unwrap();
        let b = catalog.insert(&dead_space()).unwrap();
        let ids: Vec<i64> = catalog.list_all().unwrap().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn delete_missing_id_is_a_no_op() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.insert(&doom()).unwrap();
        assert!(!catalog.delete(42).unwrap());
        assert_eq!(catalog.count().unwrap(), 1);
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let catalog = Catalog::open_in_memory().unwrap();
        let first = catalog.insert(&doom()).unwrap();
        catalog.delete(first).unwrap();
        let second = catalog.insert(&dead_space()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn update_field_changes_only_that_column() {
        let catalog = Catalog::open_in_memory().unwrap();
        let id = catalog.insert(&doom()).unwrap();
        assert!(
            catalog
                .update_field(id, Field::MetacriticScore, &FieldValue::Score(90))
                .unwrap()
        );

        let mut expected = doom().with_id(id);
        expected.metacritic_score = 90;
        assert_eq!(catalog.list_all().unwrap(), vec![expected.clone()]);

        catalog
            .update_field(id, Field::Category, &FieldValue::Category(Category::SciFi))
            .unwrap();
        catalog
            .update_field(id, Field::Name, &FieldValue::Text("Doom II".into()))
            .unwrap();
        expected.category = Category::SciFi;
        expected.name = "Doom II".into();
        assert_eq!(catalog.get(id).unwrap(), Some(expected));
    }

    #[test]
    fn update_field_on_missing_id_matches_nothing() {
        let catalog = Catalog::open_in_memory().unwrap();
        let changed = catalog
            .update_field(7, Field::Name, &FieldValue::Text("Ghost".into()))
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn insert_rejects_null_required_column() {
        let catalog = Catalog::open_in_memory().unwrap();
        let result = catalog.conn.execute(
            "INSERT INTO games (name, release_date, metacritic_score, category, image_path)
             VALUES (NULL, '2000', 1, 'Action', '/x.png')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn games_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("games.db");
        {
            let catalog = Catalog::open(&path).unwrap();
            catalog.insert(&doom()).unwrap();
        }
        let catalog = Catalog::open(&path).unwrap();
        assert_eq!(catalog.list_all().unwrap(), vec![doom().with_id(1)]);
    }
}
