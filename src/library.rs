//! In-memory view of the catalog.
//!
//! Every mutation goes to the database first and is mirrored here only once
//! the write succeeded, so the list shown and searched is always what the
//! database holds.

use thiserror::Error;

use crate::catalog::Catalog;
use crate::form::{self, ValidationError};
use crate::game::{Field, GameRecord, NewGame};

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Database error: {0}")]
    Store(#[from] rusqlite::Error),
}

pub struct Library {
    catalog: Catalog,
    games: Vec<GameRecord>,
}

impl Library {
    pub fn load(catalog: Catalog) -> Result<Self, LibraryError> {
        let games = catalog.list_all()?;
        log::info!("Loaded {} games", games.len());
        Ok(Library { catalog, games })
    }

    pub fn games(&self) -> &[GameRecord] {
        &self.games
    }

    #[cfg(test)]
    pub fn get(&self, id: i64) -> Option<&GameRecord> {
        self.games.iter().find(|g| g.id == id)
    }

    pub fn add(&mut self, game: NewGame) -> Result<&GameRecord, LibraryError> {
        let id = self.catalog.insert(&game)?;
        log::info!("Added {} (id {})", game.name, id);
        self.games.push(game.with_id(id));
        Ok(&self.games[self.games.len() - 1])
    }

    /// Removes the game from the database and the list. Returns the removed
    /// game, or `None` if no game had that id.
    pub fn remove(&mut self, id: i64) -> Result<Option<GameRecord>, LibraryError> {
        if !self.catalog.delete(id)? {
            log::debug!("Remove of id {} matched no row", id);
        }
        let removed = self
            .games
            .iter()
            .position(|g| g.id == id)
            .map(|idx| self.games.remove(idx));
        if let Some(game) = &removed {
            log::info!("Removed {} (id {})", game.name, id);
        }
        Ok(removed)
    }

    /// Applies text typed into table column `column` of game `id`.
    ///
    /// Returns `Ok(None)` for columns that are not editable and for ids the
    /// list does not hold. Invalid text is rejected before anything is
    /// written.
    pub fn edit(
        &mut self,
        id: i64,
        column: usize,
        text: &str,
    ) -> Result<Option<&GameRecord>, LibraryError> {
        let Some(field) = Field::from_column(column) else {
            return Ok(None);
        };
        let Some(idx) = self.games.iter().position(|g| g.id == id) else {
            return Ok(None);
        };
        let value = form::parse_cell(field, text)?;
        if !self.catalog.update_field(id, field, &value)? {
            log::warn!("Edit of id {} matched no row", id);
        }
        log::debug!("Set {} of id {}", field.column_name(), id);
        let game = &mut self.games[idx];
        game.apply(field, value);
        Ok(Some(&*game))
    }

    /// Games whose name contains `query`, ignoring case. An empty query
    /// matches everything.
    pub fn search(&self, query: &str) -> Vec<&GameRecord> {
        let needle = query.to_lowercase();
        self.games
            .iter()
            .filter(|g| g.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::GameForm;
    use crate::game::Category;

    fn game(name: &str, score: u32) -> NewGame {
        NewGame {
            name: name.to_string(),
            release_date: "2000-01-01".to_string(),
            metacritic_score: score,
            category: Category::Action,
            image_path: format!("/img/{name}.png"),
        }
    }

    fn library_with(names: &[&str]) -> Library {
        let catalog = Catalog::open_in_memory().unwrap();
        for name in names {
            catalog.insert(&game(name, 80)).unwrap();
        }
        Library::load(catalog).unwrap()
    }

    fn names<'a>(games: &[&'a GameRecord]) -> Vec<&'a str> {
        games.iter().map(|g| g.name.as_str()).collect()
    }

    #[test]
    fn load_mirrors_the_catalog() {
        let library = library_with(&["Doom", "Quake"]);
        assert_eq!(library.len(), 2);
        assert_eq!(library.games()[0].name, "Doom");
        assert_eq!(library.games()[1].name, "Quake");
    }

    #[test]
    fn add_grows_list_and_store_by_one() {
        let mut library = library_with(&["Doom"]);
        let form = GameForm {
            name: "Half-Life".into(),
            release_date: "1998-11-19".into(),
            metacritic_score: "96".into(),
            category: Category::SciFi,
            image_path: Some("/img/hl.png".into()),
        };
        let added = library.add(form.validate().unwrap()).unwrap().clone();
        assert_eq!(added.metacritic_score, 96);
        assert_eq!(added.category, Category::SciFi);
        assert_eq!(library.len(), 2);
        assert_eq!(library.catalog.list_all().unwrap(), library.games());
    }

    #[test]
    fn added_games_are_searchable() {
        let mut library = library_with(&["Doom"]);
        library.add(game("Doom Eternal", 88)).unwrap();
        assert_eq!(names(&library.search("doom")), vec!["Doom", "Doom Eternal"]);
    }

    #[test]
    fn removed_games_do_not_come_back_in_search() {
        let mut library = library_with(&["Doom", "Quake"]);
        let id = library.games()[0].id;
        let removed = library.remove(id).unwrap().unwrap();
        assert_eq!(removed.name, "Doom");
        assert!(library.search("").iter().all(|g| g.id != id));
        assert!(library.catalog.list_all().unwrap().iter().all(|g| g.id != id));
    }

    #[test]
    fn removing_unknown_id_changes_nothing() {
        let mut library = library_with(&["Doom"]);
        assert!(library.remove(999).unwrap().is_none());
        assert_eq!(library.len(), 1);
        assert_eq!(library.catalog.count().unwrap(), 1);
    }

    #[test]
    fn edit_score_updates_store_and_list() {
        let mut library = library_with(&["Doom"]);
        let id = library.games()[0].id;
        let before = library.games()[0].clone();

        let edited = library.edit(id, 3, "85").unwrap().unwrap().clone();
        assert_eq!(edited.metacritic_score, 85);

        let stored = library.catalog.list_all().unwrap();
        let mut expected = before;
        expected.metacritic_score = 85;
        assert_eq!(stored, vec![expected.clone()]);
        assert_eq!(library.games(), &[expected][..]);
    }

    #[test]
    fn invalid_edit_writes_nothing() {
        let mut library = library_with(&["Doom"]);
        let id = library.games()[0].id;
        let err = library.edit(id, 3, "eighty").unwrap_err();
        assert!(matches!(
            err,
            LibraryError::Validation(ValidationError::NotAScore(_))
        ));
        assert_eq!(library.games()[0].metacritic_score, 80);
        assert_eq!(library.catalog.get(id).unwrap().unwrap().metacritic_score, 80);
    }

    #[test]
    fn image_and_out_of_range_columns_are_ignored() {
        let mut library = library_with(&["Doom"]);
        let id = library.games()[0].id;
        assert!(library.edit(id, 0, "/other.png").unwrap().is_none());
        assert!(library.edit(id, 5, "anything").unwrap().is_none());
        assert_eq!(library.games()[0].image_path, "/img/Doom.png");
    }

    #[test]
    fn edit_category_and_name() {
        let mut library = library_with(&["Doom"]);
        let id = library.games()[0].id;
        library.edit(id, 4, "Horror").unwrap();
        library.edit(id, 1, "Doom 3").unwrap();
        let stored = library.catalog.get(id).unwrap().unwrap();
        assert_eq!(stored.category, Category::Horror);
        assert_eq!(stored.name, "Doom 3");
        assert_eq!(library.get(id), Some(&stored));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let library = library_with(&["The Legend of Zelda", "Doom", "Zelda II"]);
        assert_eq!(library.search("").len(), 3);
        assert_eq!(
            names(&library.search("ZELDA")),
            vec!["The Legend of Zelda", "Zelda II"]
        );
        assert!(library.search("metroid").is_empty());
    }
}
