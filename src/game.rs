use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    #[default]
    Action,
    Horror,
    SciFi,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Action, Category::Horror, Category::SciFi];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Action => "Action",
            Category::Horror => "Horror",
            Category::SciFi => "Sci-Fi",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}'")]
pub struct UnknownCategory(pub String);

/// Accepts the display names, ignoring case and surrounding whitespace.
impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        s.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A game as persisted in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    pub id: i64,
    pub name: String,
    pub release_date: String,
    pub metacritic_score: u32,
    pub category: Category,
    pub image_path: String,
}

/// A validated game that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGame {
    pub name: String,
    pub release_date: String,
    pub metacritic_score: u32,
    pub category: Category,
    pub image_path: String,
}

impl NewGame {
    pub fn with_id(self, id: i64) -> GameRecord {
        GameRecord {
            id,
            name: self.name,
            release_date: self.release_date,
            metacritic_score: self.metacritic_score,
            category: self.category,
            image_path: self.image_path,
        }
    }
}

/// The columns that may be changed after a game has been added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    ReleaseDate,
    MetacriticScore,
    Category,
}

impl Field {
    pub const EDITABLE: [Field; 4] = [
        Field::Name,
        Field::ReleaseDate,
        Field::MetacriticScore,
        Field::Category,
    ];

    /// Maps a table column to its field. Column 0 holds the cover and is
    /// never editable.
    pub fn from_column(column: usize) -> Option<Field> {
        match column {
            1 => Some(Field::Name),
            2 => Some(Field::ReleaseDate),
            3 => Some(Field::MetacriticScore),
            4 => Some(Field::Category),
            _ => None,
        }
    }

    pub fn column(self) -> usize {
        match self {
            Field::Name => 1,
            Field::ReleaseDate => 2,
            Field::MetacriticScore => 3,
            Field::Category => 4,
        }
    }

    pub fn column_name(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::ReleaseDate => "release_date",
            Field::MetacriticScore => "metacritic_score",
            Field::Category => "category",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::ReleaseDate => "Release Date",
            Field::MetacriticScore => "Metacritic Score",
            Field::Category => "Category",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Score(u32),
    Category(Category),
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            FieldValue::Text(s) => s.to_sql(),
            FieldValue::Score(n) => n.to_sql(),
            FieldValue::Category(c) => c.to_sql(),
        }
    }
}

impl GameRecord {
    /// Text shown in the table cell for `field`.
    pub fn cell_text(&self, field: Field) -> String {
        match field {
            Field::Name => self.name.clone(),
            Field::ReleaseDate => self.release_date.clone(),
            Field::MetacriticScore => self.metacritic_score.to_string(),
            Field::Category => self.category.to_string(),
        }
    }

    /// Writes `value` into `field`. Returns false if the value's kind does not
    /// belong to that field.
    pub fn apply(&mut self, field: Field, value: FieldValue) -> bool {
        match (field, value) {
            (Field::Name, FieldValue::Text(s)) => self.name = s,
            (Field::ReleaseDate, FieldValue::Text(s)) => self.release_date = s,
            (Field::MetacriticScore, FieldValue::Score(n)) => self.metacritic_score = n,
            (Field::Category, FieldValue::Category(c)) => self.category = c,
            _ => return false,
        }
        true
    }
}
