use std::path::PathBuf;

use thiserror::Error;

use crate::game::{Category, Field, FieldValue, NewGame};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill all fields correctly and select an image.")]
    IncompleteForm,
    #[error("{0} cannot be empty.")]
    Empty(&'static str),
    #[error("Metacritic score must be a whole number, got '{0}'.")]
    NotAScore(String),
    #[error("Category must be one of Action, Horror or Sci-Fi, got '{0}'.")]
    NotACategory(String),
}

/// Pending values of the add row.
#[derive(Debug, Default)]
pub struct GameForm {
    pub name: String,
    pub release_date: String,
    pub metacritic_score: String,
    pub category: Category,
    pub image_path: Option<PathBuf>,
}

impl GameForm {
    /// Checks every input and builds the game to insert. Nothing is consumed
    /// so a rejected form keeps what the user typed.
    pub fn validate(&self) -> Result<NewGame, ValidationError> {
        if is_blank(&self.name) || is_blank(&self.release_date) {
            return Err(ValidationError::IncompleteForm);
        }
        let metacritic_score =
            parse_score(&self.metacritic_score).map_err(|_| ValidationError::IncompleteForm)?;
        let image_path = self
            .image_path
            .as_ref()
            .ok_or(ValidationError::IncompleteForm)?;
        Ok(NewGame {
            name: self.name.clone(),
            release_date: self.release_date.clone(),
            metacritic_score,
            category: self.category,
            image_path: image_path.to_string_lossy().into_owned(),
        })
    }

    /// Empties the text inputs and the selected image. The category choice
    /// is kept for the next entry.
    pub fn clear(&mut self) {
        self.name.clear();
        self.release_date.clear();
        self.metacritic_score.clear();
        self.image_path = None;
    }
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Only ASCII digits are accepted: no sign, no whitespace, no decimals.
pub fn parse_score(text: &str) -> Result<u32, ValidationError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::NotAScore(text.to_string()));
    }
    text.parse()
        .map_err(|_| ValidationError::NotAScore(text.to_string()))
}

/// Turns the text typed into a table cell into the value stored for `field`.
pub fn parse_cell(field: Field, text: &str) -> Result<FieldValue, ValidationError> {
    match field {
        Field::Name | Field::ReleaseDate => {
            if is_blank(text) {
                Err(ValidationError::Empty(field.label()))
            } else {
                Ok(FieldValue::Text(text.to_string()))
            }
        }
        Field::MetacriticScore => parse_score(text).map(FieldValue::Score),
        Field::Category => text
            .parse::<Category>()
            .map(FieldValue::Category)
            .map_err(|e| ValidationError::NotACategory(e.0)),
    }
}
