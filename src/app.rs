use std::collections::HashMap;
use std::path::PathBuf;

use iced::widget::{
    Space, button, center, column, container, image, opaque, pick_list, row, rule, scrollable,
    text, text_input,
};
use iced::{Alignment, Color, Element, Length, Size, Subscription, Task, Theme, window};

use crate::catalog::Catalog;
use crate::config;
use crate::form::GameForm;
use crate::game::{Category, Field, GameRecord};
use crate::library::{Library, LibraryError};
use crate::thumbnail::{self, COVER_SIZE, Rgba};

const COVER_PX: f32 = COVER_SIZE as f32;
const LABEL_COLOR: Color = Color::from_rgb(0.5, 0.5, 0.55);

fn boot() -> (GameCatalog, Task<Message>) {
    let mut state = GameCatalog::default();

    let Some(db_path) = config::database_path() else {
        log::error!("No home directory to keep the catalog in");
        state.db_error = Some("Could not find a home directory for the catalog.".into());
        return (state, Task::none());
    };

    let opened = Catalog::open(&db_path)
        .map_err(LibraryError::from)
        .and_then(Library::load);
    match opened {
        Ok(library) => {
            let covers = library
                .games()
                .iter()
                .map(|g| (g.id, PathBuf::from(&g.image_path)))
                .collect();
            state.library = Some(library);
            (state, load_covers(covers))
        }
        Err(e) => {
            log::error!("Failed to open catalog DB {}: {}", db_path.display(), e);
            state.db_error = Some(format!("Could not open {}: {}", db_path.display(), e));
            (state, Task::none())
        }
    }
}

pub fn run() -> iced::Result {
    iced::application(boot, update, view)
        .title("Game Catalog")
        .theme(theme)
        .subscription(subscription)
        .window(window::Settings {
            size: Size::new(1920.0, 1080.0),
            exit_on_close_request: false,
            ..window::Settings::default()
        })
        .centered()
        .run()
}

#[derive(Default)]
struct GameCatalog {
    library: Option<Library>,
    /// Set when the database could not be opened; the table is replaced by
    /// this message.
    db_error: Option<String>,
    form: GameForm,
    preview: Option<image::Handle>,
    covers: HashMap<i64, image::Handle>,
    search: String,
    selected: Option<i64>,
    /// Uncommitted cell text, keyed by game and column.
    drafts: HashMap<(i64, Field), String>,
    /// Open dialogs, topmost last. Only the top one is drawn and answered.
    modals: Vec<Modal>,
}

enum Modal {
    Notice { title: String, body: String },
    ConfirmExit(window::Id),
}

#[derive(Debug, Clone)]
pub enum Message {
    SearchChanged(String),
    // Add row
    NameChanged(String),
    ReleaseDateChanged(String),
    ScoreChanged(String),
    CategorySelected(Category),
    PickImage,
    ImagePicked(Option<PathBuf>),
    PreviewLoaded(PathBuf, Rgba),
    AddGame,
    RemoveGame,
    // Table
    SelectGame(i64),
    CellChanged(i64, Field, String),
    CellSubmitted(i64, Field),
    CoversLoaded(Vec<(i64, Rgba)>),
    // Dialogs
    DismissNotice,
    CloseRequested(window::Id),
    ConfirmExit(bool),
    KeyEscape,
}

impl Message {
    /// Messages still handled while a notice or the exit prompt is showing.
    fn passes_modal(&self) -> bool {
        matches!(
            self,
            Message::DismissNotice
                | Message::ConfirmExit(_)
                | Message::CloseRequested(_)
                | Message::KeyEscape
                | Message::ImagePicked(_)
                | Message::PreviewLoaded(..)
                | Message::CoversLoaded(_)
        )
    }
}

fn subscription(_state: &GameCatalog) -> Subscription<Message> {
    let keys = iced::event::listen_with(|event, _status, _window| match event {
        iced::Event::Keyboard(iced::keyboard::Event::KeyPressed {
            key: iced::keyboard::Key::Named(iced::keyboard::key::Named::Escape),
            ..
        }) => Some(Message::KeyEscape),
        _ => None,
    });

    Subscription::batch([keys, window::close_requests().map(Message::CloseRequested)])
}

fn update(state: &mut GameCatalog, message: Message) -> Task<Message> {
    if !state.modals.is_empty() && !message.passes_modal() {
        return Task::none();
    }

    match message {
        Message::SearchChanged(query) => {
            commit_drafts(state, None);
            state.search = query;
            // Drop a selection the filter just hid so remove can't hit an unseen row.
            if let (Some(id), Some(library)) = (state.selected, state.library.as_ref()) {
                if !library.search(&state.search).iter().any(|g| g.id == id) {
                    state.selected = None;
                }
            }
        }
        Message::NameChanged(value) => {
            commit_drafts(state, None);
            state.form.name = value;
        }
        Message::ReleaseDateChanged(value) => {
            commit_drafts(state, None);
            state.form.release_date = value;
        }
        Message::ScoreChanged(value) => {
            commit_drafts(state, None);
            state.form.metacritic_score = value;
        }
        Message::CategorySelected(category) => {
            commit_drafts(state, None);
            state.form.category = category;
        }
        Message::PickImage => {
            commit_drafts(state, None);
            return Task::perform(
                pick_image(config::load_last_image_dir()),
                Message::ImagePicked,
            );
        }
        Message::ImagePicked(Some(path)) => {
            config::save_last_image_dir(&path);
            state.form.image_path = Some(path.clone());
            state.preview = None;
            return Task::perform(
                async move {
                    let rgba = thumbnail::load_cover(&path, COVER_SIZE);
                    (path, rgba)
                },
                |(path, rgba)| Message::PreviewLoaded(path, rgba),
            );
        }
        Message::ImagePicked(None) => {}
        Message::PreviewLoaded(path, (rgba, width, height)) => {
            // A slow decode may finish after another image was picked.
            if state.form.image_path.as_ref() == Some(&path) {
                state.preview = Some(image::Handle::from_rgba(width, height, rgba));
            }
        }
        Message::AddGame => {
            if !commit_drafts(state, None) {
                return Task::none();
            }
            let game = match state.form.validate() {
                Ok(game) => game,
                Err(e) => {
                    show_notice(state, "Input Error", e.to_string());
                    return Task::none();
                }
            };
            let Some(library) = state.library.as_mut() else {
                return Task::none();
            };
            match library.add(game).map(|g| (g.id, PathBuf::from(&g.image_path))) {
                Ok(cover) => {
                    state.form.clear();
                    state.preview = None;
                    return load_covers(vec![cover]);
                }
                Err(e) => report(state, "Could not add game", e),
            }
        }
        Message::RemoveGame => {
            if !commit_drafts(state, None) {
                return Task::none();
            }
            let Some(id) = state.selected else {
                show_notice(state, "Selection Error", "Please select a game to remove.");
                return Task::none();
            };
            let Some(library) = state.library.as_mut() else {
                return Task::none();
            };
            match library.remove(id) {
                Ok(_) => {
                    state.selected = None;
                    state.covers.remove(&id);
                }
                Err(e) => report(state, "Could not remove game", e),
            }
        }
        Message::SelectGame(id) => {
            commit_drafts(state, None);
            state.selected = Some(id);
        }
        Message::CellChanged(id, field, value) => {
            // Typing into a cell leaves whichever cell was edited before it.
            commit_drafts(state, Some((id, field)));
            state.selected = Some(id);
            state.drafts.insert((id, field), value);
        }
        Message::CellSubmitted(id, field) => {
            commit_draft(state, (id, field));
        }
        Message::CoversLoaded(covers) => {
            for (id, (rgba, width, height)) in covers {
                state
                    .covers
                    .insert(id, image::Handle::from_rgba(width, height, rgba));
            }
        }
        Message::DismissNotice => {
            if matches!(state.modals.last(), Some(Modal::Notice { .. })) {
                state.modals.pop();
            }
        }
        Message::CloseRequested(id) => {
            if !state
                .modals
                .iter()
                .any(|m| matches!(m, Modal::ConfirmExit(_)))
            {
                // Save edits before asking; a rejected one stays queued
                // beneath the prompt as a notice.
                commit_drafts(state, None);
                state.modals.push(Modal::ConfirmExit(id));
            }
        }
        Message::ConfirmExit(quit) => {
            if let Some(&Modal::ConfirmExit(id)) = state.modals.last() {
                state.modals.pop();
                if quit {
                    log::info!("Exiting");
                    return window::close(id);
                }
            }
        }
        Message::KeyEscape => match state.modals.last() {
            Some(Modal::ConfirmExit(_)) => return update(state, Message::ConfirmExit(false)),
            Some(Modal::Notice { .. }) => {
                state.modals.pop();
            }
            None => {
                state.drafts.clear();
                state.selected = None;
            }
        },
    }
    Task::none()
}

/// Saves every pending cell draft except `keep`. Returns false if one was
/// rejected or could not be written; a notice is showing in that case.
fn commit_drafts(state: &mut GameCatalog, keep: Option<(i64, Field)>) -> bool {
    let mut pending: Vec<(i64, Field)> = state
        .drafts
        .keys()
        .copied()
        .filter(|key| Some(*key) != keep)
        .collect();
    pending.sort_by_key(|(id, field)| (*id, field.column()));

    let mut saved = true;
    for key in pending {
        saved &= commit_draft(state, key);
    }
    saved
}

fn commit_draft(state: &mut GameCatalog, (id, field): (i64, Field)) -> bool {
    // Removing the draft first means a rejected edit shows the stored value
    // again.
    let Some(value) = state.drafts.remove(&(id, field)) else {
        return true;
    };
    let Some(library) = state.library.as_mut() else {
        return true;
    };
    match library.edit(id, field.column(), &value).map(|_| ()) {
        Ok(()) => true,
        Err(LibraryError::Validation(e)) => {
            show_notice(state, "Invalid Value", e.to_string());
            false
        }
        Err(e) => {
            report(state, "Could not save change", e);
            false
        }
    }
}

fn show_notice(state: &mut GameCatalog, title: &str, body: impl Into<String>) {
    state.modals.push(Modal::Notice {
        title: title.to_string(),
        body: body.into(),
    });
}

fn report(state: &mut GameCatalog, title: &str, error: LibraryError) {
    match &error {
        LibraryError::Store(e) => log::error!("{}: {}", title, e),
        LibraryError::Validation(e) => log::debug!("{}: {}", title, e),
    }
    show_notice(state, title, error.to_string());
}

fn load_covers(items: Vec<(i64, PathBuf)>) -> Task<Message> {
    if items.is_empty() {
        return Task::none();
    }
    Task::perform(
        async move { thumbnail::load_covers_parallel(&items, COVER_SIZE) },
        Message::CoversLoaded,
    )
}

fn view(state: &GameCatalog) -> Element<'_, Message> {
    let content = match (&state.library, &state.db_error) {
        (Some(library), _) => catalog_view(state, library),
        (None, error) => db_error_view(error.as_deref()),
    };

    match state.modals.last() {
        Some(modal) => with_modal(content, modal_view(modal)),
        None => content,
    }
}

fn catalog_view<'a>(state: &'a GameCatalog, library: &'a Library) -> Element<'a, Message> {
    let search = text_input("Search by game name...", &state.search)
        .on_input(Message::SearchChanged)
        .padding(8);

    let preview: Element<'_, Message> = match (&state.preview, &state.form.image_path) {
        (Some(handle), _) => image(handle.clone())
            .width(COVER_PX)
            .height(COVER_PX)
            .into(),
        (None, Some(_)) => text("Loading...").size(13).color(LABEL_COLOR).into(),
        (None, None) => text("No Image Selected").size(13).color(LABEL_COLOR).into(),
    };

    let inputs = row![
        text_input("Game Name", &state.form.name)
            .on_input(Message::NameChanged)
            .on_submit(Message::AddGame),
        text_input("Release Date (YYYY-MM-DD)", &state.form.release_date)
            .on_input(Message::ReleaseDateChanged)
            .on_submit(Message::AddGame),
        text_input("Metacritic Score", &state.form.metacritic_score)
            .on_input(Message::ScoreChanged)
            .on_submit(Message::AddGame),
        pick_list(
            Category::ALL,
            Some(state.form.category),
            Message::CategorySelected
        ),
        button("Select Image").on_press(Message::PickImage),
        container(preview).center_x(COVER_PX + 20.0),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let shown = library.search(&state.search);
    let count_text = if state.search.is_empty() {
        format!("{} games", library.len())
    } else {
        format!("{} of {} games", shown.len(), library.len())
    };

    let actions = row![
        button("Add Game").on_press(Message::AddGame),
        button("Remove Selected Game")
            .on_press(Message::RemoveGame)
            .style(button::danger),
        Space::new().width(Length::Fill),
        text(count_text).size(13).color(LABEL_COLOR),
    ]
    .spacing(10)
    .align_y(Alignment::Center);

    let table = games_table(state, library, shown);

    column![search, inputs, actions, table]
        .spacing(10)
        .padding(10)
        .into()
}

fn games_table<'a>(
    state: &'a GameCatalog,
    library: &'a Library,
    shown: Vec<&'a GameRecord>,
) -> Element<'a, Message> {
    let mut header: Vec<Element<'_, Message>> =
        vec![text("Image").size(13).color(LABEL_COLOR).width(COVER_PX + 8.0).into()];
    for field in Field::EDITABLE {
        header.push(
            text(field.label())
                .size(13)
                .color(LABEL_COLOR)
                .width(Length::FillPortion(column_portion(field)))
                .into(),
        );
    }
    let header = row(header).spacing(8).padding([0, 4]);

    let body: Element<'_, Message> = if shown.is_empty() {
        let hint = if library.is_empty() {
            "No games yet. Fill in the fields above and press Add Game."
        } else {
            "No games match the search"
        };
        container(text(hint).color(LABEL_COLOR))
            .center(Length::Fill)
            .into()
    } else {
        let rows: Vec<Element<'_, Message>> =
            shown.into_iter().map(|game| game_row(state, game)).collect();
        scrollable(column(rows).spacing(4))
            .height(Length::Fill)
            .into()
    };

    column![header, rule::horizontal(1), body]
        .spacing(6)
        .height(Length::Fill)
        .into()
}

fn column_portion(field: Field) -> u16 {
    match field {
        Field::Name => 3,
        Field::ReleaseDate | Field::MetacriticScore | Field::Category => 2,
    }
}

fn game_row<'a>(state: &'a GameCatalog, game: &'a GameRecord) -> Element<'a, Message> {
    let id = game.id;

    let cover: Element<'_, Message> = match state.covers.get(&id) {
        Some(handle) => image(handle.clone())
            .width(COVER_PX)
            .height(COVER_PX)
            .into(),
        None => Space::new().width(COVER_PX).height(COVER_PX).into(),
    };
    let mut cells: Vec<Element<'_, Message>> = vec![
        button(cover)
            .on_press(Message::SelectGame(id))
            .padding(4)
            .style(button::text)
            .into(),
    ];

    for field in Field::EDITABLE {
        let value = state
            .drafts
            .get(&(id, field))
            .cloned()
            .unwrap_or_else(|| game.cell_text(field));
        cells.push(
            text_input(field.label(), &value)
                .on_input(move |value| Message::CellChanged(id, field, value))
                .on_submit(Message::CellSubmitted(id, field))
                .width(Length::FillPortion(column_portion(field)))
                .into(),
        );
    }

    let line = container(row(cells).spacing(8).align_y(Alignment::Center))
        .padding(4)
        .width(Length::Fill);
    if state.selected == Some(id) {
        line.style(selected_row_style).into()
    } else {
        line.into()
    }
}

fn selected_row_style(theme: &Theme) -> container::Style {
    let palette = theme.palette();
    container::Style {
        border: iced::Border {
            color: palette.primary,
            width: 2.0,
            radius: 4.0.into(),
        },
        ..Default::default()
    }
}

fn db_error_view(error: Option<&str>) -> Element<'_, Message> {
    let detail = error.unwrap_or("The catalog is not available.");
    container(
        column![
            text("The game catalog could not be opened").size(20),
            text(detail).size(13).color(LABEL_COLOR),
        ]
        .spacing(8)
        .align_x(Alignment::Center),
    )
    .center(Length::Fill)
    .into()
}

fn modal_view(modal: &Modal) -> Element<'_, Message> {
    let (title, body, buttons) = match modal {
        Modal::Notice { title, body } => (
            title.as_str(),
            body.as_str(),
            row![button("OK").on_press(Message::DismissNotice)],
        ),
        Modal::ConfirmExit(_) => (
            "Exit",
            "Are you sure you want to quit?",
            row![
                button("Yes").on_press(Message::ConfirmExit(true)),
                button("No")
                    .on_press(Message::ConfirmExit(false))
                    .style(button::secondary),
            ]
            .spacing(8),
        ),
    };

    container(
        column![
            text(title).size(18),
            text(body).size(14),
            row![Space::new().width(Length::Fill), buttons],
        ]
        .spacing(12),
    )
    .width(420.0)
    .padding(20)
    .style(container::bordered_box)
    .into()
}

/// Lays `dialog` over `base` and swallows clicks meant for anything beneath.
fn with_modal<'a>(base: Element<'a, Message>, dialog: Element<'a, Message>) -> Element<'a, Message> {
    iced::widget::stack![
        base,
        opaque(center(opaque(dialog)).style(|_theme| container::Style {
            background: Some(
                Color {
                    a: 0.7,
                    ..Color::BLACK
                }
                .into()
            ),
            ..container::Style::default()
        })),
    ]
    .into()
}

fn theme(_state: &GameCatalog) -> Theme {
    Theme::Dark
}

async fn pick_image(start_dir: Option<PathBuf>) -> Option<PathBuf> {
    let mut dialog = rfd::AsyncFileDialog::new()
        .set_title("Select Game Image")
        .add_filter("Image Files", &["png", "jpg", "jpeg", "bmp"]);
    if let Some(dir) = start_dir {
        dialog = dialog.set_directory(dir);
    }
    dialog
        .pick_file()
        .await
        .map(|handle| handle.path().to_path_buf())
}
