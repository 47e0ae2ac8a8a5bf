mod app;
mod catalog;
mod config;
mod form;
mod game;
mod library;
mod thumbnail;

fn main() -> iced::Result {
    env_logger::init();
    app::run()
}
