use std::path::{Path, PathBuf};

pub fn config_dir() -> Option<PathBuf> {
    dirs_next::home_dir().map(|d| d.join(".game-catalog"))
}

pub fn database_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("games.db"))
}

pub fn cover_cache_dir() -> Option<PathBuf> {
    config_dir().map(|d| d.join("cache").join("covers"))
}

/// Remember the folder of the last picked cover so the next picker opens there.
pub fn save_last_image_dir(image: &Path) {
    let (Some(dir), Some(folder)) = (config_dir(), image.parent()) else {
        return;
    };
    write_last_image_dir(&dir, folder);
}

pub fn load_last_image_dir() -> Option<PathBuf> {
    read_last_image_dir(&config_dir()?)
}

fn write_last_image_dir(config: &Path, folder: &Path) {
    let _ = std::fs::create_dir_all(config);
    if let Err(e) = std::fs::write(
        config.join("last_image_dir"),
        folder.to_string_lossy().as_bytes(),
    ) {
        log::warn!("Failed to remember image folder: {}", e);
    }
}

fn read_last_image_dir(config: &Path) -> Option<PathBuf> {
    let data = std::fs::read_to_string(config.join("last_image_dir")).ok()?;
    let path = PathBuf::from(data.trim());
    if path.is_dir() { Some(path) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_image_dir_round_trip() {
        let config = tempfile::tempdir().unwrap();
        let covers = tempfile::tempdir().unwrap();
        assert_eq!(read_last_image_dir(config.path()), None);

        write_last_image_dir(config.path(), covers.path());
        assert_eq!(
            read_last_image_dir(config.path()),
            Some(covers.path().to_path_buf())
        );
    }

    #[test]
    fn vanished_image_dir_is_forgotten() {
        let config = tempfile::tempdir().unwrap();
        write_last_image_dir(config.path(), Path::new("/definitely/not/here"));
        assert_eq!(read_last_image_dir(config.path()), None);
    }

    #[test]
    fn paths_live_under_config_dir() {
        if let (Some(dir), Some(db)) = (config_dir(), database_path()) {
            assert_eq!(db, dir.join("games.db"));
        }
    }
}
