//! Platform abstraction layer
//!
//! The simulation never touches files, audio devices or keyboards directly.
//! Hosts plug in through:
//! - `AssetProvider`: resolves asset paths to opaque handles
//! - `InputSource`: reports which keys are held this frame

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Opaque handle to a renderable image owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHandle(pub u32);

/// Opaque handle to a sound clip owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoundHandle(pub u32);

/// Loads assets on behalf of the simulation.
///
/// Load failures are the host's problem; the simulation assumes every path resolves.
pub trait AssetProvider {
    fn load_image(&mut self, path: &str, transparent: bool) -> ImageHandle;
    fn load_sound(&mut self, path: &str) -> SoundHandle;
}

/// Interns asset paths into stable handles.
///
/// Loading the same path twice yields the same handle, so effects can load their
/// resources per instance without duplicating them on the host side.
#[derive(Debug, Clone, Default)]
pub struct AssetTable {
    images: HashMap<(String, bool), ImageHandle>,
    sounds: HashMap<String, SoundHandle>,
    image_paths: Vec<String>,
    sound_paths: Vec<String>,
}

impl AssetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path behind an image handle
    pub fn image_path(&self, handle: ImageHandle) -> Option<&str> {
        self.image_paths.get(handle.0 as usize).map(String::as_str)
    }

    /// Path behind a sound handle
    pub fn sound_path(&self, handle: SoundHandle) -> Option<&str> {
        self.sound_paths.get(handle.0 as usize).map(String::as_str)
    }

    pub fn image_count(&self) -> usize {
        self.image_paths.len()
    }

    pub fn sound_count(&self) -> usize {
        self.sound_paths.len()
    }
}

impl AssetProvider for AssetTable {
    fn load_image(&mut self, path: &str, transparent: bool) -> ImageHandle {
        if let Some(handle) = self.images.get(&(path.to_owned(), transparent)) {
            return *handle;
        }
        let handle = ImageHandle(self.image_paths.len() as u32);
        self.image_paths.push(path.to_owned());
        self.images.insert((path.to_owned(), transparent), handle);
        log::debug!("Registered image {path} as {handle:?}");
        handle
    }

    fn load_sound(&mut self, path: &str) -> SoundHandle {
        if let Some(handle) = self.sounds.get(path) {
            return *handle;
        }
        let handle = SoundHandle(self.sound_paths.len() as u32);
        self.sound_paths.push(path.to_owned());
        self.sounds.insert(path.to_owned(), handle);
        log::debug!("Registered sound {path} as {handle:?}");
        handle
    }
}

/// Keys the simulation cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
}

/// Live keyboard state supplied by the host
pub trait InputSource {
    fn is_key_down(&self, key: Key) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_table_interns_paths() {
        let mut table = AssetTable::new();
        let a = table.load_image("assets/ball.png", true);
        let b = table.load_image("assets/ball.png", true);
        let c = table.load_image("assets/brick.png", false);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.image_count(), 2);
        assert_eq!(table.image_path(c), Some("assets/brick.png"));

        let s1 = table.load_sound("assets/blop.wav");
        let s2 = table.load_sound("assets/blop.wav");
        assert_eq!(s1, s2);
        assert_eq!(table.sound_count(), 1);
        assert_eq!(table.sound_path(s1), Some("assets/blop.wav"));
    }
}
