// storage module for window geometry persistence
// two tiny text records in the app config dir: "WIDTHxHEIGHT" and "X,Y"

use crate::geometry::{Point, Size, WindowGeometry};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const SIZE_FILE: &str = "window_size.conf";
const POSITION_FILE: &str = "window_position.conf";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to create config dir {0:?}: {1}")]
    CreateDir(PathBuf, std::io::Error),
    #[error("Failed to write {0:?}: {1}")]
    Write(PathBuf, std::io::Error),
}

/// what survived from the last run; either half may be missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoredGeometry {
    pub size: Option<Size>,
    pub position: Option<Point>,
}

#[derive(Debug, Clone)]
pub struct GeometryStore {
    dir: PathBuf,
}

impl GeometryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn size_path(&self) -> PathBuf {
        self.dir.join(SIZE_FILE)
    }

    fn position_path(&self) -> PathBuf {
        self.dir.join(POSITION_FILE)
    }

    // --- public API ---

    /// load both records; missing or malformed files read as `None`
    pub fn load(&self) -> StoredGeometry {
        let stored = StoredGeometry {
            size: read_record(&self.size_path(), parse_size),
            position: read_record(&self.position_path(), parse_position),
        };
        info!("[storage] loaded geometry {:?} from {:?}", stored, self.dir);
        stored
    }

    pub fn save_size(&self, size: Size) -> Result<(), StoreError> {
        self.write_record(&self.size_path(), &format!("{}x{}", size.width, size.height))
    }

    pub fn save_position(&self, origin: Point) -> Result<(), StoreError> {
        self.write_record(&self.position_path(), &format!("{},{}", origin.x, origin.y))
    }

    pub fn save(&self, geometry: &WindowGeometry) -> Result<(), StoreError> {
        self.save_size(geometry.size())?;
        self.save_position(geometry.origin())
    }

    fn write_record(&self, path: &Path, contents: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::CreateDir(self.dir.clone(), e))?;
        fs::write(path, contents).map_err(|e| StoreError::Write(path.to_path_buf(), e))?;
        debug!("[storage] wrote {:?} = {}", path, contents);
        Ok(())
    }
}

fn read_record<T>(path: &Path, parse: fn(&str) -> Option<T>) -> Option<T> {
    let raw = fs::read_to_string(path).ok()?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        debug!("[storage] ignoring malformed record {:?}: {:?}", path, raw);
    }
    parsed
}

fn parse_size(raw: &str) -> Option<Size> {
    let (width, height) = raw.split_once('x')?;
    let width: i32 = width.trim().parse().ok()?;
    let height: i32 = height.trim().parse().ok()?;
    (width > 0 && height > 0).then_some(Size::new(width, height))
}

fn parse_position(raw: &str) -> Option<Point> {
    let (x, y) = raw.split_once(',')?;
    Some(Point::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}
