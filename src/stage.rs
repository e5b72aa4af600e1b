//! Staging of the bundled web UI.
//!
//! The UI directory may either contain the UI files directly or a single
//! archive with all of them. In the latter case the archive is unpacked
//! into a fresh temporary directory once at startup and files are served
//! from there. The archive itself is never modified.

use std::fs::File;
use std::path::{Path, PathBuf};
use log::{debug, error, info};
use tempfile::TempDir;
use crate::error::Failed;


//------------ Constants -----------------------------------------------------

/// The file name of the bundled UI archive.
const ARCHIVE_NAME: &str = "webui.zip";


//------------ StagedAssets --------------------------------------------------

/// The file system location the web UI is served from.
///
/// A value is created via [`prepare`][Self::prepare] exactly once before
/// the listener starts and is only read afterwards. If the UI was unpacked
/// from an archive, the temporary directory lives as long as this value
/// and is removed when it is dropped.
#[derive(Debug)]
pub struct StagedAssets {
    /// The directory files are served from.
    root: PathBuf,

    /// The staging directory if the UI was unpacked from an archive.
    staged: Option<TempDir>,
}

impl StagedAssets {
    /// Prepares the assets under the given UI directory.
    ///
    /// If `ui_dir` contains an archive named `webui.zip`, unpacks it into
    /// a new unique temporary directory and serves from there. Otherwise
    /// serves from `ui_dir` directly. Any error while unpacking is fatal
    /// and must keep the server from starting.
    pub fn prepare(ui_dir: &Path) -> Result<Self, Failed> {
        let archive = ui_dir.join(ARCHIVE_NAME);
        debug!("Checking for a UI archive at {}", archive.display());
        if !archive.is_file() {
            return Ok(StagedAssets {
                root: ui_dir.into(),
                staged: None,
            })
        }

        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(err) => {
                error!("Failed to create staging directory: {}", err);
                return Err(Failed)
            }
        };
        info!(
            "Extracting {} to {}", archive.display(), dir.path().display()
        );
        extract(&archive, dir.path())?;
        Ok(StagedAssets {
            root: dir.path().into(),
            staged: Some(dir),
        })
    }

    /// Returns the directory the UI files are served from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns whether the UI was unpacked from an archive.
    pub fn is_staged(&self) -> bool {
        self.staged.is_some()
    }
}


//------------ extract -------------------------------------------------------

/// Unpacks all entries of the archive into the given directory.
fn extract(archive: &Path, target: &Path) -> Result<(), Failed> {
    let file = match File::open(archive) {
        Ok(file) => file,
        Err(err) => {
            error!(
                "Failed to open UI archive {}: {}", archive.display(), err
            );
            return Err(Failed)
        }
    };
    let mut zip = match zip::ZipArchive::new(file) {
        Ok(zip) => zip,
        Err(err) => {
            error!(
                "Failed to read UI archive {}: {}", archive.display(), err
            );
            return Err(Failed)
        }
    };
    if let Err(err) = zip.extract(target) {
        error!(
            "Failed to unpack UI archive {}: {}", archive.display(), err
        );
        return Err(Failed)
    }
    Ok(())
}


//============ Tests =========================================================
