//! Session directories
//!
//! Every run of a road manager executable is a session. Its directory, named after the executable
//! and the time the session started, holds the log file, CSV archives under `arch/` and any JSON
//! summaries the executable saves.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::{host, time};

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

/// Time the process' session started, shared by the logger's elapsed time column.
static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// strftime format of the timestamp in session directory names
const DIR_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Name of the archive directory inside a session
const ARCHIVE_DIR: &str = "arch";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Session {
    /// Directory of this session
    pub session_root: PathBuf,

    /// Directory CSV archives are written to
    pub arch_root: PathBuf,

    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (RM_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("A session has already been started in this process ({0})")]
    AlreadyStarted(conquer_once::TryInitError),

    #[error("Cannot create the session directory {0:?}: {1}")]
    CannotCreateDir(PathBuf, std::io::Error),

    #[error("Cannot write {0:?}: {1}")]
    CannotWrite(PathBuf, std::io::Error),

    #[error("Cannot serialise data for {0:?}: {1}")]
    CannotSerialise(PathBuf, serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start the process' session under `$RM_SW_ROOT/{sessions_dir}`.
    ///
    /// Only one session may be started per process.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let root = host::get_sw_root().map_err(|_| SessionError::SwRootNotSet)?;

        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(SessionError::AlreadyStarted)?;
        let epoch = get_epoch().copied().unwrap_or_else(Utc::now);

        Self::create(&root.join(sessions_dir), exec_name, &epoch)
    }

    /// Create the directories of a session started at `epoch` inside `parent`.
    fn create(parent: &Path, exec_name: &str, epoch: &DateTime<Utc>) -> Result<Self, SessionError> {
        let session_root = parent.join(format!(
            "{}_{}",
            exec_name,
            epoch.format(DIR_TIMESTAMP_FORMAT)
        ));
        let arch_root = session_root.join(ARCHIVE_DIR);

        fs::create_dir_all(&arch_root)
            .map_err(|e| SessionError::CannotCreateDir(arch_root.clone(), e))?;

        Ok(Session {
            log_file_path: session_root.join(format!("{}.log", exec_name)),
            session_root,
            arch_root,
        })
    }

    /// Write `data` as pretty printed JSON to `path`, relative to the session directory.
    pub fn save_json<P: AsRef<Path>, T: Serialize>(
        &self,
        path: P,
        data: &T,
    ) -> Result<PathBuf, SessionError> {
        let full_path = self.session_root.join(path);

        let json = serde_json::to_string_pretty(data)
            .map_err(|e| SessionError::CannotSerialise(full_path.clone(), e))?;

        if let Some(dir) = full_path.parent() {
            fs::create_dir_all(dir).map_err(|e| SessionError::CannotWrite(full_path.clone(), e))?;
        }
        fs::write(&full_path, json).map_err(|e| SessionError::CannotWrite(full_path.clone(), e))?;

        Ok(full_path)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Seconds since the session started, `NaN` before then.
pub fn get_elapsed_seconds() -> f64 {
    get_epoch()
        .and_then(|e| time::duration_to_seconds(Utc::now() - *e))
        .unwrap_or(f64::NAN)
}

pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_create_and_save() {
        let parent = std::env::temp_dir().join("rm_util_session_test");
        let epoch = Utc.ymd(2021, 3, 4).and_hms(5, 6, 7);

        let session = Session::create(&parent, "rm_test", &epoch).unwrap();
        assert_eq!(session.session_root, parent.join("rm_test_20210304_050607"));
        assert!(session.arch_root.is_dir());
        assert_eq!(session.log_file_path.file_name().unwrap(), "rm_test.log");

        let path = session.save_json("nested/data.json", &vec![1, 2, 3]).unwrap();
        let content = fs::read_to_string(path).unwrap();
        let back: Vec<i32> = serde_json::from_str(&content).unwrap();
        assert_eq!(back, vec![1, 2, 3]);

        fs::remove_dir_all(parent).ok();
    }
}
