//! TOML parameter files
//!
//! Parameter files live in `$RM_SW_ROOT/params` and deserialise into plain serde structs.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::host;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (RM_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot read the parameter file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Invalid parameters: {0}")]
    DeserialiseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file by name, relative to `$RM_SW_ROOT/params`.
pub fn load<P: DeserializeOwned>(file_name: &str) -> Result<P, LoadError> {
    let root = host::get_sw_root().map_err(|_| LoadError::SwRootNotSet)?;

    load_from_path(root.join("params").join(file_name))
}

pub fn load_from_path<P, F>(path: F) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    F: AsRef<Path>,
{
    let path = path.as_ref();
    let content =
        read_to_string(path).map_err(|e| LoadError::FileLoadError(path.to_path_buf(), e))?;

    from_str(&content)
}

pub fn from_str<P: DeserializeOwned>(content: &str) -> Result<P, LoadError> {
    toml::from_str(content).map_err(LoadError::DeserialiseError)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Example {
        step_m: f64,
        names: Vec<String>,
    }

    #[test]
    fn test_from_str() {
        let ex: Example = from_str("step_m = 0.5\nnames = [\"a\", \"b\"]").unwrap();
        assert_eq!(ex.step_m, 0.5);
        assert_eq!(ex.names.len(), 2);

        assert!(matches!(
            from_str::<Example>("step_m = \"fast\""),
            Err(LoadError::DeserialiseError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let res: Result<Example, _> = load_from_path("/nonexistent/params.toml");
        assert!(matches!(res, Err(LoadError::FileLoadError(_, _))));
    }
}
