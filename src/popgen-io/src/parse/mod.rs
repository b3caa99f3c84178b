use std::{fs, path::{Path, PathBuf}};

use anyhow::Result;
use located_error::LocatedError;
use log::trace;

mod error;
pub use error::ParseError;

/// Attempt to create the parent directories of a path (if needed) and return an error if it failed.
/// # Errors
/// - if the user does not have the proper UNIX permissions to create the directory.
pub fn create_parent_directory(path: &Path) -> Result<()> {
    use ParseError::CreateParentDirectory;
    let parent_dir = path.parent().unwrap_or(path);
    let loc_msg = || format!("While attempting to create output directory '{}'", path.display());
    fs::create_dir_all(parent_dir).map_err(CreateParentDirectory).with_loc(loc_msg)?;
    Ok(())
}

/// Format the path of a results file: `{output_dir}/{stem}.{ext}`, creating `output_dir` if needed.
///
/// # Errors
/// - `OverwriteDisallowed` if the file already exists and `allow_overwrite` is `false`
/// - if the output directory cannot be created.
pub fn output_file(output_dir: &Path, stem: &str, ext: &str, allow_overwrite: bool) -> Result<PathBuf> {
    let path = output_dir.join(format!("{stem}.{ext}"));
    create_parent_directory(&path)?;
    if !allow_overwrite && path.exists() {
        return Err(ParseError::OverwriteDisallowed{path})
            .loc("While attempting to format the name of an output file")
    }
    trace!("Output file: {}", path.display());
    Ok(path)
}
