use std::{fs::File, io::{Write, BufWriter}, path::Path};
use anyhow::Result;
use regex::Regex;
use lazy_static::lazy_static;

use located_error::LocatedError;

mod error;
pub use error::WriterError;

/// Field separator of every results file.
pub const WRITER_SEPARATOR: &str = "\t";

/// A generic results writer, either targeting a file, or stdout.
pub struct GenericWriter<'a> {
    source: BufWriter<Box<dyn Write + 'a>>
}

impl<'a> GenericWriter<'a>{
    /// Instantiate a new `GenericWriter`. Writes to stdout if `path` is `None`.
    ///
    /// # Errors
    /// if `path` is either an invalid file, or the user does not have the proper
    /// UNIX permissions to write at this location.
    pub fn new(path: Option<impl AsRef<Path>>) -> Result<GenericWriter<'a>>{
        use WriterError::IOError;
        Ok(GenericWriter{ source: match path {
            Some(path) => {
                let file = File::create(path).map_err(IOError).loc("While creating file")?;
                BufWriter::new(Box::new(file))
            },
            None => {
                BufWriter::new(Box::new(std::io::stdout()))
            }
        }})
    }

    /// Write the contents of a generic iterator. One item = one line.
    ///
    /// Pretty-print separators (`[ ]+-[ ]+`) and alignment padding are replaced with
    /// [`WRITER_SEPARATOR`], so that `Display` implementations meant for the console end up as
    /// tab-separated records.
    ///
    /// # Errors
    /// - If any of the items within `iter` fails to get written.
    pub fn write_iter<T, I>(&mut self, iter: T) -> Result<()>
    where   T: IntoIterator<Item = I>,
            I: std::fmt::Display,
    {
        lazy_static! {
            static ref RE: Regex = Regex::new(r"[ ]+-[ ]+").expect("Failed to parse regex.");
        }
        for obj in iter {
            let line = format!("{obj}");
            let line = RE.replace_all(line.trim_end(), WRITER_SEPARATOR);
            writeln!(self.source, "{line}")
                .map_err(WriterError::IOError)
                .loc("While writing contents into file")?;
        }
        self.source.flush().loc("While flushing buffer contents of Writer")
    }
}
