use thiserror::Error;
use crate::FileEntity;

#[derive(Error, Debug)]
pub enum ParserError{
    #[error("Invalid slice or value format for --{arg}. [{err}]")]
    ParseArg{arg: String, err: String},

    #[error("{0} {1} does not exist")]
    MissingFileEntity(FileEntity, String),

    #[error("{1} is not a {0}")]
    InvalidFileEntity(FileEntity, String),
}
