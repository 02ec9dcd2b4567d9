use thiserror::Error;

#[derive(Error, Debug)]
pub enum SorteioError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("no comments loaded")]
    EmptyBatch,

    #[error("a draw is already in progress")]
    DrawInProgress,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("render error: {0}")]
    Render(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl SorteioError {
    pub fn parse(msg: impl Into<String>) -> Self {
        SorteioError::Parse(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SorteioError>;
