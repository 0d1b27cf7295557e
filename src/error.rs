use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type TokenReaderResult<T> = std::result::Result<T, TokenReaderError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration : {0}")]
    Configuration(String),
    #[error("not authorized : {0}")]
    Authorization(String),
    #[error("invalid request : {0}")]
    Request(String),
    #[error("request failed : {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider answered {status} : {body}")]
    HttpStatus { status: u16, body: String },
    #[error("token acquisition failed : {0}")]
    TokenReader(#[from] TokenReaderError),
    #[error("property store failed : {0}")]
    Store(#[from] StoreError),
    #[error("could not serialize json payload : {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not serialize form payload : {0}")]
    Form(#[from] serde_urlencoded::ser::Error),
    #[error("invalid url : {0}")]
    Url(#[from] url::ParseError),
    #[error("io error : {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone)]
pub enum TokenReaderError {
    #[error("response has malformed format: not found {0} in {1}")]
    TokenKeyNotFound(&'static str, String),
    #[error("token endpoint rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error : {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed contents : {0}")]
    Malformed(#[from] serde_json::Error),
}
