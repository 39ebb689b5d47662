use thiserror::Error;

#[derive(Error, Debug)]
pub enum TsdbError {
    #[error("time-series store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response shape from time-series store: {0}")]
    UnexpectedResponse(String),

    #[error("failed to decode time-series store response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type TsdbResult<T> = Result<T, TsdbError>;
