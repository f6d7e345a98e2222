use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Event decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Payload is missing required field `{0}`")]
    MissingField(&'static str),
}
