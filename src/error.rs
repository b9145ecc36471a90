use thiserror::Error;

use crate::asset::AssetId;
use crate::object::ObjectId;

/// Errors surfaced by an editing session.
///
/// None of these are fatal to the host: they are scoped to the session that produced them.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(String),
    #[error("invalid data URL")]
    InvalidDataUrl,
    #[error("invalid surface dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("unknown asset {0}")]
    UnknownAsset(AssetId),
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),
    #[error("object {0} cannot be merged into the background")]
    NotMergeable(ObjectId),
    #[error("a request is already pending")]
    Busy,
    #[error("invalid font data for family {0:?}")]
    InvalidFont(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

/// Failures reported by the external AI collaborators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("service returned an unusable response: {0}")]
    InvalidResponse(String),
}

pub type EditorResult<T> = Result<T, EditorError>;
