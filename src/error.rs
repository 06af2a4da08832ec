//! Error types for RaySonic

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RaySonicError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Mesh for object {0} has no triangles")]
    EmptyMesh(String),

    #[error("Object {0} is not registered")]
    ObjectNotFound(String),

    #[error("Object {0} is registered; unregister it before replacing its mesh")]
    ObjectRegistered(String),

    #[error("Geometry buffers are out of date: {0}")]
    GeometryOutOfDate(String),

    #[error("GPU resource error: {0}")]
    GpuResource(String),

    #[error("GPU device error: {0}")]
    GpuDevice(String),

    #[error("Readback error: {0}")]
    Readback(String),

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("Audio loading error: {0}")]
    AudioLoading(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RaySonicError>;
