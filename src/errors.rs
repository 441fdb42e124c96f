use thiserror::Error;

#[derive(Debug, Error)]
pub enum HprofCrunchError {
    #[error("input file `{name}` not found")]
    InputFileNotFound { name: String },
    #[error("invalid pointer size {size}, expected 4 or 8")]
    InvalidIdSize { size: u32 },
    #[error("invalid hprof file header ({message})")]
    InvalidHeader { message: String },
    #[error("invalid hprof record ({message})")]
    InvalidRecord { message: String },
    #[error("string id {id:#x} is defined more than once")]
    DuplicateStringId { id: u64 },
    #[error(
        "instance {object_id:#x} of class {class_object_id:#x} needs {needed} more bytes but only {available} are left"
    )]
    InstanceDataUnderflow {
        object_id: u64,
        class_object_id: u64,
        needed: usize,
        available: usize,
    },
    #[error(
        "instance {object_id:#x} of class {class_object_id:#x} has {remaining} unread bytes after walking its class hierarchy"
    )]
    InstanceDataMismatch {
        object_id: u64,
        class_object_id: u64,
        remaining: usize,
    },
    #[error("class {class_object_id:#x} appears twice in its own superclass chain")]
    ClassHierarchyCycle { class_object_id: u64 },
    #[error("I/O error: {e}")]
    StdIoError {
        #[from]
        e: std::io::Error,
    },
    #[error("JSON error: {e}")]
    SerdeJsonError {
        #[from]
        e: serde_json::Error,
    },
}
