pub mod entry_dto;

pub use entry_dto::{
    DirEntry, DirEntryStream, EntryKind, FileMetadata, Visibility, WriteOptions,
    DEFAULT_CONTENT_TYPE,
};
