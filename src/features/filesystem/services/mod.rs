pub mod adapter;

pub use adapter::StretchFsAdapter;
