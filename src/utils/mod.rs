//! Utility functions and types

pub mod data_loader;

pub use data_loader::{
    lock_path_for, with_exclusive_lock, write_atomic, write_atomic_all, DataLoader, DataSaver, FileInfo,
};
