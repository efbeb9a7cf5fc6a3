/// State management module
///
/// This module handles all application state, including:
/// - The key-value persistence seam and its in-memory store (storage.rs)
/// - The SQLite-backed store (library.rs)
/// - Shared data structures (data.rs)
/// - The public/archived record collections (records.rs)
/// - Persisted user settings (settings.rs)
/// - The generation form draft (draft.rs)

pub mod library;
pub mod data;
pub mod draft;
pub mod records;
pub mod settings;
pub mod storage;
