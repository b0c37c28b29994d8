//! Staging store
//!
//! Client-local holding area for files selected but not yet submitted.
//! One ordered sequence per category; insertion order is display order and
//! removal index order. Mutation requires `&mut`, so there is a single writer.

use crate::error::{ClientError, ClientResult, ValidationError};
use crate::models::{Category, StagedFile};
use std::collections::BTreeMap;
use tracing::debug;

/// Snapshot of staged files, keyed by category
///
/// Every category is always present, possibly with an empty sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct StagingState {
    files: BTreeMap<Category, Vec<StagedFile>>,
}

impl StagingState {
    pub fn new() -> Self {
        Self {
            files: Category::ALL.iter().map(|c| (*c, Vec::new())).collect(),
        }
    }

    /// Files staged for a category, in insertion order
    pub fn files(&self, category: Category) -> &[StagedFile] {
        self.files.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True iff every category is empty
    pub fn is_empty(&self) -> bool {
        self.files.values().all(Vec::is_empty)
    }

    pub fn total_files(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.iter().map(|(_, f)| f.size_bytes()).sum()
    }

    /// Categories holding at least one file, in category order
    pub fn non_empty_categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.files
            .iter()
            .filter(|(_, files)| !files.is_empty())
            .map(|(category, _)| *category)
    }

    /// All staged files with their category, category order then insertion order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &StagedFile)> + '_ {
        self.files
            .iter()
            .flat_map(|(category, files)| files.iter().map(move |f| (*category, f)))
    }

    fn slot_mut(&mut self, category: Category) -> &mut Vec<StagedFile> {
        self.files.entry(category).or_default()
    }
}

impl Default for StagingState {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of the mutable staging state
#[derive(Debug, Default)]
pub struct StagingStore {
    state: StagingState,
}

impl StagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append files to a category
    ///
    /// No de-duplication: the same file may be added twice. Every file must
    /// already be tagged with `category`.
    ///
    /// # Returns
    /// Number of files now staged in the category.
    pub fn add_files(&mut self, category: Category, files: Vec<StagedFile>) -> ClientResult<usize> {
        if files.is_empty() {
            return Err(ValidationError::EmptyFileSet(category).into());
        }
        if let Some(mismatch) = files.iter().find(|f| f.category() != category) {
            return Err(ValidationError::CategoryMismatch {
                name: mismatch.name().to_string(),
                expected: category,
                actual: mismatch.category(),
            }
            .into());
        }

        let added = files.len();
        let slot = self.state.slot_mut(category);
        slot.extend(files);
        debug!(category = %category, added, staged = slot.len(), "Files staged");
        Ok(slot.len())
    }

    /// Remove the file at `index`, shifting later files down by one
    ///
    /// Out-of-range indices leave the state untouched.
    pub fn remove_file(&mut self, category: Category, index: usize) -> ClientResult<StagedFile> {
        let slot = self.state.slot_mut(category);
        if index >= slot.len() {
            return Err(ClientError::IndexOutOfRange {
                category,
                index,
                len: slot.len(),
            });
        }
        let removed = slot.remove(index);
        debug!(category = %category, index, file = %removed.name(), "Staged file removed");
        Ok(removed)
    }

    /// Empty every category
    pub fn clear_all(&mut self) {
        self.state = StagingState::new();
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn files(&self, category: Category) -> &[StagedFile] {
        self.state.files(category)
    }

    pub fn state(&self) -> &StagingState {
        &self.state
    }

    /// Owned copy of the current state; payloads are shared, not copied
    pub fn snapshot(&self) -> StagingState {
        self.state.clone()
    }
}
