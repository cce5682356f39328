//! In-memory file table for the shell. Flat namespace, nothing persists.

use core::fmt;

use heapless::{String, Vec};

use crate::constants::fs::{FILE_CONTENT_SIZE, MAX_FILENAME, MAX_FILES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    TableFull,
    AlreadyExists,
    NotFound,
    NameTooLong,
    ContentTooLarge,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FsError::TableFull => "file table is full",
            FsError::AlreadyExists => "file already exists",
            FsError::NotFound => "file not found",
            FsError::NameTooLong => "file name too long",
            FsError::ContentTooLarge => "content too large",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone)]
pub struct File {
    name: String<MAX_FILENAME>,
    content: String<FILE_CONTENT_SIZE>,
}

impl File {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileTable {
    files: Vec<File, MAX_FILES>,
}

impl FileTable {
    pub const fn new() -> Self {
        FileTable { files: Vec::new() }
    }

    /// A table holding the welcome file.
    pub fn seeded() -> Self {
        let mut table = FileTable::new();
        let _ = table.create("readme.txt");
        let _ = table.write("readme.txt", "Welcome to miniOS!\nType 'help' for commands.");
        table
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|file| file.name.as_str() == name)
    }

    pub fn create(&mut self, name: &str) -> Result<(), FsError> {
        if self.find(name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        let name = String::try_from(name).map_err(|_| FsError::NameTooLong)?;
        self.files
            .push(File {
                name,
                content: String::new(),
            })
            .map_err(|_| FsError::TableFull)
    }

    /// Replace the content of an existing file.
    pub fn write(&mut self, name: &str, content: &str) -> Result<(), FsError> {
        let index = self.find(name).ok_or(FsError::NotFound)?;
        let content = String::try_from(content).map_err(|_| FsError::ContentTooLarge)?;
        self.files[index].content = content;
        Ok(())
    }

    pub fn read(&self, name: &str) -> Result<&str, FsError> {
        self.find(name)
            .map(|index| self.files[index].content())
            .ok_or(FsError::NotFound)
    }

    pub fn delete(&mut self, name: &str) -> Result<(), FsError> {
        let index = self.find(name).ok_or(FsError::NotFound)?;
        self.files.remove(index);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &File> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
