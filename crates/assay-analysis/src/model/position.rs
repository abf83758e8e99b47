//! Positions, spans, and the file set that maps them back to file:line:col.
//!
//! A `Pos` is global across every file of a program: each file owns a
//! disjoint `[base, base + len]` range, and `Pos(0)` means "no position".

use std::fmt;

use serde::{Deserialize, Serialize};

/// A global source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Pos(pub u32);

impl Pos {
    pub const NONE: Pos = Pos(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    pub fn offset(self, delta: u32) -> Pos {
        Pos(self.0 + delta)
    }
}

/// A half-open `[start, end)` range of positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.start <= pos && pos < self.end
    }

    /// True when `other` lies entirely inside this span.
    pub fn encloses(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn len(&self) -> u32 {
        self.end.0.saturating_sub(self.start.0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A resolved, human-readable location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// One file registered in a `FileSet`.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub base: u32,
    pub len: u32,
    line_starts: Vec<u32>,
}

impl SourceFile {
    /// Position of the byte at `offset` inside this file.
    pub fn pos(&self, offset: usize) -> Pos {
        Pos(self.base + offset as u32)
    }

    fn contains(&self, pos: Pos) -> bool {
        pos.0 >= self.base && pos.0 <= self.base + self.len
    }

    fn line_col(&self, pos: Pos) -> (u32, u32) {
        let offset = pos.0 - self.base;
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let column = offset - self.line_starts[line_idx];
        (line_idx as u32 + 1, column + 1)
    }
}

/// Registry of every file in a program.
#[derive(Debug, Clone)]
pub struct FileSet {
    files: Vec<SourceFile>,
    next_base: u32,
}

impl Default for FileSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSet {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            next_base: 1,
        }
    }

    /// Register a file and return its index.
    pub fn add_file(&mut self, name: &str, content: &str) -> usize {
        let mut line_starts = vec![0u32];
        for (i, b) in content.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        let len = content.len() as u32;
        self.files.push(SourceFile {
            name: name.to_string(),
            base: self.next_base,
            len,
            line_starts,
        });
        self.next_base += len + 1;
        self.files.len() - 1
    }

    pub fn file(&self, index: usize) -> &SourceFile {
        &self.files[index]
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    fn file_for(&self, pos: Pos) -> Option<&SourceFile> {
        if !pos.is_valid() {
            return None;
        }
        self.files.iter().find(|f| f.contains(pos))
    }

    /// Resolve a position to file:line:col.
    pub fn location(&self, pos: Pos) -> Option<Location> {
        let file = self.file_for(pos)?;
        let (line, column) = file.line_col(pos);
        Some(Location {
            file: file.name.clone(),
            line,
            column,
        })
    }

    /// 1-based line of a position, 0 when unknown.
    pub fn line(&self, pos: Pos) -> u32 {
        self.file_for(pos).map(|f| f.line_col(pos).0).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_are_disjoint_across_files() {
        let mut fs = FileSet::new();
        let a = fs.add_file("a.go", "package a\nfunc A() {}\n");
        let b = fs.add_file("b.go", "package a\n");
        let pa = fs.file(a).pos(10);
        let pb = fs.file(b).pos(0);
        assert!(pb > pa);

        let loc = fs.location(pa).unwrap();
        assert_eq!(loc.file, "a.go");
        assert_eq!((loc.line, loc.column), (2, 1));
        assert_eq!(fs.location(pb).unwrap().to_string(), "b.go:1:1");
    }

    #[test]
    fn test_no_position_has_no_location() {
        let fs = FileSet::new();
        assert!(fs.location(Pos::NONE).is_none());
        assert_eq!(fs.line(Pos::NONE), 0);
    }
}
