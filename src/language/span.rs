use std::{fmt, sync::Arc};

/// A position in a [`FileSet`]: the file's base plus a byte offset.
/// `Pos::NONE` never resolves to a file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos(pub u32);

impl Pos {
    pub const NONE: Pos = Pos(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    pub fn offset_by(self, delta: usize) -> Pos {
        Pos(self.0 + delta as u32)
    }
}

/// Byte range inside a single source buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

/// Human-readable location, 1-based line and byte column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub filename: String,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn is_valid(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return f.write_str(if self.filename.is_empty() { "-" } else { &self.filename });
        }
        if self.filename.is_empty() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(f, "{}:{}:{}", self.filename, self.line, self.column)
        }
    }
}

/// Line table for one registered source buffer.
#[derive(Debug, Clone)]
pub struct TokenFile {
    name: String,
    base: u32,
    size: usize,
    lines: Vec<usize>,
}

impl TokenFile {
    /// Builds the line table directly from the buffer, without registering
    /// it in any file set.
    pub fn from_content(name: impl Into<String>, base: u32, src: &[u8]) -> Self {
        let mut lines = vec![0];
        for (idx, byte) in src.iter().enumerate() {
            if *byte == b'\n' && idx + 1 < src.len() {
                lines.push(idx + 1);
            }
        }
        Self {
            name: name.into(),
            base,
            size: src.len(),
            lines,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos.0 >= self.base && (pos.0 as usize) <= self.base as usize + self.size
    }

    pub fn pos(&self, offset: usize) -> Pos {
        Pos(self.base + offset.min(self.size) as u32)
    }

    pub fn offset(&self, pos: Pos) -> Option<usize> {
        if self.contains(pos) {
            Some((pos.0 - self.base) as usize)
        } else {
            None
        }
    }

    pub fn span(&self, pos: Pos, end: Pos) -> Option<Span> {
        Some(Span::new(self.offset(pos)?, self.offset(end)?))
    }

    /// 1-based line for an offset.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.lines.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }

    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.lines.get(line.checked_sub(1)?).copied()
    }

    pub fn position(&self, pos: Pos) -> Position {
        let Some(offset) = self.offset(pos) else {
            return Position::default();
        };
        let line = self.line_of(offset);
        let column = offset - self.lines[line - 1] + 1;
        Position {
            filename: self.name.clone(),
            offset,
            line,
            column,
        }
    }
}

/// Registration table shared by all files parsed in one batch. Every file
/// gets a disjoint `[base, base+size]` range so a bare [`Pos`] identifies
/// both the file and the offset.
#[derive(Debug)]
pub struct FileSet {
    files: Vec<Arc<TokenFile>>,
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

    pub fn base(&self) -> u32 {
        self.next_base
    }

    pub fn add_file(&mut self, name: impl Into<String>, src: &[u8]) -> Arc<TokenFile> {
        let file = Arc::new(TokenFile::from_content(name, self.next_base, src));
        self.next_base += src.len() as u32 + 1;
        self.files.push(Arc::clone(&file));
        file
    }

    /// Registers a descriptor built elsewhere. Rejected when its range
    /// overlaps a registered file.
    pub fn register(&mut self, file: Arc<TokenFile>) -> bool {
        let start = file.base();
        let end = start as usize + file.size();
        let overlaps = self.files.iter().any(|existing| {
            let lo = existing.base() as usize;
            let hi = lo + existing.size();
            (start as usize) <= hi && end >= lo
        });
        if overlaps {
            return false;
        }
        self.next_base = self.next_base.max(end as u32 + 1);
        self.files.push(file);
        self.files.sort_by_key(|f| f.base());
        true
    }

    pub fn file(&self, pos: Pos) -> Option<Arc<TokenFile>> {
        if !pos.is_valid() {
            return None;
        }
        let idx = self.files.partition_point(|f| f.base() <= pos.0);
        let candidate = self.files.get(idx.checked_sub(1)?)?;
        candidate.contains(pos).then(|| Arc::clone(candidate))
    }

    pub fn position(&self, pos: Pos) -> Position {
        self.file(pos)
            .map(|file| file.position(pos))
            .unwrap_or_default()
    }

    pub fn files(&self) -> impl Iterator<Item = &Arc<TokenFile>> {
        self.files.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_resolve_to_their_registered_file() {
        let mut fset = FileSet::new();
        let a = fset.add_file("a.gop", b"package a\nvar x = 1\n");
        let b = fset.add_file("b.gop", b"package b\n");
        let pos = a.pos(14);
        let found = fset.file(pos).expect("file for a");
        assert_eq!(found.name(), "a.gop");
        let position = fset.position(pos);
        assert_eq!((position.line, position.column), (2, 5));
        assert_eq!(fset.file(b.pos(0)).expect("file for b").name(), "b.gop");
        assert!(fset.file(Pos::NONE).is_none());
    }

    #[test]
    fn synthesized_file_registers_without_overlap() {
        let mut fset = FileSet::new();
        let first = fset.add_file("a.gop", b"x");
        let synthetic = Arc::new(TokenFile::from_content("a.gop", first.base(), b"x"));
        assert!(!fset.register(synthetic));
        let fresh = Arc::new(TokenFile::from_content("c.gop", fset.base() + 10, b"yy"));
        assert!(fset.register(fresh));
        assert_eq!(fset.position(Pos(fset.base() - 3)).filename, "c.gop");
    }
}
