use crate::language::span::Span;
use std::sync::Arc;
use lsp_types::{Position, Range};

/// Converts between byte offsets of one buffer and editor positions, whose
/// columns count UTF-16 code units.
#[derive(Clone, Debug)]
pub struct Mapper {
    pub name: String,
    content: Arc<[u8]>,
    lines: Vec<usize>,
}

impl Mapper {
    pub fn new(name: impl Into<String>, content: Arc<[u8]>) -> Self {
        let mut lines = vec![0];
        for (idx, byte) in content.iter().enumerate() {
            if *byte == b'\n' {
                lines.push(idx + 1);
            }
        }
        Self {
            name: name.into(),
            content,
            lines,
        }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn offset_position(&self, offset: usize) -> Option<Position> {
        if offset > self.content.len() {
            return None;
        }
        let line = self.lines.partition_point(|start| *start <= offset) - 1;
        let start = self.lines[line];
        let prefix = String::from_utf8_lossy(&self.content[start..offset]);
        let character = prefix.encode_utf16().count();
        Some(Position::new(line as u32, character as u32))
    }

    pub fn position_offset(&self, position: Position) -> Option<usize> {
        let start = *self.lines.get(position.line as usize)?;
        let end = self
            .lines
            .get(position.line as usize + 1)
            .copied()
            .unwrap_or(self.content.len());
        let line = std::str::from_utf8(&self.content[start..end]).ok()?;
        let mut units = 0u32;
        for (idx, ch) in line.char_indices() {
            if units >= position.character || ch == '\n' {
                return Some(start + idx);
            }
            units += ch.len_utf16() as u32;
        }
        (units >= position.character).then_some(end)
    }

    pub fn span_range(&self, span: Span) -> Option<Range> {
        Some(Range {
            start: self.offset_position(span.start)?,
            end: self.offset_position(span.end)?,
        })
    }
}

pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(ch) if ch.is_alphabetic() || ch == '_' => (),
        _ => return false,
    }
    chars.all(|ch| ch.is_alphanumeric() || ch == '_')
}

pub fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        "break"
            | "case"
            | "chan"
            | "const"
            | "continue"
            | "default"
            | "defer"
            | "else"
            | "fallthrough"
            | "for"
            | "func"
            | "go"
            | "goto"
            | "if"
            | "import"
            | "interface"
            | "map"
            | "package"
            | "range"
            | "return"
            | "select"
            | "struct"
            | "switch"
            | "type"
            | "var"
    )
}

/// Identifier characters ending at `offset`, if any.
pub fn identifier_prefix_slice(text: &str, offset: usize) -> Option<&str> {
    let mut end = offset.min(text.len());
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    let start = text[..end]
        .char_indices()
        .rev()
        .take_while(|(_, ch)| ch.is_alphanumeric() || *ch == '_')
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(end);
    (start < end).then(|| &text[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_count_utf16_units() {
        let mapper = Mapper::new("a.gop", Arc::from("x := \"é😀\"\ny\n".as_bytes()));
        let quote = "x := \"é😀".len();
        assert_eq!(mapper.offset_position(quote), Some(Position::new(0, 9)));
        assert_eq!(mapper.position_offset(Position::new(0, 9)), Some(quote));
        let y = "x := \"é😀\"\n".len();
        assert_eq!(mapper.offset_position(y), Some(Position::new(1, 0)));
        assert_eq!(mapper.offset_position(1000), None);
    }

    #[test]
    fn identifiers_and_prefixes() {
        assert!(is_valid_identifier("_tmp1"));
        assert!(is_valid_identifier("größe"));
        assert!(!is_valid_identifier("1x"));
        assert!(is_keyword("func"));
        assert_eq!(identifier_prefix_slice("fmt.Pri", 7), Some("Pri"));
        assert_eq!(identifier_prefix_slice("fmt.", 4), None);
    }
}
