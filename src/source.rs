//! Source buffers and span primitives.
//!
//! Every token, syntax node, sema node and diagnostic carries a
//! [`SrcLocation`]: a shared handle to the buffer it came from plus a
//! half-open byte range. Merging two locations yields the enclosing span,
//! which is how composite nodes derive their spans from their children.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

/// A unit of source text fed to the compiler. The package root is a
/// synthetic buffer so that diagnostics about the package itself (missing
/// entry points, duplicate module files) still have somewhere to point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SrcBuffer {
    File { path: PathBuf, contents: String },
    PackageRoot { name: String },
}

impl SrcBuffer {
    pub fn file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Rc<SrcBuffer> {
        Rc::new(SrcBuffer::File {
            path: path.into(),
            contents: contents.into(),
        })
    }

    pub fn package_root(name: impl Into<String>) -> Rc<SrcBuffer> {
        Rc::new(SrcBuffer::PackageRoot { name: name.into() })
    }

    pub fn contents(&self) -> &str {
        match self {
            SrcBuffer::File { contents, .. } => contents,
            SrcBuffer::PackageRoot { .. } => "",
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            SrcBuffer::File { path, .. } => path.to_string_lossy().into_owned(),
            SrcBuffer::PackageRoot { name } => format!("<package {name}>"),
        }
    }

    /// Zero-based (line, column) of a byte offset, for rendering.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let text = self.contents();
        let clamped = offset.min(text.len());
        let mut line = 0;
        let mut col = 0;
        for c in text[..clamped].chars() {
            if c == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

/// A half-open byte range `[begin, end)` inside a buffer.
#[derive(Clone)]
pub struct SrcLocation {
    pub buffer: Rc<SrcBuffer>,
    pub begin: usize,
    pub end: usize,
}

impl SrcLocation {
    pub fn new(buffer: Rc<SrcBuffer>, begin: usize, end: usize) -> SrcLocation {
        SrcLocation { buffer, begin, end }
    }

    /// The enclosing span of `first..last`. Both must reference the same
    /// buffer; the result starts where `first` starts and ends where
    /// `last` ends.
    pub fn merge(first: &SrcLocation, last: &SrcLocation) -> SrcLocation {
        SrcLocation {
            buffer: Rc::clone(&first.buffer),
            begin: first.begin,
            end: last.end,
        }
    }

    /// The single-character span at the start of this location.
    pub fn first(&self) -> SrcLocation {
        SrcLocation {
            buffer: Rc::clone(&self.buffer),
            begin: self.begin,
            end: (self.begin + 1).min(self.end.max(self.begin + 1)),
        }
    }

    /// The single-character span at the end of this location.
    pub fn last(&self) -> SrcLocation {
        let begin = if self.end > self.begin {
            self.end - 1
        } else {
            self.begin
        };
        SrcLocation {
            buffer: Rc::clone(&self.buffer),
            begin,
            end: self.end.max(begin + 1),
        }
    }

    /// The empty span sitting just after this location, used to anchor
    /// missing-token diagnostics at the trailing position.
    pub fn after(&self) -> SrcLocation {
        SrcLocation {
            buffer: Rc::clone(&self.buffer),
            begin: self.end,
            end: self.end,
        }
    }

    pub fn text(&self) -> &str {
        let contents = self.buffer.contents();
        let begin = self.begin.min(contents.len());
        let end = self.end.min(contents.len());
        &contents[begin..end]
    }

    pub fn contains(&self, other: &SrcLocation) -> bool {
        Rc::ptr_eq(&self.buffer, &other.buffer)
            && self.begin <= other.begin
            && other.end <= self.end
    }
}

impl PartialEq for SrcLocation {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.buffer, &other.buffer)
            && self.begin == other.begin
            && self.end == other.end
    }
}

impl Eq for SrcLocation {}

impl fmt::Debug for SrcLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (line, col) = self.buffer.line_col(self.begin);
        write!(
            f,
            "{}:{}:{}",
            self.buffer.display_name(),
            line + 1,
            col + 1
        )
    }
}

/// A name together with where it was written.
#[derive(Clone, PartialEq, Eq)]
pub struct Ident {
    pub location: SrcLocation,
    pub name: String,
}

impl Ident {
    pub fn new(location: SrcLocation, name: impl Into<String>) -> Ident {
        Ident {
            location,
            name: name.into(),
        }
    }
}

impl fmt::Debug for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_spans_encloses() {
        let buffer = SrcBuffer::file("main.ace", "abcdef");
        let first = SrcLocation::new(Rc::clone(&buffer), 1, 3);
        let last = SrcLocation::new(Rc::clone(&buffer), 4, 6);

        let merged = SrcLocation::merge(&first, &last);

        assert_eq!(merged.begin, 1);
        assert_eq!(merged.end, 6);
        assert_eq!(merged.text(), "bcdef");
    }

    #[test]
    fn test_first_and_last_are_single_characters() {
        let buffer = SrcBuffer::file("main.ace", "abcdef");
        let location = SrcLocation::new(buffer, 2, 5);

        assert_eq!(location.first().text(), "c");
        assert_eq!(location.last().text(), "e");
    }

    #[test]
    fn test_line_col() {
        let buffer = SrcBuffer::file("main.ace", "ab\ncd\nef");
        assert_eq!(buffer.line_col(0), (0, 0));
        assert_eq!(buffer.line_col(3), (1, 0));
        assert_eq!(buffer.line_col(7), (2, 1));
    }
}
