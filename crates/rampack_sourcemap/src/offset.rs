use memchr::{memchr_iter, memrchr};
use serde::Serialize;

pub fn lines_count(str: &str) -> u32 {
  u32::try_from(memchr_iter(b'\n', str.as_bytes()).count()).unwrap()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Position {
  pub line: u32,
  pub column: u32,
}

/// Tracks where the next appended segment will begin in the assembled
/// bundle, advancing by line breaks and trailing-line characters.
#[derive(Debug, Default)]
pub struct OffsetTracker {
  line: u32,
  column: u32,
}

impl OffsetTracker {
  pub fn position(&self) -> Position {
    Position { line: self.line, column: self.column }
  }

  pub fn advance(&mut self, segment: &str) {
    match memrchr(b'\n', segment.as_bytes()) {
      None => {
        self.column += u32::try_from(segment.chars().count()).unwrap();
      }
      Some(last_break) => {
        self.line += lines_count(segment);
        self.column = u32::try_from(segment[last_break + 1..].chars().count()).unwrap();
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_lines_count() {
    assert_eq!(lines_count("a\nb\nc"), 2);
    assert_eq!(lines_count("a\nb\nc\n"), 3);
    assert_eq!(lines_count("a"), 0);
  }

  #[test]
  fn advance_without_breaks_extends_the_column() {
    let mut tracker = OffsetTracker::default();
    tracker.advance("abc");
    tracker.advance("de");
    assert_eq!(tracker.position(), Position { line: 0, column: 5 });
  }

  #[test]
  fn advance_resets_column_after_a_break() {
    let mut tracker = OffsetTracker::default();
    tracker.advance("a\nbb\nccc");
    assert_eq!(tracker.position(), Position { line: 2, column: 3 });

    tracker.advance("\n");
    assert_eq!(tracker.position(), Position { line: 3, column: 0 });
  }
}
