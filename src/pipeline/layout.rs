//! Table reconstruction from positioned text.
//!
//! Both native PDF text (pdfium glyphs) and OCR output (word boxes) arrive
//! here as boxes on a page with a downward y axis. The grid builder works in
//! three passes:
//!
//! 1. glyphs → words: whitespace or a horizontal gap ends a word
//! 2. words → lines: words whose vertical centres sit within half a text
//!    height of a line's running centre join that line
//! 3. lines → cells: column spans come from the most common multi-word line
//!    width; every word goes to the span containing its centre (or the nearest
//!    one), and words sharing a cell are joined with a space
//!
//! The column count of the result is what decides the text-table bucket.

use crate::table::Cell;

/// Fallback text height when no glyph has a usable box.
const DEFAULT_HEIGHT: f32 = 8.0;

/// A horizontal gap wider than this fraction of the text height ends a word.
const WORD_GAP_RATIO: f32 = 0.3;

/// Vertical-centre tolerance for joining a line, as a fraction of text height.
const LINE_TOLERANCE_RATIO: f32 = 0.5;

/// One character with its box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

/// A run of characters, or one OCR word.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Word {
    pub fn new(text: impl Into<String>, left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            text: text.into(),
            left,
            right,
            top,
            bottom,
        }
    }

    fn center_x(&self) -> f32 {
        (self.left + self.right) / 2.0
    }

    fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    fn height(&self) -> f32 {
        self.bottom - self.top
    }

    fn extend(&mut self, g: &Glyph) {
        self.text.push(g.ch);
        self.left = self.left.min(g.left);
        self.right = self.right.max(g.right);
        self.top = self.top.min(g.top);
        self.bottom = self.bottom.max(g.bottom);
    }
}

fn median(mut values: Vec<f32>) -> Option<f32> {
    values.retain(|v| v.is_finite() && *v > 0.0);
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    Some(values[values.len() / 2])
}

/// Group glyphs (in content order) into words.
pub fn words_from_glyphs(glyphs: &[Glyph]) -> Vec<Word> {
    let height = median(
        glyphs
            .iter()
            .filter(|g| !g.ch.is_whitespace())
            .map(|g| g.bottom - g.top)
            .collect(),
    )
    .unwrap_or(DEFAULT_HEIGHT);
    let max_gap = height * WORD_GAP_RATIO;

    let mut words = Vec::new();
    let mut current: Option<Word> = None;

    for g in glyphs {
        if g.ch.is_whitespace() || g.ch.is_control() {
            words.extend(current.take());
            continue;
        }

        let breaks = current.as_ref().is_some_and(|w| {
            let gy = (g.top + g.bottom) / 2.0;
            (gy - w.center_y()).abs() > height * LINE_TOLERANCE_RATIO
                || g.left - w.right > max_gap
                || g.right < w.left
        });
        if breaks {
            words.extend(current.take());
        }

        match current.as_mut() {
            Some(w) => w.extend(g),
            None => current = Some(Word::new(g.ch.to_string(), g.left, g.top, g.right, g.bottom)),
        }
    }
    words.extend(current);
    words
}

/// Cluster words into lines, top to bottom, each sorted left to right.
pub fn group_lines(mut words: Vec<Word>) -> Vec<Vec<Word>> {
    let height = median(words.iter().map(Word::height).collect()).unwrap_or(DEFAULT_HEIGHT);
    let tolerance = height * LINE_TOLERANCE_RATIO;

    words.sort_by(|a, b| {
        a.center_y()
            .total_cmp(&b.center_y())
            .then(a.left.total_cmp(&b.left))
    });

    let mut lines: Vec<(f32, Vec<Word>)> = Vec::new();
    for word in words {
        match lines.last_mut() {
            Some((cy, line)) if (word.center_y() - *cy).abs() <= tolerance => {
                line.push(word);
                *cy = line.iter().map(Word::center_y).sum::<f32>() / line.len() as f32;
            }
            _ => lines.push((word.center_y(), vec![word])),
        }
    }

    lines
        .into_iter()
        .map(|(_, mut line)| {
            line.sort_by(|a, b| a.left.total_cmp(&b.left));
            line
        })
        .collect()
}

/// Horizontal spans of the table's columns.
///
/// Spans are taken from lines with the modal word count (ties favour the
/// wider count); overlapping word extents on those lines merge into one span.
pub fn column_spans(lines: &[Vec<Word>]) -> Vec<(f32, f32)> {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for n in lines.iter().map(Vec::len).filter(|n| *n >= 2) {
        match counts.iter_mut().find(|(len, _)| *len == n) {
            Some((_, c)) => *c += 1,
            None => counts.push((n, 1)),
        }
    }

    let Some(modal) = counts
        .iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(len, _)| *len)
    else {
        let words = lines.iter().flatten();
        let left = words.clone().map(|w| w.left).fold(f32::INFINITY, f32::min);
        let right = words.map(|w| w.right).fold(f32::NEG_INFINITY, f32::max);
        return if left.is_finite() { vec![(left, right)] } else { Vec::new() };
    };

    let mut extents: Vec<(f32, f32)> = lines
        .iter()
        .filter(|l| l.len() == modal)
        .flatten()
        .map(|w| (w.left, w.right))
        .collect();
    extents.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut spans: Vec<(f32, f32)> = Vec::new();
    for (left, right) in extents {
        match spans.last_mut() {
            Some(span) if left <= span.1 => span.1 = span.1.max(right),
            _ => spans.push((left, right)),
        }
    }
    spans
}

fn nearest_span(spans: &[(f32, f32)], x: f32) -> usize {
    let distance = |(l, r): (f32, f32)| {
        if x < l {
            l - x
        } else if x > r {
            x - r
        } else {
            0.0
        }
    };
    spans
        .iter()
        .enumerate()
        .min_by(|a, b| distance(*a.1).total_cmp(&distance(*b.1)))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Lay words out as a grid of cells.
pub fn build_grid(words: Vec<Word>) -> Vec<Vec<Cell>> {
    if words.is_empty() {
        return Vec::new();
    }

    let lines = group_lines(words);
    let spans = column_spans(&lines);

    lines
        .into_iter()
        .map(|line| {
            let mut row: Vec<Cell> = vec![None; spans.len()];
            for word in line {
                let col = nearest_span(&spans, word.center_x());
                match row[col].as_mut() {
                    Some(text) => {
                        text.push(' ');
                        text.push_str(&word.text);
                    }
                    None => row[col] = Some(word.text),
                }
            }
            row
        })
        .collect()
}

/// Glyphs straight to a grid.
pub fn grid_from_glyphs(glyphs: &[Glyph]) -> Vec<Vec<Cell>> {
    build_grid(words_from_glyphs(glyphs))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lay out `text` as monospaced glyphs starting at (`x`, `y`), 6pt wide, 10pt high.
    fn glyphs(text: &str, x: f32, y: f32) -> Vec<Glyph> {
        text.chars()
            .enumerate()
            .map(|(i, ch)| Glyph {
                ch,
                left: x + i as f32 * 6.0,
                right: x + i as f32 * 6.0 + 5.5,
                top: y,
                bottom: y + 10.0,
            })
            .collect()
    }

    fn word(text: &str, x: f32, y: f32) -> Word {
        Word::new(text, x, y, x + text.len() as f32 * 6.0, y + 10.0)
    }

    fn texts(row: &[Cell]) -> Vec<Option<&str>> {
        row.iter().map(|c| c.as_deref()).collect()
    }

    #[test]
    fn spaces_and_gaps_split_words() {
        let mut g = glyphs("1-Jan 21", 0.0, 0.0);
        g.extend(glyphs("40", 120.0, 0.0));
        let words = words_from_glyphs(&g);
        let t: Vec<_> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(t, vec!["1-Jan", "21", "40"]);
    }

    #[test]
    fn vertical_jump_splits_words() {
        let mut g = glyphs("12", 0.0, 0.0);
        g.extend(glyphs("34", 12.0, 30.0));
        assert_eq!(words_from_glyphs(&g).len(), 2);
    }

    #[test]
    fn lines_cluster_by_vertical_centre() {
        let words = vec![
            word("b", 50.0, 21.0),
            word("a", 0.0, 20.0),
            word("title", 0.0, 0.0),
        ];
        let lines = group_lines(words);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][0].text, "title");
        assert_eq!(lines[1][0].text, "a");
        assert_eq!(lines[1][1].text, "b");
    }

    #[test]
    fn grid_uses_modal_line_width() {
        let mut words = vec![word("Air Quality Report", 40.0, 0.0)];
        for (i, y) in [20.0, 40.0, 60.0].into_iter().enumerate() {
            words.push(word(&format!("{}-Jan", i + 1), 0.0, y));
            words.push(word("21", 60.0, y));
            words.push(word("45", 120.0, y));
        }
        let grid = build_grid(words);
        assert_eq!(grid.len(), 4);
        assert!(grid.iter().all(|r| r.len() == 3));
        assert_eq!(texts(&grid[2]), vec![Some("2-Jan"), Some("21"), Some("45")]);
        assert_eq!(grid[0].iter().filter(|c| c.is_some()).count(), 1);
    }

    #[test]
    fn missing_value_leaves_empty_cell() {
        let words = vec![
            word("1-Jan", 0.0, 0.0),
            word("21", 60.0, 0.0),
            word("45", 120.0, 0.0),
            word("2-Jan", 0.0, 20.0),
            word("22", 60.0, 20.0),
            word("46", 120.0, 20.0),
            word("3-Jan", 0.0, 40.0),
            word("47", 120.0, 40.0),
        ];
        let grid = build_grid(words);
        assert_eq!(texts(&grid[2]), vec![Some("3-Jan"), None, Some("47")]);
    }

    #[test]
    fn words_in_one_span_are_joined() {
        let words = vec![
            word("Date", 0.0, 0.0),
            word("NO2", 60.0, 0.0),
            word("1-Jan", 0.0, 20.0),
            word("12", 60.0, 20.0),
            word("2-Jan", 0.0, 40.0),
            word("13", 60.0, 40.0),
            word("µg/m3", 56.0, 60.0),
            word("(avg)", 62.0, 60.0),
        ];
        let grid = build_grid(words);
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[3][1].as_deref(), Some("µg/m3 (avg)"));
    }

    #[test]
    fn single_word_lines_give_one_column() {
        let grid = build_grid(vec![word("a", 0.0, 0.0), word("b", 0.0, 20.0)]);
        assert_eq!(grid, vec![vec![Some("a".into())], vec![Some("b".into())]]);
    }

    #[test]
    fn empty_input_gives_empty_grid() {
        assert!(build_grid(Vec::new()).is_empty());
        assert!(grid_from_glyphs(&[]).is_empty());
    }
}
