//! Column widths for the process tables.
//!
//! Widths start at the widest cell and are then narrowed one column at a
//! time, always where the fewest visible characters get cut. Whatever this
//! decides is the only truncation the tables do.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::utils::truncate_str;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// How slack is handed out when the table is narrower than the space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grow {
    No,
    All,
    /// Everything except column 0 (the PID column).
    SkipFirst,
}

/// Number of rows with a visible character in display column `width - 1`,
/// which is what narrowing by one would cut. Zero-width columns can't be
/// narrowed.
fn narrowing_cost(rows: &[Vec<String>], column: usize, width: usize) -> usize {
    if width == 0 {
        return usize::MAX;
    }
    rows.iter()
        .filter_map(|row| row.get(column))
        .filter(|cell| char_at_column(cell, width - 1).is_some_and(|c| !c.is_whitespace()))
        .count()
}

/// The character drawn over display column `column`, wide characters
/// covering both of their columns.
fn char_at_column(text: &str, column: usize) -> Option<char> {
    let mut start = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if column < start + w {
            return Some(c);
        }
        start += w;
    }
    None
}

/// Widths for `rows` (header included) summing to at most `max_total`.
pub fn solve_widths(rows: &[Vec<String>], max_total: usize, grow: Grow) -> Vec<usize> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths: Vec<usize> = (0..columns)
        .map(|c| {
            rows.iter()
                .filter_map(|row| row.get(c))
                .map(|cell| cell.width())
                .max()
                .unwrap_or(0)
        })
        .collect();

    while widths.iter().sum::<usize>() > max_total {
        let cheapest = (0..columns)
            .map(|c| (c, narrowing_cost(rows, c, widths[c])))
            .filter(|&(_, cost)| cost != usize::MAX)
            .min_by(|&(a, a_cost), &(b, b_cost)| {
                a_cost.cmp(&b_cost).then(widths[b].cmp(&widths[a])).then(a.cmp(&b))
            });
        match cheapest {
            Some((c, _)) => widths[c] -= 1,
            None => break,
        }
    }

    let total: usize = widths.iter().sum();
    if total < max_total && grow != Grow::No {
        let growable: Vec<usize> = (0..columns)
            .filter(|&c| !(grow == Grow::SkipFirst && c == 0))
            .collect();
        distribute(&mut widths, &growable, max_total - total);
    }
    widths
}

fn distribute(widths: &mut [usize], growable: &[usize], slack: usize) {
    let Some(&last) = growable.last() else {
        return;
    };
    let base: usize = growable.iter().map(|&c| widths[c]).sum();
    if base == 0 {
        widths[last] += slack;
        return;
    }

    let mut handed_out = 0;
    for &c in growable {
        let extra = slack * widths[c] / base;
        widths[c] += extra;
        handed_out += extra;
    }
    widths[last] += slack - handed_out;
}

/// True if no data row (header excluded) in any of `columns` is wider than
/// its column.
pub fn fits(rows: &[Vec<String>], widths: &[usize], columns: &[usize]) -> bool {
    rows.iter().skip(1).all(|row| {
        columns.iter().all(|&c| match (row.get(c), widths.get(c)) {
            (Some(cell), Some(&width)) => cell.width() <= width,
            _ => true,
        })
    })
}

/// Pad or cut `text` to exactly `width` display columns.
pub fn pad(text: &str, width: usize, align: Align) -> String {
    let text = truncate_str(text, width);
    let fill = " ".repeat(width.saturating_sub(text.width()));
    match align {
        Align::Left => format!("{}{}", text, fill),
        Align::Right => format!("{}{}", fill, text),
    }
}
