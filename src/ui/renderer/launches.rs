//! The "Launched Commands" pane: the launch tree drawn sideways.
//!
//! ```text
//! a┬─b──c──d
//!  ├─e
//!  └─f
//! ```
//!
//! A node's children start where its label ends. Every leaf gets a row of
//! its own, so a subtree is exactly `height()` rows tall.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::monitor::LaunchNode;
use crate::ui::theme::Theme;

use super::helpers::{pane, put};

pub fn render_launches(frame: &mut Frame, area: Rect, tree: &LaunchNode, theme: &Theme) {
    let block = pane("Launched Commands", theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    draw_launch_tree(frame.buffer_mut(), inner, tree, theme);
}

/// Draw `tree` into `area`, clipped on both axes.
pub fn draw_launch_tree(buf: &mut Buffer, area: Rect, tree: &LaunchNode, theme: &Theme) {
    let mut canvas = Canvas { buf, area, theme };
    canvas.node(tree, 0, 0);
}

fn label(node: &LaunchNode) -> String {
    if node.launch_count > 0 {
        format!("{}({})", node.command, node.launch_count)
    } else {
        node.command.clone()
    }
}

struct Canvas<'a> {
    buf: &'a mut Buffer,
    area: Rect,
    theme: &'a Theme,
}

impl Canvas<'_> {
    fn put(&mut self, x: usize, y: usize, text: &str) {
        let style = Style::default().fg(self.theme.fade(y, self.area.height as usize));
        put(self.buf, self.area, x, y, text, style);
    }

    /// Draws `node` at (`x`, `y`) and returns the number of rows used.
    fn node(&mut self, node: &LaunchNode, x: usize, y: usize) -> usize {
        if y >= self.area.height as usize {
            return node.height();
        }

        let text = label(node);
        self.put(x, y, &text);
        let end = x + text.width();

        let children = node.sorted_children();
        match children.as_slice() {
            [] => 1,
            [only] => {
                self.put(end, y, "──");
                self.node(only, end + 2, y)
            }
            _ => {
                let last = children.len() - 1;
                let mut row = y;
                for (i, child) in children.iter().enumerate() {
                    let branch = match i {
                        0 => "┬─",
                        i if i == last => "└─",
                        _ => "├─",
                    };
                    self.put(end, row, branch);
                    let rows = self.node(child, end + 2, row);
                    if i != last {
                        for r in row + 1..row + rows {
                            self.put(end, r, "│");
                        }
                    }
                    row += rows;
                }
                row - y
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::renderer::helpers::buffer_lines;

    fn node(command: &str, launch_count: usize, children: Vec<LaunchNode>) -> LaunchNode {
        LaunchNode {
            command: command.to_string(),
            launch_count,
            children,
        }
    }

    fn leaf(command: &str) -> LaunchNode {
        node(command, 0, vec![])
    }

    fn draw(tree: &LaunchNode, width: u16, height: u16) -> Vec<String> {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        draw_launch_tree(&mut buf, area, tree, &Theme::dark());
        buffer_lines(&buf)
    }

    #[test]
    fn sideways_tree_rows() {
        let tree = node(
            "a",
            0,
            vec![
                node("b", 0, vec![node("c", 0, vec![leaf("d")])]),
                leaf("e"),
                node("f", 0, vec![leaf("g"), node("h", 0, vec![leaf("i")])]),
                leaf("j"),
            ],
        );
        let lines = draw(&tree, 20, 10);
        assert_eq!(
            lines[..5],
            ["a┬─b──c──d", " ├─e", " ├─f┬─g", " │  └─h──i", " └─j"]
        );
        assert!(lines[5..].iter().all(String::is_empty));
    }

    #[test]
    fn launch_counts_are_shown() {
        let tree = node("init", 0, vec![node("bash", 2, vec![leaf("ls")])]);
        assert_eq!(draw(&tree, 30, 1), ["init──bash(2)──ls"]);
    }

    #[test]
    fn busiest_branch_comes_first() {
        let tree = node("init", 0, vec![node("cron", 1, vec![]), node("sshd", 5, vec![])]);
        assert_eq!(draw(&tree, 30, 2), ["init┬─sshd(5)", "    └─cron(1)"]);
    }

    #[test]
    fn clipped_at_the_edges() {
        let tree = node(
            "a",
            0,
            vec![leaf("b"), leaf("c"), node("d", 0, vec![leaf("e"), leaf("f")])],
        );
        assert_eq!(draw(&tree, 4, 2), ["a┬─b", " ├─c"]);
    }

    #[test]
    fn rows_fade_downwards() {
        let tree = node("a", 0, vec![leaf("b"), leaf("c")]);
        let area = Rect::new(0, 0, 10, 3);
        let mut buf = Buffer::empty(area);
        let theme = Theme::dark();
        draw_launch_tree(&mut buf, area, &tree, &theme);
        assert_eq!(buf[(0, 0)].fg, theme.text);
        assert_eq!(buf[(1, 1)].fg, theme.fade(1, 3));
    }
}
