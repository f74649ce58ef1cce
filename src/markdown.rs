use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingNode {
    pub title: String,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingTree {
    pub title: String,
    pub level: u8,
    pub children: Vec<HeadingTree>,
}

/// Headings of `markdown` in document order.
pub fn extract_headings(markdown: &str) -> Vec<HeadingNode> {
    let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);

    let mut headings = Vec::new();
    let mut current: Option<HeadingNode> = None;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some(HeadingNode {
                    title: String::new(),
                    level: level as u8,
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(mut heading) = current.take() {
                    heading.title = heading.title.trim().to_owned();
                    headings.push(heading);
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(heading) = current.as_mut() {
                    heading.title.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(heading) = current.as_mut() {
                    heading.title.push(' ');
                }
            }
            _ => {}
        }
    }

    headings
}

/// Nests each heading under the nearest preceding heading of a smaller level.
pub fn build_tree(headings: &[HeadingNode]) -> Vec<HeadingTree> {
    let mut roots: Vec<HeadingTree> = Vec::new();
    // Open ancestors, shallowest first. The last entry is the deepest open node.
    let mut stack: Vec<HeadingTree> = Vec::new();

    for heading in headings {
        while stack.last().is_some_and(|open| open.level >= heading.level) {
            close_top(&mut stack, &mut roots);
        }
        stack.push(HeadingTree {
            title: heading.title.clone(),
            level: heading.level,
            children: Vec::new(),
        });
    }
    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }

    roots
}

fn close_top(stack: &mut Vec<HeadingTree>, roots: &mut Vec<HeadingTree>) {
    let Some(done) = stack.pop() else {
        return;
    };
    match stack.last_mut() {
        Some(parent) => parent.children.push(done),
        None => roots.push(done),
    }
}

/// Anchor id for a heading title.
pub fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(title: &str, level: u8) -> HeadingNode {
        HeadingNode {
            title: title.to_owned(),
            level,
        }
    }

    #[test]
    fn extracts_headings_in_order_with_inline_code() {
        let md = "# Queries\n\nText.\n\n## Using `graphql`\n\nMore.\n\nSetext\n---\n";
        assert_eq!(
            extract_headings(md),
            vec![node("Queries", 1), node("Using graphql", 2), node("Setext", 2)]
        );
    }

    #[test]
    fn ignores_hash_lines_inside_code_blocks() {
        let md = "# Real\n\n```sh\n# not a heading\n```\n";
        assert_eq!(extract_headings(md), vec![node("Real", 1)]);
    }

    #[test]
    fn tree_groups_deeper_levels_under_preceding_shallower() {
        let md = "# A\n## B\n## C\n# D\n";
        let tree = build_tree(&extract_headings(md));

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].title, "A");
        assert_eq!(
            tree[0].children.iter().map(|c| c.title.as_str()).collect::<Vec<_>>(),
            vec!["B", "C"]
        );
        assert_eq!(tree[1].title, "D");
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn heading_without_shallower_predecessor_is_root() {
        let tree = build_tree(&[node("Deep", 3), node("Top", 1), node("Mid", 2), node("Leaf", 4)]);

        assert_eq!(
            tree.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(),
            vec!["Deep", "Top"]
        );
        assert_eq!(tree[1].children[0].title, "Mid");
        assert_eq!(tree[1].children[0].children[0].title, "Leaf");
    }

    #[test]
    fn empty_input_gives_empty_tree() {
        assert!(build_tree(&extract_headings("plain text only\n")).is_empty());
    }

    #[test]
    fn slug_collapses_separators_and_drops_punctuation() {
        assert_eq!(slug("Setting up the client"), "setting-up-the-client");
        assert_eq!(slug("  What's  new?  "), "whats-new");
        assert_eq!(slug("First_and - skip"), "first-and-skip");
    }
}
