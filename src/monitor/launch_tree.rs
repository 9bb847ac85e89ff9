//! Rolling tree of commands launched since startup, keyed by ancestry.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LaunchTreeError {
    #[error("empty ancestry")]
    EmptyAncestry,
    #[error("ancestry starts with {found:?} but the launch tree root is {root:?}")]
    RootMismatch { root: String, found: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchNode {
    pub command: String,
    pub launch_count: usize,
    pub children: Vec<LaunchNode>,
}

impl LaunchNode {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            launch_count: 0,
            children: Vec::new(),
        }
    }

    /// Build a tree from a list of ancestries, creating the root from the
    /// first one.
    pub fn from_ancestries<S: AsRef<str>>(
        ancestries: &[Vec<S>],
    ) -> Result<Option<LaunchNode>, LaunchTreeError> {
        let mut root: Option<LaunchNode> = None;
        for ancestry in ancestries {
            let ancestry: Vec<&str> = ancestry.iter().map(|s| s.as_ref()).collect();
            record_launch(&mut root, &ancestry)?;
        }
        Ok(root)
    }

    /// Count one launch of `ancestry[-1]`, creating missing nodes on the
    /// way. `ancestry[0]` must be this node's command.
    pub fn record(&mut self, ancestry: &[&str]) -> Result<(), LaunchTreeError> {
        let (first, rest) = ancestry
            .split_first()
            .ok_or(LaunchTreeError::EmptyAncestry)?;
        if *first != self.command {
            return Err(LaunchTreeError::RootMismatch {
                root: self.command.clone(),
                found: first.to_string(),
            });
        }

        let mut node = self;
        for command in rest {
            let ix = match node.children.iter().position(|c| c.command == *command) {
                Some(ix) => ix,
                None => {
                    node.children.push(LaunchNode::new(command));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[ix];
        }
        node.launch_count += 1;
        Ok(())
    }

    /// Number of leaves, which is also the number of rows needed to draw
    /// the tree.
    pub fn height(&self) -> usize {
        if self.children.is_empty() {
            return 1;
        }
        self.children.iter().map(LaunchNode::height).sum()
    }

    pub fn max_launch_count(&self) -> usize {
        self.children
            .iter()
            .map(LaunchNode::max_launch_count)
            .fold(self.launch_count, usize::max)
    }

    /// Children ordered for display: busiest subtree first, insertion order
    /// for ties.
    pub fn sorted_children(&self) -> Vec<&LaunchNode> {
        let mut children: Vec<&LaunchNode> = self.children.iter().collect();
        children.sort_by_key(|c| std::cmp::Reverse(c.max_launch_count()));
        children
    }

    /// Look up a node by its command path below (and including) this node.
    pub fn find(&self, path: &[&str]) -> Option<&LaunchNode> {
        let (first, rest) = path.split_first()?;
        if *first != self.command {
            return None;
        }
        let mut node = self;
        for command in rest {
            node = node.children.iter().find(|c| c.command == *command)?;
        }
        Some(node)
    }
}

/// Record a launch, creating the root if this is the first one.
pub fn record_launch(
    root: &mut Option<LaunchNode>,
    ancestry: &[&str],
) -> Result<(), LaunchTreeError> {
    let first = ancestry.first().ok_or(LaunchTreeError::EmptyAncestry)?;
    root.get_or_insert_with(|| LaunchNode::new(first))
        .record(ancestry)
}
