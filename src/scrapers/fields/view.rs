//! Read-only view of a container shared by every strategy.

use tracing::debug;

use crate::scrapers::page::{PageError, PageNode};

/// Descendants carrying a human-readable label.
const LABELLED: &str = "[title], [alt], [aria-label]";
const LABEL_ATTRIBUTES: &[&str] = &["title", "alt", "aria-label"];

type ChildQuery<'c> = Box<dyn Fn(&str) -> Result<Vec<String>, PageError> + 'c>;
type LabelQuery<'c> = Box<dyn Fn(&[String]) -> Vec<String> + 'c>;

/// Rendered text, lines and markup of one container, computed once.
pub struct ContainerView<'c> {
    text: String,
    lines: Vec<String>,
    markup: String,
    query: ChildQuery<'c>,
    labels: LabelQuery<'c>,
}

impl<'c> ContainerView<'c> {
    pub fn of<N: PageNode + 'c>(node: &'c N) -> Self {
        let text = node.text();
        let lines = crate::scrapers::page::non_empty_lines(&text);
        Self {
            text,
            lines,
            markup: node.markup(),
            query: Box::new(move |selector: &str| {
                Ok(node
                    .children_matching(selector)?
                    .iter()
                    .map(|child| child.text())
                    .collect())
            }),
            labels: Box::new(move |excluded: &[String]| labels_outside(node, excluded)),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Rendered texts of descendants matching `selector`.
    pub fn texts_matching(&self, selector: &str) -> Result<Vec<String>, PageError> {
        (self.query)(selector)
    }

    /// `title`, `alt` and `aria-label` values in document order, skipping
    /// elements on or under anything matching `excluded`.
    pub fn labels_outside(&self, excluded: &[String]) -> Vec<String> {
        (self.labels)(excluded)
    }
}

fn labels_outside<N: PageNode>(node: &N, excluded: &[String]) -> Vec<String> {
    let mut skipped = Vec::new();
    for selector in excluded {
        match node.children_matching(selector) {
            Ok(found) => skipped.extend(found),
            Err(e) => debug!("Ignoring exclusion: {}", e),
        }
    }
    let labelled = match node.children_matching(LABELLED) {
        Ok(labelled) => labelled,
        Err(e) => {
            debug!("Label lookup failed: {}", e);
            return Vec::new();
        }
    };
    labelled
        .iter()
        .filter(|el| !skipped.iter().any(|s| s.same_node(el)) && !el.is_inside(&skipped))
        .flat_map(|el| LABEL_ATTRIBUTES.iter().filter_map(move |attr| el.attribute(attr)))
        .collect()
}
