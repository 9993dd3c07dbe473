//! `scraper`-backed page snapshot.

use scraper::{ElementRef, Html, Selector};

use super::text::rendered_text;
use super::{PageError, PageNode, PageTree};

/// Parsed copy of the page DOM taken after lazy content has loaded.
pub struct PageSnapshot {
    document: Html,
}

impl PageSnapshot {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }
}

impl std::fmt::Debug for PageSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSnapshot").finish_non_exhaustive()
    }
}

fn parse_selector(selector: &str) -> Result<Selector, PageError> {
    Selector::parse(selector).map_err(|e| PageError::Selector {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}

impl PageTree for PageSnapshot {
    type Node<'a> = DomNode<'a>;

    fn select_all(&self, selector: &str) -> Result<Vec<DomNode<'_>>, PageError> {
        let selector = parse_selector(selector)?;
        Ok(self.document.select(&selector).map(DomNode).collect())
    }
}

/// Element handle borrowed from a [`PageSnapshot`].
#[derive(Clone, Copy)]
pub struct DomNode<'a>(ElementRef<'a>);

impl std::fmt::Debug for DomNode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>", self.0.value().name())
    }
}

impl PageNode for DomNode<'_> {
    fn tag_name(&self) -> String {
        self.0.value().name().to_ascii_lowercase()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.0.value().attr(name).map(|s| s.to_string())
    }

    fn text(&self) -> String {
        rendered_text(self.0)
    }

    fn markup(&self) -> String {
        self.0.inner_html()
    }

    fn parent(&self) -> Option<Self> {
        self.0.parent().and_then(ElementRef::wrap).map(DomNode)
    }

    fn children_matching(&self, selector: &str) -> Result<Vec<Self>, PageError> {
        let selector = parse_selector(selector)?;
        Ok(self.0.select(&selector).map(DomNode).collect())
    }

    fn same_node(&self, other: &Self) -> bool {
        self.0.id() == other.0.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <div class="grid">
          <div class="card"><a href="/p/lamp-1"><p>Lamp</p></a><p>S$20</p></div>
        </div>
    </body></html>"#;

    #[test]
    fn select_all_in_document_order() {
        let page = PageSnapshot::parse(PAGE);
        let ps = page.select_all("p").unwrap();
        let texts: Vec<String> = ps.iter().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["Lamp", "S$20"]);
    }

    #[test]
    fn invalid_selector_is_an_error() {
        let page = PageSnapshot::parse(PAGE);
        assert!(matches!(
            page.select_all("a[href*="),
            Err(PageError::Selector { .. })
        ));
    }

    #[test]
    fn parent_walks_up_to_root() {
        let page = PageSnapshot::parse(PAGE);
        let anchor = page.select_all("a").unwrap().remove(0);
        let card = anchor.parent().unwrap();
        assert_eq!(card.attribute("class").as_deref(), Some("card"));

        let mut depth = 0;
        let mut current = Some(anchor);
        while let Some(node) = current {
            current = node.parent();
            depth += 1;
        }
        // a -> div.card -> div.grid -> body -> html
        assert_eq!(depth, 5);
    }

    #[test]
    fn children_matching_is_scoped() {
        let page = PageSnapshot::parse(PAGE);
        let card = page.select_all(".card").unwrap().remove(0);
        assert_eq!(card.children_matching("p").unwrap().len(), 2);
        assert!(card.children_matching("h3").unwrap().is_empty());
    }

    #[test]
    fn same_node_compares_identity() {
        let page = PageSnapshot::parse(PAGE);
        let a = page.select_all("a").unwrap().remove(0);
        let again = page.select_all("a[href]").unwrap().remove(0);
        let card = a.parent().unwrap();
        assert!(a.same_node(&again));
        assert!(!a.same_node(&card));
    }

    #[test]
    fn markup_includes_scripts() {
        let page = PageSnapshot::parse(
            r#"<div class="card"><script>window.price="S$45";</script><p>Chair</p></div>"#,
        );
        let card = page.select_all(".card").unwrap().remove(0);
        assert!(card.markup().contains("S$45"));
        assert_eq!(card.text(), "Chair");
    }
}
