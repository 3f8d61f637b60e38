use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::text::clean_text;

/// A parsed document together with the address it was loaded from.
pub(crate) struct Page {
    document: Html,
    url: Url,
}

impl Page {
    pub(crate) fn parse(html: &str, url: Url) -> Self {
        Self {
            document: Html::parse_document(html),
            url,
        }
    }

    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    pub(crate) fn document(&self) -> &Html {
        &self.document
    }

    pub(crate) fn select_all<'a>(
        &'a self,
        selector: &'a Selector,
    ) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.document.select(selector)
    }

    pub(crate) fn select_first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.document.select(selector).next()
    }

    /// Text of the first element matching `selector`, or an empty string.
    pub(crate) fn first_text(&self, selector: &Selector) -> String {
        self.select_first(selector)
            .map(element_text)
            .unwrap_or_default()
    }

    pub(crate) fn document_title(&self) -> String {
        clean_text(&self.first_text(&TITLE_TAG))
    }
}

static TITLE_TAG: LazyLock<Selector> = LazyLock::new(|| selector("title"));

pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

pub(crate) fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Compiles a selector that is a source-code constant.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|err| panic!("invalid built-in selector {css:?}: {err}"))
}

pub(crate) fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter().map(|css| selector(css)).collect()
}
