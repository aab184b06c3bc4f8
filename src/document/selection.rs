//! Zero-based page selection.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which pages of a document a call operates on.
///
/// Indices are zero-based, kept sorted and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<Vec<usize>>", into = "Option<Vec<usize>>")]
pub enum PageSelection {
    /// Every page in document order
    #[default]
    All,
    /// Specific pages
    Pages(Vec<usize>),
}

impl PageSelection {
    /// Select specific pages. An empty list selects every page.
    pub fn pages(pages: impl IntoIterator<Item = usize>) -> Self {
        let mut pages: Vec<usize> = pages.into_iter().collect();
        if pages.is_empty() {
            return PageSelection::All;
        }
        pages.sort_unstable();
        pages.dedup();
        PageSelection::Pages(pages)
    }

    /// Check whether a page index is selected.
    pub fn includes(&self, page: usize) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Pages(pages) => pages.binary_search(&page).is_ok(),
        }
    }

    /// Resolve against a document's page count.
    ///
    /// Fails with [`Error::PageOutOfRange`] on the first index that is not in
    /// `0..page_count`.
    pub fn resolve(&self, page_count: usize) -> Result<Vec<usize>> {
        match self {
            PageSelection::All => Ok((0..page_count).collect()),
            PageSelection::Pages(pages) => {
                if let Some(&page) = pages.iter().find(|&&p| p >= page_count) {
                    return Err(Error::PageOutOfRange { page, page_count });
                }
                Ok(pages.clone())
            }
        }
    }

    /// Parse a selection string such as `"0-2,5"` or `"all"`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        let invalid = || Error::InvalidPageRange(s.to_string());
        let mut pages = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            match part.split_once('-') {
                Some((start, end)) => {
                    let start: usize = start.trim().parse().map_err(|_| invalid())?;
                    let end: usize = end.trim().parse().map_err(|_| invalid())?;
                    if start > end {
                        return Err(invalid());
                    }
                    pages.extend(start..=end);
                }
                None => pages.push(part.parse().map_err(|_| invalid())?),
            }
        }

        Ok(Self::pages(pages))
    }
}

impl From<Option<Vec<usize>>> for PageSelection {
    fn from(pages: Option<Vec<usize>>) -> Self {
        match pages {
            Some(pages) => Self::pages(pages),
            None => PageSelection::All,
        }
    }
}

impl From<PageSelection> for Option<Vec<usize>> {
    fn from(selection: PageSelection) -> Self {
        match selection {
            PageSelection::All => None,
            PageSelection::Pages(pages) => Some(pages),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_sorted_and_deduped() {
        let selection = PageSelection::pages(vec![5, 1, 3, 1, 5]);
        assert_eq!(selection, PageSelection::Pages(vec![1, 3, 5]));
        assert!(selection.includes(3));
        assert!(!selection.includes(2));
    }

    #[test]
    fn test_empty_list_selects_all() {
        assert_eq!(PageSelection::pages(Vec::new()), PageSelection::All);
        assert_eq!(PageSelection::from(Some(vec![])), PageSelection::All);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(PageSelection::All.resolve(3).unwrap(), vec![0, 1, 2]);
        assert!(PageSelection::All.resolve(0).unwrap().is_empty());
        assert_eq!(
            PageSelection::pages(vec![2, 0]).resolve(3).unwrap(),
            vec![0, 2]
        );
    }

    #[test]
    fn test_resolve_out_of_range() {
        let err = PageSelection::pages(vec![0, 3, 7]).resolve(3).unwrap_err();
        assert!(matches!(
            err,
            Error::PageOutOfRange {
                page: 3,
                page_count: 3
            }
        ));
    }

    #[test]
    fn test_parse() {
        assert_eq!(PageSelection::parse("all").unwrap(), PageSelection::All);
        assert_eq!(PageSelection::parse("").unwrap(), PageSelection::All);
        assert_eq!(
            PageSelection::parse("0-2, 5,1").unwrap(),
            PageSelection::Pages(vec![0, 1, 2, 5])
        );
        assert!(matches!(
            PageSelection::parse("3-1"),
            Err(Error::InvalidPageRange(_))
        ));
        assert!(matches!(
            PageSelection::parse("one"),
            Err(Error::InvalidPageRange(_))
        ));
    }

    #[test]
    fn test_serde_as_optional_list() {
        let selection: PageSelection = serde_json::from_str("[2,0,2]").unwrap();
        assert_eq!(selection, PageSelection::Pages(vec![0, 2]));
        let selection: PageSelection = serde_json::from_str("null").unwrap();
        assert_eq!(selection, PageSelection::All);
        assert_eq!(
            serde_json::to_string(&PageSelection::Pages(vec![1])).unwrap(),
            "[1]"
        );
    }
}
