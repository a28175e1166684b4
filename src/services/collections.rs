// src/services/collections.rs

//! Resolution of board sections and boards into ordered post lists.

use std::collections::HashMap;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Collection, CollectionItem, CollectionKind, SectionSpan, Target};
use crate::services::parser::{ListingEntry, ListingPage, PageParser};
use crate::utils::http::PageSource;
use crate::utils::url::listing_page_url;

/// Resolves section and board targets into flattened [`Collection`]s.
pub struct CollectionResolver {
    source: Arc<dyn PageSource>,
    parser: Arc<PageParser>,
    base: Url,
    max_pages: u32,
    concurrency: usize,
}

/// A board listing entry that survives into the flattened result.
enum BoardPart {
    Post(CollectionItem),
    /// A section header and the posts the board page shows beneath it.
    Section {
        id: u64,
        title: String,
        listed: Vec<CollectionItem>,
    },
}

impl CollectionResolver {
    pub fn new(
        source: Arc<dyn PageSource>,
        parser: Arc<PageParser>,
        base: Url,
        max_pages: u32,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            parser,
            base,
            max_pages,
            concurrency: concurrency.max(1),
        }
    }

    /// Resolve a section or board. Errors are tagged with the target.
    pub async fn resolve(&self, target: Target) -> Result<Collection> {
        let result = match target {
            Target::Section(id) => self.resolve_section(id).await,
            Target::Board(id) => self.resolve_board(id).await,
            Target::Post(_) => Err(AppError::invalid_url(
                target.to_string(),
                "a single post is not a collection",
            )),
        };
        result.map_err(|e| e.in_collection(target.to_string()))
    }

    /// Posts of a board section in display order.
    pub async fn resolve_section(&self, id: u64) -> Result<Collection> {
        let pages = self.listing_pages(Target::Section(id)).await?;
        let title = pages
            .first()
            .and_then(|p| p.title.clone())
            .unwrap_or_else(|| format!("Section {id}"));

        let items = pages
            .into_iter()
            .flat_map(|page| page.entries)
            .filter_map(|entry| match entry {
                ListingEntry::Post {
                    id: post_id,
                    title,
                    updated_at,
                } => Some(CollectionItem {
                    post_id,
                    title,
                    updated_at,
                    section_id: Some(id),
                }),
                _ => None,
            });

        let mut collection = Collection::new(id, CollectionKind::Section, title);
        collection.extend_unique(items);
        log::debug!("Section {id} lists {} posts", collection.items.len());
        Ok(collection)
    }

    /// Posts of a board: its sections in declared order, with posts listed
    /// directly on the board kept in place.
    pub async fn resolve_board(&self, id: u64) -> Result<Collection> {
        let pages = self.listing_pages(Target::Board(id)).await?;
        let title = pages
            .first()
            .and_then(|p| p.title.clone())
            .unwrap_or_else(|| format!("Board {id}"));

        let parts = self.board_parts(id, pages)?;

        let section_ids: Vec<u64> = parts
            .iter()
            .filter_map(|part| match part {
                BoardPart::Section { id, .. } => Some(*id),
                BoardPart::Post(_) => None,
            })
            .collect();
        let mut sections = stream::iter(section_ids)
            .map(|section_id| async move {
                self.resolve_section(section_id)
                    .await
                    .map_err(|e| e.in_collection(format!("section {section_id}")))
            })
            .buffered(self.concurrency)
            .try_collect::<Vec<_>>()
            .await?
            .into_iter();

        let mut collection = Collection::new(id, CollectionKind::Board, title);
        for part in parts {
            match part {
                BoardPart::Post(item) => {
                    collection.extend_unique([item]);
                }
                BoardPart::Section {
                    id: section_id,
                    title,
                    listed,
                } => {
                    let Some(section) = sections.next() else {
                        break;
                    };
                    let start = collection.items.len();
                    let mut len = collection.extend_unique(section.items);
                    let extra = collection.extend_unique(listed);
                    if extra > 0 {
                        log::warn!(
                            "Board {id} lists {extra} posts under section {section_id} that the section itself does not"
                        );
                    }
                    len += extra;
                    let title = if title.is_empty() { section.title } else { title };
                    collection.sections.push(SectionSpan {
                        id: section_id,
                        title,
                        start,
                        len,
                    });
                }
            }
        }

        log::debug!(
            "Board {id} lists {} posts in {} sections",
            collection.items.len(),
            collection.sections.len()
        );
        Ok(collection)
    }

    /// Walk the board listing in document order.
    ///
    /// Posts under a section header are kept with that section, to be merged
    /// after the section's own listing.
    fn board_parts(&self, board_id: u64, pages: Vec<ListingPage>) -> Result<Vec<BoardPart>> {
        let mut parts = Vec::new();
        let mut section_parts: HashMap<u64, usize> = HashMap::new();
        let mut current: Option<(u64, usize)> = None;

        for entry in pages.into_iter().flat_map(|page| page.entries) {
            match entry {
                ListingEntry::Section { id, title } => {
                    let index = *section_parts.entry(id).or_insert_with(|| {
                        parts.push(BoardPart::Section {
                            id,
                            title,
                            listed: Vec::new(),
                        });
                        parts.len() - 1
                    });
                    current = Some((id, index));
                }
                ListingEntry::Board { id, .. } if id != board_id => {
                    return Err(AppError::invalid_url(
                        listing_page_url(&self.base, Target::Board(id), 1)?.as_str(),
                        format!("board {board_id} nests board {id}, which is not supported"),
                    ));
                }
                ListingEntry::Board { .. } | ListingEntry::Heading { .. } => current = None,
                ListingEntry::Post {
                    id,
                    title,
                    updated_at,
                } => {
                    let item = CollectionItem {
                        post_id: id,
                        title,
                        updated_at,
                        section_id: current.map(|(section_id, _)| section_id),
                    };
                    match current.and_then(|(_, index)| parts.get_mut(index)) {
                        Some(BoardPart::Section { listed, .. }) => listed.push(item),
                        _ => parts.push(BoardPart::Post(item)),
                    }
                }
            }
        }
        Ok(parts)
    }

    /// Every page of a listing, following next-page controls.
    async fn listing_pages(&self, target: Target) -> Result<Vec<ListingPage>> {
        let mut pages = Vec::new();
        let mut number = 1;
        loop {
            if number > self.max_pages {
                return Err(AppError::malformed(
                    target.to_string(),
                    format!("more than {} listing pages", self.max_pages),
                ));
            }
            let url = listing_page_url(&self.base, target, number)?;
            log::debug!("Fetching listing {url}");
            let raw = self.source.fetch(&url).await?;
            let page = self
                .parser
                .parse_listing_page(&raw)
                .map_err(|e| e.with_page_context(url.as_str()))?;

            let more = page.has_next_page;
            pages.push(page);
            if !more {
                return Ok(pages);
            }
            number += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::models::PageSelectors;
    use crate::testing::{MockSource, Row, base, listing_page, listing_url};

    const STAMP: &str = "Jan 5, 2024 3:04 PM";

    fn resolver(source: MockSource) -> CollectionResolver {
        let parser = Arc::new(PageParser::new(&PageSelectors::default(), base()).unwrap());
        CollectionResolver::new(Arc::new(source), parser, base(), 5, 2)
    }

    fn section_source() -> MockSource {
        MockSource::new()
            .page(
                listing_url("board_sections", 7, 1),
                listing_page(
                    &[
                        Row::Heading("Part One", Some("/board_sections/7")),
                        Row::Post(31, STAMP),
                        Row::Post(32, STAMP),
                    ],
                    true,
                ),
            )
            .page(
                listing_url("board_sections", 7, 2),
                listing_page(&[Row::Post(32, STAMP), Row::Post(35, STAMP)], false),
            )
    }

    #[tokio::test]
    async fn test_section_is_paginated_and_deduplicated() {
        let collection = resolver(section_source())
            .resolve(Target::Section(7))
            .await
            .unwrap();
        assert_eq!(collection.kind, CollectionKind::Section);
        assert_eq!(collection.title, "Part One");
        assert_eq!(collection.post_ids(), vec![31, 32, 35]);
        assert!(collection.items.iter().all(|i| i.section_id == Some(7)));
        assert!(collection.items[0].updated_at.is_some());
    }

    fn board_source() -> MockSource {
        section_source()
            .page(
                listing_url("boards", 12, 1),
                listing_page(
                    &[
                        Row::Heading("Sandbox", Some("/boards/12/edit")),
                        Row::Post(30, STAMP),
                        Row::Heading("Part One", Some("/board_sections/7")),
                        Row::Post(31, STAMP),
                    ],
                    true,
                ),
            )
            .page(
                listing_url("boards", 12, 2),
                listing_page(
                    &[
                        Row::Heading("Part One", Some("/board_sections/7")),
                        Row::Post(32, STAMP),
                        Row::Heading("Part Two", Some("/board_sections/8")),
                        Row::Heading("Unsorted", None),
                        Row::Post(40, STAMP),
                    ],
                    false,
                ),
            )
            .page(
                listing_url("board_sections", 8, 1),
                listing_page(&[Row::Post(30, STAMP), Row::Post(36, STAMP)], false),
            )
    }

    #[tokio::test]
    async fn test_board_flattens_sections_in_order() {
        let collection = resolver(board_source())
            .resolve(Target::Board(12))
            .await
            .unwrap();

        assert_eq!(collection.title, "Sandbox");
        assert_eq!(collection.post_ids(), vec![30, 31, 32, 35, 36, 40]);
        assert_eq!(
            collection.sections,
            vec![
                SectionSpan {
                    id: 7,
                    title: "Part One".to_string(),
                    start: 1,
                    len: 3
                },
                SectionSpan {
                    id: 8,
                    title: "Part Two".to_string(),
                    start: 4,
                    len: 1
                },
            ]
        );
        assert_eq!(collection.items[0].section_id, None);
        assert_eq!(collection.items[4].section_id, Some(8));
    }

    #[tokio::test]
    async fn test_board_keeps_posts_missing_from_section_listing() {
        let source = MockSource::new()
            .page(
                listing_url("boards", 12, 1),
                listing_page(
                    &[
                        Row::Heading("Sandbox", Some("/boards/12")),
                        Row::Heading("Part One", Some("/board_sections/7")),
                        Row::Post(31, STAMP),
                        Row::Post(99, STAMP),
                    ],
                    false,
                ),
            )
            .page(
                listing_url("board_sections", 7, 1),
                listing_page(&[Row::Post(31, STAMP)], false),
            );

        let collection = resolver(source).resolve(Target::Board(12)).await.unwrap();
        assert_eq!(collection.post_ids(), vec![31, 99]);
        assert_eq!(collection.sections.len(), 1);
        assert_eq!(collection.sections[0].start, 0);
        assert_eq!(collection.sections[0].len, 2);
        assert_eq!(collection.items[1].section_id, Some(7));
    }

    #[tokio::test]
    async fn test_nested_board_is_unsupported() {
        let source = MockSource::new().page(
            listing_url("boards", 12, 1),
            listing_page(
                &[
                    Row::Heading("Sandbox", Some("/boards/12")),
                    Row::Heading("Elsewhere", Some("/boards/99")),
                ],
                false,
            ),
        );
        let err = resolver(source).resolve(Target::Board(12)).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidUrl);
    }

    #[tokio::test]
    async fn test_section_failure_is_tagged_with_context() {
        let source = MockSource::new()
            .page(
                listing_url("boards", 12, 1),
                listing_page(&[Row::Heading("Part Two", Some("/board_sections/8"))], false),
            )
            .fail(listing_url("board_sections", 8, 1), FailureKind::Forbidden);
        let err = resolver(source).resolve(Target::Board(12)).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Forbidden);
        assert!(err.to_string().starts_with("board 12: section 8: "));
    }

    #[tokio::test]
    async fn test_missing_collection_is_not_found() {
        let err = resolver(MockSource::new())
            .resolve(Target::Section(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[tokio::test]
    async fn test_post_target_is_rejected() {
        let err = resolver(MockSource::new())
            .resolve(Target::Post(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidUrl);
    }

    #[tokio::test]
    async fn test_endless_listing_is_malformed() {
        let mut source = MockSource::new();
        for page in 1..=6 {
            source = source.page(
                listing_url("board_sections", 3, page),
                listing_page(&[Row::Post(100 + page as u64, STAMP)], true),
            );
        }
        let err = resolver(source).resolve(Target::Section(3)).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Malformed);
    }
}
