// ABOUTME: Translates list query parameters (window, sort, filters) into a typed query.
// ABOUTME: Also provides the in-process filter and ordering used by the in-memory store.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::model::Announcement;

/// Raw query string of the list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    #[serde(rename = "_start")]
    pub start: Option<u64>,
    #[serde(rename = "_end")]
    pub end: Option<u64>,
    #[serde(rename = "_sort")]
    pub sort: Option<String>,
    #[serde(rename = "_order")]
    pub order: Option<String>,
    pub title_like: Option<String>,
    #[serde(rename = "announcementType")]
    pub announcement_type: Option<String>,
}

impl ListParams {
    /// Build the typed query. Empty filter values mean "no filter"; an unknown
    /// sort field is dropped with a warning.
    pub fn into_query(self) -> AnnouncementQuery {
        let filter = AnnouncementFilter {
            announcement_type: self.announcement_type.filter(|t| !t.is_empty()),
            title_like: self.title_like.filter(|t| !t.is_empty()),
        };

        let offset = self.start.unwrap_or(0);
        let limit = self.end.map(|end| end.saturating_sub(offset));

        let sort = match self.sort.as_deref().filter(|s| !s.is_empty()) {
            None => None,
            Some(name) => match SortField::parse(name) {
                Some(field) => Some(Sort {
                    field,
                    order: SortOrder::parse(self.order.as_deref()),
                }),
                None => {
                    tracing::warn!("ignoring unknown sort field: {}", name);
                    None
                }
            },
        };

        AnnouncementQuery {
            filter,
            page: Page { offset, limit },
            sort,
        }
    }
}

/// Unicode case folding used for title matching by every store backend.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Exact category match and case-insensitive title substring match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnouncementFilter {
    pub announcement_type: Option<String>,
    pub title_like: Option<String>,
}

impl AnnouncementFilter {
    pub fn matches(&self, announcement: &Announcement) -> bool {
        if let Some(ref kind) = self.announcement_type
            && announcement.announcement_type != *kind
        {
            return false;
        }
        if let Some(ref needle) = self.title_like
            && !fold_case(&announcement.title).contains(&fold_case(needle))
        {
            return false;
        }
        true
    }
}

/// Offset plus optional limit. `limit: None` means no upper bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    Description,
    AnnouncementType,
    Photo,
}

impl SortField {
    /// Accepts the wire field names (`_id`, `id`, `title`, `announcementType`, ...).
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "_id" | "id" => Some(Self::Id),
            "title" => Some(Self::Title),
            "description" => Some(Self::Description),
            "announcementType" => Some(Self::AnnouncementType),
            "photo" => Some(Self::Photo),
            _ => None,
        }
    }

    /// Column name in the SQL backend. Always a fixed identifier.
    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Description => "description",
            Self::AnnouncementType => "announcement_type",
            Self::Photo => "photo",
        }
    }

    fn compare(self, a: &Announcement, b: &Announcement) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Title => a.title.cmp(&b.title),
            Self::Description => a.description.cmp(&b.description),
            Self::AnnouncementType => a.announcement_type.cmp(&b.announcement_type),
            Self::Photo => a.photo.cmp(&b.photo),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(order: Option<&str>) -> Self {
        match order {
            Some(o) if o.eq_ignore_ascii_case("desc") => Self::Desc,
            _ => Self::Asc,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

/// A fully translated list query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnouncementQuery {
    pub filter: AnnouncementFilter,
    pub page: Page,
    pub sort: Option<Sort>,
}

impl AnnouncementQuery {
    /// Run the query over already-loaded documents. Returns the page and the
    /// number of filter matches before paging.
    pub fn apply(
        &self,
        announcements: impl IntoIterator<Item = Announcement>,
    ) -> (Vec<Announcement>, u64) {
        let mut matched: Vec<Announcement> = announcements
            .into_iter()
            .filter(|a| self.filter.matches(a))
            .collect();

        // Ties fall back to id order, matching the SQL backend.
        matched.sort_by(|a, b| {
            let primary = match self.sort {
                Some(Sort { field, order }) => {
                    let ord = field.compare(a, b);
                    match order {
                        SortOrder::Asc => ord,
                        SortOrder::Desc => ord.reverse(),
                    }
                }
                None => Ordering::Equal,
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });

        let total = matched.len() as u64;
        let offset = usize::try_from(self.page.offset).unwrap_or(usize::MAX);
        let limit = self
            .page
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        let items = matched.into_iter().skip(offset).take(limit).collect();
        (items, total)
    }
}
