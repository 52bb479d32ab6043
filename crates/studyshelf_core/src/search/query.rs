//! In-memory material filtering.
//!
//! # Responsibility
//! - Evaluate text, tag and favourite filters against one material.
//!
//! # Invariants
//! - Filters compose with logical AND.
//! - Blank text and an empty tag list impose no restriction.
//! - Non-blank text is matched as given, whitespace included.
//! - Text matching is a case-insensitive substring test on title and
//!   description; tag matching is exact.

use crate::model::material::Material;
use std::cmp::Ordering;

/// Search options for catalog queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialQuery {
    /// Substring searched in title and description.
    pub text: Option<String>,
    /// Keep entries carrying at least one of these tags.
    pub tags: Vec<String>,
    /// Keep favourites only.
    pub favorites_only: bool,
    /// Result order; ties keep newest-first order.
    pub order: MaterialOrder,
}

/// Result ordering for catalog queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MaterialOrder {
    /// Newest insertion first.
    #[default]
    Newest,
    /// Most recently opened first; never-opened entries last.
    RecentlyAccessed,
    /// Case-insensitive title order.
    Title,
}

impl MaterialOrder {
    pub fn compare(self, a: &Material, b: &Material) -> Ordering {
        match self {
            Self::Newest => Ordering::Equal,
            Self::RecentlyAccessed => b.last_accessed.cmp(&a.last_accessed),
            Self::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        }
    }
}

impl MaterialQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn favorites_only(mut self) -> Self {
        self.favorites_only = true;
        self
    }

    pub fn ordered_by(mut self, order: MaterialOrder) -> Self {
        self.order = order;
        self
    }

    /// Pre-computes the normalized needle so one matcher serves a whole scan.
    pub fn matcher(&self) -> MaterialMatcher<'_> {
        let needle = self
            .text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .map(str::to_lowercase);
        MaterialMatcher {
            needle,
            tags: &self.tags,
            favorites_only: self.favorites_only,
        }
    }
}

/// Compiled form of a `MaterialQuery`.
#[derive(Debug)]
pub struct MaterialMatcher<'q> {
    needle: Option<String>,
    tags: &'q [String],
    favorites_only: bool,
}

impl MaterialMatcher<'_> {
    pub fn matches(&self, material: &Material) -> bool {
        if self.favorites_only && !material.is_favorite {
            return false;
        }

        if !self.tags.is_empty() && !material.tags.iter().any(|tag| self.tags.contains(tag)) {
            return false;
        }

        match &self.needle {
            None => true,
            Some(needle) => {
                material.title.to_lowercase().contains(needle.as_str())
                    || material
                        .description
                        .as_deref()
                        .is_some_and(|text| text.to_lowercase().contains(needle.as_str()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MaterialOrder, MaterialQuery};
    use crate::model::material::Material;
use std::cmp::Ordering;
    use chrono::{TimeZone, Utc};

    fn sample() -> Material {
        let at = Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap();
        let mut material = Material::note("Organic Chemistry", "Alkenes and ALKYNES", at).unwrap();
        material.tags = vec!["chem".to_string(), "exam".to_string()];
        material
    }

    #[test]
    fn text_matches_title_or_description_case_insensitively() {
        let material = sample();
        assert!(MaterialQuery::text("organic").matcher().matches(&material));
        assert!(MaterialQuery::text("alkynes").matcher().matches(&material));
        assert!(!MaterialQuery::text("physics").matcher().matches(&material));
    }

    #[test]
    fn blank_filters_match_everything() {
        let material = sample();
        assert!(MaterialQuery::default().matcher().matches(&material));
        assert!(MaterialQuery::text("   ").matcher().matches(&material));
    }

    #[test]
    fn surrounding_whitespace_is_part_of_the_needle() {
        let at = Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap();
        let preheat = Material::note("Preheat the oven", "", at).unwrap();
        let heat = Material::note("Latent heat", "", at).unwrap();

        let query = MaterialQuery::text(" heat");
        assert!(!query.matcher().matches(&preheat));
        assert!(query.matcher().matches(&heat));
    }

    #[test]
    fn recently_accessed_order_puts_unopened_last() {
        let at = Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap();
        let unopened = Material::note("unopened", "", at).unwrap();
        let mut old = Material::note("old", "", at).unwrap();
        old.last_accessed = Some(at + chrono::Duration::hours(1));
        let mut recent = Material::note("recent", "", at).unwrap();
        recent.last_accessed = Some(at + chrono::Duration::hours(2));

        let order = MaterialOrder::RecentlyAccessed;
        let mut items = vec![unopened, old, recent];
        items.sort_by(|a, b| order.compare(a, b));
        let titles: Vec<_> = items.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["recent", "old", "unopened"]);
    }

    #[test]
    fn filters_compose_with_and() {
        let mut material = sample();
        let query = MaterialQuery::text("chemistry")
            .with_tags(["exam", "other"])
            .favorites_only();
        assert!(!query.matcher().matches(&material));

        material.is_favorite = true;
        assert!(query.matcher().matches(&material));

        let wrong_tag = MaterialQuery::text("chemistry").with_tags(["physics"]);
        assert!(!wrong_tag.matcher().matches(&material));
    }
}
