//! Static catalog of user-selectable skin concerns
//!
//! Loaded once at startup and never mutated. Tag ids travel to the
//! analysis prompt; labels and icons are display-only.

/// A user-selectable category describing a self-reported skin issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConcernTag {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
}

/// The full concern catalog, in display order
pub(crate) const SKIN_CONCERNS: &[ConcernTag] = &[
    ConcernTag {
        id: "acne",
        label: "Acne & Blemishes",
        icon: "◉",
    },
    ConcernTag {
        id: "dark-circles",
        label: "Dark Circles",
        icon: "◎",
    },
    ConcernTag {
        id: "dryness",
        label: "Dryness / Flakiness",
        icon: "✧",
    },
    ConcernTag {
        id: "redness",
        label: "Redness / Irritation",
        icon: "▲",
    },
    ConcernTag {
        id: "wrinkles",
        label: "Fine Lines & Wrinkles",
        icon: "≈",
    },
    ConcernTag {
        id: "pigmentation",
        label: "Pigmentation / Spots",
        icon: "✦",
    },
    ConcernTag {
        id: "oiliness",
        label: "Oily Skin",
        icon: "☀",
    },
    ConcernTag {
        id: "pores",
        label: "Large Pores",
        icon: "▦",
    },
];

/// Look up a concern's display label by id
#[allow(dead_code)]
pub(crate) fn concern_label(id: &str) -> Option<&'static str> {
    SKIN_CONCERNS
        .iter()
        .find(|tag| tag.id == id)
        .map(|tag| tag.label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_are_unique() {
        let ids: HashSet<_> = SKIN_CONCERNS.iter().map(|tag| tag.id).collect();
        assert_eq!(ids.len(), SKIN_CONCERNS.len());
    }

    #[test]
    fn test_concern_label_lookup() {
        assert_eq!(concern_label("acne"), Some("Acne & Blemishes"));
        assert_eq!(concern_label("nonexistent"), None);
    }
}
