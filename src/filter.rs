//! Filter identity and selection state.

use clap::ValueEnum;

/// Contrast strength used when the contrast filter is selected.
pub const DEFAULT_CONTRAST_STRENGTH: f32 = 1.5;

/// An applicable filter, including its parameters.
///
/// The set is closed: every filter the app can render is a variant here, and
/// render dispatch matches exhaustively on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Filter {
    None,
    Sepia,
    BlackAndWhite,
    Contrast { strength: f32 },
    Blur,
}

impl Filter {
    /// Resolves a filter identifier string.
    ///
    /// Unrecognized identifiers fall back to `Filter::None` so that stale or
    /// misspelled ids from config files never abort a render.
    pub fn parse(id: &str) -> Filter {
        match id.to_ascii_lowercase().as_str() {
            "none" | "" => Filter::None,
            "sepia" => Filter::Sepia,
            "bw" | "black-and-white" | "blackandwhite" => Filter::BlackAndWhite,
            "contrast" => Filter::contrast(),
            "blur" => Filter::Blur,
            other => {
                tracing::warn!("unknown filter id {:?}, falling back to none", other);
                Filter::None
            }
        }
    }

    /// The contrast filter at its default strength.
    pub fn contrast() -> Filter {
        Filter::Contrast {
            strength: DEFAULT_CONTRAST_STRENGTH,
        }
    }

    /// The payload-free discriminant of this filter.
    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::None => FilterKind::None,
            Filter::Sepia => FilterKind::Sepia,
            Filter::BlackAndWhite => FilterKind::BlackAndWhite,
            Filter::Contrast { .. } => FilterKind::Contrast,
            Filter::Blur => FilterKind::Blur,
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::None
    }
}

/// Payload-free filter discriminant.
///
/// Keys the shader registry and names filters on the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum FilterKind {
    None,
    Sepia,
    BlackAndWhite,
    Contrast,
    Blur,
}

impl FilterKind {
    /// All filter kinds, in selection order.
    pub const ALL: [FilterKind; 5] = [
        FilterKind::None,
        FilterKind::Sepia,
        FilterKind::BlackAndWhite,
        FilterKind::Contrast,
        FilterKind::Blur,
    ];

    /// Canonical identifier, as accepted by [`Filter::parse`].
    pub fn id(&self) -> &'static str {
        match self {
            FilterKind::None => "none",
            FilterKind::Sepia => "sepia",
            FilterKind::BlackAndWhite => "bw",
            FilterKind::Contrast => "contrast",
            FilterKind::Blur => "blur",
        }
    }

    /// The filter for this kind with default parameters.
    pub fn filter(&self) -> Filter {
        match self {
            FilterKind::None => Filter::None,
            FilterKind::Sepia => Filter::Sepia,
            FilterKind::BlackAndWhite => Filter::BlackAndWhite,
            FilterKind::Contrast => Filter::contrast(),
            FilterKind::Blur => Filter::Blur,
        }
    }
}

/// Holds the active filter selection.
///
/// Selection is plain state: it changes only through `set`/`select`, and
/// loading a new source image leaves it untouched.
#[derive(Debug, Default)]
pub struct FilterSelector {
    active: Filter,
}

impl FilterSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently selected filter.
    pub fn active(&self) -> Filter {
        self.active
    }

    /// Sets the selection to a typed filter value.
    pub fn set(&mut self, filter: Filter) {
        self.active = filter;
    }

    /// Resolves an identifier and makes it the selection.
    ///
    /// Returns the filter that became active (which is `Filter::None` for
    /// unrecognized identifiers).
    pub fn select(&mut self, id: &str) -> Filter {
        self.active = Filter::parse(id);
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_identifiers() {
        assert_eq!(Filter::parse("none"), Filter::None);
        assert_eq!(Filter::parse("sepia"), Filter::Sepia);
        assert_eq!(Filter::parse("bw"), Filter::BlackAndWhite);
        assert_eq!(Filter::parse("black-and-white"), Filter::BlackAndWhite);
        assert_eq!(
            Filter::parse("contrast"),
            Filter::Contrast { strength: DEFAULT_CONTRAST_STRENGTH }
        );
        assert_eq!(Filter::parse("blur"), Filter::Blur);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Filter::parse("Sepia"), Filter::Sepia);
        assert_eq!(Filter::parse("BLUR"), Filter::Blur);
    }

    #[test]
    fn test_parse_unknown_falls_back_to_none() {
        assert_eq!(Filter::parse("vintage"), Filter::None);
        assert_eq!(Filter::parse("sepia2"), Filter::None);
    }

    #[test]
    fn test_selector_tracks_latest_selection() {
        let mut selector = FilterSelector::new();
        assert_eq!(selector.active(), Filter::None);

        selector.select("sepia");
        assert_eq!(selector.active(), Filter::Sepia);

        selector.select("does-not-exist");
        assert_eq!(selector.active(), Filter::None);

        selector.set(Filter::Contrast { strength: 2.0 });
        assert_eq!(selector.active(), Filter::Contrast { strength: 2.0 });
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in FilterKind::ALL {
            assert_eq!(kind.filter().kind(), kind);
            assert_eq!(Filter::parse(kind.id()).kind(), kind);
        }
    }
}
