use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use thiserror::Error;

/// APP1 marker; carries EXIF and XMP payloads, disambiguated by signature.
pub const APP1: u8 = 0xE1;
/// APP2 marker; carries the ICC color profile.
pub const APP2: u8 = 0xE2;
/// COM marker; free-form text comment.
pub const COM: u8 = 0xFE;

/// Payload signature of an EXIF APP1 segment.
pub const EXIF_PREFIX: &[u8] = b"Exif\0\0";
/// Payload signature of an XMP APP1 segment.
pub const XMP_PREFIX: &[u8] = b"http://ns.adobe.com/xap/1.0/";

/// A metadata category that can be stripped from a JPEG.
///
/// Categories are resolved from user-facing names with [`MetadataKind::from_name`]
/// and map onto a (marker, payload-prefix) pair. EXIF and XMP share the APP1
/// marker and are told apart by their payload signature; ICC and comments are
/// identified by marker alone.
///
/// # Example
///
/// ```rust
/// use exif_cleaner::jpeg::MetadataKind;
///
/// let kind = MetadataKind::from_name(" EXIF ").unwrap();
/// assert_eq!(kind, MetadataKind::Exif);
/// assert_eq!(kind.marker(), 0xE1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    /// EXIF block (APP1, `Exif\0\0` signature).
    Exif,
    /// XMP packet (APP1, Adobe namespace signature).
    Xmp,
    /// ICC color profile (APP2).
    Icc,
    /// Text comment (COM).
    Comment,
}

impl MetadataKind {
    /// Every strippable category, in canonical order.
    pub const ALL: &[MetadataKind] = &[Self::Exif, Self::Xmp, Self::Icc, Self::Comment];

    /// Resolve a category from its user-facing name.
    ///
    /// Names are trimmed and matched case-insensitively; `com` is accepted
    /// as an alias for `comment`. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "exif" => Some(Self::Exif),
            "xmp" => Some(Self::Xmp),
            "icc" => Some(Self::Icc),
            "comment" | "com" => Some(Self::Comment),
            _ => None,
        }
    }

    /// The canonical name for this category.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Exif => "exif",
            Self::Xmp => "xmp",
            Self::Icc => "icc",
            Self::Comment => "comment",
        }
    }

    /// The segment marker byte this category lives under.
    pub fn marker(&self) -> u8 {
        match self {
            Self::Exif | Self::Xmp => APP1,
            Self::Icc => APP2,
            Self::Comment => COM,
        }
    }

    /// The payload signature that identifies this category, if the marker
    /// alone is not enough.
    pub fn prefix(&self) -> Option<&'static [u8]> {
        match self {
            Self::Exif => Some(EXIF_PREFIX),
            Self::Xmp => Some(XMP_PREFIX),
            Self::Icc | Self::Comment => None,
        }
    }

    /// The removal rule for this category on its own.
    pub fn rule(&self) -> SegmentRule {
        match self.prefix() {
            Some(prefix) => SegmentRule::PrefixedBy(vec![prefix]),
            None => SegmentRule::Always,
        }
    }
}

/// The removal decision for a single marker value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentRule {
    /// Every segment with the marker is removed.
    Always,
    /// A segment is removed only when its payload begins with one of the
    /// listed signatures.
    PrefixedBy(Vec<&'static [u8]>),
}

impl SegmentRule {
    /// Longest signature this rule needs to see to decide.
    pub fn max_prefix_len(&self) -> usize {
        match self {
            Self::Always => 0,
            Self::PrefixedBy(prefixes) => {
                prefixes.iter().map(|p| p.len()).max().unwrap_or(0)
            }
        }
    }

    /// Whether a payload beginning with `peeked` is a removal candidate.
    ///
    /// A signature only matches when it is fully present; a payload shorter
    /// than every signature is never matched.
    pub fn matches(&self, peeked: &[u8]) -> bool {
        match self {
            Self::Always => true,
            Self::PrefixedBy(prefixes) => prefixes.iter().any(|p| peeked.starts_with(p)),
        }
    }
}

/// Policy construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A requested category name is not in the fixed vocabulary.
    #[error("unknown metadata category: {0:?}")]
    UnknownCategory(String),
    /// A marker was given both an unconditional and a prefix-matched rule;
    /// there is no defined precedence between them.
    #[error("conflicting rules for marker 0x{0:02X}: cannot mix unconditional and prefix-matched removal")]
    ConflictingRules(u8),
}

/// The marker → [`SegmentRule`] mapping consulted by the scanner.
///
/// A rule set holds at most one rule per marker value. Categories sharing a
/// marker (EXIF and XMP on APP1) merge into a single rule carrying both
/// signatures, so requesting both removes both.
///
/// # Example
///
/// ```rust
/// use exif_cleaner::jpeg::RuleSet;
///
/// let rules = RuleSet::from_names(["exif", "icc"]).unwrap();
/// assert!(rules.rule_for(0xE1).is_some());
/// assert!(rules.rule_for(0xFE).is_none()); // comments untouched
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: BTreeMap<u8, SegmentRule>,
}

impl RuleSet {
    /// An empty rule set; the scanner copies every segment unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule set from resolved categories.
    pub fn from_kinds(kinds: impl IntoIterator<Item = MetadataKind>) -> Result<Self, PolicyError> {
        let mut set = Self::new();
        for kind in kinds {
            set.insert(kind)?;
        }
        Ok(set)
    }

    /// Build a rule set from user-facing category names, failing fast on
    /// names outside the fixed vocabulary.
    ///
    /// Callers that prefer to silently ignore unknown names can resolve
    /// with [`MetadataKind::from_name`] themselves and use [`RuleSet::from_kinds`].
    pub fn from_names(
        names: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, PolicyError> {
        let mut set = Self::new();
        for name in names {
            let name = name.as_ref();
            let kind = MetadataKind::from_name(name)
                .ok_or_else(|| PolicyError::UnknownCategory(name.trim().to_string()))?;
            set.insert(kind)?;
        }
        Ok(set)
    }

    /// Register a category. Duplicate categories are idempotent.
    pub fn insert(&mut self, kind: MetadataKind) -> Result<(), PolicyError> {
        self.insert_rule(kind.marker(), kind.rule())
    }

    /// Register a rule for an arbitrary marker, merging with any rule
    /// already present.
    ///
    /// Two prefix rules union their signatures; two unconditional rules
    /// collapse into one. Mixing an unconditional rule with a prefix rule
    /// on the same marker is rejected as [`PolicyError::ConflictingRules`].
    pub fn insert_rule(&mut self, marker: u8, rule: SegmentRule) -> Result<(), PolicyError> {
        match self.rules.entry(marker) {
            Entry::Vacant(slot) => {
                slot.insert(rule);
                Ok(())
            }
            Entry::Occupied(mut slot) => match (slot.get_mut(), rule) {
                (SegmentRule::Always, SegmentRule::Always) => Ok(()),
                (SegmentRule::PrefixedBy(existing), SegmentRule::PrefixedBy(new)) => {
                    for prefix in new {
                        if !existing.contains(&prefix) {
                            existing.push(prefix);
                        }
                    }
                    Ok(())
                }
                _ => Err(PolicyError::ConflictingRules(marker)),
            },
        }
    }

    /// The rule registered for a marker, if any.
    pub fn rule_for(&self, marker: u8) -> Option<&SegmentRule> {
        self.rules.get(&marker)
    }

    /// Number of markers with a registered rule.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
