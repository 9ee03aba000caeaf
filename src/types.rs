//! Public data types returned by this crate.

/// One child entry of a remote directory listing.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListingEntry {
    /// The raw href value, as served. Directories keep their trailing `/`.
    pub name: String,
    /// Whether the href ends with `/`.
    pub is_dir: bool,
}

impl ListingEntry {
    /// Builds an entry from a raw href value.
    pub fn from_href(href: impl Into<String>) -> Self {
        let name = href.into();
        let is_dir = name.ends_with('/');
        Self { name, is_dir }
    }
}
