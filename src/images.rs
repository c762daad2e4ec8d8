use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::model::ImageBytes;
use crate::text::{clean_text, extract_cc_number};
use crate::util::sha256_file;

/// Boundary to the image-association collaborator: whole-row thumbnails keyed
/// by (category, product, material) and color-cell thumbnails keyed by
/// (product, material, header text). Identity strings are matched after
/// plain-text cleanup ([`clean_text`]), not the alnum-only normalization used
/// for structural header matching.
pub trait ImageAssociator {
    fn row_image(&self, category: &str, product: &str, material: &str) -> Option<ImageBytes>;

    fn color_image(&self, product: &str, material: &str, header: &str) -> Option<ImageBytes>;

    /// Fallback lookup by embedded CC number, for continuation headers whose
    /// text differs from the text the collaborator indexed under.
    fn color_image_by_code(&self, product: &str, material: &str, cc_number: &str)
    -> Option<ImageBytes>;
}

/// Null implementation for callers that do not supply thumbnails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImages;

impl ImageAssociator for NoImages {
    fn row_image(&self, _: &str, _: &str, _: &str) -> Option<ImageBytes> {
        None
    }

    fn color_image(&self, _: &str, _: &str, _: &str) -> Option<ImageBytes> {
        None
    }

    fn color_image_by_code(&self, _: &str, _: &str, _: &str) -> Option<ImageBytes> {
        None
    }
}

/// In-memory associator. Keys are normalized with [`clean_text`] on both
/// insert and lookup so the two sides cannot drift.
#[derive(Debug, Clone, Default)]
pub struct ImageIndex {
    row_images: HashMap<(String, String, String), ImageBytes>,
    color_images: HashMap<(String, String, String), ImageBytes>,
}

impl ImageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_row_image(
        &mut self,
        category: &str,
        product: &str,
        material: &str,
        bytes: Vec<u8>,
    ) {
        self.row_images.insert(
            (clean_text(category), clean_text(product), clean_text(material)),
            Arc::new(bytes),
        );
    }

    pub fn insert_color_image(
        &mut self,
        product: &str,
        material: &str,
        header: &str,
        bytes: Vec<u8>,
    ) {
        self.color_images.insert(
            (clean_text(product), clean_text(material), clean_text(header)),
            Arc::new(bytes),
        );
    }
}

impl ImageAssociator for ImageIndex {
    fn row_image(&self, category: &str, product: &str, material: &str) -> Option<ImageBytes> {
        self.row_images
            .get(&(clean_text(category), clean_text(product), clean_text(material)))
            .cloned()
    }

    fn color_image(&self, product: &str, material: &str, header: &str) -> Option<ImageBytes> {
        self.color_images
            .get(&(clean_text(product), clean_text(material), clean_text(header)))
            .cloned()
    }

    fn color_image_by_code(
        &self,
        product: &str,
        material: &str,
        cc_number: &str,
    ) -> Option<ImageBytes> {
        let product = clean_text(product);
        let material = clean_text(material);
        self.color_images
            .iter()
            .find(|((p, m, header), _)| {
                *p == product && *m == material && header.contains(cc_number)
            })
            .map(|(_, bytes)| bytes.clone())
    }
}

/// Graphic color-cell lookup: try each header text variant, then fall back to
/// matching by the CC number embedded in any variant.
pub fn find_graphic_color_image(
    images: &dyn ImageAssociator,
    product: &str,
    material: &str,
    header_variants: &[&str],
) -> Option<ImageBytes> {
    for variant in header_variants {
        if variant.is_empty() {
            continue;
        }
        if let Some(bytes) = images.color_image(product, material, variant) {
            return Some(bytes);
        }
    }

    for variant in header_variants {
        let Some(cc_number) = extract_cc_number(variant) else {
            continue;
        };
        if let Some(bytes) = images.color_image_by_code(product, material, &cc_number) {
            return Some(bytes);
        }
    }

    None
}

/// Stable identity for cross-call caches: content hash of the document file.
pub fn document_identity(path: &Path) -> Result<String> {
    sha256_file(path)
}

/// Single-entry cache keyed by document identity. A new key evicts the old
/// entry, bounding memory when full-page rasters are cached between calls.
#[derive(Debug, Default)]
pub struct DocumentCache<T> {
    entry: Option<(String, T)>,
}

impl<T> DocumentCache<T> {
    pub fn new() -> Self {
        Self { entry: None }
    }

    pub fn get_or_insert_with(&mut self, key: &str, build: impl FnOnce() -> T) -> &T {
        if self.entry.as_ref().map(|(cached, _)| cached.as_str()) != Some(key) {
            self.entry = None;
        }
        &self.entry.get_or_insert_with(|| (key.to_string(), build())).1
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        match &self.entry {
            Some((cached, value)) if cached == key => Some(value),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_normalizes_keys_on_both_sides() {
        let mut index = ImageIndex::new();
        index.insert_row_image("Fabric", " 12345 ", "Jersey  Knit", vec![1, 2, 3]);

        let found = index.row_image("Fabric", "12345", "Jersey Knit");
        assert_eq!(found.as_deref(), Some(&vec![1, 2, 3]));
        assert!(index.row_image("Trim", "12345", "Jersey Knit").is_none());
    }

    #[test]
    fn graphic_lookup_falls_back_to_cc_number() {
        let mut index = ImageIndex::new();
        index.insert_color_image("GRAPHIC", "Logo", "Seasalt Blue 000123456789", vec![9]);

        // Different header text, same CC number.
        let found = find_graphic_color_image(
            &index,
            "GRAPHIC",
            "Logo",
            &["Seasalt\n000123456789"],
        );
        assert_eq!(found.as_deref(), Some(&vec![9]));

        let missing = find_graphic_color_image(&index, "GRAPHIC", "Logo", &["Navy 000999999999"]);
        assert!(missing.is_none());
    }

    #[test]
    fn document_cache_holds_a_single_entry() {
        let mut cache = DocumentCache::<usize>::new();
        assert_eq!(*cache.get_or_insert_with("doc-a", || 1), 1);
        assert_eq!(*cache.get_or_insert_with("doc-a", || 2), 1);

        // New document identity evicts the old entry.
        assert_eq!(*cache.get_or_insert_with("doc-b", || 3), 3);
        assert!(cache.get("doc-a").is_none());
        assert_eq!(cache.get("doc-b"), Some(&3));
    }
}
