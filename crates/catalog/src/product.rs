use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    NotFound,
    StorageUnavailable,
    Corrupt(String),
    Io(String),
    Rejected(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::NotFound => write!(f, "product not found"),
            CatalogError::StorageUnavailable => write!(f, "browser storage unavailable"),
            CatalogError::Corrupt(msg) => write!(f, "stored customization corrupt: {msg}"),
            CatalogError::Io(msg) => write!(f, "catalog storage error: {msg}"),
            CatalogError::Rejected(msg) => write!(f, "request rejected: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Width,
    Depth,
    Height,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Width, Axis::Depth, Axis::Height];

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Width => "width",
            Axis::Depth => "depth",
            Axis::Height => "height",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical size in centimetres.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, depth: f64, height: f64) -> Self {
        Self {
            width,
            depth,
            height,
        }
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Width => self.width,
            Axis::Depth => self.depth,
            Axis::Height => self.height,
        }
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::Width => self.width = value,
            Axis::Depth => self.depth = value,
            Axis::Height => self.height = value,
        }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.width, self.depth, self.height]
    }
}

/// What the viewer needs to show one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductModelDescriptor {
    /// `None` means the product has no 3D asset; a placeholder is shown.
    #[serde(default)]
    pub model_url: Option<String>,
    pub base_dimensions: Dimensions,
    pub display_name: String,
}

/// Product lookup result from the storefront backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub slug: String,
    #[serde(flatten)]
    pub descriptor: ProductModelDescriptor,
    pub price: f64,
    #[serde(default)]
    pub discount_percent: Option<f64>,
    pub stock_quantity: u32,
}

impl ProductRecord {
    /// List price after any percentage discount, rounded to cents.
    pub fn effective_price(&self) -> f64 {
        let discount = self
            .discount_percent
            .filter(|d| d.is_finite())
            .map(|d| d.clamp(0.0, 100.0))
            .unwrap_or(0.0);
        ((self.price * (100.0 - discount)).round()) / 100.0
    }

    pub fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }
}

/// Product lookup collaborator.
pub trait ProductSource {
    fn product(&self, slug: &str) -> Result<ProductRecord, CatalogError>;
}

#[derive(Debug, Default)]
pub struct InMemoryProductSource {
    products: BTreeMap<String, ProductRecord>,
}

impl InMemoryProductSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: ProductRecord) {
        self.products.insert(record.slug.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl ProductSource for InMemoryProductSource {
    fn product(&self, slug: &str) -> Result<ProductRecord, CatalogError> {
        self.products
            .get(slug)
            .cloned()
            .ok_or(CatalogError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::{Axis, CatalogError, InMemoryProductSource, ProductRecord, ProductSource};
    use pretty_assertions::assert_eq;

    fn record_json() -> &'static str {
        r#"{
            "slug": "oak-chair",
            "modelUrl": "/models/oak-chair.glb",
            "baseDimensions": { "width": 60, "depth": 55, "height": 90 },
            "displayName": "Oak chair",
            "price": 199.0,
            "discountPercent": 10,
            "stockQuantity": 3
        }"#
    }

    #[test]
    fn record_parses_from_backend_json() {
        let record: ProductRecord = serde_json::from_str(record_json()).expect("parse");
        assert_eq!(
            record.descriptor.model_url.as_deref(),
            Some("/models/oak-chair.glb")
        );
        assert_eq!(record.descriptor.base_dimensions.get(Axis::Width), 60.0);
        assert_eq!(record.effective_price(), 179.1);
        assert!(record.in_stock());
    }

    #[test]
    fn missing_model_url_is_none() {
        let record: ProductRecord = serde_json::from_str(
            r#"{ "slug": "stool", "baseDimensions": { "width": 30, "depth": 30, "height": 45 },
                 "displayName": "Stool", "price": 40, "stockQuantity": 0 }"#,
        )
        .expect("parse");
        assert_eq!(record.descriptor.model_url, None);
        assert!(!record.in_stock());
    }

    #[test]
    fn in_memory_lookup() {
        let mut source = InMemoryProductSource::new();
        source.insert(serde_json::from_str(record_json()).expect("parse"));
        assert_eq!(source.product("oak-chair").map(|p| p.stock_quantity), Ok(3));
        assert_eq!(source.product("sofa"), Err(CatalogError::NotFound));
    }

    #[test]
    fn axis_names() {
        assert_eq!(Axis::parse("Width"), Some(Axis::Width));
        assert_eq!(Axis::parse("length"), None);
    }
}
