use qrcode::QrCode;
use qrcode::render::svg;

use crate::deep_link::ar_deep_link;
use crate::error::HandoffError;

/// Scannable bridge from a desktop page to the same product's AR flow.
#[derive(Debug, Clone, PartialEq)]
pub struct QrBridge {
    pub deep_link: String,
    pub svg: String,
    /// Modules per side of the symbol.
    pub modules: usize,
}

impl QrBridge {
    pub fn for_product(product_url: &str, min_size_px: u32) -> Result<Self, HandoffError> {
        let deep_link = ar_deep_link(product_url)?;
        let code = QrCode::new(deep_link.as_bytes())?;
        let svg = code
            .render::<svg::Color>()
            .min_dimensions(min_size_px, min_size_px)
            .build();
        Ok(Self {
            modules: code.width(),
            deep_link,
            svg,
        })
    }

    /// Text for the manual "copy link" fallback.
    pub fn copy_link(&self) -> &str {
        &self.deep_link
    }
}

#[cfg(test)]
mod tests {
    use super::QrBridge;

    #[test]
    fn renders_svg_for_deep_link() {
        let qr = QrBridge::for_product("https://shop.example/products/oak-chair", 200)
            .expect("qr");
        assert_eq!(qr.copy_link(), "https://shop.example/products/oak-chair?ar=true");
        assert!(qr.svg.contains("<svg"));
        assert!(qr.modules >= 21);
    }
}
