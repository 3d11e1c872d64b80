//! Form Preview Binder
//!
//! Mirrors the project form's icon and color inputs into their previews.

/// Icon shown when the icon input is empty
pub const DEFAULT_ICON: &str = "check-circle";
/// Swatch color shown when the color input is empty
pub const DEFAULT_COLOR: &str = "#ffffff";

/// Live preview state of the project form
#[derive(Debug, Clone, PartialEq)]
pub struct FormPreview {
    icon_class: String,
    background: String,
}

impl Default for FormPreview {
    fn default() -> Self {
        Self {
            icon_class: icon_class(""),
            background: DEFAULT_COLOR.to_string(),
        }
    }
}

impl FormPreview {
    pub fn on_icon_input(&mut self, value: &str) {
        self.icon_class = icon_class(value);
    }

    pub fn on_color_input(&mut self, value: &str) {
        let value = value.trim();
        self.background = if value.is_empty() {
            DEFAULT_COLOR.to_string()
        } else {
            value.to_string()
        };
    }

    /// Class list of the preview `<i>` element
    pub fn icon_class(&self) -> &str {
        &self.icon_class
    }

    /// Background color of the swatch
    pub fn background(&self) -> &str {
        &self.background
    }
}

/// Bootstrap Icons class for an icon name
pub fn icon_class(name: &str) -> String {
    let name = name.trim();
    format!("bi bi-{}", if name.is_empty() { DEFAULT_ICON } else { name })
}
