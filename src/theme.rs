use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub background: String,
    /// Panel fills, cycled by item position.
    pub panel_colors: Vec<String>,
    pub panel_border: String,
    pub label_color: String,
    /// Fill for items carrying the sensitive flag.
    pub sensitive_color: String,
    pub empty_color: String,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            background: "#FFFFFF".to_string(),
            panel_colors: vec![
                "#DCE6F5".to_string(),
                "#E8EFD9".to_string(),
                "#F5E6D3".to_string(),
                "#E9DFF2".to_string(),
                "#D9EFEC".to_string(),
            ],
            panel_border: "#FFFFFF".to_string(),
            label_color: "#1C2430".to_string(),
            sensitive_color: "#3A3F47".to_string(),
            empty_color: "#F4F5F7".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            background: "#14171C".to_string(),
            panel_colors: vec![
                "#2B3A52".to_string(),
                "#34422B".to_string(),
                "#4A3A28".to_string(),
                "#3D2F4D".to_string(),
                "#24433F".to_string(),
            ],
            panel_border: "#14171C".to_string(),
            label_color: "#E4E8EF".to_string(),
            sensitive_color: "#0B0C0E".to_string(),
            empty_color: "#1E2229".to_string(),
        }
    }

    pub fn panel_color(&self, index: usize) -> &str {
        if self.panel_colors.is_empty() {
            return &self.empty_color;
        }
        &self.panel_colors[index % self.panel_colors.len()]
    }
}
