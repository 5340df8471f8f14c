use crate::layout::LayoutError;
use crate::layout::optimizer::OptimizerConfig;
use crate::layout::ratio::DEFAULT_CLIP_PARAM;
use crate::layout::rules::Rule;
use crate::theme::Theme;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Internal width unit shared by all columns; the renderer scales it.
    pub working_width: f64,
    pub columns: usize,
    pub importance_threshold: f64,
    pub epic_threshold: f64,
    pub clip_param: f64,
    /// Relative filler deviation tiers, tightest first.
    pub tolerances: Vec<f64>,
    /// Effective hero ratios beyond this (or its reciprocal) only try two-panel rules.
    pub wide_ratio: f64,
    /// Heroes within this ratio of square may fall back to five-panel rules.
    pub square_tolerance: f64,
    pub row_gap: f64,
    pub allowed_rules: Option<Vec<Rule>>,
    /// Fixed generator seed; the 8-hour session epoch is used when absent.
    pub seed: Option<i64>,
    pub optimizer: OptimizerConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            working_width: 1000.0,
            columns: 1,
            importance_threshold: 1.0,
            epic_threshold: 2.0,
            clip_param: DEFAULT_CLIP_PARAM,
            tolerances: vec![0.2, 1.0 / 3.0, 0.5],
            wide_ratio: 2.0,
            square_tolerance: 1.25,
            row_gap: 8.0,
            allowed_rules: None,
            seed: None,
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl LayoutConfig {
    pub fn band_width(&self) -> f64 {
        self.working_width / self.columns.max(1) as f64
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.columns == 0 {
            return Err(LayoutError::InvalidColumns(0));
        }
        if !(self.working_width.is_finite() && self.working_width > 0.0) {
            return Err(LayoutError::InvalidConfig(format!(
                "working width must be positive, got {}",
                self.working_width
            )));
        }
        if !(0.0..0.5).contains(&self.clip_param) {
            return Err(LayoutError::InvalidConfig(format!(
                "clip parameter must lie in [0, 0.5), got {}",
                self.clip_param
            )));
        }
        if self.tolerances.is_empty()
            || self.tolerances.iter().any(|tol| !(*tol > 0.0 && *tol <= 1.0))
            || self.tolerances.windows(2).any(|pair| pair[0] >= pair[1])
        {
            return Err(LayoutError::InvalidConfig(format!(
                "tolerances must ascend within (0, 1], got {:?}",
                self.tolerances
            )));
        }
        if self.wide_ratio <= 1.0 || self.square_tolerance < 1.0 {
            return Err(LayoutError::InvalidConfig(
                "wide ratio must exceed 1 and square tolerance must be at least 1".to_string(),
            ));
        }
        if self.optimizer.step <= 0.0 {
            return Err(LayoutError::InvalidConfig(
                "optimizer step must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output width in pixels; the working width is scaled to it.
    pub width: f32,
    pub background: String,
    pub show_labels: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            background: "#FFFFFF".to_string(),
            show_labels: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::light();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    background: Option<String>,
    panel_colors: Option<Vec<String>>,
    panel_border: Option<String>,
    label_color: Option<String>,
    sensitive_color: Option<String>,
    empty_color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    working_width: Option<f64>,
    /// Signed so negative counts reach validation instead of a serde error.
    columns: Option<i64>,
    importance_threshold: Option<f64>,
    epic_threshold: Option<f64>,
    clip_param: Option<f64>,
    tolerances: Option<Vec<f64>>,
    wide_ratio: Option<f64>,
    square_tolerance: Option<f64>,
    row_gap: Option<f64>,
    allowed_rules: Option<Vec<String>>,
    seed: Option<i64>,
    max_passes: Option<usize>,
    step: Option<f64>,
    min_improvement: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    background: Option<String>,
    show_labels: Option<bool>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents)
            .map_err(|_| json_err)
            .context("invalid config file")?,
    };
    let mut config = Config::default();

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "dark" {
            config.theme = Theme::dark();
        } else if theme_name == "light" || theme_name == "default" {
            config.theme = Theme::light();
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            config.theme.background = v;
        }
        if let Some(v) = vars.panel_colors.filter(|colors| !colors.is_empty()) {
            config.theme.panel_colors = v;
        }
        if let Some(v) = vars.panel_border {
            config.theme.panel_border = v;
        }
        if let Some(v) = vars.label_color {
            config.theme.label_color = v;
        }
        if let Some(v) = vars.sensitive_color {
            config.theme.sensitive_color = v;
        }
        if let Some(v) = vars.empty_color {
            config.theme.empty_color = v;
        }
    }

    if let Some(layout) = parsed.layout {
        apply_layout_file(&mut config.layout, layout)?;
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.background {
            config.render.background = v;
        }
        if let Some(v) = render.show_labels {
            config.render.show_labels = v;
        }
    }

    config.layout.validate()?;
    Ok(config)
}

fn apply_layout_file(layout: &mut LayoutConfig, file: LayoutConfigFile) -> Result<(), LayoutError> {
    if let Some(v) = file.working_width {
        layout.working_width = v;
    }
    if let Some(v) = file.columns {
        layout.columns = usize::try_from(v)
            .ok()
            .filter(|columns| *columns > 0)
            .ok_or(LayoutError::InvalidColumns(v))?;
    }
    if let Some(v) = file.importance_threshold {
        layout.importance_threshold = v;
    }
    if let Some(v) = file.epic_threshold {
        layout.epic_threshold = v;
    }
    if let Some(v) = file.clip_param {
        layout.clip_param = v;
    }
    if let Some(v) = file.tolerances {
        layout.tolerances = v;
    }
    if let Some(v) = file.wide_ratio {
        layout.wide_ratio = v;
    }
    if let Some(v) = file.square_tolerance {
        layout.square_tolerance = v;
    }
    if let Some(v) = file.row_gap {
        layout.row_gap = v;
    }
    if let Some(names) = file.allowed_rules {
        let rules = names
            .iter()
            .map(|name| name.parse::<Rule>())
            .collect::<Result<Vec<_>, _>>()?;
        layout.allowed_rules = Some(rules);
    }
    if let Some(v) = file.seed {
        layout.seed = Some(v);
    }
    if let Some(v) = file.max_passes {
        layout.optimizer.max_passes = v;
    }
    if let Some(v) = file.step {
        layout.optimizer.step = v;
    }
    if let Some(v) = file.min_improvement {
        layout.optimizer.min_improvement = v;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = LayoutConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.band_width(), 1000.0);
    }

    #[test]
    fn parses_layout_overrides() {
        let config = parse_config(
            r#"{"theme":"dark","layout":{"columns":3,"allowedRules":["A","i"],"seed":77,"maxPasses":10}}"#,
        )
        .unwrap();
        assert_eq!(config.layout.columns, 3);
        assert_eq!(config.layout.allowed_rules, Some(vec![Rule::A, Rule::I]));
        assert_eq!(config.layout.seed, Some(77));
        assert_eq!(config.layout.optimizer.max_passes, 10);
        assert_eq!(config.theme.background, Theme::dark().background);
    }

    #[test]
    fn accepts_json5() {
        let config = parse_config("{ layout: { rowGap: 4, }, // trailing comment\n }").unwrap();
        assert_eq!(config.layout.row_gap, 4.0);
    }

    #[test]
    fn rejects_unknown_rules_and_bad_columns() {
        let err = parse_config(r#"{"layout":{"allowedRules":["Q"]}}"#).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LayoutError>(),
            Some(&LayoutError::UnknownRule("Q".to_string()))
        );
        let err = parse_config(r#"{"layout":{"columns":-2}}"#).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LayoutError>(),
            Some(&LayoutError::InvalidColumns(-2))
        );
    }

    #[test]
    fn rejects_descending_tolerances() {
        let mut config = LayoutConfig::default();
        config.tolerances = vec![0.5, 0.2];
        assert!(matches!(
            config.validate(),
            Err(LayoutError::InvalidConfig(_))
        ));
    }
}
