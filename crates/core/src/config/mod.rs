use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Mixer device opened when no override is given on the command line.
pub const DEFAULT_MIXER_DEVICE: &str = "/dev/mixer";

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub device: PathBuf,
    #[serde(default)]
    pub limits: CatalogLimits,
    #[serde(default)]
    pub layout: LayoutConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_MIXER_DEVICE),
            limits: CatalogLimits::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults with the mixer device replaced.
    pub fn with_device(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }
}

/// Capacity of the control catalog. Descriptors that do not fit are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogLimits {
    pub max_classes: usize,
    /// Maximum number of controls held by a single class.
    pub max_controls: usize,
    /// Maximum number of members of an enum or set control.
    pub max_members: usize,
    pub max_channels: usize,
}

impl Default for CatalogLimits {
    fn default() -> Self {
        Self {
            max_classes: 16,
            max_controls: 64,
            max_members: 32,
            max_channels: 8,
        }
    }
}

/// Screen geometry used to derive the row budget of the control viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Row of the first control widget; everything above belongs to the title,
    /// the class selector and the controls heading.
    pub controls_top: u16,
    pub bottom_margin: u16,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            controls_top: 5,
            bottom_margin: 3,
        }
    }
}

impl LayoutConfig {
    /// Number of rows available to control widgets on a screen of `height`
    /// rows. The last row before the margin is never used.
    pub fn row_budget(&self, height: u16) -> usize {
        usize::from(height)
            .saturating_sub(usize::from(self.controls_top) + usize::from(self.bottom_margin) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_budget_reserves_header_and_margin() {
        let layout = LayoutConfig::default();
        assert_eq!(layout.row_budget(24), 15);
        assert_eq!(layout.row_budget(4), 0);
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: AppConfig = serde_json::from_str(r#"{"device": "/dev/mixer1"}"#).unwrap();
        assert_eq!(config.device, PathBuf::from("/dev/mixer1"));
        assert_eq!(config.limits, CatalogLimits::default());
    }
}
