use serde::{Deserialize, Serialize};

/// Gap widths in pixels. `inner` separates sibling nodes, `outer` separates
/// nodes from the display edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapSettings {
    pub inner: f64,
    pub outer: f64,
}

impl Default for GapSettings {
    fn default() -> Self {
        GapSettings { inner: 5.0, outer: 20.0 }
    }
}

impl GapSettings {
    /// Validates gap values and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.inner < 0.0 {
            issues.push(format!("inner gap must be non-negative, got {}", self.inner));
        }
        if self.outer < 0.0 {
            issues.push(format!("outer gap must be non-negative, got {}", self.outer));
        }
        issues
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub gaps: GapSettings,
    /// Border drawn by the host around each surface; subtracted from the
    /// rectangle handed over during geometry application.
    pub border_size: f64,
    /// A lone tiled window claims the whole usable area, without gaps.
    pub no_gaps_when_only: bool,
    /// Whether the host animates interactive resizes. When false, resize
    /// recalculations are applied with the force flag set.
    pub animate_manual_resizes: bool,
    /// Re-weight a vertical split so the focused child takes the dominant
    /// share whenever focus shifts into it.
    pub focus_expands_vertical: bool,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        LayoutSettings {
            gaps: GapSettings::default(),
            border_size: 1.0,
            no_gaps_when_only: false,
            animate_manual_resizes: false,
            focus_expands_vertical: false,
        }
    }
}

impl LayoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.gaps.validate();
        if self.border_size < 0.0 {
            issues.push(format!("border_size must be non-negative, got {}", self.border_size));
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(LayoutSettings::default().validate().is_empty());
    }

    #[test]
    fn negative_values_are_reported() {
        let settings = LayoutSettings {
            gaps: GapSettings { inner: -1.0, outer: -2.0 },
            border_size: -3.0,
            ..Default::default()
        };
        assert_eq!(settings.validate().len(), 3);
    }
}
