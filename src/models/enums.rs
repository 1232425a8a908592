use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + Display pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(IndicatorStatus {
    Normal => "normal",
    High => "high",
    Low => "low",
    Unknown => "unknown",
});

impl IndicatorStatus {
    /// High or low. `Unknown` is not an abnormal condition.
    pub fn is_abnormal(&self) -> bool {
        matches!(self, Self::High | Self::Low)
    }
}

str_enum!(TrendDirection {
    Increasing => "increasing",
    Decreasing => "decreasing",
    Stable => "stable",
});

str_enum!(ChangeDirection {
    Increase => "increase",
    Decrease => "decrease",
    Unchanged => "unchanged",
});

str_enum!(AlertKind {
    Threshold => "threshold",
    Trend => "trend",
    SuddenChange => "sudden_change",
});

str_enum!(AlertSeverity {
    Low => "low",
    Medium => "medium",
    High => "high",
});

str_enum!(IndicatorCategory {
    Blood => "blood",
    Liver => "liver",
    Kidney => "kidney",
    Metabolism => "metabolism",
    Other => "other",
});
