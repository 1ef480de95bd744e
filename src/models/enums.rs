use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form doubles as the serde representation and the stored column value.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
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

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(
    /// Coarse severity used for clinical risk, coarse ML risk and the fused tier.
    RiskLevel {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
);

str_enum!(
    /// Five-bucket reading of the classifier output.
    MlSignal {
        StrongHigh => "strong_high",
        Moderate => "moderate",
        Weak => "weak",
        StrongNegative => "strong_negative",
        UncertainNegative => "uncertain_negative",
    }
);

str_enum!(DecisionAction {
    Monitor => "monitor",
    RequestAdditionalTests => "request_additional_tests",
    Escalate => "escalate",
});

str_enum!(
    /// Provenance of a persisted differential record.
    DifferentialSource {
        Llm => "llm",
        RulesFallback => "rules_fallback",
    }
);

str_enum!(Likelihood {
    High => "High",
    Moderate => "Moderate",
    Low => "Low",
});

str_enum!(InsightsSource {
    Llm => "llm",
    Placeholder => "placeholder",
});

str_enum!(ExplanationSource {
    Llm => "llm",
    Rules => "rules",
});

str_enum!(FindingStatus {
    Low => "low",
    Normal => "normal",
    Borderline => "borderline",
    High => "high",
    Critical => "critical",
});

impl RiskLevel {
    /// Upper-case label used in reasoning prompts (LOW / MODERATE / HIGH).
    pub fn prompt_label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MODERATE",
            RiskLevel::High => "HIGH",
        }
    }
}

impl Likelihood {
    /// Lenient parse for model output ("high", "Medium", "moderate ").
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Some(Likelihood::High),
            "moderate" | "medium" => Some(Likelihood::Moderate),
            "low" => Some(Likelihood::Low),
            _ => None,
        }
    }
}
