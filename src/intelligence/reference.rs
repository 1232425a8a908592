//! Static reference tables: indicator categories and fixed advice strings.

use crate::models::enums::IndicatorCategory;

/// Keywords that place an indicator into a category.
///
/// `phrases` match anywhere in the lower-cased name. `abbreviations` must be
/// a whole token, so `ALT` matches "ALT (U/L)" but not "Alternative".
pub struct CategoryKeywords {
    pub category: IndicatorCategory,
    pub phrases: &'static [&'static str],
    pub abbreviations: &'static [&'static str],
}

/// Checked in order. Metabolism precedes blood so glycated haemoglobin is
/// not taken for a blood count.
pub static CATEGORY_TABLE: &[CategoryKeywords] = &[
    CategoryKeywords {
        category: IndicatorCategory::Metabolism,
        phrases: &[
            "glucose",
            "glycated",
            "glycosylated",
            "cholesterol",
            "triglyceride",
            "lipoprotein",
            "insulin",
            "血糖",
            "糖化血红蛋白",
            "胆固醇",
            "甘油三酯",
            "脂蛋白",
        ],
        abbreviations: &["glu", "fbg", "fpg", "hba1c", "a1c", "tc", "tg", "hdl", "ldl"],
    },
    CategoryKeywords {
        category: IndicatorCategory::Liver,
        phrases: &[
            "alanine aminotransferase",
            "aspartate aminotransferase",
            "aminotransferase",
            "bilirubin",
            "albumin",
            "alkaline phosphatase",
            "glutamyl",
            "谷丙转氨酶",
            "谷草转氨酶",
            "总胆红素",
            "直接胆红素",
            "间接胆红素",
            "白蛋白",
        ],
        abbreviations: &["alt", "ast", "ggt", "alp", "tbil", "dbil", "sgpt", "sgot"],
    },
    CategoryKeywords {
        category: IndicatorCategory::Kidney,
        phrases: &[
            "creatinine",
            "urea",
            "uric acid",
            "cystatin",
            "肌酐",
            "尿素氮",
            "尿酸",
        ],
        abbreviations: &["cr", "crea", "scr", "bun", "ua", "egfr"],
    },
    CategoryKeywords {
        category: IndicatorCategory::Blood,
        phrases: &[
            "hemoglobin",
            "haemoglobin",
            "red blood cell",
            "white blood cell",
            "platelet",
            "erythrocyte",
            "leukocyte",
            "hematocrit",
            "haematocrit",
            "neutrophil",
            "lymphocyte",
            "红细胞",
            "白细胞",
            "血红蛋白",
            "血小板",
        ],
        abbreviations: &["wbc", "rbc", "hb", "hgb", "plt", "hct", "mcv", "mch", "mchc"],
    },
];

/// Indicator kinds that carry specific health-implication text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownIndicator {
    Haemoglobin,
    Glucose,
}

static HAEMOGLOBIN_PHRASES: &[&str] = &["hemoglobin", "haemoglobin", "血红蛋白"];
static HAEMOGLOBIN_ABBREVIATIONS: &[&str] = &["hb", "hgb"];
/// Red-cell indices that name haemoglobin without measuring it.
static HAEMOGLOBIN_INDEX_PHRASES: &[&str] = &["corpuscular", "平均红细胞"];
static HAEMOGLOBIN_INDEX_ABBREVIATIONS: &[&str] = &["mch", "mchc"];
static GLUCOSE_PHRASES: &[&str] = &["glucose", "血糖"];
static GLUCOSE_ABBREVIATIONS: &[&str] = &["glu", "fbg", "fpg"];

pub const ALL_NORMAL_ASSESSMENT: &str =
    "All indicators are within normal ranges; overall health status looks good.";

pub static WELLNESS_RECOMMENDATIONS: &[&str] = &[
    "Maintain your current healthy lifestyle",
    "Schedule regular health check-ups",
];

pub const FOLLOW_UP_RECOMMENDATION: &str =
    "Follow up with a clinician for treatment and monitoring as advised";

/// Fixed advice for an abnormal category. `Other` has none.
pub fn recommendation_for(category: IndicatorCategory) -> Option<&'static str> {
    match category {
        IndicatorCategory::Blood => Some("Consider a specialist haematology examination"),
        IndicatorCategory::Liver => Some("Consider a detailed liver function work-up"),
        IndicatorCategory::Kidney => Some("Consider a detailed kidney function work-up"),
        IndicatorCategory::Metabolism => {
            Some("Adjust your diet and increase physical activity")
        }
        IndicatorCategory::Other => None,
    }
}

/// Resolve an indicator name to its category. Unmatched names are `Other`.
pub fn category_for(name: &str) -> IndicatorCategory {
    let lower = name.to_lowercase();
    let tokens = tokens(&lower);

    CATEGORY_TABLE
        .iter()
        .find(|entry| matches_keywords(&lower, &tokens, entry.phrases, entry.abbreviations))
        .map(|entry| entry.category)
        .unwrap_or(IndicatorCategory::Other)
}

pub fn known_indicator(name: &str) -> Option<KnownIndicator> {
    let lower = name.to_lowercase();
    let tokens = tokens(&lower);

    // Glycated haemoglobin is a glucose marker.
    if category_for(name) != IndicatorCategory::Metabolism
        && !matches_keywords(
            &lower,
            &tokens,
            HAEMOGLOBIN_INDEX_PHRASES,
            HAEMOGLOBIN_INDEX_ABBREVIATIONS,
        )
        && matches_keywords(&lower, &tokens, HAEMOGLOBIN_PHRASES, HAEMOGLOBIN_ABBREVIATIONS)
    {
        return Some(KnownIndicator::Haemoglobin);
    }
    if matches_keywords(&lower, &tokens, GLUCOSE_PHRASES, GLUCOSE_ABBREVIATIONS) {
        return Some(KnownIndicator::Glucose);
    }
    None
}

fn tokens(lower: &str) -> Vec<&str> {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

fn matches_keywords(
    lower: &str,
    tokens: &[&str],
    phrases: &[&str],
    abbreviations: &[&str],
) -> bool {
    phrases.iter().any(|p| lower.contains(p))
        || tokens.iter().any(|t| abbreviations.contains(t))
}
