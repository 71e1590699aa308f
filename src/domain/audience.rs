//! `audience_targeting`: rule-based audience criteria for insurance campaigns

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::domain::utils::{
    contains_any, required_str, str_or, strings, DEFAULT_CAMPAIGN_OBJECTIVE,
    DEFAULT_INSURANCE_TYPE,
};
use crate::tool_registry::ToolError;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudienceCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_age: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub income_range: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub occupation: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub marital_status: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub risk_profile: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub preferred_communication_channel: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_objective: Option<String>,
}

const KNOWN_SEGMENTS: [(&str, &[&str]); 5] = [
    ("life_insurance", &["young_professionals", "families", "seniors"]),
    (
        "health_insurance",
        &["young_adults", "families", "seniors", "self_employed"],
    ),
    (
        "auto_insurance",
        &["new_drivers", "experienced_drivers", "commercial_drivers"],
    ),
    (
        "property_insurance",
        &["homeowners", "renters", "business_owners"],
    ),
    (
        "travel_insurance",
        &["frequent_travelers", "vacationers", "business_travelers"],
    ),
];

pub fn recommend(arguments: &Map<String, Value>) -> Result<Value, ToolError> {
    let requirements = required_str(arguments, "requirements")?;
    let insurance_type = str_or(arguments, "insurance_type", DEFAULT_INSURANCE_TYPE);
    let objective = str_or(arguments, "campaign_objective", DEFAULT_CAMPAIGN_OBJECTIVE);

    info!(
        insurance_type,
        objective, "generating audience criteria recommendation"
    );

    let criteria = criteria_for(requirements, insurance_type, objective);
    let segments = segments_for(insurance_type)
        .map(|segments| strings(segments))
        .unwrap_or_else(|| vec!["general".to_string()]);
    let suggestions = criteria
        .iter()
        .map(|criteria| {
            json!({
                "criteria": criteria,
                "priority": "high",
                "reasoning": reasoning(criteria, objective),
            })
        })
        .collect::<Vec<_>>();

    Ok(json!({
        "recommended_criteria": criteria,
        "target_segments": segments,
        "targeting_suggestions": suggestions,
        "insights": {
            "market_opportunity": format!("Strong potential in {insurance_type} market segment"),
            "competitive_advantage": "Focus on personalized messaging and digital channels",
            "risk_factors": ["Market saturation", "Regulatory compliance"],
            "success_metrics": ["Click-through rate", "Conversion rate", "Customer acquisition cost"],
        },
        "estimated_audience_size": audience_size(criteria.len()),
        "confidence_score": confidence(requirements, insurance_type),
    }))
}

fn segments_for(insurance_type: &str) -> Option<&'static [&'static str]> {
    KNOWN_SEGMENTS
        .iter()
        .find(|(kind, _)| *kind == insurance_type)
        .map(|(_, segments)| *segments)
}

fn base_criteria(insurance_type: &str, objective: &str) -> AudienceCriteria {
    let objective = Some(objective.to_string());
    match insurance_type {
        "life_insurance" => AudienceCriteria {
            min_age: Some(25),
            max_age: Some(65),
            marital_status: strings(&["single", "married"]),
            risk_profile: strings(&["low_risk", "medium_risk"]),
            campaign_objective: objective,
            ..Default::default()
        },
        "health_insurance" => AudienceCriteria {
            min_age: Some(18),
            max_age: Some(65),
            risk_profile: strings(&["medium_risk", "high_risk"]),
            campaign_objective: objective,
            ..Default::default()
        },
        "auto_insurance" => AudienceCriteria {
            min_age: Some(18),
            max_age: Some(75),
            occupation: strings(&["employed", "self_employed"]),
            campaign_objective: objective,
            ..Default::default()
        },
        _ => AudienceCriteria {
            min_age: Some(18),
            max_age: Some(65),
            campaign_objective: objective,
            ..Default::default()
        },
    }
}

fn criteria_for(requirements: &str, insurance_type: &str, objective: &str) -> Vec<AudienceCriteria> {
    let base = base_criteria(insurance_type, objective);
    let lowered = requirements.to_lowercase();
    let mut criteria = vec![base.clone()];

    if contains_any(&lowered, &["young", "millennial"]) {
        criteria.push(AudienceCriteria {
            min_age: Some(25),
            max_age: Some(35),
            preferred_communication_channel: strings(&["social_media", "mobile_app", "email"]),
            ..base.clone()
        });
    }
    if contains_any(&lowered, &["senior", "retirement"]) {
        criteria.push(AudienceCriteria {
            min_age: Some(55),
            max_age: Some(75),
            preferred_communication_channel: strings(&["phone", "mail", "email"]),
            ..base.clone()
        });
    }
    if contains_any(&lowered, &["affordable", "budget"]) {
        criteria.push(AudienceCriteria {
            income_range: strings(&["low_income", "middle_income"]),
            ..base.clone()
        });
    }
    if contains_any(&lowered, &["premium", "high-end"]) {
        criteria.push(AudienceCriteria {
            income_range: strings(&["high_income", "very_high_income"]),
            ..base
        });
    }

    criteria
}

fn reasoning(criteria: &AudienceCriteria, objective: &str) -> String {
    let mut reasoning = String::new();

    if let (Some(min), Some(max)) = (criteria.min_age, criteria.max_age) {
        reasoning.push_str(&format!(
            "Age range {min}-{max} is optimal for {objective} campaigns. "
        ));
    }
    if !criteria.income_range.is_empty() {
        reasoning.push_str(&format!(
            "Targeting {} income segments aligns with campaign objectives. ",
            criteria.income_range.join(", ")
        ));
    }
    if !criteria.preferred_communication_channel.is_empty() {
        reasoning.push_str(&format!(
            "Recommended channels: {} for better engagement. ",
            criteria.preferred_communication_channel.join(", ")
        ));
    }

    reasoning
}

fn audience_size(criteria_count: usize) -> &'static str {
    match criteria_count {
        0 | 1 => "Large (100,000+)",
        2 | 3 => "Medium (10,000 - 100,000)",
        _ => "Small (1,000 - 10,000)",
    }
}

fn confidence(requirements: &str, insurance_type: &str) -> f64 {
    let mut score = 0.7;
    if requirements.len() > 50 {
        score += 0.1;
    }
    if segments_for(insurance_type).is_some() {
        score += 0.2;
    }
    f64::min(score, 1.0)
}
