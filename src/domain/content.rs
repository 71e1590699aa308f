//! `campaign_content_recommendation`: templated campaign copy per insurance line

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::domain::utils::{
    humanize, required_str, str_or, strings, DEFAULT_CAMPAIGN_GOAL, DEFAULT_CHANNEL,
};
use crate::tool_registry::ToolError;

const DISCLAIMER: &str = "Terms and conditions apply. Coverage subject to underwriting approval.";
const QUOTE_URL: &str = "https://insurance.com/get-quote";

const TITLES: [(&str, [&str; 3]); 4] = [
    (
        "life_insurance",
        [
            "Protect Your Family's Future",
            "Life Insurance Made Simple",
            "Secure Tomorrow, Today",
        ],
    ),
    (
        "health_insurance",
        [
            "Your Health, Our Priority",
            "Comprehensive Coverage for You",
            "Stay Healthy, Stay Protected",
        ],
    ),
    (
        "auto_insurance",
        [
            "Drive with Confidence",
            "Complete Auto Protection",
            "Your Road to Peace of Mind",
        ],
    ),
    (
        "property_insurance",
        [
            "Protect What Matters Most",
            "Home Sweet Home Protection",
            "Secure Your Investments",
        ],
    ),
];

const BENEFITS: [(&str, [&str; 4]); 4] = [
    (
        "life_insurance",
        [
            "Financial security for your family",
            "Tax-free death benefit",
            "Cash value accumulation",
            "Flexible payment options",
        ],
    ),
    (
        "health_insurance",
        [
            "Comprehensive medical coverage",
            "Preventive care included",
            "Network of top doctors",
            "Emergency coverage worldwide",
        ],
    ),
    (
        "auto_insurance",
        [
            "24/7 roadside assistance",
            "Accident forgiveness",
            "New car replacement",
            "Comprehensive coverage",
        ],
    ),
    (
        "property_insurance",
        [
            "Full replacement cost coverage",
            "Natural disaster protection",
            "Personal property coverage",
            "Liability protection",
        ],
    ),
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignContent {
    pub content_id: String,
    pub title: String,
    pub description: String,
    pub content_type: String,
    pub subject: String,
    pub message: String,
    pub call_to_action: String,
    pub cta_button_text: String,
    pub cta_url: String,
    pub channel: String,
    pub insurance_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benefit_highlight: Option<String>,
    pub personalization_tokens: Map<String, Value>,
    pub recommended_segments: Vec<String>,
    pub disclaimer: String,
    pub requires_opt_in: bool,
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

/// Fields shared by every variant produced for one request.
struct Brief<'a> {
    insurance_type: &'a str,
    channel: &'a str,
    goal: &'a str,
    tokens: Map<String, Value>,
    segments: Vec<String>,
}

pub fn recommend(arguments: &Map<String, Value>) -> Result<Value, ToolError> {
    let insurance_type = required_str(arguments, "insurance_type")?;
    let channel = str_or(arguments, "channel", DEFAULT_CHANNEL);
    let goal = str_or(arguments, "campaign_goal", DEFAULT_CAMPAIGN_GOAL);
    let audience = arguments.get("audience_criteria").and_then(Value::as_object);

    info!(
        insurance_type,
        channel,
        goal,
        "generating campaign content recommendation"
    );

    let brief = Brief {
        insurance_type,
        channel,
        goal,
        tokens: personalization_tokens(audience),
        segments: recommended_segments(audience),
    };

    let content = vec![
        templated(&brief, 0, "main", "Get Quote Now", "Start Protection", QUOTE_URL),
        templated(
            &brief,
            1,
            "secondary",
            "Learn More",
            "Explore Options",
            "https://insurance.com/learn-more",
        ),
        follow_up(&brief),
    ];

    Ok(json!({
        "recommended_content": content,
        "content_strategy": {
            "primary_focus": "Value proposition and benefits",
            "tone": "Professional yet approachable",
            "key_messages": [
                "Protection and security",
                "Financial peace of mind",
                "Personalized coverage options",
            ],
            "content_pillars": [
                "Education and awareness",
                "Risk mitigation",
                "Financial planning",
            ],
        },
        "personalization_tips": [
            "Use demographic data for age-appropriate messaging",
            "Leverage income information for premium positioning",
            "Include location-specific benefits and coverage",
            "Personalize call-to-action based on engagement level",
        ],
        "optimization_suggestions": [
            "A/B test subject lines for email campaigns",
            "Optimize send times based on audience behavior",
            "Use dynamic content based on user preferences",
            "Implement progressive profiling for lead nurturing",
        ],
        "compliance_notes": [
            "Ensure all claims are substantiated and comply with insurance regulations",
            "Include required disclaimers and terms of service",
            "Obtain proper consent for data processing and marketing communications",
            "Follow GDPR and local privacy regulations",
        ],
        "performance_expectations": {
            "expected_open_rate": "15-25%",
            "expected_click_rate": "2-5%",
            "expected_conversion_rate": "1-3%",
            "optimization_timeline": "2-4 weeks",
        },
    }))
}

fn title(insurance_type: &str, variant: usize) -> &'static str {
    TITLES
        .iter()
        .find(|(kind, _)| *kind == insurance_type)
        .map(|(_, titles)| titles[variant])
        .unwrap_or("Insurance Protection")
}

fn benefit(insurance_type: &str, variant: usize) -> &'static str {
    BENEFITS
        .iter()
        .find(|(kind, _)| *kind == insurance_type)
        .map(|(_, benefits)| benefits[variant])
        .unwrap_or("Comprehensive coverage")
}

fn templated(
    brief: &Brief<'_>,
    variant: usize,
    prefix: &str,
    call_to_action: &str,
    button: &str,
    url: &str,
) -> CampaignContent {
    let title = title(brief.insurance_type, variant);
    let benefit = benefit(brief.insurance_type, variant);
    let product = humanize(brief.insurance_type);

    CampaignContent {
        content_id: format!("{prefix}_{}_{}", brief.insurance_type, brief.channel),
        title: title.to_string(),
        description: format!(
            "Comprehensive {product} coverage tailored for your needs. Get personalized protection that fits your lifestyle and budget."
        ),
        content_type: brief.channel.to_string(),
        subject: title.to_string(),
        message: message(&product, benefit, brief.goal),
        call_to_action: call_to_action.to_string(),
        cta_button_text: button.to_string(),
        cta_url: url.to_string(),
        channel: brief.channel.to_string(),
        insurance_type: brief.insurance_type.to_string(),
        benefit_highlight: Some(benefit.to_string()),
        personalization_tokens: brief.tokens.clone(),
        recommended_segments: brief.segments.clone(),
        disclaimer: DISCLAIMER.to_string(),
        requires_opt_in: true,
        priority: variant as u8 + 1,
        frequency: None,
    }
}

fn follow_up(brief: &Brief<'_>) -> CampaignContent {
    CampaignContent {
        content_id: format!("followup_{}_{}", brief.insurance_type, brief.channel),
        title: "Don't Miss Out on Protection".to_string(),
        description: "Follow-up message to re-engage prospects".to_string(),
        content_type: brief.channel.to_string(),
        subject: "Last Chance: Secure Your Protection".to_string(),
        message: format!(
            "You showed interest in {} protection. Don't wait - secure your coverage today and protect what matters most.",
            brief.insurance_type
        ),
        call_to_action: "Get Protected Now".to_string(),
        cta_button_text: "Secure Coverage".to_string(),
        cta_url: QUOTE_URL.to_string(),
        channel: brief.channel.to_string(),
        insurance_type: brief.insurance_type.to_string(),
        benefit_highlight: None,
        personalization_tokens: brief.tokens.clone(),
        recommended_segments: brief.segments.clone(),
        disclaimer: DISCLAIMER.to_string(),
        requires_opt_in: true,
        priority: 3,
        frequency: Some("weekly".to_string()),
    }
}

fn message(product: &str, benefit: &str, goal: &str) -> String {
    let hook = if goal == "conversion" {
        "Limited time offer - get your personalized quote today and save up to 20% on your premium. "
    } else {
        "Learn more about how we can help protect what matters most to you. "
    };

    format!(
        "Protect yourself and your loved ones with our comprehensive {product} coverage. \
         Key benefits include {benefit}. {hook}\
         Our experienced team is ready to help you find the perfect coverage for your needs."
    )
}

fn first_entry(audience: &Map<String, Value>, key: &str) -> Option<Value> {
    audience
        .get(key)
        .and_then(Value::as_array)
        .and_then(|values| values.first())
        .cloned()
}

fn personalization_tokens(audience: Option<&Map<String, Value>>) -> Map<String, Value> {
    let mut tokens = Map::new();
    let Some(audience) = audience else {
        return tokens;
    };

    if let (Some(min), Some(max)) = (audience.get("minAge"), audience.get("maxAge")) {
        tokens.insert("AGE_RANGE".to_string(), json!(format!("{min}-{max}")));
    }
    if let Some(income) = first_entry(audience, "incomeRange") {
        tokens.insert("INCOME_LEVEL".to_string(), income);
    }
    if let Some(location) = first_entry(audience, "location") {
        tokens.insert("LOCATION".to_string(), location);
    }

    tokens
}

fn recommended_segments(audience: Option<&Map<String, Value>>) -> Vec<String> {
    let segment = audience
        .and_then(|audience| audience.get("minAge"))
        .and_then(Value::as_i64)
        .map(|age| match age {
            age if age < 30 => "young_adults",
            age if age < 50 => "middle_aged",
            _ => "seniors",
        })
        .unwrap_or("general");

    strings(&[segment])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn requires_insurance_type() {
        let err = recommend(&args(json!({"channel": "sms"}))).expect_err("missing type");
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn produces_three_variants_with_defaults() {
        let result = recommend(&args(json!({"insurance_type": "auto_insurance"})))
            .expect("recommendation");

        let content = result["recommended_content"].as_array().expect("array");
        assert_eq!(content.len(), 3);
        assert_eq!(content[0]["contentId"], "main_auto_insurance_email");
        assert_eq!(content[0]["title"], "Drive with Confidence");
        assert_eq!(content[1]["benefitHighlight"], "Accident forgiveness");
        assert_eq!(content[2]["frequency"], "weekly");
        assert_eq!(content[2]["priority"], 3);
        assert_eq!(content[0]["recommendedSegments"], json!(["general"]));
    }

    #[test]
    fn audience_criteria_drive_tokens_and_segments() {
        let result = recommend(&args(json!({
            "insurance_type": "life_insurance",
            "campaign_goal": "conversion",
            "audience_criteria": {"minAge": 25, "maxAge": 35, "incomeRange": ["middle_income"]},
        })))
        .expect("recommendation");

        let main = &result["recommended_content"][0];
        assert_eq!(main["personalizationTokens"]["AGE_RANGE"], "25-35");
        assert_eq!(main["personalizationTokens"]["INCOME_LEVEL"], "middle_income");
        assert_eq!(main["recommendedSegments"], json!(["young_adults"]));
        assert!(main["message"]
            .as_str()
            .expect("message")
            .contains("save up to 20%"));
    }

    #[test]
    fn unknown_line_falls_back_to_generic_copy() {
        let result = recommend(&args(json!({"insurance_type": "pet_insurance"})))
            .expect("recommendation");

        assert_eq!(result["recommended_content"][1]["title"], "Insurance Protection");
    }
}
