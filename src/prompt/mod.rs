use chrono::{Datelike, Duration, Months, NaiveDate};
use serde_json::{json, Value};
use std::collections::BTreeSet;

use crate::wire::{GenerationRequest, Variant, KEYWORD_COUNT, MANDATORY_KEYWORDS, TITLE_SUFFIX};

/// Months and days added to "today" to get the seasonal target date.
const LEAD_MONTHS: u32 = 3;
const LEAD_DAYS: i64 = 10;

fn role() -> &'static str {
r#"You are an expert creative director for a 3D artist specializing in high-end, commercially valuable stock imagery for Adobe Stock. Your goal is to generate unique and diverse ideas for objects that are rare on microstock websites and have high commercial appeal."#
}

fn compliance_policy() -> &'static str {
r#"**CONTENT RESTRICTION: ISLAMIC COMPLIANCE (NON-NEGOTIABLE)**
This is the most important rule. ALL generated ideas MUST strictly adhere to Islamic principles.
- **ABSOLUTELY NO LIVING BEINGS:** Do not generate ideas for humans, animals, or any figures that resemble living beings. All objects must be inanimate.
- **ABSOLUTELY NO PROHIBITED ITEMS:** Avoid any objects, themes, or concepts that are prohibited (haram). This includes, but is not limited to:
    - Alcohol (e.g., wine bottles, glasses of wine, beer mugs).
    - Gambling items (e.g., poker chips, dice).
    - Non-halal food items, especially pork.
    - Religious symbols of other faiths.
    - Any indecent, suggestive, or inappropriate objects.
- **EXPLICITLY AVOID NON-ISLAMIC HOLIDAYS:** Do not generate ideas for Christmas, Easter, Halloween, Valentine's Day, or St. Patrick's Day. Focus on secular seasonal events (autumn, winter), national holidays (Thanksgiving, Canada Day), and general celebrations (New Year's).
- Failure to adhere to these content restrictions will result in an invalid output."#
}

fn image_rules() -> &'static str {
r#"**Strict Image Generation Rules (for the prompt):**
1.  **Background Control:** The object MUST be isolated on a seamless, clean, **pure white OR pure black background**. No other colors, gradients, or textures are allowed.
2.  **Absolute Sharpness:** The image must be hyper-realistic, incredibly detailed, and in **razor-sharp focus from edge to edge**. There should be **absolutely zero blur**.
3.  **No Text or Watermarks:** The image must be **completely free of any text, typography, letters, numbers, logos, or watermarks**.
4.  **Lighting & Composition:** Use 'soft, professional studio lighting' for an elegant look. The composition should be artistic, minimalist, and visually appealing.
5.  **Clean Content:** Strictly no distracting shadows, and absolutely no people or animals."#
}

fn keyword_rules() -> String {
    format!(r#"**Keyword Generation Rules:**
1.  For each idea, provide a list of **exactly {count} highly relevant SEO keywords**.
2.  The keywords MUST be ordered from the most commercially valuable and relevant to the least relevant.
3.  The keywords list **MUST ALWAYS include '{first}' and '{second}'**."#,
        count = KEYWORD_COUNT,
        first = MANDATORY_KEYWORDS[0],
        second = MANDATORY_KEYWORDS[1],
    )
}

fn title_rules(count: usize) -> String {
    let half = count / 2;
    format!(r#"**Object Title Rules:**
1.  The "object" title MUST be SEO-optimized for Adobe Stock. It should be descriptive, clear, and contain relevant keywords that a buyer would search for. Think about titles like "Minimalist Ceramic Pumpkin for Autumn Decor" instead of just "Pumpkin".
2.  **Exactly {half} of the {count} titles** MUST end with the phrase "{suffix}". The other {rest} titles should not. Distribute this randomly."#,
        half = half,
        count = count,
        rest = count - half,
        suffix = TITLE_SUFFIX,
    )
}

fn theme(variant: Variant, target_date: Option<&str>) -> String {
    match (variant, target_date) {
        (Variant::Seasonal, Some(date)) => format!(r#"**CRITICAL THEME: Upcoming Events**
Focus ALL ideas on objects related to holidays, seasons, and cultural events happening in **America and Canada** around **{date}**. This is approximately 3 months and 10 days from now. Brainstorm relevant events (e.g., seasonal changes, specific holidays, cultural festivals, national days) and generate object ideas that would be in high demand for marketing and editorial content related to those events."#),
        (Variant::Catalog, _) => r#"**CRITICAL THEME: Evergreen Catalog**
Focus on timeless objects with steady year-round demand: home and office decor, kitchenware, tools, stationery, technology, travel, wellness, and seasonal staples that are not tied to a single date. Favor concepts that are under-represented on microstock websites."#.to_string(),
        _ => r#"**CRITICAL THEME: Trending Now**
Focus on objects with strong current commercial demand for marketing, e-commerce, and editorial design. Favor fresh, unexpected concepts over common stock subjects."#.to_string(),
    }
}

fn output_structure(variant: Variant) -> String {
    if variant.wants_keywords() {
        r#"**Final Output Structure:**
Return your response as a valid JSON array. Each element in the array must be an object with three keys: "object", "prompt", and "keywords".

Example of a single element in the output array:
{
  "object": "Hand-carved Wooden Acorn with Brass Cap, Autumnal Decor, on transparent background",
  "prompt": "Artistic photo of a single, hand-carved wooden acorn with a polished brass cap, resting on a clean surface. Isolated on a seamless, pure white background under soft, professional studio lighting. The image must be hyper-detailed, crystal clear, and in razor-sharp focus, showing the wood grain and metal texture. Minimalist composition, absolutely no blur, no text, no distracting shadows.",
  "keywords": ["acorn", "autumn", "fall decor", "thanksgiving", "wooden toy", "seasonal", "harvest", "minimalist", "isolated", "3d render", "product shot", "e-commerce", "graphic design element", "seasonal graphic", "autumnal", "forest", "nature", "eco-friendly", "handmade", "rustic", "decorative object", "still life", "transparent background", "cutout", "png"]
}"#.to_string()
    } else {
        r#"**Final Output Structure:**
Return your response as a valid JSON array. Each element in the array must be an object with two keys: "object" and "prompt".

Example of a single element in the output array:
{
  "object": "Brushed Copper Desk Lamp, Modern Workspace Lighting, on transparent background",
  "prompt": "Artistic photo of a single brushed copper desk lamp with an articulated arm. Isolated on a seamless, pure black background under soft, professional studio lighting. The image must be hyper-detailed, crystal clear, and in razor-sharp focus. Minimalist composition, absolutely no blur, no text, no distracting shadows."
}"#.to_string()
    }
}

/// The date the seasonal theme targets: three calendar months and ten days
/// after `today`. A day past the end of the target month spills into the
/// following month (Nov 30 + 3 months = Mar 2).
pub fn target_date(today: NaiveDate) -> NaiveDate {
    let shifted = today
        .with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(LEAD_MONTHS)))
        .map(|first| first + Duration::days(i64::from(today.day0())))
        .unwrap_or(today);
    shifted + Duration::days(LEAD_DAYS)
}

/// `January 20, 2027`
pub fn format_target_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Assembles the per-invocation request from the variant, the current
/// history, and today's date.
pub fn build_request(
    variant: Variant,
    excluded_labels: BTreeSet<String>,
    today: NaiveDate,
) -> GenerationRequest {
    GenerationRequest {
        variant,
        excluded_labels,
        temperature: variant.temperature(),
        target_date: variant.uses_target_date().then(|| target_date(today)),
    }
}

/// Full instruction text sent as the single user turn.
pub fn build_instruction(req: &GenerationRequest) -> String {
    let count = req.variant.idea_count();
    let excluded = req
        .excluded_labels
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let date = req.target_date.map(format_target_date);

    let mut sections = vec![
        role().to_string(),
        format!("**Core Task:**\nGenerate a list of {count} unique object ideas."),
        format!(r#"**Uniqueness Constraint (NON-NEGOTIABLE):**
You MUST NOT generate any object titles that are present in the following list of previously generated ideas. Every single idea you provide must be new and unique compared to this list.
**Existing ideas to avoid:** [{excluded}]"#),
        theme(req.variant, date.as_deref()),
        compliance_policy().to_string(),
        title_rules(count),
    ];
    if req.variant.wants_keywords() {
        sections.push(keyword_rules());
    }
    sections.push(image_rules().to_string());
    sections.push(output_structure(req.variant));

    format!("\n{}\n", sections.join("\n\n"))
}

/// Response-shape descriptor in the Gemini schema dialect.
pub fn response_schema(variant: Variant) -> Value {
    let mut properties = json!({
        "object": {
            "type": "STRING",
            "description": "The SEO-optimized name of the object or concept for Adobe Stock."
        },
        "prompt": {
            "type": "STRING",
            "description": "The generated prompt for an image creation tool."
        }
    });
    let mut required = vec!["object", "prompt"];

    if variant.wants_keywords() {
        properties["keywords"] = json!({
            "type": "ARRAY",
            "items": { "type": "STRING" },
            "description": format!("An array of {KEYWORD_COUNT} SEO keywords related to the object.")
        });
        required.push("keywords");
    }

    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": properties,
            "required": required
        }
    })
}
