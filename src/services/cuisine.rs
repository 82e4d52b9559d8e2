use serde::{Deserialize, Serialize};

use super::embed_json;
use crate::pipeline::{AiPipeline, PipelineError};

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SignatureDish {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CuisineFacts {
    pub cuisine: String,
    pub region: String,
    pub overview: String,
    pub history: String,
    pub key_ingredients: Vec<String>,
    pub cooking_techniques: Vec<String>,
    pub signature_dishes: Vec<SignatureDish>,
    pub dining_etiquette: Vec<String>,
    pub fun_facts: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Pairing {
    pub item: String,
    /// "wine", "beverage", "side" ...
    pub kind: String,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
struct PairingReply {
    pairings: Vec<Pairing>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PairingSource {
    Generated,
    Traditional,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PairingSuggestions {
    pub dish: String,
    pub source: PairingSource,
    pub pairings: Vec<Pairing>,
}

/// (cuisine keyword, item, kind, reason)
const TRADITIONAL_PAIRINGS: &[(&str, &str, &str, &str)] = &[
    ("italian", "Chianti", "wine", "High acidity cuts through tomato and olive oil."),
    ("italian", "Arugula salad with lemon", "side", "Peppery greens balance rich pasta."),
    ("french", "Pinot Noir", "wine", "Light tannins suit butter and cream sauces."),
    ("french", "Crusty baguette", "side", "Carries sauces and jus."),
    ("japanese", "Junmai sake", "beverage", "Clean rice notes echo umami without overpowering fish."),
    ("japanese", "Miso soup", "side", "Classic companion to rice-based meals."),
    ("mexican", "Agua fresca", "beverage", "Fruit and lime cool chilli heat."),
    ("mexican", "Black beans", "side", "Earthy contrast to bright salsas."),
    ("indian", "Mango lassi", "beverage", "Yoghurt tempers spice."),
    ("indian", "Cucumber raita", "side", "Cooling contrast to curries."),
    ("thai", "Riesling", "wine", "Off-dry sweetness balances chilli and lime."),
    ("chinese", "Jasmine tea", "beverage", "Cleanses the palate between rich dishes."),
];

const GENERIC_PAIRINGS: &[(&str, &str, &str)] = &[
    ("Sparkling water with citrus", "beverage", "Neutral and refreshing with most dishes."),
    ("Seasonal green salad", "side", "Adds freshness and texture."),
];

pub fn build_facts_prompt(cuisine: &str) -> String {
    format!(
        "You are a food historian. Describe the cultural background of {cuisine} cuisine.
Respond ONLY with a JSON object:
{{
  \"cuisine\": string,
  \"region\": string,
  \"overview\": string,
  \"history\": string,
  \"key_ingredients\": [string],
  \"cooking_techniques\": [string],
  \"signature_dishes\": [{{ \"name\": string, \"description\": string }}],
  \"dining_etiquette\": [string],
  \"fun_facts\": [string]
}}"
    )
}

pub fn build_pairing_prompt(dish: &str, cuisine: Option<&str>) -> String {
    let context = serde_json::json!({ "dish": dish, "cuisine": cuisine });
    format!(
        "You are a sommelier and chef. Suggest 3 to 5 pairings (wines, other beverages or side dishes) for this dish:
{}
Respond ONLY with a JSON object: {{ \"pairings\": [{{ \"item\": string, \"kind\": \"wine\" | \"beverage\" | \"side\", \"reason\": string }}] }}",
        embed_json(&context)
    )
}

pub async fn cultural_facts(
    pipeline: &AiPipeline,
    cuisine: &str,
) -> Result<CuisineFacts, PipelineError> {
    let mut facts: CuisineFacts = pipeline.generate_as(&build_facts_prompt(cuisine)).await?;
    if facts.cuisine.trim().is_empty() {
        facts.cuisine = cuisine.to_string();
    }
    facts.signature_dishes.retain(|dish| !dish.name.trim().is_empty());
    Ok(facts)
}

/// Generated pairings, or the traditional table when generation fails or
/// comes back empty.
pub async fn suggest_pairings(
    pipeline: &AiPipeline,
    dish: &str,
    cuisine: Option<&str>,
) -> PairingSuggestions {
    let generated = pipeline
        .generate_as::<PairingReply>(&build_pairing_prompt(dish, cuisine))
        .await
        .map(|reply| {
            reply
                .pairings
                .into_iter()
                .filter(|p| !p.item.trim().is_empty())
                .collect::<Vec<_>>()
        });

    match generated {
        Ok(pairings) if !pairings.is_empty() => PairingSuggestions {
            dish: dish.to_string(),
            source: PairingSource::Generated,
            pairings,
        },
        Ok(_) => {
            tracing::warn!(dish, "model suggested no pairings, using traditional pairings");
            traditional_pairings(dish, cuisine)
        }
        Err(e) => {
            tracing::warn!(dish, error = %e, "pairing generation failed, using traditional pairings");
            traditional_pairings(dish, cuisine)
        }
    }
}

/// Static pairings keyed on the cuisine, or on a cuisine named in the dish.
pub fn traditional_pairings(dish: &str, cuisine: Option<&str>) -> PairingSuggestions {
    let haystack = format!("{} {}", cuisine.unwrap_or_default(), dish).to_lowercase();

    let mut pairings: Vec<Pairing> = TRADITIONAL_PAIRINGS
        .iter()
        .filter(|(keyword, ..)| haystack.contains(keyword))
        .map(|(_, item, kind, reason)| Pairing {
            item: item.to_string(),
            kind: kind.to_string(),
            reason: reason.to_string(),
        })
        .collect();

    if pairings.is_empty() {
        pairings = GENERIC_PAIRINGS
            .iter()
            .map(|(item, kind, reason)| Pairing {
                item: item.to_string(),
                kind: kind.to_string(),
                reason: reason.to_string(),
            })
            .collect();
    }

    PairingSuggestions {
        dish: dish.to_string(),
        source: PairingSource::Traditional,
        pairings,
    }
}
