use serde::{Deserialize, Serialize};

use super::embed_json;
use crate::pipeline::{AiPipeline, PipelineError};

/// What the user told us about their kitchen.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct KitchenProfile {
    pub kitchen_size: String,
    pub budget: String,
    pub cooking_frequency: String,
    pub skill_level: String,
    pub owned_equipment: Vec<String>,
    pub favorite_cuisines: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct EquipmentItem {
    pub name: String,
    pub category: String,
    pub reason: String,
    pub estimated_price: String,
    pub priority: Priority,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct EquipmentAdvice {
    pub essentials: Vec<EquipmentItem>,
    pub upgrades: Vec<EquipmentItem>,
    /// Gadgets not worth buying for this kitchen.
    pub skip: Vec<String>,
    pub tips: Vec<String>,
}

pub fn build_equipment_prompt(profile: &KitchenProfile) -> String {
    format!(
        "You are a kitchen equipment advisor. Recommend equipment for this cook:
{}
Do not recommend anything listed in owned_equipment.
Respond ONLY with a JSON object:
{{
  \"essentials\": [{{ \"name\": string, \"category\": string, \"reason\": string, \"estimated_price\": string, \"priority\": \"high\" | \"medium\" | \"low\" }}],
  \"upgrades\": [same shape as essentials],
  \"skip\": [string],
  \"tips\": [string]
}}",
        embed_json(profile)
    )
}

/// Asks the model for buying advice, then drops anything the user already
/// owns and orders each list by priority.
pub async fn equipment_advice(
    pipeline: &AiPipeline,
    profile: &KitchenProfile,
) -> Result<EquipmentAdvice, PipelineError> {
    let mut advice: EquipmentAdvice = pipeline
        .generate_as(&build_equipment_prompt(profile))
        .await?;

    let owned: Vec<String> = profile
        .owned_equipment
        .iter()
        .map(|item| item.trim().to_lowercase())
        .collect();
    let keep = |item: &EquipmentItem| {
        let name = item.name.trim().to_lowercase();
        !name.is_empty() && !owned.contains(&name)
    };

    for list in [&mut advice.essentials, &mut advice.upgrades] {
        let before = list.len();
        list.retain(|item| keep(item));
        if list.len() != before {
            tracing::debug!(dropped = before - list.len(), "filtered owned or unnamed equipment");
        }
        list.sort_by_key(|item| item.priority);
    }

    Ok(advice)
}
