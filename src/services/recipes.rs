use serde::{Deserialize, Serialize};

use super::embed_json;
use crate::pipeline::{AiPipeline, PipelineError};

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ParsedIngredient {
    pub raw_text: String,
    pub ingredient_name: String,
    pub quantity: String,
    pub unit: String,
    pub preparation_notes: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ParsedRecipe {
    #[serde(alias = "title")]
    pub recipe_title: String,
    pub ingredients: Vec<ParsedIngredient>,
    pub instructions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RecipeRequest {
    pub ingredients: Vec<String>,
    pub cuisine: Option<String>,
    pub dietary_restrictions: Vec<String>,
    pub servings: u32,
    pub max_total_minutes: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RecipeIngredient {
    pub name: String,
    pub quantity: String,
    pub unit: String,
    pub notes: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct NutritionEstimate {
    pub calories: f32,
    pub protein_g: f32,
    pub carbohydrate_g: f32,
    pub fat_g: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct GeneratedRecipe {
    #[serde(alias = "name")]
    pub title: String,
    pub description: String,
    pub cuisine: String,
    pub servings: u32,
    pub prep_time_minutes: u32,
    pub cook_time_minutes: u32,
    pub ingredients: Vec<RecipeIngredient>,
    pub instructions: Vec<String>,
    pub nutrition_per_serving: NutritionEstimate,
    pub tips: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct GramConversion {
    pub grams: Option<f32>,
    pub notes: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CleanedIngredient {
    pub raw_text: String,
    pub ingredient_name: String,
    pub original_quantity: String,
    pub original_unit: String,
    pub preparation_notes: String,
    pub quantity_grams: Option<f32>,
    /// "LLM", "LLM_Error" or "API_Error".
    pub conversion_source: String,
    pub conversion_notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CleanedRecipe {
    pub recipe_title: String,
    pub ingredients: Vec<CleanedIngredient>,
    pub instructions: Vec<String>,
}

pub fn build_parse_prompt(recipe_text: &str) -> String {
    format!(
        "You are a recipe parsing assistant. Your task is to parse the given recipe text and extract its title, ingredients, and instructions.
Return the output as a JSON object. The JSON object must be the only content in your response. Do not include any explanatory text, comments, or markdown formatting (like ```json) before or after the JSON object.
The JSON object must have the following top-level properties:
- \"recipe_title\": A string representing the title of the recipe.
- \"ingredients\": An array of objects. Each object in this array represents a single ingredient.
- \"instructions\": An array of strings, where each string is a distinct cooking instruction.

Each object in the \"ingredients\" array must have the following string properties:
- \"raw_text\": The full, original text of the ingredient line.
- \"ingredient_name\": The primary name of the food item (e.g., 'all-purpose flour', 'egg', 'garlic clove').
- \"quantity\": The amount specified (e.g., '2', '1/2', 'a pinch', '1-2').
- \"unit\": The unit of measurement (e.g., 'cups', 'g', 'ml', 'large', 'clove', or an empty string if unitless).
- \"preparation_notes\": Any additional notes on preparation or state (e.g., 'sifted', 'finely chopped', or an empty string if none).

Recipe text:
---
{}
---",
        recipe_text.trim()
    )
}

pub fn build_generation_prompt(request: &RecipeRequest) -> String {
    format!(
        "You are a creative chef. Create one recipe that satisfies this request:
{}

Use mainly the listed ingredients; pantry staples (salt, pepper, oil, water) are allowed.
Respect every dietary restriction. If max_total_minutes is set, prep plus cook time must not exceed it.
Respond ONLY with a JSON object of this shape:
{{
  \"title\": string,
  \"description\": string,
  \"cuisine\": string,
  \"servings\": number,
  \"prep_time_minutes\": number,
  \"cook_time_minutes\": number,
  \"ingredients\": [{{ \"name\": string, \"quantity\": string, \"unit\": string, \"notes\": string }}],
  \"instructions\": [string],
  \"nutrition_per_serving\": {{ \"calories\": number, \"protein_g\": number, \"carbohydrate_g\": number, \"fat_g\": number }},
  \"tips\": [string]
}}",
        embed_json(request)
    )
}

pub fn build_gram_conversion_prompt(ingredient: &ParsedIngredient) -> String {
    format!(
        "You are a unit conversion assistant. Convert the given ingredient quantity to grams.
Ingredient Name: \"{}\"
Quantity: \"{}\"
Unit: \"{}\"
Preparation Notes: \"{}\"

Consider common food densities and typical weights for items specified by count (e.g., '1 large egg').
If the unit is already in grams (g), simply return that value.
If a direct conversion is impossible, highly ambiguous, or the unit is not a measure of mass/volume (e.g. 'to taste'), return null for grams and explain in notes.
Respond ONLY with a JSON object: {{ \"grams\": float_or_null, \"notes\": \"string_explanation\" }}.",
        ingredient.ingredient_name, ingredient.quantity, ingredient.unit, ingredient.preparation_notes
    )
}

/// Structures free recipe text into title, ingredients and instructions.
pub async fn parse_recipe_text(
    pipeline: &AiPipeline,
    recipe_text: &str,
) -> Result<ParsedRecipe, PipelineError> {
    let mut recipe: ParsedRecipe = pipeline.generate_as(&build_parse_prompt(recipe_text)).await?;
    recipe
        .ingredients
        .retain(|ingredient| !ingredient.ingredient_name.trim().is_empty());
    recipe.instructions.retain(|step| !step.trim().is_empty());
    Ok(recipe)
}

pub async fn generate_recipe(
    pipeline: &AiPipeline,
    request: &RecipeRequest,
) -> Result<GeneratedRecipe, PipelineError> {
    let mut recipe: GeneratedRecipe = pipeline.generate_as(&build_generation_prompt(request)).await?;
    if recipe.servings == 0 {
        recipe.servings = request.servings.max(1);
    }
    if recipe.cuisine.is_empty() {
        recipe.cuisine = request.cuisine.clone().unwrap_or_default();
    }
    Ok(recipe)
}

/// Converts every ingredient to grams. A failed conversion is recorded on
/// that ingredient and does not stop the rest.
pub async fn convert_ingredients_to_grams(
    pipeline: &AiPipeline,
    parsed_recipe: &ParsedRecipe,
) -> CleanedRecipe {
    let total = parsed_recipe.ingredients.len();
    let mut cleaned_ingredients = Vec::with_capacity(total);

    for (index, ingredient) in parsed_recipe.ingredients.iter().enumerate() {
        tracing::info!(
            "Converting ingredient {}/{}: {} {} {}",
            index + 1,
            total,
            ingredient.quantity,
            ingredient.unit,
            ingredient.ingredient_name
        );

        let prompt = build_gram_conversion_prompt(ingredient);
        let (grams, source, notes) = match pipeline.generate_as::<GramConversion>(&prompt).await {
            Ok(conversion) => (conversion.grams, "LLM", Some(conversion.notes)),
            Err(PipelineError::MalformedResponse { raw }) => {
                tracing::warn!(ingredient = %ingredient.ingredient_name, "unparsable conversion reply");
                (None, "LLM_Error", Some(format!("Failed to parse LLM response. Raw: {raw}")))
            }
            Err(e) => {
                tracing::warn!(ingredient = %ingredient.ingredient_name, error = %e, "conversion call failed");
                (None, "API_Error", Some(format!("API call failed: {e}")))
            }
        };

        cleaned_ingredients.push(CleanedIngredient {
            raw_text: ingredient.raw_text.clone(),
            ingredient_name: ingredient.ingredient_name.clone(),
            original_quantity: ingredient.quantity.clone(),
            original_unit: ingredient.unit.clone(),
            preparation_notes: ingredient.preparation_notes.clone(),
            quantity_grams: grams.filter(|g| g.is_finite() && *g >= 0.0),
            conversion_source: source.to_string(),
            conversion_notes: notes,
        });
    }

    CleanedRecipe {
        recipe_title: parsed_recipe.recipe_title.clone(),
        ingredients: cleaned_ingredients,
        instructions: parsed_recipe.instructions.clone(),
    }
}
