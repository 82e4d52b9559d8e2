use serde::{Deserialize, Serialize};

use super::embed_json;
use crate::pipeline::{AiPipeline, PipelineError};

pub const MAX_PLAN_DAYS: u32 = 14;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MealPlanRequest {
    pub days: u32,
    pub diet: Option<String>,
    pub calories_per_day: Option<u32>,
    pub meals_per_day: u32,
    pub exclude_ingredients: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Meal {
    pub meal_type: String,
    pub name: String,
    pub description: String,
    pub calories: Option<u32>,
    pub prep_minutes: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DayPlan {
    pub day: u32,
    pub meals: Vec<Meal>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MealPlan {
    pub days: Vec<DayPlan>,
    pub shopping_list: Vec<String>,
    pub notes: Vec<String>,
}

pub fn build_meal_plan_prompt(request: &MealPlanRequest) -> String {
    format!(
        "You are a meal planner. Create a plan matching this request:
{}
Respond ONLY with a JSON object:
{{
  \"days\": [{{ \"day\": number, \"meals\": [{{ \"meal_type\": string, \"name\": string, \"description\": string, \"calories\": number, \"prep_minutes\": number }}] }}],
  \"shopping_list\": [string],
  \"notes\": [string]
}}",
        embed_json(request)
    )
}

/// Generates a multi-day plan through the serial queue.
///
/// The request is clamped to `1..=MAX_PLAN_DAYS` days. Surplus days from the
/// model are dropped, days are renumbered from 1 and the shopping list is
/// deduplicated.
pub async fn generate_meal_plan(
    pipeline: &AiPipeline,
    request: &MealPlanRequest,
) -> Result<MealPlan, PipelineError> {
    let mut request = request.clone();
    request.days = request.days.clamp(1, MAX_PLAN_DAYS);
    if request.meals_per_day == 0 {
        request.meals_per_day = 3;
    }

    let mut plan: MealPlan = pipeline
        .generate_as_queued(&build_meal_plan_prompt(&request))
        .await?;

    for day in &mut plan.days {
        day.meals.retain(|meal| !meal.name.trim().is_empty());
    }
    plan.days.retain(|day| !day.meals.is_empty());
    if plan.days.len() > request.days as usize {
        tracing::debug!(
            requested = request.days,
            returned = plan.days.len(),
            "model returned extra days, truncating"
        );
        plan.days.truncate(request.days as usize);
    }
    for (index, day) in plan.days.iter_mut().enumerate() {
        day.day = index as u32 + 1;
    }

    let mut seen = std::collections::HashSet::new();
    plan.shopping_list
        .retain(|item| !item.trim().is_empty() && seen.insert(item.trim().to_lowercase()));

    if plan.days.len() < request.days as usize {
        tracing::warn!(
            requested = request.days,
            returned = plan.days.len(),
            "meal plan is shorter than requested"
        );
    }
    Ok(plan)
}
