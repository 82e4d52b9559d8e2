use anyhow::{Context, Result};
use kitchen_ai::cli::{parse_args, Command};
use kitchen_ai::pipeline::{safe_json_parse, AiPipeline};
use kitchen_ai::services::{cuisine, equipment, meal_plan, recipes};
use kitchen_ai::settings::Settings;
use serde::Serialize;
use tokio::fs;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Pipeline for the subcommands that call the model. Loads `.env` first.
fn build_pipeline() -> AiPipeline {
    let settings = Settings::from_env();
    tracing::debug!(?settings, "loaded settings");
    AiPipeline::from_settings(&settings)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output as JSON")?;
    println!("{rendered}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = parse_args();

    match cli.command {
        Command::Extract { file } => {
            let raw = fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read model output '{}'", file.display()))?;
            let value = safe_json_parse(raw).context("No JSON could be extracted")?;
            print_json(&value)
        }
        Command::ParseRecipe { file, no_grams } => {
            let recipe_content = fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read recipe file '{}'", file.display()))?;
            tracing::info!("Recipe content read, sending to parser");

            let pipeline = build_pipeline();
            let parsed = recipes::parse_recipe_text(&pipeline, &recipe_content)
                .await
                .context("Recipe parsing failed")?;
            if no_grams {
                return print_json(&parsed);
            }

            let cleaned = recipes::convert_ingredients_to_grams(&pipeline, &parsed).await;
            print_json(&cleaned)
        }
        Command::Cuisine { name } => {
            let facts = cuisine::cultural_facts(&build_pipeline(), &name)
                .await
                .with_context(|| format!("Could not describe cuisine '{name}'"))?;
            print_json(&facts)
        }
        Command::Pairings { dish, cuisine: style } => {
            let suggestions =
                cuisine::suggest_pairings(&build_pipeline(), &dish, style.as_deref()).await;
            print_json(&suggestions)
        }
        Command::Equipment(args) => {
            let profile = equipment::KitchenProfile::from(args);
            let advice = equipment::equipment_advice(&build_pipeline(), &profile)
                .await
                .context("Equipment advice failed")?;
            print_json(&advice)
        }
        Command::MealPlan(args) => {
            let request = meal_plan::MealPlanRequest::from(args);
            let plan = meal_plan::generate_meal_plan(&build_pipeline(), &request)
                .await
                .context("Meal plan generation failed")?;
            print_json(&plan)
        }
    }
}
