use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::services::equipment::KitchenProfile;
use crate::services::meal_plan::MealPlanRequest;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the JSON extractor over a saved model reply (no network)
    Extract {
        /// File holding the raw model output
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Parse a recipe text file and convert its ingredients to grams
    ParseRecipe {
        /// Path to the recipe text file
        #[arg(short, long)]
        file: PathBuf,
        /// Skip the per-ingredient gram conversion
        #[arg(long)]
        no_grams: bool,
    },
    /// Cultural background of a cuisine
    Cuisine {
        #[arg(short, long)]
        name: String,
    },
    /// Drink and side pairings for a dish
    Pairings {
        #[arg(short, long)]
        dish: String,
        #[arg(short, long)]
        cuisine: Option<String>,
    },
    /// Equipment recommendations for a kitchen
    Equipment(EquipmentArgs),
    /// Multi-day meal plan
    MealPlan(MealPlanArgs),
}

#[derive(Args, Debug)]
pub struct EquipmentArgs {
    #[arg(long, default_value = "medium")]
    pub kitchen_size: String,
    #[arg(long, default_value = "moderate")]
    pub budget: String,
    /// How often you cook, e.g. "daily"
    #[arg(long, default_value = "a few times a week")]
    pub cooks: String,
    #[arg(long, default_value = "beginner")]
    pub skill: String,
    /// Equipment already owned, comma separated
    #[arg(long, value_delimiter = ',')]
    pub owned: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub cuisines: Vec<String>,
}

impl From<EquipmentArgs> for KitchenProfile {
    fn from(args: EquipmentArgs) -> Self {
        Self {
            kitchen_size: args.kitchen_size,
            budget: args.budget,
            cooking_frequency: args.cooks,
            skill_level: args.skill,
            owned_equipment: args.owned,
            favorite_cuisines: args.cuisines,
        }
    }
}

#[derive(Args, Debug)]
pub struct MealPlanArgs {
    #[arg(short, long, default_value_t = 3)]
    pub days: u32,
    #[arg(long)]
    pub diet: Option<String>,
    #[arg(long)]
    pub calories: Option<u32>,
    /// Ingredients to leave out, comma separated
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,
}

impl From<MealPlanArgs> for MealPlanRequest {
    fn from(args: MealPlanArgs) -> Self {
        Self {
            days: args.days,
            diet: args.diet,
            calories_per_day: args.calories,
            exclude_ingredients: args.exclude,
            ..MealPlanRequest::default()
        }
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
