use anyhow::Result;
use clap::{Parser, Subcommand};
use saucier_core::{build_pipeline_from_env, Comparison, Outcome, ResearchRequest, SkillLevel};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "saucier")]
#[command(about = "Recipe research pipeline CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one research request and print the report
    Research {
        /// What to learn (e.g. "pan sauces")
        #[arg(long)]
        goal: String,
        /// Skill level: beginner | intermediate | advanced
        #[arg(long, default_value = "intermediate")]
        skill: String,
        /// Dietary restriction (repeatable)
        #[arg(long = "diet")]
        diets: Vec<String>,
        /// URL to exclude from results (repeatable)
        #[arg(long = "exclude")]
        excluded: Vec<String>,
        /// Print the full report as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Research {
            goal,
            skill,
            diets,
            excluded,
            json,
        } => {
            research(&goal, &skill, diets, excluded, json).await?;
        }
    }

    Ok(())
}

async fn research(
    goal: &str,
    skill: &str,
    diets: Vec<String>,
    excluded: Vec<String>,
    json: bool,
) -> Result<()> {
    let pipeline = build_pipeline_from_env()?;

    let mut request = ResearchRequest::new(goal, SkillLevel::parse_or_default(skill));
    request.dietary_restrictions = diets;
    request.excluded_urls = excluded;

    let report = pipeline.run(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match report.outcome {
        Outcome::NotFound => {
            println!("No recipes found after {} retries.", report.metadata.retry_count);
        }
        Outcome::Complete => {
            for (i, card) in report.cards.iter().enumerate() {
                println!(
                    "{}. {} ({}, score {:.1})",
                    i + 1,
                    card.recipe.title,
                    card.recipe.source,
                    card.score
                );
                println!("   {}", card.recipe.url);
                println!("   {}", card.reasoning);
                if !card.technique_highlights.is_empty() {
                    println!("   Techniques: {}", card.technique_highlights.join(", "));
                }
                if let Some(nutrition) = &card.nutrition {
                    match nutrition.calories {
                        Some(calories) => println!(
                            "   ~{} kcal/serving ({} servings)",
                            calories, nutrition.servings
                        ),
                        None => println!("   {}", nutrition.disclaimer),
                    }
                }
                println!();
            }

            if let Comparison::SideBySide {
                first_focus,
                second_focus,
                shared_techniques,
            } = &report.comparison
            {
                println!("Comparing \"{first_focus}\" vs \"{second_focus}\"");
                if !shared_techniques.is_empty() {
                    println!("Shared techniques: {}", shared_techniques.join(", "));
                }
            }
        }
    }

    if !report.metadata.warnings.is_empty() {
        println!("Warnings:");
        for warning in &report.metadata.warnings {
            println!("  - {warning}");
        }
    }
    println!(
        "({} search calls, {} LLM calls, {} ms)",
        report.metadata.search_calls, report.metadata.llm_calls, report.metadata.elapsed_ms
    );

    Ok(())
}
