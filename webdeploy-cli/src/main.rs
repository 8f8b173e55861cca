use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};

use webdeploy_aws::asset::{self, StagedAsset};
use webdeploy_aws::config::StackConfig;
use webdeploy_aws::stack;
use webdeploy_aws::{schemas, user_data};
use webdeploy_core::differ::diff_templates;
use webdeploy_core::plan::{Change, Plan, format_change_brief};
use webdeploy_core::template::Template;

#[derive(Parser)]
#[command(name = "webdeploy")]
#[command(about = "Describe an EC2 web application stack as a deployment template", long_about = None)]
struct Cli {
    /// Override a deployment parameter read from the environment
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param, global = true)]
    params: Vec<(String, String)>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the deployment template
    Synth {
        /// Write the template to a file instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Build the stack and check it against the resource schemas
    Validate,
    /// Show what changed compared with a previously synthesized template
    Diff {
        /// Path to the previous template
        previous: PathBuf,

        /// Also print a line diff of the two templates
        #[arg(long)]
        verbose: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let params = merge_params(StackConfig::env_params(), cli.params);

    let result = match cli.command {
        Commands::Synth { out } => run_synth(&params, out.as_deref()),
        Commands::Validate => run_validate(&params),
        Commands::Diff { previous, verbose } => run_diff(&params, &previous, verbose),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Command-line parameters win over the environment
fn merge_params(
    mut params: HashMap<String, String>,
    overrides: Vec<(String, String)>,
) -> HashMap<String, String> {
    params.extend(overrides);
    params
}

fn load(params: &HashMap<String, String>) -> Result<(StackConfig, StagedAsset), String> {
    let config = StackConfig::from_params(params).map_err(|e| e.to_string())?;
    let asset = asset::stage_for(&config).map_err(|e| e.to_string())?;
    Ok((config, asset))
}

fn synthesize(params: &HashMap<String, String>) -> Result<Template, String> {
    let (config, asset) = load(params)?;
    stack::synthesize(&config, &asset).map_err(|e| e.to_string())
}

fn run_synth(params: &HashMap<String, String>, out: Option<&Path>) -> Result<(), String> {
    let template = synthesize(params)?;
    let json = template
        .to_json_pretty()
        .map_err(|e| format!("Failed to serialize template: {}", e))?;

    match out {
        Some(path) => {
            fs::write(path, format!("{}\n", json))
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
            println!(
                "{}",
                format!("✓ Template written to {}", path.display())
                    .green()
                    .bold()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn run_validate(params: &HashMap<String, String>) -> Result<(), String> {
    let (config, asset) = load(params)?;

    println!("{}", "Validating...".cyan());

    let graph = stack::build_stack(&config, &asset).map_err(|e| e.to_string())?;

    println!(
        "{}",
        format!(
            "✓ {} resources validated successfully.",
            graph.resources().len()
        )
        .green()
        .bold()
    );

    let registry = schemas::registry();
    for resource in graph.resources() {
        let description = registry
            .get(&resource.id.resource_type)
            .and_then(|schema| schema.description.as_deref());
        match description {
            Some(description) => {
                println!("  • {} {}", resource.id, format!("({})", description).dimmed())
            }
            None => println!("  • {}", resource.id),
        }
    }

    if let Some(script) = stack::startup_script_of(&graph) {
        log::info!("startup script:\n{}", user_data::preview_value(script));
    }

    Ok(())
}

fn run_diff(params: &HashMap<String, String>, previous: &Path, verbose: bool) -> Result<(), String> {
    let previous_json = fs::read_to_string(previous)
        .map_err(|e| format!("Failed to read {}: {}", previous.display(), e))?;
    let previous_template = Template::from_json(&previous_json)
        .map_err(|e| format!("Failed to parse {}: {}", previous.display(), e))?;

    let desired = synthesize(params)?;
    let plan = diff_templates(&desired, &previous_template);
    print_plan(&plan);

    if verbose {
        let desired_json = desired
            .to_json_pretty()
            .map_err(|e| format!("Failed to serialize template: {}", e))?;
        // Re-serialize so formatting differences in the file do not show up
        let previous_json = previous_template
            .to_json_pretty()
            .map_err(|e| format!("Failed to serialize template: {}", e))?;
        print_diff(previous, &previous_json, &desired_json);
    }

    Ok(())
}

fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for change in plan.changes() {
        let line = format_change_brief(change);
        let line = match change {
            Change::Create { .. } => line.green(),
            Change::Update { .. } => line.yellow(),
            Change::Replace { .. } => line.magenta(),
            Change::Delete { .. } => line.red(),
        };
        println!("  {}", line);
    }

    println!();
    println!("{}", plan.summary().to_string().bold());
}

fn print_diff(file: &Path, original: &str, desired: &str) {
    println!("\n{} {}:", "Diff for".cyan().bold(), file.display());

    let diff = TextDiff::from_lines(original, desired);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-".red(),
            ChangeTag::Insert => "+".green(),
            ChangeTag::Equal => " ".normal(),
        };
        print!("{}{}", sign, change);
    }
}
