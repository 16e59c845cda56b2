use clap::{Parser, Subcommand};
use flowcanvas::prelude::*;
use std::fs;
use std::time::Instant;

/// Lay out, validate and edit flow definitions from the command line
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Optional path to a session configuration JSON file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute the render tree of a flow
    Layout {
        /// Path to the flow JSON file
        flow_path: String,
        /// Canvas mode to lay out for
        #[arg(short, long, default_value = "default")]
        mode: CanvasMode,
    },
    /// Report every structural problem of a flow
    Validate {
        flow_path: String,
    },
    /// Replay a JSON array of canvas events and write the edited flow
    Apply {
        flow_path: String,
        /// Path to the events JSON file
        events_path: String,
        /// Where to write the edited flow, stdout when omitted
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the structure of a flow as a tree
    Tree {
        flow_path: String,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let json = read_file(path);
            serde_json::from_str::<SessionConfig>(&json).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to parse config '{}': {}", path, e))
            })
        }
        None => SessionConfig::default(),
    };

    match cli.command {
        Commands::Layout { flow_path, mode } => run_layout(&flow_path, mode, &config, cli.json),
        Commands::Validate { flow_path } => run_validate(&flow_path, cli.json),
        Commands::Apply {
            flow_path,
            events_path,
            output,
        } => run_apply(&flow_path, &events_path, output, config, cli.json),
        Commands::Tree { flow_path } => {
            let model = load_model(&flow_path);
            print!("{}", visualize_model(&model));
        }
    }
}

fn run_layout(flow_path: &str, mode: CanvasMode, config: &SessionConfig, json: bool) {
    let model = load_model(flow_path);

    let start = Instant::now();
    let engine = LayoutEngine::builder(config.layout.clone()).build();
    let tree = engine
        .compute_layout(&model, mode)
        .unwrap_or_else(|e| exit_with_error(&format!("Layout failed: {}", e)));
    let duration = start.elapsed();

    if json {
        let output = serde_json::to_string_pretty(&tree)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize layout: {}", e)));
        println!("{}", output);
    } else {
        print!("{}", visualize_layout(&tree));
        println!("\nLaid out {} nodes in {:?}", tree.nodes().len(), duration);
    }
}

fn run_validate(flow_path: &str, json: bool) {
    let model = load_model(flow_path);
    let violations = validate_graph(&model);

    if json {
        let output = serde_json::to_string_pretty(&violations)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize report: {}", e)));
        println!("{}", output);
    } else if violations.is_empty() {
        println!("Flow '{}' is valid ({} elements)", model.root(), model.len());
    } else {
        println!("Flow '{}' has {} problems:", model.root(), violations.len());
        for violation in &violations {
            println!("  - {}", violation);
        }
    }

    if !violations.is_empty() {
        std::process::exit(2);
    }
}

fn run_apply(
    flow_path: &str,
    events_path: &str,
    output: Option<String>,
    config: SessionConfig,
    json: bool,
) {
    let model = load_model(flow_path);
    let events: Vec<CanvasEvent> = serde_json::from_str(&read_file(events_path))
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse events: {}", e)));

    let mut session = EditorSession::new(model, config)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to open flow: {}", e)));

    let mut rejected = 0;
    for (i, event) in events.iter().enumerate() {
        match session.dispatch(event) {
            Ok(Effect::Mutated { diff, .. }) if !json => println!(
                "#{:03} {:<14} +{} -{} ~{}",
                i,
                event.event_type,
                diff.added.len(),
                diff.removed.len(),
                diff.modified.len()
            ),
            Ok(_) => {}
            Err(e) => {
                rejected += 1;
                eprintln!("#{:03} {:<14} rejected: {}", i, event.event_type, e);
            }
        }
        session.run_deferred();
    }

    let definition = FlowDefinition::from_model(session.model());
    let flow_json = definition
        .to_json()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize flow: {}", e)));
    match output {
        Some(path) => {
            fs::write(&path, flow_json)
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to write '{}': {}", path, e)));
            if !json {
                println!(
                    "Applied {} of {} events, wrote '{}'",
                    events.len() - rejected,
                    events.len(),
                    path
                );
            }
        }
        None => println!("{}", flow_json),
    }
}

fn load_model(path: &str) -> FlowModel {
    FlowModel::from_json(&read_file(path))
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load flow '{}': {}", path, e)))
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read file '{}': {}", path, e)))
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
