use clap::Parser;
use flowcanvas::prelude::*;
use rand::seq::IndexedRandom;
use rand::{Rng, rngs::ThreadRng};
use std::fs;

/// A CLI tool to generate random, structurally valid flows for the canvas engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The path to write the generated flow JSON file to
    #[arg(short, long, default_value = "generated_flow.json")]
    output: String,

    /// The number of insertions to attempt
    #[arg(short, long, default_value_t = 40)]
    elements: usize,

    /// Chance that an insertion targets a fault path when one is available
    #[arg(long, default_value_t = 0.1)]
    fault_rate: f64,
}

const INSERTABLE: [ElementType; 12] = [
    ElementType::Screen,
    ElementType::Decision,
    ElementType::Wait,
    ElementType::Loop,
    ElementType::Assignment,
    ElementType::RecordCreate,
    ElementType::RecordUpdate,
    ElementType::RecordLookup,
    ElementType::RecordDelete,
    ElementType::ActionCall,
    ElementType::Subflow,
    ElementType::End,
];

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut rng = rand::rng();

    if !(0.0..=1.0).contains(&cli.fault_rate) {
        eprintln!("Error: --fault-rate ({}) must be between 0 and 1", cli.fault_rate);
        std::process::exit(1);
    }

    println!("Generating a flow with {} insertion attempts...", cli.elements);

    let mut model = FlowDefinition {
        root: "start".to_string(),
        elements: vec![
            ElementDefinition::new("start", ElementType::Start).with_next("end"),
            ElementDefinition::new("end", ElementType::End),
        ],
    }
    .into_flow_model()?;

    let mut engine = MutationEngine::default();
    let mut rejected = 0;
    for _ in 0..cli.elements {
        let command = random_command(&mut rng, &model, cli.fault_rate);
        match engine.apply(&model, &command) {
            Ok(mutation) => model = mutation.model,
            Err(_) => rejected += 1,
        }
    }

    let json_output = FlowDefinition::from_model(&model).to_json()?;
    fs::write(&cli.output, json_output)?;

    println!(
        "-> {} elements ({} insertions refused as structurally invalid)",
        model.len(),
        rejected
    );
    println!("Successfully generated and saved flow to '{}'", cli.output);

    Ok(())
}

/// Picks a random insertion point and element type.
fn random_command(rng: &mut ThreadRng, model: &FlowModel, fault_rate: f64) -> Command {
    let guids = model.sorted_guids();
    let anchor = loop {
        let Some(guid) = guids.choose(rng) else {
            break Anchor::after(model.root());
        };
        let Some(element) = model.get(guid) else {
            continue;
        };

        if element.element_type.supports_fault()
            && element.fault.is_none()
            && rng.random_bool(fault_rate)
        {
            break Anchor::fault(guid);
        }
        if !element.children.is_empty() && rng.random_bool(0.5) {
            break Anchor::branch(guid, rng.random_range(0..element.children.len()));
        }
        if !element.element_type.is_terminal() {
            break Anchor::after(guid);
        }
    };

    let element_type = *INSERTABLE.choose(rng).unwrap_or(&ElementType::Assignment);
    Command::AddElement {
        anchor,
        element_type,
        label: None,
    }
}
