use crate::layout::{FlowRender, RenderNode, RenderTree};
use crate::model::FlowModel;
use std::fmt::{self, Write};

/// Formats the structure of a flow as an indented tree for debugging.
///
/// Branches and fault paths are nested under their owning element; a chain continues at
/// the indentation it started at.
pub fn visualize_model(model: &FlowModel) -> String {
    let mut output = String::new();
    // Writing into a String cannot fail.
    let _ = write_model(&mut output, model);
    output
}

/// Formats a render tree as an outline of node slots and connectors.
pub fn visualize_layout(tree: &RenderTree) -> String {
    let mut output = String::new();
    let _ = write_layout(&mut output, tree);
    output
}

fn write_model(output: &mut String, model: &FlowModel) -> fmt::Result {
    writeln!(output, "======== FLOW: {} ========", model.root())?;
    write_chain(output, model, Some(model.root().as_str()), "")?;

    let resources: Vec<_> = model
        .sorted_guids()
        .into_iter()
        .filter_map(|guid| model.get(guid))
        .filter(|e| !e.is_canvas_element)
        .collect();
    if !resources.is_empty() {
        writeln!(output, "\n--- RESOURCES ---")?;
        for element in resources {
            writeln!(output, "{} [{}]", element.guid, element.element_type)?;
        }
    }
    Ok(())
}

fn write_chain(output: &mut String, model: &FlowModel, head: Option<&str>, indent: &str) -> fmt::Result {
    let Some(head) = head else {
        return writeln!(output, "{}(empty)", indent);
    };
    if !model.contains(head) {
        return writeln!(output, "{}{} (missing)", indent, head);
    }
    for element in model.traverse_branch(head) {
        writeln!(
            output,
            "{}{} [{}] \"{}\"",
            indent, element.guid, element.element_type, element.label
        )?;

        let nested = element.children.len() + usize::from(element.fault.is_some());
        for (i, branch) in element.children.iter().enumerate() {
            let last = i + 1 == nested;
            let marker = if branch.merging { "" } else { " (ended)" };
            writeln!(
                output,
                "{}{} {}{}",
                indent,
                if last { "└──" } else { "├──" },
                branch.label,
                marker
            )?;
            let child_indent = format!("{}{}", indent, if last { "    " } else { "│   " });
            write_chain(output, model, branch.head.as_deref(), &child_indent)?;
        }
        if let Some(fault) = &element.fault {
            writeln!(output, "{}└── Fault", indent)?;
            write_chain(output, model, Some(fault), &format!("{}    ", indent))?;
        }
    }
    // A chain that stops at a missing element.
    let tail = model.chain_tail(head);
    if let Some(next) = tail.and_then(|e| e.next.as_deref()).filter(|n| !model.contains(n)) {
        writeln!(output, "{}{} (missing)", indent, next)?;
    }
    Ok(())
}

fn write_layout(output: &mut String, tree: &RenderTree) -> fmt::Result {
    writeln!(
        output,
        "======== LAYOUT ({} mode) {}x{} ========",
        tree.mode, tree.bounds.width, tree.bounds.height
    )?;
    write_flow(output, &tree.flow, 0)?;
    if !tree.violations.is_empty() {
        writeln!(output, "\n--- STUBS ---")?;
        for violation in &tree.violations {
            writeln!(output, "{}", violation)?;
        }
    }
    Ok(())
}

fn write_flow(output: &mut String, flow: &FlowRender, depth: usize) -> fmt::Result {
    for node in &flow.nodes {
        write_node(output, node, depth)?;
    }
    Ok(())
}

fn write_node(output: &mut String, node: &RenderNode, depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    let kind = match node.element_type {
        Some(element_type) => element_type.to_string(),
        None => "stub".to_string(),
    };
    writeln!(
        output,
        "{}{:<16} {:<12} at ({}, {}) {}x{}",
        indent, node.guid, kind, node.x, node.y, node.width, node.height
    )?;
    for connector in &node.connectors {
        writeln!(
            output,
            "{}  -> {:?} {}",
            indent,
            connector.kind,
            connector.target.as_deref().unwrap_or("-")
        )?;
    }
    for branch in &node.children {
        writeln!(
            output,
            "{}  [{}] {} +{} w{}",
            indent, branch.index, branch.label, branch.offset, branch.width
        )?;
        write_flow(output, &branch.flow, depth + 2)?;
    }
    if let Some(fault) = &node.fault {
        writeln!(output, "{}  [fault]", indent)?;
        write_flow(output, fault, depth + 2)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{ElementDefinition, FlowDefinition, IntoFlowModel};
    use crate::model::ElementType;

    #[test]
    fn test_model_tree_nests_branches() {
        let model = FlowDefinition {
            root: "start".to_string(),
            elements: vec![
                ElementDefinition::new("start", ElementType::Start).with_next("d"),
                ElementDefinition::new("d", ElementType::Decision)
                    .with_branches(&[("Yes", Some("a")), ("No", None)])
                    .with_next("end"),
                ElementDefinition::new("a", ElementType::Assignment),
                ElementDefinition::new("end", ElementType::End),
            ],
        }
        .into_flow_model()
        .unwrap();

        let text = visualize_model(&model);
        assert!(text.contains("├── Yes"));
        assert!(text.contains("│   a [Assignment]"));
        assert!(text.contains("└── No"));
        assert!(text.contains("    (empty)"));
        assert!(text.contains("end [End]"));
    }
}
